use actix_cors::Cors;
use actix_files::Files;
use actix_web::{middleware::Logger, App, HttpServer};
use dotenv::dotenv;

mod ai;
mod config;
mod controllers;

use config::Config;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();

    // Landing page location differs when running from the workspace root vs
    // the crate directory; serving is optional either way.
    let static_dir = if std::path::Path::new("./static").exists() {
        "./static"
    } else if std::path::Path::new("../static").exists() {
        "../static"
    } else {
        log::warn!("Static directory not found in ./static or ../static - landing page disabled");
        ""
    };

    log::info!("Starting HelloWeather server on {}:{}", config.host, config.port);
    if !static_dir.is_empty() {
        log::info!("Serving landing page from: {}", static_dir);
    }

    let bind_addr = (config.host.clone(), config.port);
    let static_dir = static_dir.to_string();

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let mut app = App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config)
            .configure(controllers::predict::config);

        if !static_dir.is_empty() {
            app = app.service(Files::new("/", static_dir.clone()).index_file("index.html"));
        }

        app
    })
    .bind(bind_addr)?
    .run()
    .await
}
