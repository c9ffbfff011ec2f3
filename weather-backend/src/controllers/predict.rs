//! `/predict` boundary: input validation, orchestration, and SSE streaming.

use actix_web::web::Bytes;
use actix_web::{web, HttpResponse, Responder};
use async_stream::stream;
use futures_util::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::ai::aggregator::{aggregate, mentions_city};
use crate::ai::{AgentInvocationResult, EventKind, Orchestrator, StreamEvent};

/// Introduction length cap, in words
const MAX_INTRODUCTION_WORDS: usize = 60;

/// Requests touching these topics are refused at the boundary
const DISALLOWED_TERMS: [&str; 3] = ["diagnosis", "prescription", "lawsuit"];

static SENTENCE_TERMINALS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]").unwrap());

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    introduction: String,
    #[serde(default)]
    city: String,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/predict").route(web::post().to(predict)));
}

/// Validate inputs, launch the concurrent agents, and stream SSE updates.
async fn predict(payload: web::Json<PredictRequest>) -> impl Responder {
    let introduction = payload.introduction.trim().to_string();
    let city = payload.city.trim().to_string();

    let errors = validate_inputs(&introduction, &city);
    if !errors.is_empty() {
        return HttpResponse::UnprocessableEntity().json(serde_json::json!({ "detail": errors }));
    }

    log::info!("[PREDICT] Streaming tips for city '{}'", city);

    // The orchestrator runs on its own task so a crash there drops the
    // channel instead of tearing down the response mid-stream.
    let (tx, mut rx) = mpsc::channel::<StreamEvent>(16);
    let events = Orchestrator::new().stream(introduction, city.clone());
    tokio::spawn(async move {
        tokio::pin!(events);
        while let Some(event) = events.next().await {
            if tx.send(event).await.is_err() {
                // client went away
                break;
            }
        }
    });

    let body = stream! {
        let mut saw_final = false;
        while let Some(event) = rx.recv().await {
            if event.kind == EventKind::Final {
                saw_final = true;
            }
            yield Ok::<Bytes, actix_web::Error>(Bytes::from(format_sse(&event)));
        }

        if !saw_final {
            log::error!("[PREDICT] Stream ended without a final event; sending degraded wrap-up");
            let degraded = StreamEvent::new(
                EventKind::Degraded,
                None,
                "We hit a hiccup contacting the agents. Please retry in a moment.",
            );
            yield Ok(Bytes::from(format_sse(&degraded)));

            let results = [
                ("weather", AgentInvocationResult::failed()),
                ("city", AgentInvocationResult::failed()),
            ];
            let wrap_up = StreamEvent::new(EventKind::Final, None, aggregate(&city, &results));
            yield Ok(Bytes::from(format_sse(&wrap_up)));
        }
    };

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(body)
}

/// Return validation errors for the introduction + city fields
fn validate_inputs(introduction: &str, city: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if introduction.is_empty() {
        errors.push("Introduction is required.".to_string());
    }
    if introduction.split_whitespace().count() > MAX_INTRODUCTION_WORDS {
        errors.push("Introduction should stay under 60 words for clarity.".to_string());
    }

    if !introduction.is_empty() {
        let terminals = SENTENCE_TERMINALS.find_iter(introduction).count();
        if terminals != 1 || introduction.contains('\n') {
            errors.push("Please share exactly one sentence in your introduction.".to_string());
        }
    }

    if city.is_empty() {
        errors.push("City is required.".to_string());
    } else if !mentions_city(introduction, city) {
        errors.push(
            "Mention the city within your introduction sentence so the agents share context."
                .to_string(),
        );
    }

    let lowered = introduction.to_lowercase();
    if DISALLOWED_TERMS.iter().any(|term| lowered.contains(term)) {
        errors.push(
            "Please avoid medical or legal requests; HelloWeather shares casual tips only."
                .to_string(),
        );
    }

    errors
}

/// Convert a structured event into SSE wire format.
///
/// Events carrying only `data` serialize the raw string; agent-tagged events
/// serialize a small `{agent, data}` record.
fn format_sse(event: &StreamEvent) -> String {
    let payload = match event.agent {
        Some(agent) => serde_json::json!({ "agent": agent, "data": event.data }),
        None => Value::String(event.data.clone()),
    };
    format!("event: {}\ndata: {}\n\n", event.kind, payload)
}
