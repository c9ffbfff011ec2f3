//! Concurrent agent orchestration with bounded retry and graceful degrade.
//!
//! Runs WeatherAgent and CityAgent as independent tasks, wraps each attempt
//! in a timeout, and streams ordered progress events ending in one `final`
//! event. Individual agent failure never surfaces to the caller as an error.

use crate::ai::agents::{CityAgent, RoleAgent, WeatherAgent};
use crate::ai::aggregator::aggregate;
use crate::ai::azure::AzureChatClient;
use crate::ai::types::{AgentInvocationResult, AgentStatus, EventKind, StreamEvent};
use async_stream::stream;
use futures_util::Stream;
use std::sync::Arc;
use std::time::{Duration, Instant};

const STREAM_TIMEOUT_SECONDS: u64 = 12;
const RETRY_LIMIT: u32 = 1;
const RETRY_BACKOFF_MS: u64 = 200;

/// Per-invocation budgets, shrunk by tests to keep failure paths fast
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    pub attempt_timeout: Duration,
    pub retry_limit: u32,
    pub retry_backoff: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(STREAM_TIMEOUT_SECONDS),
            retry_limit: RETRY_LIMIT,
            retry_backoff: Duration::from_millis(RETRY_BACKOFF_MS),
        }
    }
}

/// Fans a request out to the declared agents and streams progress events.
///
/// Each `stream` call is a fresh, finite run; the orchestrator is consumed so
/// a run cannot be restarted.
pub struct Orchestrator {
    agents: Option<Vec<Arc<dyn RoleAgent>>>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            agents: None,
            config: OrchestratorConfig::default(),
        }
    }

    /// Replace the declared agents, primarily for tests injecting stubs
    pub fn with_agents(mut self, agents: Vec<Arc<dyn RoleAgent>>) -> Self {
        self.agents = Some(agents);
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Run both agents concurrently and stream structured events.
    ///
    /// Event order per request: one `info`, one gathering `update` per agent,
    /// one result event per agent in declared order (not completion order),
    /// then exactly one terminal `final`.
    pub fn stream(self, introduction: String, city: String) -> impl Stream<Item = StreamEvent> {
        let Orchestrator { agents, config } = self;

        stream! {
            yield StreamEvent::new(
                EventKind::Info,
                None,
                format!("Thanks for sharing! Checking fresh guidance for {} with both agents…", city),
            );

            let agents = agents.unwrap_or_else(default_agents);
            let run_started = Instant::now();

            let mut handles = Vec::with_capacity(agents.len());
            for agent in &agents {
                let agent = Arc::clone(agent);
                let introduction = introduction.clone();
                let city = city.clone();
                handles.push(tokio::spawn(async move {
                    invoke_agent(agent, &introduction, &city, config).await
                }));
            }

            for agent in &agents {
                yield StreamEvent::new(EventKind::Update, Some(agent.name()), "Gathering insights…");
            }

            let mut results: Vec<(&'static str, AgentInvocationResult)> =
                Vec::with_capacity(agents.len());

            for (agent, handle) in agents.iter().zip(handles) {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(err) => {
                        log::error!("[ORCHESTRATOR] {} task crashed: {}", agent.label(), err);
                        AgentInvocationResult {
                            status: AgentStatus::Failed,
                            text: String::new(),
                            duration_ms: config.attempt_timeout.as_millis() as u64,
                        }
                    }
                };

                let kind = if result.status == AgentStatus::Success {
                    EventKind::Update
                } else {
                    EventKind::Degraded
                };
                let message = if result.text.is_empty() {
                    format!("{} ran into an issue; no fresh details.", agent.label())
                } else {
                    result.text.clone()
                };
                yield StreamEvent::new(kind, Some(agent.name()), message);

                results.push((agent.name(), result));
            }

            let combined = aggregate(&city, &results);
            log::info!(
                "[ORCHESTRATOR] Aggregated final tip in {}ms",
                run_started.elapsed().as_millis()
            );

            yield StreamEvent::new(EventKind::Final, None, combined);
        }
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Declared agents in order: weather first, then city. A missing or
/// misconfigured Azure deployment downgrades to canned responses instead of
/// aborting the request.
fn default_agents() -> Vec<Arc<dyn RoleAgent>> {
    let client = match AzureChatClient::from_env() {
        Ok(client) => Some(Arc::new(client)),
        Err(err) => {
            log::warn!("[ORCHESTRATOR] Falling back to canned agent responses: {}", err);
            None
        }
    };

    vec![
        Arc::new(WeatherAgent::new(client.clone())) as Arc<dyn RoleAgent>,
        Arc::new(CityAgent::new(client)) as Arc<dyn RoleAgent>,
    ]
}

/// One agent invocation: up to `retry_limit + 1` attempts, each bounded by
/// the attempt timeout, with a short backoff between attempts.
async fn invoke_agent(
    agent: Arc<dyn RoleAgent>,
    introduction: &str,
    city: &str,
    config: OrchestratorConfig,
) -> AgentInvocationResult {
    let started = Instant::now();
    let mut status = AgentStatus::Failed;
    let mut text = String::new();
    let mut last_error: Option<String> = None;

    for attempt in 0..=config.retry_limit {
        let err = match tokio::time::timeout(config.attempt_timeout, agent.run(introduction, city))
            .await
        {
            Ok(Ok(out)) => {
                status = if out.is_empty() {
                    AgentStatus::Degraded
                } else {
                    AgentStatus::Success
                };
                text = out;
                break;
            }
            Ok(Err(err)) => err,
            Err(_) => format!("timed out after {}s", config.attempt_timeout.as_secs()),
        };

        status = AgentStatus::Failed;
        log::warn!(
            "[ORCHESTRATOR] {} attempt {} failed: {}",
            agent.label(),
            attempt + 1,
            err
        );
        last_error = Some(err);

        if attempt < config.retry_limit {
            tokio::time::sleep(config.retry_backoff).await;
        }
    }

    let duration_ms = started.elapsed().as_millis() as u64;
    if status == AgentStatus::Failed {
        if let Some(err) = &last_error {
            log::error!("[ORCHESTRATOR] {} failed after retries: {}", agent.label(), err);
        }
    }

    AgentInvocationResult {
        status,
        text,
        duration_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::aggregator::DISCLAIMER;
    use futures_util::StreamExt;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn test_config() -> OrchestratorConfig {
        OrchestratorConfig {
            attempt_timeout: Duration::from_millis(50),
            retry_limit: 1,
            retry_backoff: Duration::from_millis(10),
        }
    }

    struct CannedAgent {
        name: &'static str,
        label: &'static str,
        text: String,
    }

    #[async_trait::async_trait]
    impl RoleAgent for CannedAgent {
        fn name(&self) -> &'static str {
            self.name
        }
        fn label(&self) -> &'static str {
            self.label
        }
        async fn run(&self, _introduction: &str, _city: &str) -> Result<String, String> {
            Ok(self.text.clone())
        }
    }

    struct StallingAgent;

    #[async_trait::async_trait]
    impl RoleAgent for StallingAgent {
        fn name(&self) -> &'static str {
            "weather"
        }
        fn label(&self) -> &'static str {
            "WeatherAgent"
        }
        async fn run(&self, _introduction: &str, _city: &str) -> Result<String, String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("never".to_string())
        }
    }

    struct ErroringAgent {
        attempts: AtomicU32,
    }

    #[async_trait::async_trait]
    impl RoleAgent for ErroringAgent {
        fn name(&self) -> &'static str {
            "weather"
        }
        fn label(&self) -> &'static str {
            "WeatherAgent"
        }
        async fn run(&self, _introduction: &str, _city: &str) -> Result<String, String> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err("connection refused".to_string())
        }
    }

    fn city_agent(text: &str) -> Arc<dyn RoleAgent> {
        Arc::new(CannedAgent {
            name: "city",
            label: "CityAgent",
            text: text.to_string(),
        })
    }

    async fn collect(orchestrator: Orchestrator) -> Vec<StreamEvent> {
        orchestrator
            .stream("I am visiting Paris next week.".to_string(), "Paris".to_string())
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_event_shape_without_backend() {
        let agents: Vec<Arc<dyn RoleAgent>> = vec![
            Arc::new(WeatherAgent::new(None)),
            Arc::new(CityAgent::new(None)),
        ];
        let events = collect(Orchestrator::new().with_agents(agents)).await;

        assert_eq!(events.len(), 6);
        assert_eq!(events[0].kind, EventKind::Info);
        assert_eq!(events[1].kind, EventKind::Update);
        assert_eq!(events[1].agent, Some("weather"));
        assert_eq!(events[1].data, "Gathering insights…");
        assert_eq!(events[2].kind, EventKind::Update);
        assert_eq!(events[2].agent, Some("city"));
        assert_eq!(events[3].agent, Some("weather"));
        assert_eq!(events[3].kind, EventKind::Update);
        assert_eq!(events[4].agent, Some("city"));
        assert_eq!(events[4].kind, EventKind::Update);
        assert_eq!(events[5].kind, EventKind::Final);
        assert!(events[5].data.ends_with(DISCLAIMER));
    }

    #[tokio::test]
    async fn test_fallback_final_contains_both_sentences() {
        let agents: Vec<Arc<dyn RoleAgent>> = vec![
            Arc::new(WeatherAgent::new(None)),
            Arc::new(CityAgent::new(None)),
        ];
        let events = collect(Orchestrator::new().with_agents(agents)).await;

        let combined = &events.last().unwrap().data;
        assert!(combined.contains("Skies around Paris can shift quickly"));
        assert!(combined.contains("Budget a little extra time when moving around Paris"));
        // "Paris" already appears, so no prefix gets added
        assert!(!combined.starts_with("In Paris,"));
        assert!(combined.ends_with(DISCLAIMER));
    }

    #[tokio::test]
    async fn test_timeout_on_both_attempts_degrades_one_agent() {
        let agents: Vec<Arc<dyn RoleAgent>> = vec![
            Arc::new(StallingAgent),
            city_agent("Trams in Paris fill up early."),
        ];
        let events = collect(
            Orchestrator::new()
                .with_agents(agents)
                .with_config(test_config()),
        )
        .await;

        assert_eq!(events.len(), 6);
        let weather_result = &events[3];
        assert_eq!(weather_result.kind, EventKind::Degraded);
        assert_eq!(weather_result.agent, Some("weather"));
        assert_eq!(
            weather_result.data,
            "WeatherAgent ran into an issue; no fresh details."
        );

        let city_result = &events[4];
        assert_eq!(city_result.kind, EventKind::Update);
        assert_eq!(city_result.data, "Trams in Paris fill up early.");

        let combined = &events[5].data;
        assert!(combined.contains("Trams in Paris fill up early."));
        assert!(combined.contains("WeatherAgent encountered delays"));
    }

    #[tokio::test]
    async fn test_erroring_agent_is_retried_once() {
        let erroring = Arc::new(ErroringAgent {
            attempts: AtomicU32::new(0),
        });
        let agents: Vec<Arc<dyn RoleAgent>> = vec![
            erroring.clone(),
            city_agent("Trams in Paris fill up early."),
        ];
        let events = collect(
            Orchestrator::new()
                .with_agents(agents)
                .with_config(test_config()),
        )
        .await;

        assert_eq!(erroring.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(events[3].kind, EventKind::Degraded);
        assert_eq!(
            events[3].data,
            "WeatherAgent ran into an issue; no fresh details."
        );
    }

    #[tokio::test]
    async fn test_empty_text_is_degraded_not_failed() {
        let agents: Vec<Arc<dyn RoleAgent>> = vec![
            Arc::new(CannedAgent {
                name: "weather",
                label: "WeatherAgent",
                text: String::new(),
            }),
            city_agent("Trams in Paris fill up early."),
        ];
        let events = collect(
            Orchestrator::new()
                .with_agents(agents)
                .with_config(test_config()),
        )
        .await;

        assert_eq!(events[3].kind, EventKind::Degraded);
        assert_eq!(
            events[3].data,
            "WeatherAgent ran into an issue; no fresh details."
        );
    }

    #[tokio::test]
    async fn test_final_event_is_always_last() {
        let agents: Vec<Arc<dyn RoleAgent>> = vec![
            Arc::new(StallingAgent),
            city_agent("Trams in Paris fill up early."),
        ];
        let events = collect(
            Orchestrator::new()
                .with_agents(agents)
                .with_config(test_config()),
        )
        .await;

        let finals: Vec<_> = events.iter().filter(|e| e.kind == EventKind::Final).collect();
        assert_eq!(finals.len(), 1);
        assert_eq!(events.last().unwrap().kind, EventKind::Final);
        let infos: Vec<_> = events.iter().filter(|e| e.kind == EventKind::Info).collect();
        assert_eq!(infos.len(), 1);
        assert_eq!(events[0].kind, EventKind::Info);
    }

    struct SlowAgent {
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl RoleAgent for SlowAgent {
        fn name(&self) -> &'static str {
            "weather"
        }
        fn label(&self) -> &'static str {
            "WeatherAgent"
        }
        async fn run(&self, _introduction: &str, _city: &str) -> Result<String, String> {
            tokio::time::sleep(self.delay).await;
            Ok("Cool evenings in Paris.".to_string())
        }
    }

    #[tokio::test]
    async fn test_result_events_follow_declared_order() {
        // City answers instantly while weather takes most of its budget;
        // weather's result must still be reported first.
        let agents: Vec<Arc<dyn RoleAgent>> = vec![
            Arc::new(SlowAgent {
                delay: Duration::from_millis(30),
            }),
            city_agent("Trams in Paris fill up early."),
        ];
        let events = collect(
            Orchestrator::new()
                .with_agents(agents)
                .with_config(test_config()),
        )
        .await;

        assert_eq!(events[3].agent, Some("weather"));
        assert_eq!(events[4].agent, Some("city"));
    }
}
