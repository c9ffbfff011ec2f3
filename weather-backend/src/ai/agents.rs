//! WeatherAgent and CityAgent role definitions.
//!
//! Each agent pairs a fixed system prompt with deterministic fallback
//! sentences so a request completes even when no live chat client is
//! configured.

use crate::ai::azure::AzureChatClient;
use crate::ai::Message;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Pause used by the canned-response path so progress events stay visible
const FALLBACK_DELAY: Duration = Duration::from_millis(100);

/// A role-specific text generator producing one short tip
#[async_trait]
pub trait RoleAgent: Send + Sync {
    /// Stable identifier used in stream events ("weather", "city")
    fn name(&self) -> &'static str;

    /// Human-readable label used in messages and logs ("WeatherAgent")
    fn label(&self) -> &'static str;

    /// Produce one short tip for the given introduction and city.
    ///
    /// Must not error on the canned-response path; an empty live response is
    /// replaced with a fixed non-empty sentence.
    async fn run(&self, introduction: &str, city: &str) -> Result<String, String>;
}

/// Agent that produces a short, approximate weather tip
pub struct WeatherAgent {
    client: Option<Arc<AzureChatClient>>,
}

impl WeatherAgent {
    pub const SYSTEM_PROMPT: &'static str = "You are WeatherAgent. Given a friendly introduction and city name, \
         respond with a concise, good-natured weather suggestion. Keep to one or \
         two sentences, avoid deterministic claims, and remind users conditions can change.";

    pub fn new(client: Option<Arc<AzureChatClient>>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RoleAgent for WeatherAgent {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn label(&self) -> &'static str {
        "WeatherAgent"
    }

    async fn run(&self, introduction: &str, city: &str) -> Result<String, String> {
        let Some(client) = &self.client else {
            tokio::time::sleep(FALLBACK_DELAY).await;
            return Ok(format!(
                "Skies around {} can shift quickly, so pack a light layer and stay flexible.",
                city
            ));
        };

        let messages = vec![
            Message::system(Self::SYSTEM_PROMPT),
            Message::user(format!(
                "The user said: '{}'. Provide a brief, friendly weather tip for {}. \
                 Stay approximate and suggest flexible preparation.",
                introduction, city
            )),
        ];

        let text = client.generate_text(messages).await?;
        if text.trim().is_empty() {
            return Ok(format!(
                "Keep an eye on local updates in {}; weather can change fast.",
                city
            ));
        }
        Ok(text)
    }
}

/// Agent that produces a short guidance sentence for the requested city
pub struct CityAgent {
    client: Option<Arc<AzureChatClient>>,
}

impl CityAgent {
    pub const SYSTEM_PROMPT: &'static str = "You are CityAgent. Offer a single helpful sentence for visitors in the \
         given city. Mention practical local tips (transit, attire, timing) and avoid claims of certainty.";

    pub fn new(client: Option<Arc<AzureChatClient>>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RoleAgent for CityAgent {
    fn name(&self) -> &'static str {
        "city"
    }

    fn label(&self) -> &'static str {
        "CityAgent"
    }

    async fn run(&self, introduction: &str, city: &str) -> Result<String, String> {
        let Some(client) = &self.client else {
            tokio::time::sleep(FALLBACK_DELAY).await;
            return Ok(format!(
                "Budget a little extra time when moving around {}; local conditions can vary.",
                city
            ));
        };

        let messages = vec![
            Message::system(Self::SYSTEM_PROMPT),
            Message::user(format!(
                "The user introduction was '{}'. Share one short, practical tip for spending time in {}.",
                introduction, city
            )),
        ];

        let text = client.generate_text(messages).await?;
        if text.trim().is_empty() {
            return Ok(format!(
                "Consider reviewing community forums for current tips about {}.",
                city
            ));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_weather_agent_fallback_mentions_city() {
        let agent = WeatherAgent::new(None);
        let text = agent.run("I am visiting Paris next week.", "Paris").await.unwrap();
        assert!(text.contains("Paris"));
        assert!(!text.is_empty());
    }

    #[tokio::test]
    async fn test_city_agent_fallback_mentions_city() {
        let agent = CityAgent::new(None);
        let text = agent.run("I am visiting Paris next week.", "Paris").await.unwrap();
        assert!(text.contains("Paris"));
        assert!(!text.is_empty());
    }

    #[tokio::test]
    async fn test_fallbacks_are_deterministic() {
        let agent = WeatherAgent::new(None);
        let first = agent.run("I am visiting Oslo soon.", "Oslo").await.unwrap();
        let second = agent.run("I am visiting Oslo soon.", "Oslo").await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_agent_identity() {
        let weather = WeatherAgent::new(None);
        let city = CityAgent::new(None);
        assert_eq!(weather.name(), "weather");
        assert_eq!(weather.label(), "WeatherAgent");
        assert_eq!(city.name(), "city");
        assert_eq!(city.label(), "CityAgent");
    }
}
