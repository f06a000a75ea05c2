//! Typed message payloads.

use serde::{Deserialize, Serialize};

/// Weather record attached to a `WEATHER` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub city: String,
    pub temperature: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub humidity: f64,
    #[serde(default)]
    pub wind_speed: f64,
    #[serde(default)]
    pub icon: String,
}

/// Knowledge-retrieval result attached to a `KNOWLEDGE` message.
///
/// `confidence` is always within `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSources {
    pub sources: Vec<String>,
    pub confidence: f64,
}

impl KnowledgeSources {
    pub fn new(sources: Vec<String>, confidence: f64) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            sources,
            confidence,
        }
    }

    /// Confidence as a whole percentage, for display.
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence * 100.0).round() as u8
    }
}

/// The typed payload of a message. The variant decides which presentation
/// contract renders it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "metadata", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessagePayload {
    Text,
    Weather(WeatherReport),
    Knowledge(KnowledgeSources),
}
