use serde::{Deserialize, Serialize};

/// one simulated snapshot of the hive sensors
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Reading {
    /// brood temperature in celsius
    pub temperature: f64,
    /// hive weight in kilograms
    pub weight: f64,
    /// dominant vibration frequency in hertz
    pub vibration: f64,
    pub latitude: f64,
    pub longitude: f64,
    /// wall-clock label, "HH:MM"
    pub timestamp: String,
}

/// who said a line in the chat transcript
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub speaker: Speaker,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { speaker: Speaker::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { speaker: Speaker::Assistant, text: text.into() }
    }
}
