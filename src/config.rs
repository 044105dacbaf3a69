//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `hive.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - SimulationConfig: tick interval, window size, starting point, rng seed.
//!     - AlertsConfig: threshold values and how many alerts stay visible.
//!     - ChatConfig: generative api endpoint, model, credential variable, persona.
//!     - ServerConfig: dashboard bind address.
//!     - LoggingConfig: default log filter.
//!
//! every section is optional; missing keys take the values in `Default`.
//!
//! ==============================================================================

use serde::Deserialize;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HiveConfig {
    pub simulation: SimulationConfig,
    pub alerts: AlertsConfig,
    pub chat: ChatConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimulationConfig {
    pub interval_seconds: u64,
    /// number of readings kept for the charts
    pub history_len: usize,
    pub base_latitude: f64,
    pub base_longitude: f64,
    pub initial_temperature: f64,
    pub initial_weight: f64,
    pub initial_vibration: f64,
    /// fixed seed for reproducible runs; entropy when absent
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlertsConfig {
    pub max_alerts: usize,
    pub high_temperature: f64,
    pub high_vibration: f64,
    pub low_weight: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    pub base_url: String,
    pub model: String,
    /// name of the environment variable holding the api key
    pub api_key_env: String,
    pub persona: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 5,
            history_len: 15,
            base_latitude: 12.9716,
            base_longitude: 77.5946,
            initial_temperature: 35.0,
            initial_weight: 12.0,
            initial_vibration: 5.0,
            seed: None,
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            max_alerts: 3,
            high_temperature: 37.0,
            high_vibration: 12.0,
            low_weight: 10.0,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            persona: "You are BeeBot, a friendly assistant for beekeepers. \
                      Answer questions about hive health, bee behaviour and apiary \
                      management in a few short sentences."
                .to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:3000".to_string() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: false }
    }
}

impl HiveConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))
    }

    /// Load with default fallback
    ///
    /// runs before the subscriber is installed, so it reports with println.
    pub fn load_or_default() -> Self {
        let paths = [
            std::path::PathBuf::from("config").join("hive.toml"),
            std::path::PathBuf::from("..").join("config").join("hive.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Self::default()
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("┌─────────────────────────────────────────┐");
        println!("│           HIVE CONFIGURATION            │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Tick Interval: {}s", self.simulation.interval_seconds);
        println!("│ History Window: {} readings", self.simulation.history_len);
        println!("│ Hive Location: {:.4}, {:.4}", self.simulation.base_latitude, self.simulation.base_longitude);
        println!("│ Chat Model: {}", self.chat.model);
        println!("│ Dashboard: http://{}", self.server.bind);
        println!("│ Log Level: {}", self.logging.level);
        println!("└─────────────────────────────────────────┘");
    }
}
