//! ==============================================================================
//! simulator.rs - mock hive telemetry driven by a timer
//! ==============================================================================
//!
//! purpose:
//!     stands in for the hive sensors. every tick perturbs the previous reading
//!     with bounded random deltas, appends it to the rolling history window and
//!     feeds it through the threshold rules.
//!
//! relationships:
//!     - used by: main.rs (builds the simulator, owns the ticker)
//!     - uses: alerts.rs (evaluate, AlertList)
//!     - read by: dashboard.rs (through the shared Telemetry)
//!
//! state flow:
//!
//!     ticker task ──step()──► Telemetry { current, history, alerts }
//!                                  ▲
//!     http handlers ───read()──────┘
//!
//! the random source is a type parameter so tests can run it seeded.
//!
//! ==============================================================================

use crate::alerts::{self, AlertList, Thresholds};
use crate::config::HiveConfig;
use crate::domain::Reading;

use rand::Rng;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const TEMPERATURE_FLOOR: f64 = 34.0;
pub const TEMPERATURE_SPAN: f64 = 3.0;
pub const WEIGHT_STEP_MIN: f64 = -0.045;
pub const WEIGHT_STEP_MAX: f64 = 0.055;
pub const VIBRATION_MAX: f64 = 15.0;
pub const GPS_JITTER: f64 = 0.0005;

pub type SharedTelemetry = Arc<RwLock<Telemetry>>;

/// fixed point the gps jitter is centred on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseLocation {
    pub latitude: f64,
    pub longitude: f64,
}

// ==============================================================================
// telemetry state
// ==============================================================================

/// everything the dashboard renders
#[derive(Debug, Clone, Serialize)]
pub struct Telemetry {
    pub current: Reading,
    /// oldest first
    pub history: VecDeque<Reading>,
    pub alerts: AlertList,
    #[serde(skip)]
    history_len: usize,
}

impl Telemetry {
    /// the starting reading is also the first history entry
    pub fn new(initial: Reading, history_len: usize, max_alerts: usize) -> Self {
        let mut history = VecDeque::with_capacity(history_len + 1);
        history.push_back(initial.clone());
        history.truncate(history_len);
        Self {
            current: initial,
            history,
            alerts: AlertList::new(max_alerts),
            history_len,
        }
    }

    pub fn from_config(config: &HiveConfig, timestamp: String) -> Self {
        let sim = &config.simulation;
        let initial = Reading {
            temperature: sim.initial_temperature,
            weight: sim.initial_weight,
            vibration: sim.initial_vibration,
            latitude: sim.base_latitude,
            longitude: sim.base_longitude,
            timestamp,
        };
        Self::new(initial, sim.history_len, config.alerts.max_alerts)
    }

    pub fn shared(self) -> SharedTelemetry {
        Arc::new(RwLock::new(self))
    }

    /// make `reading` current and push it into the window, evicting the oldest
    fn record(&mut self, reading: Reading) {
        self.history.push_back(reading.clone());
        while self.history.len() > self.history_len {
            self.history.pop_front();
        }
        self.current = reading;
    }
}

// ==============================================================================
// generation
// ==============================================================================

/// perturb `prev` into the next reading
pub fn next_reading<R: Rng + ?Sized>(
    prev: &Reading,
    rng: &mut R,
    base: BaseLocation,
    timestamp: String,
) -> Reading {
    Reading {
        temperature: TEMPERATURE_FLOOR + rng.gen_range(0.0..TEMPERATURE_SPAN),
        weight: prev.weight + rng.gen_range(WEIGHT_STEP_MIN..WEIGHT_STEP_MAX),
        vibration: rng.gen_range(0.0..VIBRATION_MAX),
        latitude: base.latitude + rng.gen_range(-GPS_JITTER..GPS_JITTER),
        longitude: base.longitude + rng.gen_range(-GPS_JITTER..GPS_JITTER),
        timestamp,
    }
}

/// result of one simulation step
#[derive(Debug, Clone)]
pub struct Tick {
    pub reading: Reading,
    /// alerts this reading raised, before dedup against older ones
    pub raised: Vec<String>,
}

pub struct Simulator<R> {
    rng: R,
    base: BaseLocation,
    thresholds: Thresholds,
}

impl<R: Rng> Simulator<R> {
    pub fn new(rng: R, base: BaseLocation, thresholds: Thresholds) -> Self {
        Self { rng, base, thresholds }
    }

    pub fn from_config(rng: R, config: &HiveConfig) -> Self {
        let base = BaseLocation {
            latitude: config.simulation.base_latitude,
            longitude: config.simulation.base_longitude,
        };
        Self::new(rng, base, Thresholds::from(&config.alerts))
    }

    /// advance `telemetry` by one reading
    pub fn step(&mut self, telemetry: &mut Telemetry, timestamp: String) -> Tick {
        let reading = next_reading(&telemetry.current, &mut self.rng, self.base, timestamp);
        let raised = alerts::evaluate(&reading, &self.thresholds);
        telemetry.record(reading.clone());
        telemetry.alerts.merge(raised.clone());
        Tick { reading, raised }
    }
}

// ==============================================================================
// ticker - owned, cancellable timer
// ==============================================================================

/// wall-clock label stamped on each reading
pub fn clock_label() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

/// background task stepping the simulator; aborted on stop or drop
pub struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    pub fn spawn<R>(
        mut simulator: Simulator<R>,
        telemetry: SharedTelemetry,
        period: Duration,
        show_data: bool,
    ) -> Self
    where
        R: Rng + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick fires immediately; the initial reading covers it
            interval.tick().await;

            loop {
                interval.tick().await;
                let tick = {
                    let mut guard = telemetry.write().await;
                    simulator.step(&mut guard, clock_label())
                };
                log_tick(&tick, show_data);
            }
        });

        Self { handle }
    }

    pub fn stop(&self) {
        self.handle.abort();
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn log_tick(tick: &Tick, show_data: bool) {
    let r = &tick.reading;
    if show_data {
        tracing::info!(
            "[HIVE] {} | Temp: {:.1}°C | Weight: {:.2}kg | Vibration: {:.1}Hz | GPS: {:.5}, {:.5}",
            r.timestamp, r.temperature, r.weight, r.vibration, r.latitude, r.longitude
        );
    } else {
        tracing::debug!(temperature = r.temperature, weight = r.weight, vibration = r.vibration, "tick");
    }
    for alert in &tick.raised {
        tracing::warn!("[ALERT] {}", alert);
    }
}
