use chrono::NaiveDate;

use crate::airports::AirportCode;

// Availability client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 10000,
        }
    }
}

// Timing of the highlight played after a promotional shortcut
#[derive(Debug, Clone)]
pub struct AcknowledgeConfig {
    pub hold_ms: u64,
}

impl Default for AcknowledgeConfig {
    fn default() -> Self {
        Self { hold_ms: 1500 }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Origin forced by every promotional shortcut.
    pub promo_origin: AirportCode,
    pub acknowledge: AcknowledgeConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            promo_origin: AirportCode::from_static("NZNE"),
            acknowledge: AcknowledgeConfig::default(),
        }
    }
}

/// Source of "today" for past-date filtering and date-field minimums.
pub trait Clock: Send + Sync + 'static {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
