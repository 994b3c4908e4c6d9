// Dependent-field synchronization for the flight search form

pub mod actions;
pub mod airports;
pub mod client;
pub mod config;
pub mod date_set;
pub mod engine;
pub mod error;
pub mod registry;
pub mod search;
pub mod widgets;

// Re-export key types for convenience
pub use actions::ActionOutcome;
pub use airports::{AirportCode, AirportDirectory, AirportInfo};
pub use client::{AvailabilityService, DestinationResult, HttpAvailabilityClient};
pub use config::{AcknowledgeConfig, ClientConfig, Clock, EngineConfig, FixedClock, SystemClock};
pub use date_set::DateSet;
pub use engine::{EngineStatsReport, FormSnapshot, Resolution, RouteState, SyncEngine};
pub use error::{AirportError, AvailabilityError, SearchError, SyncError};
pub use registry::{Field, FieldRegistry, Travellers};
pub use search::SearchQuery;
pub use widgets::{
    AttentionRegion, Calendar, CalendarOption, Choice, FormWidgets, SearchableSelect,
    ShortcutControls, SubmitControl,
};
