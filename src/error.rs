use chrono::NaiveDate;
use thiserror::Error;

use crate::airports::AirportCode;

// Failures talking to the availability service
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AvailabilityError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("API error: {status_code} - {message}")]
    ApiResponse { status_code: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    // The service answered without a destination list at all
    #[error("Unknown origin airport: {0}")]
    UnknownOrigin(AirportCode),
}

impl From<reqwest::Error> for AvailabilityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AvailabilityError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            AvailabilityError::ApiResponse {
                status_code: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            AvailabilityError::Network(err.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("Availability query failed: {0}")]
    Availability(#[from] AvailabilityError),

    #[error("No route selected")]
    NoRoute,

    #[error("{destination} is not reachable from {origin}")]
    UnreachableDestination {
        origin: AirportCode,
        destination: AirportCode,
    },

    #[error("Date {date} is before today ({today})")]
    DateInPast { date: NaiveDate, today: NaiveDate },

    #[error("Return date {ret} is before departure {depart}")]
    ReturnBeforeDepart { depart: NaiveDate, ret: NaiveDate },

    #[error("The {0} field is disabled")]
    FieldDisabled(&'static str),

    #[error("Nothing to swap: destination is not set")]
    NothingToSwap,
}

#[derive(Error, Debug)]
pub enum AirportError {
    #[error("Invalid airport code: {0:?}")]
    InvalidCode(String),

    #[error("Invalid airport directory: {0}")]
    InvalidDirectory(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("Invalid search: {}", .0.join(" "))]
    InvalidSearch(Vec<String>),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
}
