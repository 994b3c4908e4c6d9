// Availability client: the two queries the search form makes against the
// booking backend to learn which routes and dates exist.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::airports::AirportCode;
use crate::config::ClientConfig;
use crate::error::AvailabilityError;

/// Outcome of a destinations query for a recognised origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationResult {
    Reachable(Vec<AirportCode>),
    // Valid origin with nothing reachable from it
    Empty,
}

// Wire format of `GET /destinations/?o=CODE`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DestinationsPayload {
    #[serde(default)]
    pub destinations: Option<Vec<AirportCode>>,
}

impl DestinationsPayload {
    pub fn into_result(self, origin: &AirportCode) -> Result<DestinationResult, AvailabilityError> {
        match self.destinations {
            None => Err(AvailabilityError::UnknownOrigin(origin.clone())),
            Some(codes) if codes.is_empty() => Ok(DestinationResult::Empty),
            Some(codes) => Ok(DestinationResult::Reachable(codes)),
        }
    }
}

// Wire format of `GET /flight_dates/?o=A&d=B`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FlightDatesPayload {
    pub dates: Vec<NaiveDate>,
}

#[async_trait]
pub trait AvailabilityService: Send + Sync + 'static {
    // Destinations reachable from `origin`
    async fn fetch_destinations(
        &self,
        origin: &AirportCode,
    ) -> Result<DestinationResult, AvailabilityError>;

    // Flight dates for the directed pair, in no particular order
    async fn fetch_flight_dates(
        &self,
        origin: &AirportCode,
        destination: &AirportCode,
    ) -> Result<Vec<NaiveDate>, AvailabilityError>;
}

/// reqwest-backed client for the booking site's JSON endpoints.
pub struct HttpAvailabilityClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl HttpAvailabilityClient {
    pub fn new(config: ClientConfig) -> Result<Self, AvailabilityError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, AvailabilityError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = self.endpoint(path);
        tracing::debug!("GET {} {:?}", url, query);

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AvailabilityError::Timeout(self.config.timeout_ms)
                } else {
                    AvailabilityError::from(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AvailabilityError::ApiResponse {
                status_code: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| AvailabilityError::Parse(e.to_string()))
    }
}

#[async_trait]
impl AvailabilityService for HttpAvailabilityClient {
    async fn fetch_destinations(
        &self,
        origin: &AirportCode,
    ) -> Result<DestinationResult, AvailabilityError> {
        let payload: DestinationsPayload = self
            .get_json("destinations", &[("o", origin.as_str())])
            .await?;
        payload.into_result(origin)
    }

    async fn fetch_flight_dates(
        &self,
        origin: &AirportCode,
        destination: &AirportCode,
    ) -> Result<Vec<NaiveDate>, AvailabilityError> {
        let payload: FlightDatesPayload = self
            .get_json(
                "flight_dates",
                &[("o", origin.as_str()), ("d", destination.as_str())],
            )
            .await?;
        Ok(payload.dates)
    }
}
