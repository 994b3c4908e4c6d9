// Submission of the search form to the flight results page

use chrono::NaiveDate;
use reqwest::Url;

use crate::airports::AirportCode;
use crate::error::SearchError;
use crate::registry::FieldRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub origin: AirportCode,
    pub destination: AirportCode,
    pub depart_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub travellers: u8,
}

impl SearchQuery {
    /// Validate the form and collect every problem, not just the first.
    pub fn from_fields(fields: &FieldRegistry) -> Result<Self, SearchError> {
        let mut errors = Vec::new();

        if !fields.search_enabled {
            errors.push("No flights available.".to_string());
        }

        let origin = fields.origin.value.clone();
        let destination = fields.destination.value.clone();
        match (&origin, &destination) {
            (Some(o), Some(d)) if o == d => {
                errors.push("Origin and destination cannot be the same.".to_string())
            }
            (Some(_), Some(_)) => {}
            _ => errors.push("Origin and destination are required.".to_string()),
        }

        let depart_date = fields.depart_date.value;
        if depart_date.is_none() {
            errors.push("Departure date is required.".to_string());
        }

        let return_date = if fields.is_return && fields.return_date.enabled {
            fields.return_date.value
        } else {
            None
        };
        if let (Some(depart), Some(ret)) = (depart_date, return_date) {
            if ret < depart {
                errors.push("Return date cannot be before departure date.".to_string());
            }
        }

        // Already clamped to the allowed range by `Travellers`
        let travellers = fields.travellers.get();

        match (origin, destination, depart_date) {
            (Some(origin), Some(destination), Some(depart_date)) if errors.is_empty() => {
                Ok(Self {
                    origin,
                    destination,
                    depart_date,
                    return_date,
                    travellers,
                })
            }
            _ => Err(SearchError::InvalidSearch(errors)),
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("origin", self.origin.to_string()),
            ("destination", self.destination.to_string()),
            ("depart_date", self.depart_date.format("%Y-%m-%d").to_string()),
        ];
        if let Some(ret) = self.return_date {
            pairs.push(("return_date", ret.format("%Y-%m-%d").to_string()));
        }
        pairs.push(("travellers", self.travellers.to_string()));
        pairs
    }

    /// Results page URL, e.g. `{base}/flights/?origin=NZNE&...`.
    pub fn url(&self, base_url: &str) -> Result<Url, SearchError> {
        let endpoint = format!("{}/flights/", base_url.trim_end_matches('/'));
        Url::parse_with_params(&endpoint, self.query_pairs())
            .map_err(|e| SearchError::InvalidUrl(e.to_string()))
    }
}
