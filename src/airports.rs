// Airport codes and the static code-to-name directory shipped with the page

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AirportError;

pub const CODE_LEN: usize = 4;

/// Four-letter ICAO-style airport identifier, always stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AirportCode(String);

impl AirportCode {
    pub fn new(code: &str) -> Result<Self, AirportError> {
        let code = code.trim().to_ascii_uppercase();
        if code.len() != CODE_LEN || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AirportError::InvalidCode(code));
        }
        Ok(Self(code))
    }

    // Literal codes compiled into the crate
    pub(crate) fn from_static(code: &'static str) -> Self {
        Self(code.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AirportCode {
    type Err = AirportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AirportCode {
    type Error = AirportError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<AirportCode> for String {
    fn from(code: AirportCode) -> Self {
        code.0
    }
}

impl fmt::Display for AirportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Stored as a `[name, region]` pair in the page payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct AirportInfo {
    pub name: String,
    pub region: String,
}

impl From<(String, String)> for AirportInfo {
    fn from((name, region): (String, String)) -> Self {
        Self { name, region }
    }
}

impl From<AirportInfo> for (String, String) {
    fn from(info: AirportInfo) -> Self {
        (info.name, info.region)
    }
}

/// Immutable lookup table loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct AirportDirectory {
    airports: HashMap<AirportCode, AirportInfo>,
}

impl AirportDirectory {
    pub fn from_json(json: &str) -> Result<Self, AirportError> {
        let airports: HashMap<AirportCode, AirportInfo> = serde_json::from_str(json)?;
        tracing::debug!("Loaded {} airports into directory", airports.len());
        Ok(Self { airports })
    }

    pub fn get(&self, code: &AirportCode) -> Option<&AirportInfo> {
        self.airports.get(code)
    }

    pub fn contains(&self, code: &AirportCode) -> bool {
        self.airports.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.airports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }

    /// Display label used by the select widgets, e.g. `Rotorua (NZRO)`.
    pub fn label(&self, code: &AirportCode) -> String {
        match self.airports.get(code) {
            Some(info) => format!("{} ({})", info.region, code),
            None => code.to_string(),
        }
    }
}

impl FromIterator<(AirportCode, AirportInfo)> for AirportDirectory {
    fn from_iter<I: IntoIterator<Item = (AirportCode, AirportInfo)>>(iter: I) -> Self {
        Self {
            airports: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("NZNE", "NZNE" ; "already uppercase")]
    #[test_case("nzro", "NZRO" ; "lowercase is normalised")]
    #[test_case(" ymml ", "YMML" ; "surrounding whitespace")]
    fn test_valid_codes(input: &str, expected: &str) {
        let code = AirportCode::new(input).unwrap();
        assert_eq!(code.as_str(), expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("NZN" ; "too short")]
    #[test_case("NZNEX" ; "too long")]
    #[test_case("NZ-E" ; "punctuation")]
    fn test_invalid_codes(input: &str) {
        assert!(matches!(
            AirportCode::new(input),
            Err(AirportError::InvalidCode(_))
        ));
    }

    #[test]
    fn test_directory_labels() {
        let json = r#"{
            "NZNE": ["North Shore Aerodrome", "Auckland"],
            "NZRO": ["Rotorua International", "Rotorua"]
        }"#;
        let directory = AirportDirectory::from_json(json).unwrap();
        assert_eq!(directory.len(), 2);

        let rotorua: AirportCode = "NZRO".parse().unwrap();
        assert_eq!(directory.label(&rotorua), "Rotorua (NZRO)");
        assert_eq!(
            directory.get(&rotorua).map(|info| info.name.as_str()),
            Some("Rotorua International")
        );

        let unknown: AirportCode = "YSSY".parse().unwrap();
        assert!(!directory.contains(&unknown));
        assert_eq!(directory.label(&unknown), "YSSY");
    }

    #[test]
    fn test_directory_rejects_bad_codes() {
        let json = r#"{"NZ": ["Nowhere", "Nowhere"]}"#;
        assert!(AirportDirectory::from_json(json).is_err());
    }
}
