// Passive store for the search form's fields. The synchronization engine
// enforces the cross-field rules; nothing here does.

use chrono::NaiveDate;

use crate::airports::AirportCode;
use crate::date_set::DateSet;

pub const MIN_TRAVELLERS: u8 = 1;
pub const MAX_TRAVELLERS: u8 = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field<T> {
    pub value: Option<T>,
    pub enabled: bool,
}

impl<T> Field<T> {
    pub fn enabled(value: Option<T>) -> Self {
        Self {
            value,
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            value: None,
            enabled: false,
        }
    }
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::enabled(None)
    }
}

/// Traveller count, always within `[MIN_TRAVELLERS, MAX_TRAVELLERS]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Travellers(u8);

impl Travellers {
    pub fn new(count: i64) -> Self {
        Self(count.clamp(MIN_TRAVELLERS as i64, MAX_TRAVELLERS as i64) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn increment(self) -> Self {
        Self::new(self.0 as i64 + 1)
    }

    pub fn decrement(self) -> Self {
        Self::new(self.0 as i64 - 1)
    }
}

impl Default for Travellers {
    fn default() -> Self {
        Self(MIN_TRAVELLERS)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    pub origin: Field<AirportCode>,
    pub destination: Field<AirportCode>,
    pub depart_date: Field<NaiveDate>,
    pub return_date: Field<NaiveDate>,
    pub travellers: Travellers,
    pub is_return: bool,
    pub search_enabled: bool,
    pub depart_dates: DateSet,
    pub return_dates: DateSet,
}

impl FieldRegistry {
    pub fn new(origin: AirportCode) -> Self {
        Self {
            origin: Field::enabled(Some(origin)),
            return_date: Field::disabled(),
            search_enabled: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 1 ; "below range")]
    #[test_case(1, 1 ; "lower bound")]
    #[test_case(4, 4 ; "in range")]
    #[test_case(6, 6 ; "upper bound")]
    #[test_case(42, 6 ; "above range")]
    #[test_case(-3, 1 ; "negative")]
    fn test_travellers_clamped(input: i64, expected: u8) {
        assert_eq!(Travellers::new(input).get(), expected);
    }

    #[test]
    fn test_travellers_step_within_bounds() {
        let mut travellers = Travellers::default();
        assert_eq!(travellers.decrement().get(), 1);

        for _ in 0..10 {
            travellers = travellers.increment();
        }
        assert_eq!(travellers.get(), MAX_TRAVELLERS);
        assert_eq!(travellers.decrement().get(), MAX_TRAVELLERS - 1);
    }

    #[test]
    fn test_new_registry_disables_return() {
        let registry = FieldRegistry::new(AirportCode::new("NZNE").unwrap());
        assert!(registry.origin.enabled);
        assert!(!registry.return_date.enabled);
        assert_eq!(registry.return_date.value, None);
        assert!(!registry.is_return);
        assert!(registry.depart_dates.is_empty());
    }
}
