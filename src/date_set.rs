use chrono::NaiveDate;

/// Dates on which a flight exists for one direction of the current route.
///
/// The set is never patched: every accepted availability response clears it
/// and repopulates it in full, dropping anything before `today`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateSet {
    // Sorted and deduplicated
    dates: Vec<NaiveDate>,
}

impl DateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear and refill from an unordered source sequence.
    pub fn replace_with<I>(&mut self, dates: I, today: NaiveDate)
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        self.dates.clear();
        self.dates.extend(dates.into_iter().filter(|d| *d >= today));
        self.dates.sort_unstable();
        self.dates.dedup();
    }

    pub fn clear(&mut self) {
        self.dates.clear();
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.iter().any(|d| *d == date)
    }

    /// Earliest member on or after `reference`, if any.
    pub fn first_on_or_after(&self, reference: NaiveDate) -> Option<NaiveDate> {
        self.dates.iter().copied().filter(|d| *d >= reference).min()
    }

    pub fn earliest(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates.iter().copied()
    }

    /// Per-day render hook handed to the calendar widget.
    pub fn marker(&self) -> impl Fn(NaiveDate) -> bool + '_ {
        move |date| self.contains(date)
    }
}
