// Synchronization engine: keeps origin, destination and the two date fields
// consistent with the availability backend while queries are in flight.
//
// Every query kind carries a generation token. A response commits only if its
// token is still the latest issued for that kind; anything older is dropped
// on the floor. The form lock is only ever taken between awaits.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use parking_lot::Mutex;

use crate::airports::{AirportCode, AirportDirectory};
use crate::client::{AvailabilityService, DestinationResult};
use crate::config::{Clock, EngineConfig, SystemClock};
use crate::error::{SearchError, SyncError};
use crate::registry::{Field, FieldRegistry, Travellers};
use crate::search::SearchQuery;
use crate::widgets::{
    AttentionRegion, CalendarOption, Choice, FormWidgets, HeadlessAttention, HeadlessShortcuts,
    ShortcutControls, NO_FLIGHTS_LABEL,
};

/// Route-resolution state of the origin/destination/date subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    ResolvingDestinations,
    HasDestinations,
    NoFlights,
    HasDates,
}

impl RouteState {
    pub fn is_no_flights(self) -> bool {
        self == RouteState::NoFlights
    }
}

/// What happened to the response of one resolution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Committed(RouteState),
    // A newer query of the same kind was issued before this one returned
    Superseded,
}

#[derive(Debug, Clone)]
pub struct FormSnapshot {
    pub fields: FieldRegistry,
    pub route: RouteState,
    pub destinations: Vec<AirportCode>,
    pub last_error: Option<SyncError>,
}

#[derive(Debug, Default)]
pub struct EngineStats {
    pub destination_queries: AtomicUsize,
    pub date_queries: AtomicUsize,
    pub stale_discarded: AtomicUsize,
    pub failed_queries: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EngineStatsReport {
    pub destination_queries: usize,
    pub date_queries: usize,
    pub stale_discarded: usize,
    pub failed_queries: usize,
}

pub(crate) struct FormState {
    pub(crate) fields: FieldRegistry,
    pub(crate) route: RouteState,
    // Last committed state and the origin it belongs to, restored when a
    // query fails
    settled: RouteState,
    settled_origin: Option<AirportCode>,
    pub(crate) destinations: Vec<AirportCode>,
    last_error: Option<SyncError>,
    pub(crate) widgets: FormWidgets,
}

pub struct SyncEngine<S: AvailabilityService> {
    service: Arc<S>,
    airports: AirportDirectory,
    clock: Arc<dyn Clock>,
    pub(crate) config: EngineConfig,
    pub(crate) state: Mutex<FormState>,
    destinations_token: AtomicU64,
    dates_token: AtomicU64,
    pub(crate) busy: AtomicBool,
    pub(crate) attention: Arc<dyn AttentionRegion>,
    pub(crate) shortcuts: Arc<dyn ShortcutControls>,
    stats: EngineStats,
}

impl<S: AvailabilityService> SyncEngine<S> {
    pub fn new(
        service: Arc<S>,
        airports: AirportDirectory,
        widgets: FormWidgets,
        origin: AirportCode,
    ) -> Self {
        Self {
            service,
            airports,
            clock: Arc::new(SystemClock),
            config: EngineConfig::default(),
            state: Mutex::new(FormState {
                fields: FieldRegistry::new(origin),
                route: RouteState::ResolvingDestinations,
                settled: RouteState::ResolvingDestinations,
                settled_origin: None,
                destinations: Vec::new(),
                last_error: None,
                widgets,
            }),
            destinations_token: AtomicU64::new(0),
            dates_token: AtomicU64::new(0),
            busy: AtomicBool::new(false),
            attention: Arc::new(HeadlessAttention::new(Duration::ZERO)),
            shortcuts: Arc::new(HeadlessShortcuts::default()),
            stats: EngineStats::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_attention(
        mut self,
        attention: Arc<dyn AttentionRegion>,
        shortcuts: Arc<dyn ShortcutControls>,
    ) -> Self {
        self.attention = attention;
        self.shortcuts = shortcuts;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Page-load initialisation followed by the first route resolution.
    pub async fn start(&self) -> Result<Resolution, SyncError> {
        let today = self.clock.today();
        {
            let mut guard = self.state.lock();
            let form = &mut *guard;
            form.widgets.depart.set_option(CalendarOption::MinDate(today));
            form.widgets.ret.set_option(CalendarOption::MinDate(today));
            disable_return(form);
        }
        self.resolve_route().await
    }

    pub async fn select_origin(&self, origin: AirportCode) -> Result<Resolution, SyncError> {
        begin_origin_change(&mut self.state.lock(), origin);
        self.resolve_route().await
    }

    pub async fn select_destination(
        &self,
        destination: AirportCode,
    ) -> Result<Resolution, SyncError> {
        {
            let mut form = self.state.lock();
            // The destination set still belongs to the previous origin
            if form.route == RouteState::ResolvingDestinations {
                return Err(SyncError::FieldDisabled("destination"));
            }
            if !form.fields.destination.enabled || !form.destinations.contains(&destination) {
                let origin = form.fields.origin.value.clone().ok_or(SyncError::NoRoute)?;
                return Err(SyncError::UnreachableDestination {
                    origin,
                    destination,
                });
            }
            form.widgets.destination.set_choice_by_value(&destination);
            form.fields.destination.value = Some(destination);
        }
        self.refresh_flight_dates().await
    }

    /// Destinations for the current origin, then dates for the chosen pair.
    pub async fn resolve_route(&self) -> Result<Resolution, SyncError> {
        match self.resolve_destinations().await? {
            Resolution::Committed(RouteState::HasDestinations) => self.refresh_flight_dates().await,
            other => Ok(other),
        }
    }

    pub async fn resolve_destinations(&self) -> Result<Resolution, SyncError> {
        let token = self.destinations_token.fetch_add(1, Ordering::SeqCst) + 1;
        // Dates for the old route must not land after this point
        self.dates_token.fetch_add(1, Ordering::SeqCst);

        let origin = {
            let mut form = self.state.lock();
            let origin = form.fields.origin.value.clone().ok_or(SyncError::NoRoute)?;
            form.route = RouteState::ResolvingDestinations;
            origin
        };

        tracing::debug!("Fetching destinations from {} (token {})", origin, token);
        self.stats.destination_queries.fetch_add(1, Ordering::SeqCst);
        let result = self.service.fetch_destinations(&origin).await;

        let mut guard = self.state.lock();
        if self.destinations_token.load(Ordering::SeqCst) != token {
            self.stats.stale_discarded.fetch_add(1, Ordering::SeqCst);
            tracing::debug!("Discarding stale destinations for {} (token {})", origin, token);
            return Ok(Resolution::Superseded);
        }
        let form = &mut *guard;

        match result {
            Err(err) => {
                self.stats.failed_queries.fetch_add(1, Ordering::SeqCst);
                tracing::warn!("Destinations query for {} failed: {}", origin, err);
                let err = SyncError::from(err);
                if let Some(settled_origin) = form.settled_origin.clone() {
                    form.widgets.origin.set_choice_by_value(&settled_origin);
                    form.fields.origin.value = Some(settled_origin);
                }
                form.route = form.settled;
                form.last_error = Some(err.clone());
                Err(err)
            }
            Ok(DestinationResult::Reachable(codes)) if !codes.is_empty() => {
                self.apply_destinations(form, codes);
                tracing::info!(
                    "{} destinations from {}, selected {:?}",
                    form.destinations.len(),
                    origin,
                    form.fields.destination.value
                );
                Ok(Resolution::Committed(RouteState::HasDestinations))
            }
            Ok(_) => {
                enter_no_flights(form);
                tracing::info!("No flights from {}", origin);
                Ok(Resolution::Committed(RouteState::NoFlights))
            }
        }
    }

    fn apply_destinations(&self, form: &mut FormState, codes: Vec<AirportCode>) {
        let selected = match &form.fields.destination.value {
            Some(current) if codes.contains(current) => current.clone(),
            _ => codes[0].clone(),
        };

        let choices = codes
            .iter()
            .map(|code| {
                Choice::airport(code.clone(), self.airports.label(code), *code == selected)
            })
            .collect();
        form.widgets.destination.clear();
        form.widgets.destination.set_choices(choices, true);
        form.widgets.destination.set_disabled(false);
        form.widgets.submit.set_disabled(false);
        form.widgets.depart.set_disabled(false);

        let fields = &mut form.fields;
        fields.destination = Field::enabled(Some(selected));
        fields.depart_date.enabled = true;
        fields.search_enabled = true;
        if fields.is_return && !fields.return_date.enabled {
            fields.return_date.enabled = true;
            form.widgets.ret.set_disabled(false);
        }

        form.destinations = codes;
        form.route = RouteState::HasDestinations;
        form.settled = RouteState::HasDestinations;
        form.settled_origin = form.fields.origin.value.clone();
        form.last_error = None;
    }

    /// Fetch both directions' dates for the current pair and mark calendars.
    pub async fn refresh_flight_dates(&self) -> Result<Resolution, SyncError> {
        let token = self.dates_token.fetch_add(1, Ordering::SeqCst) + 1;

        let (origin, destination) = {
            let form = self.state.lock();
            match form.route {
                RouteState::NoFlights => return Ok(Resolution::Committed(RouteState::NoFlights)),
                RouteState::ResolvingDestinations => return Ok(Resolution::Superseded),
                _ => {}
            }
            let origin = form.fields.origin.value.clone().ok_or(SyncError::NoRoute)?;
            let destination = form
                .fields
                .destination
                .value
                .clone()
                .ok_or(SyncError::NoRoute)?;
            (origin, destination)
        };

        tracing::debug!("Fetching flight dates {} <-> {} (token {})", origin, destination, token);
        self.stats.date_queries.fetch_add(1, Ordering::SeqCst);
        let result = futures::try_join!(
            self.service.fetch_flight_dates(&origin, &destination),
            self.service.fetch_flight_dates(&destination, &origin),
        );
        let today = self.clock.today();

        let mut guard = self.state.lock();
        if self.dates_token.load(Ordering::SeqCst) != token
            || guard.route == RouteState::ResolvingDestinations
        {
            self.stats.stale_discarded.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(
                "Discarding stale flight dates {} <-> {} (token {})",
                origin,
                destination,
                token
            );
            return Ok(Resolution::Superseded);
        }
        let form = &mut *guard;

        let (depart_dates, return_dates) = match result {
            Ok(dates) => dates,
            Err(err) => {
                self.stats.failed_queries.fetch_add(1, Ordering::SeqCst);
                tracing::warn!("Flight dates query {} <-> {} failed: {}", origin, destination, err);
                let err = SyncError::from(err);
                form.last_error = Some(err.clone());
                return Err(err);
            }
        };

        form.fields.depart_dates.replace_with(depart_dates, today);
        form.fields.return_dates.replace_with(return_dates, today);

        let current = form
            .fields
            .depart_date
            .value
            .filter(|d| *d >= today && form.fields.depart_dates.contains(*d));
        if let Some(depart) = current.or_else(|| form.fields.depart_dates.earliest()) {
            form.fields.depart_date.value = Some(depart);
            form.widgets.depart.set_date(Some(depart), false);
        }
        if form.fields.is_return {
            recompute_return(form, today);
        }
        redraw_calendars(form);

        form.route = RouteState::HasDates;
        form.settled = RouteState::HasDates;
        form.last_error = None;
        tracing::info!(
            "{} -> {}: {} depart dates, {} return dates",
            origin,
            destination,
            form.fields.depart_dates.len(),
            form.fields.return_dates.len()
        );
        Ok(Resolution::Committed(RouteState::HasDates))
    }

    pub fn set_depart_date(&self, date: NaiveDate) -> Result<(), SyncError> {
        let today = self.clock.today();
        let mut guard = self.state.lock();
        let form = &mut *guard;
        if !form.fields.depart_date.enabled {
            return Err(SyncError::FieldDisabled("depart date"));
        }
        if date < today {
            return Err(SyncError::DateInPast { date, today });
        }

        form.fields.depart_date.value = Some(date);
        form.widgets.depart.set_date(Some(date), false);
        if form.fields.is_return {
            recompute_return(form, today);
        }
        Ok(())
    }

    pub fn set_return_date(&self, date: NaiveDate) -> Result<(), SyncError> {
        let today = self.clock.today();
        let mut guard = self.state.lock();
        let form = &mut *guard;
        if !form.fields.return_date.enabled {
            return Err(SyncError::FieldDisabled("return date"));
        }
        if date < today {
            return Err(SyncError::DateInPast { date, today });
        }
        if let Some(depart) = form.fields.depart_date.value {
            if date < depart {
                return Err(SyncError::ReturnBeforeDepart { depart, ret: date });
            }
        }

        form.fields.return_date.value = Some(date);
        form.widgets.ret.set_date(Some(date), false);
        Ok(())
    }

    pub fn set_return_trip(&self, is_return: bool) {
        let today = self.clock.today();
        let mut guard = self.state.lock();
        let form = &mut *guard;
        form.fields.is_return = is_return;

        if is_return && !form.route.is_no_flights() {
            form.fields.return_date.enabled = true;
            form.widgets.ret.set_disabled(false);
            recompute_return(form, today);
        } else {
            disable_return(form);
        }
    }

    /// Re-derive the return date from the current depart date.
    pub fn update_return_date(&self) {
        let today = self.clock.today();
        let mut guard = self.state.lock();
        recompute_return(&mut guard, today);
    }

    pub fn increment_travellers(&self) -> Travellers {
        let mut form = self.state.lock();
        form.fields.travellers = form.fields.travellers.increment();
        form.fields.travellers
    }

    pub fn decrement_travellers(&self) -> Travellers {
        let mut form = self.state.lock();
        form.fields.travellers = form.fields.travellers.decrement();
        form.fields.travellers
    }

    pub fn set_travellers(&self, count: i64) -> Travellers {
        let mut form = self.state.lock();
        form.fields.travellers = Travellers::new(count);
        form.fields.travellers
    }

    pub fn snapshot(&self) -> FormSnapshot {
        let form = self.state.lock();
        FormSnapshot {
            fields: form.fields.clone(),
            route: form.route,
            destinations: form.destinations.clone(),
            last_error: form.last_error.clone(),
        }
    }

    pub fn route_state(&self) -> RouteState {
        self.state.lock().route
    }

    /// Query for the results page built from the current fields.
    pub fn search_query(&self) -> Result<SearchQuery, SearchError> {
        let form = self.state.lock();
        if form.route == RouteState::ResolvingDestinations {
            return Err(SearchError::InvalidSearch(vec![
                "Destinations are still loading.".to_string(),
            ]));
        }
        SearchQuery::from_fields(&form.fields)
    }

    pub fn stats(&self) -> EngineStatsReport {
        EngineStatsReport {
            destination_queries: self.stats.destination_queries.load(Ordering::SeqCst),
            date_queries: self.stats.date_queries.load(Ordering::SeqCst),
            stale_discarded: self.stats.stale_discarded.load(Ordering::SeqCst),
            failed_queries: self.stats.failed_queries.load(Ordering::SeqCst),
        }
    }
}

// Origin changes and the route state flip happen under the same lock
pub(crate) fn begin_origin_change(form: &mut FormState, origin: AirportCode) {
    form.widgets.origin.set_choice_by_value(&origin);
    form.fields.origin.value = Some(origin);
    form.route = RouteState::ResolvingDestinations;
}

// Two-step lookup: first depart-set date on/after the depart value, then the
// first return-set date on/after that. No candidate leaves the field as is.
fn recompute_return(form: &mut FormState, today: NaiveDate) {
    if !form.fields.return_date.enabled {
        return;
    }
    let floor = form.fields.depart_date.value.unwrap_or(today);
    form.widgets.ret.set_option(CalendarOption::MinDate(floor));

    let next_return = form
        .fields
        .depart_dates
        .first_on_or_after(floor)
        .and_then(|depart| form.fields.return_dates.first_on_or_after(depart));

    match next_return {
        Some(ret) => {
            form.fields.return_date.value = Some(ret);
            form.widgets.ret.set_date(Some(ret), true);
        }
        None => tracing::debug!("No return date on or after {}, keeping current value", floor),
    }
}

fn disable_return(form: &mut FormState) {
    form.fields.return_date = Field::disabled();
    form.widgets.ret.set_disabled(true);
    form.widgets.ret.set_date(None, false);
}

fn enter_no_flights(form: &mut FormState) {
    let fields = &mut form.fields;
    fields.destination = Field::disabled();
    fields.depart_date = Field::disabled();
    fields.return_date = Field::disabled();
    fields.search_enabled = false;
    fields.depart_dates.clear();
    fields.return_dates.clear();

    form.widgets.destination.clear();
    form.widgets
        .destination
        .set_choices(vec![Choice::placeholder(NO_FLIGHTS_LABEL)], false);
    form.widgets.destination.set_disabled(true);
    form.widgets.submit.set_disabled(true);
    for calendar in [&mut form.widgets.depart, &mut form.widgets.ret] {
        calendar.set_disabled(true);
        calendar.set_date(None, false);
    }
    redraw_calendars(form);

    form.destinations.clear();
    form.route = RouteState::NoFlights;
    form.settled = RouteState::NoFlights;
    form.settled_origin = form.fields.origin.value.clone();
    form.last_error = None;
}

fn redraw_calendars(form: &mut FormState) {
    form.widgets.depart.redraw(&form.fields.depart_dates.marker());
    form.widgets.ret.redraw(&form.fields.return_dates.marker());
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::airports::AirportInfo;
    use crate::client::mock_service::{code, date, MockAvailability};
    use crate::config::FixedClock;
    use crate::widgets::HeadlessForm;

    pub const TODAY: &str = "2024-05-20";

    pub fn airports() -> AirportDirectory {
        [
            ("NZNE", "North Shore Aerodrome", "Auckland"),
            ("NZRO", "Rotorua International", "Rotorua"),
            ("YMML", "Melbourne Airport", "Melbourne"),
            ("NZAA", "Auckland Airport", "Auckland Intl"),
            ("NZWN", "Wellington Airport", "Wellington"),
            ("NZCH", "Christchurch Airport", "Christchurch"),
        ]
        .into_iter()
        .map(|(c, name, region)| {
            (
                code(c),
                AirportInfo {
                    name: name.to_string(),
                    region: region.to_string(),
                },
            )
        })
        .collect()
    }

    // NZNE is the hub; NZAA has no onward flights; NZWN is unknown upstream
    pub async fn network() -> Arc<MockAvailability> {
        let service = Arc::new(MockAvailability::new());
        service.add_destinations("NZNE", &["NZRO", "YMML", "NZCH"]).await;
        service.add_destinations("NZRO", &["NZNE", "NZCH"]).await;
        service.add_destinations("YMML", &["NZNE"]).await;
        service.add_destinations("NZCH", &["NZRO"]).await;
        service.add_destinations("NZAA", &[]).await;
        service.add_unknown_origin("NZWN").await;

        service
            .add_dates("NZNE", "NZRO", &["2024-06-10", "2024-06-01", "2024-05-01"])
            .await;
        service.add_dates("NZRO", "NZNE", &["2024-06-15", "2024-06-02"]).await;
        service.add_dates("NZNE", "YMML", &["2024-07-01"]).await;
        service.add_dates("YMML", "NZNE", &["2024-07-08"]).await;
        service.add_dates("NZRO", "NZCH", &["2024-08-01"]).await;
        service
    }

    pub fn engine(service: Arc<MockAvailability>) -> (SyncEngine<MockAvailability>, HeadlessForm) {
        let (widgets, form) = FormWidgets::headless();
        let engine = SyncEngine::new(service, airports(), widgets, code("NZNE"))
            .with_clock(Arc::new(FixedClock(date(TODAY))));
        (engine, form)
    }

    pub async fn started() -> (SyncEngine<MockAvailability>, HeadlessForm, Arc<MockAvailability>) {
        let service = network().await;
        let (engine, form) = engine(service.clone());
        engine.start().await.unwrap();
        (engine, form, service)
    }
}
