// Compound actions: multi-field jumps built on the engine's resolution steps.
// Only one runs at a time; a second invocation while one is in flight is a
// no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::airports::AirportCode;
use crate::client::AvailabilityService;
use crate::engine::{begin_origin_change, Resolution, SyncEngine};
use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed(Resolution),
    // Another compound action was already running
    Ignored,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: AvailabilityService> SyncEngine<S> {
    /// Exchange origin and destination, then re-resolve from the new origin.
    ///
    /// Best effort: if the old origin is not reachable from the new one the
    /// destination falls back to whatever resolution picks.
    pub async fn swap(&self) -> Result<ActionOutcome, SyncError> {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            tracing::debug!("Swap ignored, another action is running");
            return Ok(ActionOutcome::Ignored);
        };

        let (old_origin, old_destination) = {
            let mut form = self.state.lock();
            let origin = form.fields.origin.value.clone().ok_or(SyncError::NoRoute)?;
            let destination = form
                .fields
                .destination
                .value
                .clone()
                .ok_or(SyncError::NothingToSwap)?;

            form.fields.destination.value = Some(origin.clone());
            begin_origin_change(&mut form, destination.clone());
            (origin, destination)
        };
        tracing::info!("Swapping {} <-> {}", old_origin, old_destination);

        let resolution = match self.resolve_destinations().await {
            Ok(resolution) => resolution,
            Err(err) => {
                let mut form = self.state.lock();
                form.widgets.origin.set_choice_by_value(&old_origin);
                form.fields.origin.value = Some(old_origin);
                form.fields.destination.value = Some(old_destination);
                return Err(err);
            }
        };
        if resolution == Resolution::Superseded {
            return Ok(ActionOutcome::Completed(resolution));
        }

        self.force_destination(&old_origin);
        let dates = self.refresh_flight_dates().await?;
        Ok(ActionOutcome::Completed(dates))
    }

    /// Promotional shortcut: jump to `target` from the configured promo origin
    /// and flash the destination picker.
    pub async fn promote(&self, target: &AirportCode) -> Result<ActionOutcome, SyncError> {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            tracing::debug!("Shortcut to {} ignored, another action is running", target);
            return Ok(ActionOutcome::Ignored);
        };

        self.shortcuts.set_enabled(false);
        let result = self.run_promotion(target).await;
        self.shortcuts.set_enabled(true);
        result
    }

    async fn run_promotion(&self, target: &AirportCode) -> Result<ActionOutcome, SyncError> {
        let origin = self.config.promo_origin.clone();
        begin_origin_change(&mut self.state.lock(), origin);

        let resolution = self.resolve_destinations().await?;
        if resolution == Resolution::Superseded {
            return Ok(ActionOutcome::Completed(resolution));
        }

        self.force_destination(target);
        let dates = self.refresh_flight_dates().await?;
        self.acknowledge().await;
        Ok(ActionOutcome::Completed(dates))
    }

    // Select `destination` if the latest resolution allows it
    fn force_destination(&self, destination: &AirportCode) -> bool {
        let mut form = self.state.lock();
        if !form.destinations.contains(destination) {
            tracing::warn!(
                "{} is not reachable from {:?}, keeping {:?}",
                destination,
                form.fields.origin.value,
                form.fields.destination.value
            );
            return false;
        }
        form.widgets.destination.set_choice_by_value(destination);
        form.fields.destination.value = Some(destination.clone());
        true
    }

    async fn acknowledge(&self) {
        self.attention.scroll_into_view();
        self.attention.highlight();
        tokio::time::sleep(Duration::from_millis(self.config.acknowledge.hold_ms)).await;
        self.attention.begin_fade();
        self.attention.transition_end().await;
        self.attention.clear_fade();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock_service::{code, date};
    use crate::config::{AcknowledgeConfig, EngineConfig};
    use crate::engine::test_support::{engine, network, started};
    use crate::engine::RouteState;
    use crate::widgets::{HeadlessAttention, HeadlessShortcuts};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn fast_config() -> EngineConfig {
        EngineConfig {
            acknowledge: AcknowledgeConfig { hold_ms: 20 },
            ..EngineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_swap_exchanges_route() {
        let (engine, form, _) = started().await;

        let outcome = engine.swap().await.unwrap();
        assert_eq!(
            outcome,
            ActionOutcome::Completed(Resolution::Committed(RouteState::HasDates))
        );

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.fields.origin.value, Some(code("NZRO")));
        assert_eq!(snapshot.fields.destination.value, Some(code("NZNE")));
        assert_eq!(snapshot.fields.depart_date.value, Some(date("2024-06-02")));
        assert_eq!(form.origin.state().selected, Some(code("NZRO")));
        assert_eq!(form.destination.state().selected, Some(code("NZNE")));
    }

    #[tokio::test]
    async fn test_double_swap_restores_route() {
        let (engine, _, _) = started().await;
        let before = engine.snapshot();

        engine.swap().await.unwrap();
        engine.swap().await.unwrap();

        let after = engine.snapshot();
        assert_eq!(after.fields.origin.value, before.fields.origin.value);
        assert_eq!(after.fields.destination.value, before.fields.destination.value);
        assert_eq!(after.destinations, before.destinations);
        assert_eq!(after.fields.depart_dates, before.fields.depart_dates);
    }

    #[tokio::test]
    async fn test_swap_falls_back_when_old_origin_unreachable() {
        let (engine, _, _) = started().await;
        engine.select_destination(code("NZCH")).await.unwrap();

        // NZCH only flies to NZRO, not back to NZNE
        engine.swap().await.unwrap();
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.fields.origin.value, Some(code("NZCH")));
        assert_eq!(snapshot.fields.destination.value, Some(code("NZRO")));
        assert!(snapshot.destinations.contains(&code("NZRO")));
    }

    #[tokio::test]
    async fn test_swap_failure_restores_fields() {
        let (engine, _, service) = started().await;
        service.fail_next_requests(1);

        assert!(engine.swap().await.is_err());
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.fields.origin.value, Some(code("NZNE")));
        assert_eq!(snapshot.fields.destination.value, Some(code("NZRO")));
        assert_eq!(snapshot.route, RouteState::HasDates);
    }

    #[tokio::test]
    async fn test_swap_without_destination() {
        let (engine, _, _) = started().await;
        engine.select_origin(code("NZAA")).await.unwrap();
        assert_eq!(engine.swap().await, Err(SyncError::NothingToSwap));
        assert!(!engine.busy.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_promote_jumps_and_acknowledges() {
        let service = network().await;
        let attention = Arc::new(HeadlessAttention::new(Duration::from_millis(5)));
        let shortcuts = Arc::new(HeadlessShortcuts::default());
        let (engine, form) = engine(service);
        let engine = engine
            .with_config(fast_config())
            .with_attention(attention.clone(), shortcuts.clone());
        engine.start().await.unwrap();
        engine.select_origin(code("NZRO")).await.unwrap();

        let outcome = engine.promote(&code("YMML")).await.unwrap();
        assert_eq!(
            outcome,
            ActionOutcome::Completed(Resolution::Committed(RouteState::HasDates))
        );

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.fields.origin.value, Some(code("NZNE")));
        assert_eq!(snapshot.fields.destination.value, Some(code("YMML")));
        assert_eq!(snapshot.fields.depart_date.value, Some(date("2024-07-01")));
        assert_eq!(form.destination.state().selected, Some(code("YMML")));

        assert_eq!(
            attention.events(),
            vec!["scroll", "highlight", "fade", "transitionend", "cleared"]
        );
        assert_eq!(shortcuts.history(), vec![false, true]);
    }

    #[tokio::test]
    async fn test_overlapping_promotions_run_once() {
        let service = network().await;
        let shortcuts = Arc::new(HeadlessShortcuts::default());
        let (engine, _) = engine(service.clone());
        let engine = engine.with_config(fast_config()).with_attention(
            Arc::new(HeadlessAttention::new(Duration::from_millis(5))),
            shortcuts.clone(),
        );
        engine.start().await.unwrap();
        let calls_before = service.destination_calls.load(Ordering::SeqCst);

        let target = code("NZRO");
        let (first, second) = tokio::join!(engine.promote(&target), engine.promote(&target));

        assert_eq!(
            first,
            Ok(ActionOutcome::Completed(Resolution::Committed(RouteState::HasDates)))
        );
        assert_eq!(second, Ok(ActionOutcome::Ignored));
        assert_eq!(service.destination_calls.load(Ordering::SeqCst), calls_before + 1);
        assert_eq!(shortcuts.history(), vec![false, true]);

        // The flag is released afterwards
        assert_eq!(
            engine.promote(&code("YMML")).await,
            Ok(ActionOutcome::Completed(Resolution::Committed(RouteState::HasDates)))
        );
    }

    #[tokio::test]
    async fn test_swap_ignored_during_promotion() {
        let service = network().await;
        let (engine, _) = engine(service);
        let engine = engine.with_config(fast_config());
        engine.start().await.unwrap();

        let ymml = code("YMML");
        let (promoted, swapped) = tokio::join!(engine.promote(&ymml), engine.swap());
        assert!(matches!(promoted, Ok(ActionOutcome::Completed(_))));
        assert_eq!(swapped, Ok(ActionOutcome::Ignored));
        assert_eq!(engine.snapshot().fields.destination.value, Some(code("YMML")));
    }

    #[tokio::test]
    async fn test_promote_unreachable_target_keeps_default() {
        let service = network().await;
        let attention = Arc::new(HeadlessAttention::new(Duration::ZERO));
        let (engine, _) = engine(service);
        let engine = engine
            .with_config(fast_config())
            .with_attention(attention.clone(), Arc::new(HeadlessShortcuts::default()));
        engine.start().await.unwrap();

        engine.promote(&code("NZWN")).await.unwrap();
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.fields.origin.value, Some(code("NZNE")));
        assert_eq!(snapshot.fields.destination.value, Some(code("NZRO")));
        assert_eq!(attention.events().len(), 5);
    }

    #[tokio::test]
    async fn test_promote_failure_reenables_shortcuts() {
        let service = network().await;
        let shortcuts = Arc::new(HeadlessShortcuts::default());
        let (engine, _) = engine(service.clone());
        let engine = engine.with_config(fast_config()).with_attention(
            Arc::new(HeadlessAttention::new(Duration::ZERO)),
            shortcuts.clone(),
        );
        engine.start().await.unwrap();

        engine.select_origin(code("NZRO")).await.unwrap();

        service.fail_next_requests(1);
        assert!(engine.promote(&code("YMML")).await.is_err());
        assert_eq!(shortcuts.history(), vec![false, true]);
        assert!(!engine.busy.load(Ordering::SeqCst));

        // The promo origin never resolved, so the form stays on NZRO
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.route, RouteState::HasDates);
        assert_eq!(snapshot.fields.origin.value, Some(code("NZRO")));
        assert_eq!(snapshot.fields.destination.value, Some(code("NZNE")));
        let query = engine.search_query().unwrap();
        assert_eq!((query.origin, query.destination), (code("NZRO"), code("NZNE")));
    }
}
