// Capability contracts for the UI components the engine drives, plus headless
// implementations that keep the rendered state in memory.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;

use crate::airports::AirportCode;

pub const NO_FLIGHTS_LABEL: &str = "No flights available";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: Option<AirportCode>,
    pub label: String,
    pub selected: bool,
    pub disabled: bool,
}

impl Choice {
    pub fn airport(code: AirportCode, label: String, selected: bool) -> Self {
        Self {
            value: Some(code),
            label,
            selected,
            disabled: false,
        }
    }

    pub fn placeholder(label: &str) -> Self {
        Self {
            value: None,
            label: label.to_string(),
            selected: false,
            disabled: true,
        }
    }
}

/// Airport picker. A plain native select implements the same contract.
pub trait SearchableSelect: Send {
    fn set_choices(&mut self, choices: Vec<Choice>, replace: bool);
    fn set_choice_by_value(&mut self, value: &AirportCode);
    fn clear(&mut self);
    fn set_disabled(&mut self, disabled: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarOption {
    MinDate(NaiveDate),
}

pub trait Calendar: Send {
    fn set_date(&mut self, date: Option<NaiveDate>, trigger_change: bool);
    fn set_option(&mut self, option: CalendarOption);
    fn set_disabled(&mut self, disabled: bool);
    /// Re-render every visible day, marking those `is_marked` accepts.
    fn redraw(&mut self, is_marked: &dyn Fn(NaiveDate) -> bool);
}

pub trait SubmitControl: Send {
    fn set_disabled(&mut self, disabled: bool);
}

/// Region around the destination picker that flashes after a shortcut.
#[async_trait]
pub trait AttentionRegion: Send + Sync {
    fn scroll_into_view(&self);
    fn highlight(&self);
    // Swap the highlight for the fading transition
    fn begin_fade(&self);
    async fn transition_end(&self);
    fn clear_fade(&self);
}

pub trait ShortcutControls: Send + Sync {
    fn set_enabled(&self, enabled: bool);
}

pub struct FormWidgets {
    pub origin: Box<dyn SearchableSelect>,
    pub destination: Box<dyn SearchableSelect>,
    pub depart: Box<dyn Calendar>,
    pub ret: Box<dyn Calendar>,
    pub submit: Box<dyn SubmitControl>,
}

impl FormWidgets {
    pub fn headless() -> (Self, HeadlessForm) {
        let form = HeadlessForm::default();
        let widgets = Self {
            origin: Box::new(form.origin.clone()),
            destination: Box::new(form.destination.clone()),
            depart: Box::new(form.depart.clone()),
            ret: Box::new(form.ret.clone()),
            submit: Box::new(form.submit.clone()),
        };
        (widgets, form)
    }
}

// Handles onto the headless widgets after they are boxed into the engine
#[derive(Debug, Clone, Default)]
pub struct HeadlessForm {
    pub origin: HeadlessSelect,
    pub destination: HeadlessSelect,
    pub depart: HeadlessCalendar,
    pub ret: HeadlessCalendar,
    pub submit: HeadlessSubmit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectState {
    pub choices: Vec<Choice>,
    pub selected: Option<AirportCode>,
    pub disabled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessSelect(Arc<Mutex<SelectState>>);

impl HeadlessSelect {
    pub fn state(&self) -> SelectState {
        self.0.lock().clone()
    }
}

impl SearchableSelect for HeadlessSelect {
    fn set_choices(&mut self, choices: Vec<Choice>, replace: bool) {
        let mut state = self.0.lock();
        if replace {
            state.choices.clear();
        }
        if let Some(selected) = choices.iter().find(|c| c.selected) {
            state.selected = selected.value.clone();
        }
        state.choices.extend(choices);
    }

    fn set_choice_by_value(&mut self, value: &AirportCode) {
        let mut state = self.0.lock();
        let known = state.choices.is_empty()
            || state.choices.iter().any(|c| c.value.as_ref() == Some(value));
        if known {
            state.selected = Some(value.clone());
        }
    }

    fn clear(&mut self) {
        let mut state = self.0.lock();
        state.choices.clear();
        state.selected = None;
    }

    fn set_disabled(&mut self, disabled: bool) {
        self.0.lock().disabled = disabled;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarState {
    pub date: Option<NaiveDate>,
    pub min_date: Option<NaiveDate>,
    pub disabled: bool,
    /// Days currently on screen.
    pub visible: Vec<NaiveDate>,
    pub marked: Vec<NaiveDate>,
    pub redraws: usize,
    pub change_events: usize,
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessCalendar(Arc<Mutex<CalendarState>>);

impl HeadlessCalendar {
    pub fn state(&self) -> CalendarState {
        self.0.lock().clone()
    }

    pub fn show_days(&self, days: impl IntoIterator<Item = NaiveDate>) {
        self.0.lock().visible = days.into_iter().collect();
    }
}

impl Calendar for HeadlessCalendar {
    fn set_date(&mut self, date: Option<NaiveDate>, trigger_change: bool) {
        let mut state = self.0.lock();
        state.date = date;
        if trigger_change {
            state.change_events += 1;
        }
    }

    fn set_option(&mut self, option: CalendarOption) {
        match option {
            CalendarOption::MinDate(min) => self.0.lock().min_date = Some(min),
        }
    }

    fn set_disabled(&mut self, disabled: bool) {
        self.0.lock().disabled = disabled;
    }

    fn redraw(&mut self, is_marked: &dyn Fn(NaiveDate) -> bool) {
        let mut state = self.0.lock();
        state.marked = state.visible.iter().copied().filter(|d| is_marked(*d)).collect();
        state.redraws += 1;
    }
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessSubmit(Arc<Mutex<bool>>);

impl HeadlessSubmit {
    pub fn is_disabled(&self) -> bool {
        *self.0.lock()
    }
}

impl SubmitControl for HeadlessSubmit {
    fn set_disabled(&mut self, disabled: bool) {
        *self.0.lock() = disabled;
    }
}

/// Records the acknowledgment steps; the fade lasts `fade`.
#[derive(Debug, Default)]
pub struct HeadlessAttention {
    pub fade: Duration,
    events: Mutex<Vec<&'static str>>,
}

impl HeadlessAttention {
    pub fn new(fade: Duration) -> Self {
        Self {
            fade,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl AttentionRegion for HeadlessAttention {
    fn scroll_into_view(&self) {
        self.events.lock().push("scroll");
    }

    fn highlight(&self) {
        self.events.lock().push("highlight");
    }

    fn begin_fade(&self) {
        self.events.lock().push("fade");
    }

    async fn transition_end(&self) {
        tokio::time::sleep(self.fade).await;
        self.events.lock().push("transitionend");
    }

    fn clear_fade(&self) {
        self.events.lock().push("cleared");
    }
}

#[derive(Debug, Default)]
pub struct HeadlessShortcuts {
    enabled: Mutex<Vec<bool>>,
}

impl HeadlessShortcuts {
    /// Every `set_enabled` call, oldest first.
    pub fn history(&self) -> Vec<bool> {
        self.enabled.lock().clone()
    }
}

impl ShortcutControls for HeadlessShortcuts {
    fn set_enabled(&self, enabled: bool) {
        self.enabled.lock().push(enabled);
    }
}
