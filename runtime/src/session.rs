//! Session facade: the renderer's view of one running wizard.
//!
//! A [`Session`] pairs an [`Engine`] with the external [`DataModel`] it reads.
//! Reads are projections ([`PageView`], [`Buttons`]); writes delegate to the
//! engine unchanged. No gating happens here.

use crate::engine::Engine;
use serde_json::Value;
use uuid::Uuid;
use waymark_core::control::{PageControl, SectionControl};
use waymark_core::data::{DataModel, resolve_field};
use waymark_core::error::{NavigationError, PathError, ValidationFailure};
use waymark_core::outcome::Outcome;
use waymark_core::state::State;

/// The active page with its live validity.
#[derive(Debug, Clone)]
pub struct PageView<'a> {
    pub control: &'a PageControl,
    /// The page would pass the `next` validation gate.
    pub valid: bool,
    /// Every bound control passes, regardless of any page validator.
    pub valid_controls: bool,
    pub invalid: bool,
    pub failures: Vec<ValidationFailure>,
}

/// Navigation button visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Buttons {
    pub back: bool,
    pub next: bool,
}

pub struct Session<D: DataModel> {
    id: Uuid,
    engine: Engine,
    data: D,
}

impl<D: DataModel> Session<D> {
    /// Open a session and fire `on_init` for its first page.
    pub fn new(engine: Engine, data: D) -> Self {
        let id = Uuid::new_v4();
        let _span = tracing::info_span!("session", session.id = %id).entered();
        engine.enter(&data);
        tracing::debug!(route = ?engine.state().route_active_id, "Session opened");
        Self { id, engine, data }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn state(&self) -> &State {
        self.engine.state()
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    /// Mutable access for the renderer writing collected values.
    pub fn data_mut(&mut self) -> &mut D {
        &mut self.data
    }

    /// Write `value` at `field`, pinning `key[]` placeholders to the current items.
    pub fn set_field(&mut self, field: &str, value: Value) -> Result<(), PathError> {
        let path = resolve_field(field, &self.engine.state().array_indexes);
        self.data.set(&path, value)
    }

    pub fn into_parts(self) -> (Engine, D) {
        (self.engine, self.data)
    }

    pub fn section(&self) -> Option<&SectionControl> {
        self.engine.active_section()
    }

    pub fn page(&self) -> Option<PageView<'_>> {
        let control = self.engine.active_page()?;
        let control_failures = self.engine.controls_failures(control, &self.data);
        let failures = self.engine.page_failures(&self.data);
        let valid = failures.is_empty();
        Some(PageView {
            control,
            valid,
            valid_controls: control_failures.is_empty(),
            invalid: !valid,
            failures,
        })
    }

    /// Page settings win over engine defaults; a button only shows when its
    /// transition is structurally possible.
    pub fn buttons(&self) -> Buttons {
        let options = self.engine.options();
        let settings = self.engine.active_page().map(|page| &page.settings);
        let back = settings
            .and_then(|s| s.back_button_visible)
            .unwrap_or(options.back_button_default);
        let next = settings
            .and_then(|s| s.next_button_visible)
            .unwrap_or(options.next_button_default);
        Buttons {
            back: back && self.engine.can_prev(),
            next: next && !self.engine.is_complete(),
        }
    }

    pub fn array_index(&self) -> Option<usize> {
        self.engine.array_index()
    }

    pub fn is_complete(&self) -> bool {
        self.engine.is_complete()
    }

    /// Renderer feedback for one control of the active page.
    pub fn report_validity(&mut self, control_id: &str, valid: bool) -> bool {
        self.engine.report_validity(control_id, valid)
    }

    pub fn request_next(&mut self) -> Result<Outcome, NavigationError> {
        let _span = tracing::info_span!("session", session.id = %self.id).entered();
        self.engine.next(&self.data)
    }

    pub fn request_prev(&mut self) -> Result<Outcome, NavigationError> {
        let _span = tracing::info_span!("session", session.id = %self.id).entered();
        self.engine.prev(&self.data)
    }

    pub fn request_goto(&mut self, route_id: &str) -> Result<Outcome, NavigationError> {
        let _span = tracing::info_span!("session", session.id = %self.id).entered();
        self.engine.goto(route_id, &self.data)
    }

    pub fn request_array_index(&mut self, key: &str, index: usize) -> Result<(), NavigationError> {
        self.engine.set_array_index(key, index)
    }
}

impl<D: DataModel> std::fmt::Debug for Session<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("engine", &self.engine)
            .finish()
    }
}
