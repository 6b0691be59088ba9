//! # Engine: the wizard state machine
//!
//! The `Engine` owns one session's [`State`] and moves it across the
//! [`ControlModel`]'s route graph in response to `next`, `prev` and `goto`.
//!
//! ## Transition contract
//!
//! * Every transition is computed on a copy of the state and committed only
//!   when all gates pass. A returned `Err(NavigationError)` means nothing
//!   changed.
//! * Success is always an explicit [`Outcome`]; section changes and wizard
//!   completion are never signalled out of band.
//! * Page events run in-line: `on_next`/`on_previous` before the commit,
//!   `on_destroy`/`on_init` after it.
//!
//! The engine never owns the collected data. Each transition borrows the
//! caller's [`DataModel`] for the duration of the call.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use waymark_core::control::{ControlModel, ControlRef, PageControl, RouteControl, SectionControl};
use waymark_core::data::{DataModel, resolve_field};
use waymark_core::definition::RouteNext;
use waymark_core::error::{
    FailureKind, NavigationError, StateError, ValidationError, ValidationFailure, Violation,
};
use waymark_core::hooks::{HookContext, HookDecision, PageEvents, Registry};
use waymark_core::options::EngineOptions;
use waymark_core::outcome::Outcome;
use waymark_core::state::State;
use waymark_core::timeline::{Timeline, TimelineEvent, TransitionKind};
use waymark_std::validators;

/// Source of timestamps for status dates and timeline events.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct Engine {
    model: Arc<ControlModel>,
    registry: Registry,
    options: EngineOptions,
    state: State,
    timeline: Timeline,
    /// Renderer-reported validity, keyed by control id of the active page.
    reported: HashMap<String, bool>,
    clock: Clock,
}

impl Engine {
    /// Start a fresh session at the first section's `routeStart`.
    pub fn new(model: Arc<ControlModel>, registry: Registry, options: EngineOptions) -> Self {
        Self::with_clock(model, registry, options, Arc::new(Utc::now))
    }

    pub fn with_clock(
        model: Arc<ControlModel>,
        registry: Registry,
        options: EngineOptions,
        clock: Clock,
    ) -> Self {
        warn_unresolved_hooks(&model, &registry);
        let mut engine = Self {
            timeline: Timeline::with_limit(options.timeline_limit),
            model,
            registry,
            options,
            state: State::default(),
            reported: HashMap::new(),
            clock,
        };
        engine.start();
        engine
    }

    /// Continue a session from an externally supplied state.
    ///
    /// Every id in `state` is checked against the model first; the error lists
    /// all mismatches. A state that never started (no active route) starts fresh.
    pub fn resume(
        model: Arc<ControlModel>,
        registry: Registry,
        options: EngineOptions,
        state: State,
    ) -> Result<Self, StateError> {
        Self::resume_with_clock(model, registry, options, state, Arc::new(Utc::now))
    }

    pub fn resume_with_clock(
        model: Arc<ControlModel>,
        registry: Registry,
        options: EngineOptions,
        state: State,
        clock: Clock,
    ) -> Result<Self, StateError> {
        let violations = check_state(&model, &state);
        if !violations.is_empty() {
            tracing::warn!(count = violations.len(), "Rejected supplied wizard state");
            return Err(StateError { violations });
        }

        warn_unresolved_hooks(&model, &registry);
        let fresh = state.route_active_id.is_none();
        let mut engine = Self {
            timeline: Timeline::with_limit(options.timeline_limit),
            model,
            registry,
            options,
            state,
            reported: HashMap::new(),
            clock,
        };
        if fresh {
            engine.start();
        } else {
            tracing::info!(
                section = ?engine.state.section_active_id,
                route = ?engine.state.route_active_id,
                "Wizard session resumed"
            );
        }
        Ok(engine)
    }

    fn start(&mut self) {
        let now = self.now();
        let model = Arc::clone(&self.model);
        let mut state = State::default();
        if let Some(first) = model.first_section() {
            activate(&mut state, first, &first.route_start, now);
            state.route_path.push(first.route_start.clone());
            tracing::info!(section = %first.id, route = %first.route_start, "Wizard started");
        }
        self.state = state;
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub fn model(&self) -> &Arc<ControlModel> {
        &self.model
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn into_state(self) -> State {
        self.state
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Hand the recorded events to the caller and start a fresh record.
    pub fn drain_timeline(&mut self) -> Vec<TimelineEvent> {
        self.timeline.drain()
    }

    /// Page `events`/`validator` names the registry cannot resolve.
    ///
    /// Such pages run without hooks or page validation.
    pub fn unresolved_hooks(&self) -> Vec<Violation> {
        unresolved_hooks(&self.model, &self.registry)
    }

    pub fn is_complete(&self) -> bool {
        self.state.complete
    }

    pub fn active_section(&self) -> Option<&SectionControl> {
        self.model.section(self.state.section_active_id.as_deref()?)
    }

    pub fn active_route(&self) -> Option<&RouteControl> {
        position(&self.model, &self.state).map(|(_, route)| route)
    }

    pub fn active_page(&self) -> Option<&PageControl> {
        let (section, route) = position(&self.model, &self.state)?;
        section.pages.get(&route.page_id)
    }

    /// Current item of the active section, when it repeats.
    pub fn array_index(&self) -> Option<usize> {
        let key = self.active_section()?.array_key()?;
        Some(self.state.array_index(key))
    }

    /// Whether `prev` would move anywhere.
    pub fn can_prev(&self) -> bool {
        back_target(&self.model, &self.state).is_some()
    }

    /// Fire `on_init` for the page the session opens on.
    pub fn enter(&self, data: &dyn DataModel) {
        let Some((section, route)) = position(&self.model, &self.state) else {
            return;
        };
        if let Some(events) = self.events_for(section, route) {
            events.on_init(&context(&self.state, section, route, data));
        }
    }

    // --- Validation ---------------------------------------------------------

    /// Record the renderer's verdict for a control of the active page.
    ///
    /// Returns `false` when the active page has no such control.
    pub fn report_validity(&mut self, control_id: &str, valid: bool) -> bool {
        let known = self
            .active_page()
            .map(|page| page.control(control_id).is_some())
            .unwrap_or(false);
        if known {
            self.reported.insert(control_id.to_string(), valid);
        }
        known
    }

    pub fn reported_validity(&self, control_id: &str) -> Option<bool> {
        self.reported.get(control_id).copied()
    }

    /// A reported verdict wins; otherwise the control's own validators decide.
    pub fn control_failures(
        &self,
        control: &ControlRef,
        data: &dyn DataModel,
    ) -> Vec<ValidationFailure> {
        match self.reported.get(&control.id) {
            Some(true) => Vec::new(),
            Some(false) => vec![ValidationFailure {
                control: control.id.clone(),
                kind: FailureKind::Reported,
            }],
            None => {
                let field = resolve_field(&control.field, &self.state.array_indexes);
                validators::check_control(control, data.get(&field))
            }
        }
    }

    /// Failures across every bound control of `page`.
    pub fn controls_failures(
        &self,
        page: &PageControl,
        data: &dyn DataModel,
    ) -> Vec<ValidationFailure> {
        page.controls
            .iter()
            .flat_map(|control| self.control_failures(control, data))
            .collect()
    }

    /// Page-level verdict for the active page. A registered page validator
    /// replaces the per-control check.
    pub fn page_failures(&self, data: &dyn DataModel) -> Vec<ValidationFailure> {
        let Some((section, route)) = position(&self.model, &self.state) else {
            return Vec::new();
        };
        let Some(page) = section.pages.get(&route.page_id) else {
            return Vec::new();
        };

        let validator = page
            .validator
            .as_deref()
            .and_then(|name| Some((name, self.registry.get_validator(name)?)));
        match validator {
            Some((name, validator)) => {
                if validator.validate(&context(&self.state, section, route, data)) {
                    Vec::new()
                } else {
                    vec![ValidationFailure {
                        control: page.id.clone(),
                        kind: FailureKind::Validator(name.to_string()),
                    }]
                }
            }
            None => self.controls_failures(page, data),
        }
    }

    fn validate_active(&self, data: &dyn DataModel) -> Result<(), ValidationError> {
        let failures = self.page_failures(data);
        if failures.is_empty() {
            return Ok(());
        }
        let page = self
            .active_page()
            .map(|p| p.id.clone())
            .unwrap_or_default();
        Err(ValidationError { page, failures })
    }

    // --- Transitions --------------------------------------------------------

    /// Advance along the active route.
    pub fn next(&mut self, data: &dyn DataModel) -> Result<Outcome, NavigationError> {
        let kind = TransitionKind::Next;
        if self.state.complete {
            return self.reject(kind, NavigationError::WizardComplete);
        }
        let model = Arc::clone(&self.model);
        let Some((section, route)) = position(&model, &self.state) else {
            return Ok(Outcome::Stay);
        };

        if self.options.validate_on_next {
            if let Err(err) = self.validate_active(data) {
                return self.reject(kind, err.into());
            }
        }

        match self.before_leave(kind, section, route, data) {
            HookDecision::Proceed => {}
            HookDecision::Veto => return Ok(self.veto(kind)),
            HookDecision::Redirect(target) => {
                tracing::debug!(route = %route.id, target = %target, "Page events redirected next");
                return self.jump(kind, &target, data);
            }
        }

        match self.advance(&model, section, route, data) {
            Ok((state, outcome)) => self.commit(kind, state, outcome, data),
            Err(err) => self.reject(kind, err),
        }
    }

    fn advance(
        &self,
        model: &ControlModel,
        section: &SectionControl,
        route: &RouteControl,
        data: &dyn DataModel,
    ) -> Result<(State, Outcome), NavigationError> {
        let now = self.now();
        let mut next = self.state.clone();

        let target = match &route.next {
            RouteNext::Static(target) => target.as_str(),
            RouteNext::Dynamic(groups) => {
                waymark_std::evaluate(groups, data, &self.state.array_indexes).map_err(
                    |source| NavigationError::NoMatchingRule {
                        route: route.id.clone(),
                        source,
                    },
                )?
            }
            RouteNext::SectionComplete => {
                return Ok(finish_section(model, next, section, route, data, now));
            }
        };

        if !section.routes.contains_key(target) {
            return Err(NavigationError::UnknownRoute(target.to_string()));
        }
        activate(&mut next, section, target, now);
        next.route_path.push(target.to_string());
        Ok((
            next,
            Outcome::Route {
                from: route.id.clone(),
                to: target.to_string(),
            },
        ))
    }

    /// Step back through the visited path.
    ///
    /// At the first route of the first section this is a no-op returning
    /// [`Outcome::Stay`].
    pub fn prev(&mut self, data: &dyn DataModel) -> Result<Outcome, NavigationError> {
        let kind = TransitionKind::Prev;
        let model = Arc::clone(&self.model);
        let Some((section, route)) = position(&model, &self.state) else {
            return Ok(Outcome::Stay);
        };
        let Some((target_section, target)) = back_target(&model, &self.state) else {
            tracing::debug!(route = %route.id, "Nothing to go back to");
            return Ok(Outcome::Stay);
        };

        match self.before_leave(kind, section, route, data) {
            HookDecision::Proceed => {}
            HookDecision::Veto => return Ok(self.veto(kind)),
            HookDecision::Redirect(target) => {
                tracing::debug!(route = %route.id, target = %target, "Page events redirected prev");
                return self.jump(kind, &target, data);
            }
        }

        let now = self.now();
        let mut next = self.state.clone();
        if next.route_path.last() == Some(&route.id) {
            next.route_path.pop();
        }
        next.complete = false;

        let outcome = if target_section.id == section.id {
            // Leaving an item's first route steps back into the previous item.
            if let Some(key) = section.array_key() {
                let index = next.array_index(key);
                if route.id == section.route_start && index > 0 {
                    next.array_indexes.insert(key.to_string(), index - 1);
                }
            }
            retrace(&mut next.route_path, target);
            activate(&mut next, section, target, now);
            Outcome::Route {
                from: route.id.clone(),
                to: target.to_string(),
            }
        } else {
            retrace(&mut next.route_path, target);
            activate(&mut next, target_section, target, now);
            Outcome::Section {
                from: section.id.clone(),
                to: target_section.id.clone(),
                route: target.to_string(),
            }
        };

        self.commit(kind, next, outcome, data)
    }

    /// Jump straight to `target`, discarding forward history.
    ///
    /// No page validation runs; `previousRequired` on the target's section is
    /// the only gate.
    pub fn goto(&mut self, target: &str, data: &dyn DataModel) -> Result<Outcome, NavigationError> {
        self.jump(TransitionKind::Goto, target, data)
    }

    fn jump(
        &mut self,
        kind: TransitionKind,
        target: &str,
        data: &dyn DataModel,
    ) -> Result<Outcome, NavigationError> {
        let model = Arc::clone(&self.model);
        let Some(target_section) = model.section_of_route(target) else {
            return self.reject(kind, NavigationError::UnknownRoute(target.to_string()));
        };

        if target_section.settings.previous_required {
            let incomplete: Vec<String> = model
                .sections_before(&target_section.id)
                .iter()
                .filter(|s| !self.state.is_completed(&s.id))
                .map(|s| s.id.clone())
                .collect();
            if !incomplete.is_empty() {
                return self.reject(
                    kind,
                    NavigationError::NavigationBlocked {
                        section: target_section.id.clone(),
                        incomplete,
                    },
                );
            }
        }

        let now = self.now();
        let mut next = self.state.clone();
        let from_section = next.section_active_id.clone();
        let from_route = next.route_active_id.clone().unwrap_or_default();
        retrace(&mut next.route_path, target);
        activate(&mut next, target_section, target, now);
        next.complete = false;

        let outcome = if from_section.as_deref() == Some(target_section.id.as_str()) {
            Outcome::Route {
                from: from_route,
                to: target.to_string(),
            }
        } else {
            Outcome::Section {
                from: from_section.unwrap_or_default(),
                to: target_section.id.clone(),
                route: target.to_string(),
            }
        };
        self.commit(kind, next, outcome, data)
    }

    /// Point the repeating section for `key` at item `index`.
    ///
    /// The engine does not own the collection, so `index` is not bounds-checked.
    pub fn set_array_index(&mut self, key: &str, index: usize) -> Result<(), NavigationError> {
        if self.model.section_for_array_key(key).is_none() {
            tracing::warn!(key, "Unknown array key");
            return Err(NavigationError::UnknownArrayKey(key.to_string()));
        }
        let previous = self.state.array_indexes.insert(key.to_string(), index);
        if previous != Some(index) {
            if self.active_section().and_then(|s| s.array_key()) == Some(key) {
                // Bound controls now point at another item.
                self.reported.clear();
            }
            tracing::debug!(key, index, "Array index set");
        }
        Ok(())
    }

    // --- Internals ----------------------------------------------------------

    fn events_for(
        &self,
        section: &SectionControl,
        route: &RouteControl,
    ) -> Option<Arc<dyn PageEvents>> {
        if !self.options.run_hooks {
            return None;
        }
        let name = section.pages.get(&route.page_id)?.events.as_deref()?;
        self.registry.get_events(name).cloned()
    }

    fn before_leave(
        &self,
        kind: TransitionKind,
        section: &SectionControl,
        route: &RouteControl,
        data: &dyn DataModel,
    ) -> HookDecision {
        let Some(events) = self.events_for(section, route) else {
            return HookDecision::Proceed;
        };
        let ctx = context(&self.state, section, route, data);
        match kind {
            TransitionKind::Next => events.on_next(&ctx),
            TransitionKind::Prev => events.on_previous(&ctx),
            TransitionKind::Goto => HookDecision::Proceed,
        }
    }

    fn commit(
        &mut self,
        kind: TransitionKind,
        next: State,
        outcome: Outcome,
        data: &dyn DataModel,
    ) -> Result<Outcome, NavigationError> {
        let previous = std::mem::replace(&mut self.state, next);
        let from = previous.route_active_id.clone();
        let to = self.state.route_active_id.clone();

        self.timeline.push(TimelineEvent::Transition {
            kind,
            from: from.clone(),
            to: to.clone(),
            outcome: outcome.label().to_string(),
            at: self.now(),
        });
        tracing::info!(
            kind = ?kind,
            from = ?from,
            to = ?to,
            outcome = outcome.label(),
            "Transition committed"
        );

        let page_changed = from != to || matches!(outcome, Outcome::Iteration { .. });
        if page_changed {
            self.reported.clear();
            let model = Arc::clone(&self.model);
            if let Some((section, route)) = position(&model, &previous) {
                if let Some(events) = self.events_for(section, route) {
                    events.on_destroy(&context(&previous, section, route, data));
                }
            }
            if let Some((section, route)) = position(&model, &self.state) {
                if let Some(events) = self.events_for(section, route) {
                    events.on_init(&context(&self.state, section, route, data));
                }
            }
        }

        Ok(outcome)
    }

    fn reject(
        &mut self,
        kind: TransitionKind,
        err: NavigationError,
    ) -> Result<Outcome, NavigationError> {
        let route = self.state.route_active_id.clone();
        match &err {
            NavigationError::Validation(_) | NavigationError::WizardComplete => {
                tracing::debug!(kind = ?kind, route = ?route, error = %err, "Transition refused");
            }
            _ => {
                tracing::warn!(kind = ?kind, route = ?route, error = %err, "Transition refused");
            }
        }
        self.timeline.push(TimelineEvent::Rejected {
            kind,
            route,
            reason: err.to_string(),
            at: self.now(),
        });
        Err(err)
    }

    fn veto(&mut self, kind: TransitionKind) -> Outcome {
        let route = self.state.route_active_id.clone();
        tracing::info!(kind = ?kind, route = ?route, "Transition vetoed by page events");
        self.timeline.push(TimelineEvent::Rejected {
            kind,
            route,
            reason: "vetoed by page events".to_string(),
            at: self.now(),
        });
        Outcome::Vetoed
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("options", &self.options)
            .field("registry", &self.registry)
            .field("timeline_len", &self.timeline.len())
            .finish()
    }
}

fn position<'m>(
    model: &'m ControlModel,
    state: &State,
) -> Option<(&'m SectionControl, &'m RouteControl)> {
    let section = model.section(state.section_active_id.as_deref()?)?;
    let route = section.routes.get(state.route_active_id.as_deref()?)?;
    Some((section, route))
}

fn context<'a>(
    state: &'a State,
    section: &'a SectionControl,
    route: &'a RouteControl,
    data: &'a dyn DataModel,
) -> HookContext<'a> {
    HookContext {
        section_id: &section.id,
        route_id: &route.id,
        page_id: &route.page_id,
        data,
        array_index: section.array_key().map(|key| state.array_index(key)),
    }
}

/// Make `route` of `section` the active position.
fn activate(state: &mut State, section: &SectionControl, route: &str, now: DateTime<Utc>) {
    for (id, status) in state.status.iter_mut() {
        status.active = *id == section.id;
    }
    let status = state.status_mut(&section.id);
    status.enter(now);
    status.route_last = Some(route.to_string());

    if let Some(key) = section.array_key() {
        state.array_indexes.entry(key.to_string()).or_insert(0);
    }
    state.section_active_id = Some(section.id.clone());
    state.route_active_id = Some(route.to_string());
}

/// Cut the path back to the last visit of `target`, or append it.
fn retrace(path: &mut Vec<String>, target: &str) {
    match path.iter().rposition(|id| id == target) {
        Some(pos) => path.truncate(pos + 1),
        None => path.push(target.to_string()),
    }
}

/// Where `prev` would land: the previous path entry when it belongs to the
/// active section, else the previous section's last visited route.
fn back_target<'m>(model: &'m ControlModel, state: &State) -> Option<(&'m SectionControl, &'m str)> {
    let (section, route) = position(model, state)?;

    let mut path = state.route_path.iter().rev();
    let mut top = path.next();
    if top == Some(&route.id) {
        top = path.next();
    }
    if let Some(candidate) = top.and_then(|id| section.routes.get(id)) {
        return Some((section, candidate.id.as_str()));
    }

    let previous = model.section(section.section_previous_id.as_deref()?)?;
    let target = state
        .section_status(&previous.id)
        .and_then(|status| status.route_last.as_deref())
        .and_then(|id| previous.routes.get(id))
        .map(|r| r.id.as_str())
        .unwrap_or(previous.route_start.as_str());
    Some((previous, target))
}

/// `next` on a `sectionComplete` route: iterate, move on, or finish.
fn finish_section(
    model: &ControlModel,
    mut next: State,
    section: &SectionControl,
    route: &RouteControl,
    data: &dyn DataModel,
    now: DateTime<Utc>,
) -> (State, Outcome) {
    if let Some(key) = section.array_key() {
        let len = data.collection_len(&resolve_field(key, &next.array_indexes));
        let following = next
            .array_index(key)
            .checked_add(1)
            .filter(|&following| following < len);
        if let Some(index) = following {
            next.array_indexes.insert(key.to_string(), index);
            activate(&mut next, section, &section.route_start, now);
            next.route_path.push(section.route_start.clone());
            return (
                next,
                Outcome::Iteration {
                    section: section.id.clone(),
                    index,
                },
            );
        }
    }

    next.status_mut(&section.id).complete(now);

    let following = if section.wizard_complete {
        None
    } else {
        section
            .section_next_id
            .as_deref()
            .and_then(|id| model.section(id))
    };

    match following {
        Some(following) => {
            if let Some(key) = following.array_key() {
                next.array_indexes.insert(key.to_string(), 0);
            }
            activate(&mut next, following, &following.route_start, now);
            next.route_path.push(following.route_start.clone());
            (
                next,
                Outcome::Section {
                    from: section.id.clone(),
                    to: following.id.clone(),
                    route: following.route_start.clone(),
                },
            )
        }
        None => {
            next.complete = true;
            next.status_mut(&section.id).route_last = Some(route.id.clone());
            (
                next,
                Outcome::Complete {
                    section: section.id.clone(),
                },
            )
        }
    }
}

fn unresolved_hooks(model: &ControlModel, registry: &Registry) -> Vec<Violation> {
    let mut violations = Vec::new();
    for section in model.sections() {
        let mut pages: Vec<&PageControl> = section.pages.values().collect();
        pages.sort_by(|a, b| a.id.cmp(&b.id));
        for page in pages {
            if let Some(name) = page.events.as_deref().filter(|n| !registry.has_events(n)) {
                violations.push(Violation::UnknownEvents {
                    page: page.id.clone(),
                    name: name.to_string(),
                });
            }
            if let Some(name) = page.validator.as_deref().filter(|n| !registry.has_validator(n)) {
                violations.push(Violation::UnknownValidator {
                    page: page.id.clone(),
                    name: name.to_string(),
                });
            }
        }
    }
    violations
}

fn warn_unresolved_hooks(model: &ControlModel, registry: &Registry) {
    for violation in unresolved_hooks(model, registry) {
        tracing::warn!(%violation, "Engine registry does not match the model");
    }
}

/// Every way `state` fails to fit `model`.
fn check_state(model: &ControlModel, state: &State) -> Vec<String> {
    let mut violations = Vec::new();

    match (&state.section_active_id, &state.route_active_id) {
        (Some(section_id), Some(route_id)) => match model.section(section_id) {
            None => violations.push(format!("active section '{section_id}' does not exist")),
            Some(section) if !section.routes.contains_key(route_id) => violations.push(format!(
                "active route '{route_id}' is not a route of section '{section_id}'"
            )),
            Some(_) => {}
        },
        (None, None) => {}
        _ => violations.push("active section and active route must be set together".to_string()),
    }

    for id in &state.route_path {
        if !model.contains_route(id) {
            violations.push(format!("route path contains unknown route '{id}'"));
        }
    }

    for (section_id, status) in &state.status {
        match model.section(section_id) {
            None => violations.push(format!("status for unknown section '{section_id}'")),
            Some(section) => {
                if let Some(last) = &status.route_last {
                    if !section.routes.contains_key(last) {
                        violations.push(format!(
                            "routeLast '{last}' of section '{section_id}' is not one of its routes"
                        ));
                    }
                }
            }
        }
    }

    for key in state.array_indexes.keys() {
        if model.section_for_array_key(key).is_none() {
            violations.push(format!("no repeating section uses array key '{key}'"));
        }
    }

    let active = state.active_sections();
    if active.len() > 1 {
        violations.push(format!(
            "more than one section is active: {}",
            active.join(", ")
        ));
    } else if let (Some(&only), Some(section_id)) = (active.first(), &state.section_active_id) {
        if only != section_id.as_str() {
            violations.push(format!(
                "section '{only}' is flagged active but '{section_id}' is the active section"
            ));
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use waymark_core::data::JsonDataModel;
    use waymark_core::definition::Definition;

    fn model(value: serde_json::Value) -> Arc<ControlModel> {
        let definition: Definition = serde_json::from_value(value).unwrap();
        Arc::new(waymark_flow::build(&definition, &Registry::new()).unwrap())
    }

    fn linear() -> Arc<ControlModel> {
        model(json!([
            { "id": "s1", "title": "One", "routeStart": "r1",
              "routes": [
                { "id": "r1", "pageId": "p1", "routeNext": "r2" },
                { "id": "r2", "pageId": "p2", "sectionComplete": true }
              ],
              "pages": [
                { "id": "p1", "content": [] },
                { "id": "p2", "content": [] }
              ] },
            { "id": "s2", "title": "Two", "routeStart": "r3", "wizardComplete": true,
              "routes": [{ "id": "r3", "pageId": "p3", "sectionComplete": true }],
              "pages": [{ "id": "p3", "content": [] }] }
        ]))
    }

    #[test]
    fn test_retrace_truncates_or_appends() {
        let mut path: Vec<String> = vec!["a".into(), "b".into(), "a".into(), "c".into()];
        retrace(&mut path, "a");
        assert_eq!(path, vec!["a", "b", "a"]);
        retrace(&mut path, "z");
        assert_eq!(path, vec!["a", "b", "a", "z"]);
    }

    #[test]
    fn test_activate_keeps_a_single_active_section() {
        let model = linear();
        let now = Utc::now();
        let mut state = State::default();
        let s1 = model.section("s1").unwrap();
        let s2 = model.section("s2").unwrap();

        activate(&mut state, s1, "r1", now);
        activate(&mut state, s2, "r3", now);
        assert_eq!(state.active_sections(), vec!["s2"]);
        assert!(state.status["s1"].started);
        assert_eq!(state.status["s2"].route_last.as_deref(), Some("r3"));
    }

    #[test]
    fn test_check_state_lists_every_problem() {
        let model = linear();
        let mut state = State {
            section_active_id: Some("s1".into()),
            route_active_id: Some("r3".into()),
            route_path: vec!["r1".into(), "ghost".into()],
            ..Default::default()
        };
        state.status_mut("s1").active = true;
        state.status_mut("s2").active = true;
        state.status_mut("s9");
        state.array_indexes.insert("people".into(), 1);

        let violations = check_state(&model, &state);
        assert_eq!(violations.len(), 5, "{violations:#?}");
    }

    #[test]
    fn test_fixed_clock_stamps_dates() {
        let at = Utc::now() - chrono::Duration::days(3);
        let engine = Engine::with_clock(
            linear(),
            Registry::new(),
            EngineOptions::default(),
            Arc::new(move || at),
        );
        assert_eq!(engine.state().status["s1"].started_date, Some(at));
    }

    #[test]
    fn test_report_validity_ignores_unknown_controls() {
        let model = model(json!([
            { "id": "s1", "title": "One", "routeStart": "r1", "wizardComplete": true,
              "routes": [{ "id": "r1", "pageId": "p1", "sectionComplete": true }],
              "pages": [{ "id": "p1", "content": [
                { "type": "formField", "field": "name", "formFieldType": "text",
                  "validators": { "required": true } }
              ] }] }
        ]));
        let mut engine = Engine::new(model, Registry::new(), EngineOptions::default());
        let data = JsonDataModel::new(json!({}));

        assert_eq!(engine.page_failures(&data).len(), 1);
        assert!(!engine.report_validity("missing", true));
        assert!(engine.report_validity("name", true));
        assert!(engine.page_failures(&data).is_empty());
        assert_eq!(engine.reported_validity("name"), Some(true));
    }
}
