//! Page lifecycle hooks and custom validators.
//!
//! A definition is plain JSON, so pages refer to behaviour by name
//! (`"events": "income-page"`, `"validator": "dates-in-order"`). The
//! [`Registry`] wires those names to code before the control model is built;
//! an unregistered name is a build error, never a runtime surprise.

use crate::data::DataModel;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What a pre-transition hook wants the engine to do.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HookDecision {
    /// Default behaviour.
    #[default]
    Proceed,
    /// Cancel the transition; state stays untouched.
    Veto,
    /// Replace the transition with a jump to this route.
    Redirect(String),
}

/// Read-only view handed to hooks and validators.
pub struct HookContext<'a> {
    pub section_id: &'a str,
    pub route_id: &'a str,
    pub page_id: &'a str,
    pub data: &'a dyn DataModel,
    /// Current item of the active repeating section, if any.
    pub array_index: Option<usize>,
}

impl fmt::Debug for HookContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("section_id", &self.section_id)
            .field("route_id", &self.route_id)
            .field("page_id", &self.page_id)
            .field("array_index", &self.array_index)
            .finish()
    }
}

/// Ordered lifecycle slots of a page. Every slot is optional.
pub trait PageEvents: Send + Sync {
    /// The page became active.
    fn on_init(&self, _ctx: &HookContext<'_>) {}

    /// The page stopped being active.
    fn on_destroy(&self, _ctx: &HookContext<'_>) {}

    /// Called before `next` leaves the page.
    fn on_next(&self, _ctx: &HookContext<'_>) -> HookDecision {
        HookDecision::Proceed
    }

    /// Called before `prev` leaves the page.
    fn on_previous(&self, _ctx: &HookContext<'_>) -> HookDecision {
        HookDecision::Proceed
    }
}

/// Page-level validation that replaces the per-control check when present.
pub trait PageValidator: Send + Sync {
    fn validate(&self, ctx: &HookContext<'_>) -> bool;
}

struct FnValidator<F>(F);

impl<F> PageValidator for FnValidator<F>
where
    F: Fn(&HookContext<'_>) -> bool + Send + Sync,
{
    fn validate(&self, ctx: &HookContext<'_>) -> bool {
        (self.0)(ctx)
    }
}

/// Name -> behaviour wiring for page events and validators.
#[derive(Clone, Default)]
pub struct Registry {
    events: HashMap<String, Arc<dyn PageEvents>>,
    validators: HashMap<String, Arc<dyn PageValidator>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register page events under `name`, replacing any previous entry.
    pub fn events(mut self, name: impl Into<String>, events: impl PageEvents + 'static) -> Self {
        self.events.insert(name.into(), Arc::new(events));
        self
    }

    pub fn validator(
        mut self,
        name: impl Into<String>,
        validator: impl PageValidator + 'static,
    ) -> Self {
        self.validators.insert(name.into(), Arc::new(validator));
        self
    }

    pub fn validator_fn<F>(self, name: impl Into<String>, validate: F) -> Self
    where
        F: Fn(&HookContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.validator(name, FnValidator(validate))
    }

    pub fn get_events(&self, name: &str) -> Option<&Arc<dyn PageEvents>> {
        self.events.get(name)
    }

    pub fn get_validator(&self, name: &str) -> Option<&Arc<dyn PageValidator>> {
        self.validators.get(name)
    }

    pub fn has_events(&self, name: &str) -> bool {
        self.events.contains_key(name)
    }

    pub fn has_validator(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("event_count", &self.events.len())
            .field("validator_count", &self.validators.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::JsonDataModel;
    use serde_json::json;

    struct Gate;

    impl PageEvents for Gate {
        fn on_next(&self, ctx: &HookContext<'_>) -> HookDecision {
            match ctx.data.get("skip") {
                Some(v) if v == &json!(true) => HookDecision::Redirect("summary".into()),
                _ => HookDecision::Proceed,
            }
        }
    }

    #[test]
    fn test_registry_resolves_by_name() {
        let registry = Registry::new()
            .events("gate", Gate)
            .validator_fn("always", |_| true);

        assert!(registry.has_events("gate"));
        assert!(registry.has_validator("always"));
        assert!(!registry.has_validator("gate"));

        let data = JsonDataModel::new(json!({ "skip": true }));
        let ctx = HookContext {
            section_id: "s1",
            route_id: "r1",
            page_id: "p1",
            data: &data,
            array_index: None,
        };
        let events = registry.get_events("gate").unwrap();
        assert_eq!(events.on_next(&ctx), HookDecision::Redirect("summary".into()));
        assert_eq!(events.on_previous(&ctx), HookDecision::Proceed);
        assert!(registry.get_validator("always").unwrap().validate(&ctx));
    }
}
