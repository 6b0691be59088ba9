//! Waymark Core - the data side of a guided wizard.
//!
//! This crate defines the **shapes** every other crate agrees on:
//! - `Definition`: the wizard as authored (sections, routes, pages, content)
//! - `ControlModel`: the compiled, id-indexed form the engine navigates
//! - `State`: the mutable, serializable record of one session
//! - `Outcome` / `NavigationError`: what a transition returns
//!
//! No IO and no async live here.

pub mod control;
pub mod data;
pub mod definition;
pub mod error;
pub mod hooks;
pub mod options;
pub mod outcome;
pub mod rule;
pub mod schematic;
pub mod state;
pub mod timeline;

pub use control::{ControlModel, ControlRef, PageControl, RouteControl, SectionControl};
pub use data::{DataModel, JsonDataModel, resolve_field};
pub use definition::{Content, Definition, Page, Route, RouteNext, Section};
pub use error::{
    DefinitionError, FailureKind, NavigationError, NoMatchingRuleError, PathError, StateError,
    ValidationError, ValidationFailure, Violation,
};
pub use hooks::{HookContext, HookDecision, PageEvents, PageValidator, Registry};
pub use options::EngineOptions;
pub use outcome::Outcome;
pub use rule::{Combinator, Operator, Rule, RuleGroup, RuleNode};
pub use schematic::Schematic;
pub use state::{SectionStatus, State};
pub use timeline::{Timeline, TimelineEvent, TransitionKind};

pub mod prelude {
    pub use crate::control::{ControlModel, PageControl, SectionControl};
    pub use crate::data::{DataModel, JsonDataModel};
    pub use crate::definition::Definition;
    pub use crate::error::{DefinitionError, NavigationError};
    pub use crate::hooks::{HookContext, HookDecision, PageEvents, Registry};
    pub use crate::options::EngineOptions;
    pub use crate::outcome::Outcome;
    pub use crate::state::State;
}
