//! Waymark facade crate.
//!
//! Re-exports the core, flow, runtime and rule/validator (`stdlib`) crates
//! behind one entry point, plus [`load`] for the common "JSON in, control
//! model out" step.

pub use waymark_core as core;
pub use waymark_flow as flow;
#[cfg(feature = "runtime")]
pub use waymark_runtime as runtime;
pub use waymark_std as stdlib;

pub use waymark_core::{
    ControlModel, Definition, EngineOptions, NavigationError, Outcome, Registry, Schematic, State,
};
#[cfg(feature = "runtime")]
pub use waymark_runtime::{Engine, Session, SessionHandle};

use std::sync::Arc;
use thiserror::Error;
use waymark_core::error::DefinitionError;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("wizard definition is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

/// Parse a JSON definition and build its shared control model.
pub fn load(json: &str, registry: &Registry) -> Result<Arc<ControlModel>, LoadError> {
    let definition = Definition::from_json(json)?;
    Ok(Arc::new(waymark_flow::build(&definition, registry)?))
}

pub mod prelude {
    pub use crate::{LoadError, load};
    pub use waymark_core::prelude::*;
    pub use waymark_flow::build;
    #[cfg(feature = "runtime")]
    pub use waymark_runtime::prelude::*;
    pub use waymark_std::prelude::*;
}
