//! Waymark Std - standard evaluation library.
//!
//! - `rules`: the branch Rule Evaluator used for dynamic routes
//! - `validators`: built-in `formField` validators

pub mod prelude;
pub mod rules;
pub mod validators;

pub use rules::evaluate;
pub use validators::{check, check_control};
