//! Waymark Flow - Control Model Builder
//!
//! This crate compiles an authored `Definition` into the navigable
//! `ControlModel`:
//! - `builder`: linking, indexing, and referential validation
//! - `flatten`: content tree -> ordered form controls
//! - `slug`: section and page slugs (authored, else the id)
//!
//! **IMPORTANT**: This layer is Pure Rust - no IO, no Async.

pub mod builder;
pub mod flatten;
pub mod slug;

pub use builder::{build, validate};
pub use flatten::flatten_controls;
pub use slug::resolve_slug;
