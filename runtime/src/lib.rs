//! Waymark Runtime - running wizards.
//!
//! - `engine`: the navigation state machine over a shared `ControlModel`
//! - `session`: renderer-facing projection plus request methods
//! - `actor`: tokio task that serializes requests for one session
//! - `store`: `State` persistence (memory, JSON files)

pub mod actor;
pub mod engine;
pub mod session;
pub mod store;

pub mod prelude {
    pub use crate::actor::{SessionError, SessionHandle, Snapshot};
    pub use crate::engine::{Clock, Engine};
    pub use crate::session::{Buttons, PageView, Session};
    pub use crate::store::{FileStateStore, MemoryStateStore, StateStore, StoreError, open_engine};
}

pub use actor::{SessionError, SessionHandle, Snapshot};
pub use engine::{Clock, Engine};
pub use session::{Buttons, PageView, Session};
pub use store::{FileStateStore, MemoryStateStore, StateStore, StoreError, open_engine};
