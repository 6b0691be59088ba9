//! Queued access to a [`Session`] from async code.
//!
//! One task owns the session; callers talk to it through a cloneable
//! [`SessionHandle`]. Requests are processed strictly in arrival order, each to
//! completion, so two transitions never interleave against the same state.

use crate::session::{Buttons, Session};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use waymark_core::data::DataModel;
use waymark_core::error::{NavigationError, PathError};
use waymark_core::outcome::Outcome;
use waymark_core::state::State;

const QUEUE_DEPTH: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("session actor is closed")]
    Closed,
}

/// Point-in-time copy of what a renderer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub state: State,
    pub page_id: Option<String>,
    pub valid: bool,
    pub buttons: Buttons,
    pub array_index: Option<usize>,
}

enum Command {
    Next {
        response: oneshot::Sender<Result<Outcome, NavigationError>>,
    },
    Prev {
        response: oneshot::Sender<Result<Outcome, NavigationError>>,
    },
    Goto {
        route: String,
        response: oneshot::Sender<Result<Outcome, NavigationError>>,
    },
    SetArrayIndex {
        key: String,
        index: usize,
        response: oneshot::Sender<Result<(), NavigationError>>,
    },
    SetField {
        field: String,
        value: Value,
        response: oneshot::Sender<Result<(), PathError>>,
    },
    ReportValidity {
        control: String,
        valid: bool,
        response: oneshot::Sender<bool>,
    },
    Snapshot {
        response: oneshot::Sender<Snapshot>,
    },
    Shutdown {
        response: oneshot::Sender<State>,
    },
}

/// Handle to a session actor. Clone freely; all clones share one queue.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    /// Move `session` onto its own task. Must be called inside a tokio runtime.
    pub fn spawn<D>(session: Session<D>) -> Self
    where
        D: DataModel + 'static,
    {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        tokio::spawn(run_actor(session, rx));
        Self { tx }
    }

    async fn request<T>(
        &self,
        command: Command,
        response_rx: oneshot::Receiver<T>,
    ) -> Result<T, SessionError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)?;
        response_rx.await.map_err(|_| SessionError::Closed)
    }

    pub async fn next(&self) -> Result<Outcome, SessionError> {
        let (response, rx) = oneshot::channel();
        Ok(self.request(Command::Next { response }, rx).await??)
    }

    pub async fn prev(&self) -> Result<Outcome, SessionError> {
        let (response, rx) = oneshot::channel();
        Ok(self.request(Command::Prev { response }, rx).await??)
    }

    pub async fn goto(&self, route: impl Into<String>) -> Result<Outcome, SessionError> {
        let (response, rx) = oneshot::channel();
        let command = Command::Goto {
            route: route.into(),
            response,
        };
        Ok(self.request(command, rx).await??)
    }

    pub async fn set_array_index(
        &self,
        key: impl Into<String>,
        index: usize,
    ) -> Result<(), SessionError> {
        let (response, rx) = oneshot::channel();
        let command = Command::SetArrayIndex {
            key: key.into(),
            index,
            response,
        };
        Ok(self.request(command, rx).await??)
    }

    pub async fn set_field(
        &self,
        field: impl Into<String>,
        value: Value,
    ) -> Result<(), SessionError> {
        let (response, rx) = oneshot::channel();
        let command = Command::SetField {
            field: field.into(),
            value,
            response,
        };
        Ok(self.request(command, rx).await??)
    }

    pub async fn report_validity(
        &self,
        control: impl Into<String>,
        valid: bool,
    ) -> Result<bool, SessionError> {
        let (response, rx) = oneshot::channel();
        let command = Command::ReportValidity {
            control: control.into(),
            valid,
            response,
        };
        self.request(command, rx).await
    }

    pub async fn snapshot(&self) -> Result<Snapshot, SessionError> {
        let (response, rx) = oneshot::channel();
        self.request(Command::Snapshot { response }, rx).await
    }

    /// Stop the actor after queued requests drain, returning the final state.
    pub async fn shutdown(&self) -> Result<State, SessionError> {
        let (response, rx) = oneshot::channel();
        self.request(Command::Shutdown { response }, rx).await
    }
}

async fn run_actor<D: DataModel>(mut session: Session<D>, mut rx: mpsc::Receiver<Command>) {
    tracing::debug!(session.id = %session.id(), "Session actor started");

    // A dropped receiver only means the caller stopped waiting.
    while let Some(command) = rx.recv().await {
        match command {
            Command::Next { response } => {
                let _ = response.send(session.request_next());
            }
            Command::Prev { response } => {
                let _ = response.send(session.request_prev());
            }
            Command::Goto { route, response } => {
                let _ = response.send(session.request_goto(&route));
            }
            Command::SetArrayIndex {
                key,
                index,
                response,
            } => {
                let _ = response.send(session.request_array_index(&key, index));
            }
            Command::SetField {
                field,
                value,
                response,
            } => {
                let _ = response.send(session.set_field(&field, value));
            }
            Command::ReportValidity {
                control,
                valid,
                response,
            } => {
                let _ = response.send(session.report_validity(&control, valid));
            }
            Command::Snapshot { response } => {
                let page = session.page();
                let snapshot = Snapshot {
                    state: session.state().clone(),
                    page_id: page.as_ref().map(|p| p.control.id.clone()),
                    valid: page.map(|p| p.valid).unwrap_or(true),
                    buttons: session.buttons(),
                    array_index: session.array_index(),
                };
                let _ = response.send(snapshot);
            }
            Command::Shutdown { response } => {
                let _ = response.send(session.state().clone());
                break;
            }
        }
    }

    tracing::debug!(session.id = %session.id(), "Session actor stopped");
}
