use serde::{Deserialize, Serialize};

/// The explicit result of a successful transition.
///
/// `Outcome` is "control flow as data": the engine never signals a section
/// change or wizard completion through side channels, it returns one of these.
/// Failed transitions are `Err(NavigationError)` and leave state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Outcome {
    /// Moved to another route within the same section.
    Route { from: String, to: String },
    /// Left one section and entered another at `route`.
    Section {
        from: String,
        to: String,
        route: String,
    },
    /// Restarted a repeating section for its next item.
    Iteration { section: String, index: usize },
    /// The terminal section was completed; the wizard is done.
    Complete { section: String },
    /// A page hook cancelled the transition.
    Vetoed,
    /// Nothing to do (e.g. `prev` on the very first route).
    Stay,
}

impl Outcome {
    /// Whether the active route changed.
    pub fn moved(&self) -> bool {
        matches!(
            self,
            Outcome::Route { .. } | Outcome::Section { .. } | Outcome::Iteration { .. }
        )
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Outcome::Complete { .. })
    }

    /// Short label used in logs and the timeline.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Route { .. } => "route",
            Outcome::Section { .. } => "section",
            Outcome::Iteration { .. } => "iteration",
            Outcome::Complete { .. } => "complete",
            Outcome::Vetoed => "vetoed",
            Outcome::Stay => "stay",
        }
    }
}
