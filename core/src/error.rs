use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid data path '{0}'")]
    Invalid(String),
    #[error("data path '{0}' has an unresolved array index")]
    Unresolved(String),
    #[error("data path '{path}' writes item {index} of a {len}-item list")]
    OutOfRange {
        path: String,
        index: usize,
        len: usize,
    },
}

/// One referential-integrity problem found while building a control model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("definition has no sections")]
    NoSections,
    #[error("duplicate section id '{0}'")]
    DuplicateSection(String),
    #[error("duplicate route id '{route}' in section '{section}'")]
    DuplicateRoute { section: String, route: String },
    #[error("duplicate page id '{page}' in section '{section}'")]
    DuplicatePage { section: String, page: String },
    #[error("section '{section}' starts at unknown route '{route}'")]
    UnknownRouteStart { section: String, route: String },
    #[error("route '{route}' in section '{section}' shows unknown page '{page}'")]
    UnknownPage {
        section: String,
        route: String,
        page: String,
    },
    #[error("route '{route}' in section '{section}' leads to unknown route '{target}'")]
    UnknownRouteNext {
        section: String,
        route: String,
        target: String,
    },
    #[error("route '{route}' has a default rule group that is not the last group")]
    MisplacedDefaultGroup { route: String },
    #[error("route '{route}' has an empty rule group list")]
    EmptyRuleGroups { route: String },
    #[error("page '{page}' uses unregistered events '{name}'")]
    UnknownEvents { page: String, name: String },
    #[error("page '{page}' uses unregistered validator '{name}'")]
    UnknownValidator { page: String, name: String },
    #[error("sections '{first}' and '{second}' share slug '{slug}'")]
    DuplicateSectionSlug {
        slug: String,
        first: String,
        second: String,
    },
    #[error("pages '{first}' and '{second}' in section '{section}' share slug '{slug}'")]
    DuplicatePageSlug {
        section: String,
        slug: String,
        first: String,
        second: String,
    },
    #[error("section '{section}' has an empty arrayKey")]
    EmptyArrayKey { section: String },
    #[error("array key '{key}' is repeated by sections '{first}' and '{second}'")]
    SharedArrayKey {
        key: String,
        first: String,
        second: String,
    },
}

/// Build-time failure listing every violation found. Fatal: the wizard never starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid wizard definition ({} problem(s)): {}", .violations.len(), join(.violations))]
pub struct DefinitionError {
    pub violations: Vec<Violation>,
}

/// A supplied runtime state does not fit the control model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("state does not match the wizard ({} problem(s)): {}", .violations.len(), .violations.join("; "))]
pub struct StateError {
    pub violations: Vec<String>,
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// No rule group matched and none was marked default.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no rule group matched among {groups} group(s)")]
pub struct NoMatchingRuleError {
    pub groups: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Required,
    MinLength(usize),
    MaxLength(usize),
    Email,
    /// The renderer reported the control invalid.
    Reported,
    /// The page's custom validator rejected the page.
    Validator(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub control: String,
    pub kind: FailureKind,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Required => write!(f, "is required"),
            FailureKind::MinLength(n) => write!(f, "is shorter than {n}"),
            FailureKind::MaxLength(n) => write!(f, "is longer than {n}"),
            FailureKind::Email => write!(f, "is not an email address"),
            FailureKind::Reported => write!(f, "was reported invalid"),
            FailureKind::Validator(name) => write!(f, "rejected by validator '{name}'"),
        }
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.control, self.kind)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("page '{page}' is invalid ({} failure(s))", .failures.len())]
pub struct ValidationError {
    pub page: String,
    pub failures: Vec<ValidationFailure>,
}

/// Transition-time failures. State is untouched whenever one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("route '{route}' found no branch: {source}")]
    NoMatchingRule {
        route: String,
        #[source]
        source: NoMatchingRuleError,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("section '{section}' requires earlier sections to be completed: {}", .incomplete.join(", "))]
    NavigationBlocked {
        section: String,
        incomplete: Vec<String>,
    },
    #[error("wizard is already complete")]
    WizardComplete,
    #[error("unknown route '{0}'")]
    UnknownRoute(String),
    #[error("no repeating section uses array key '{0}'")]
    UnknownArrayKey(String),
}
