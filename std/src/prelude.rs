pub use crate::rules::{evaluate, group_matches, rule_matches};
pub use crate::validators::{check, check_control, is_email};
