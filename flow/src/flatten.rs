//! Content tree flattening.
//!
//! Pages nest `row -> column -> content` arbitrarily deep. The engine only cares
//! about the `formField` leaves, in reading order, so the tree is walked once at
//! build time with an explicit stack rather than recursion.

use std::collections::HashMap;
use waymark_core::definition::Content;
use waymark_core::ControlRef;

/// Collect `formField` leaves depth-first, left-to-right.
pub fn flatten_controls(content: &[Content]) -> Vec<ControlRef> {
    let mut controls = Vec::new();
    let mut seen: HashMap<&str, usize> = HashMap::new();
    // Each entry carries whether an enclosing row is hidden.
    let mut stack: Vec<(&Content, bool)> = content.iter().rev().map(|c| (c, false)).collect();

    while let Some((node, inherited)) = stack.pop() {
        match node {
            Content::FormField(field) => {
                let count = seen.entry(field.field.as_str()).or_insert(0);
                *count += 1;
                let id = if *count == 1 {
                    field.field.clone()
                } else {
                    format!("{}#{}", field.field, count)
                };
                controls.push(ControlRef {
                    id,
                    field: field.field.clone(),
                    form_field_type: field.form_field_type,
                    validators: field.validators.clone().unwrap_or_default(),
                    disabled: field.disabled,
                    hidden: inherited || field.common.hidden.is_hidden(),
                });
            }
            Content::Row(row) => {
                let hidden = inherited || row.common.hidden.is_hidden();
                for column in row.columns.iter().rev() {
                    stack.extend(column.content.iter().rev().map(|c| (c, hidden)));
                }
            }
            Content::Html(_) | Content::Feature(_) => {}
        }
    }

    controls
}

/// Index controls by id.
pub fn index_controls(controls: &[ControlRef]) -> HashMap<String, usize> {
    controls
        .iter()
        .enumerate()
        .map(|(idx, control)| (control.id.clone(), idx))
        .collect()
}
