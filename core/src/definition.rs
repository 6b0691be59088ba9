//! Definition Model - the wizard as authored.
//!
//! These types deserialize the nested JSON an author writes (sections, routes,
//! pages, content trees). They are never mutated; the builder in `waymark-flow`
//! compiles them into a [`ControlModel`](crate::control::ControlModel).

use crate::rule::RuleGroup;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The complete authored wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(from = "DefinitionSrc")]
pub struct Definition {
    pub sections: Vec<Section>,
}

impl Definition {
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Accepts either `{ "sections": [...] }` or a bare array of sections.
#[derive(Deserialize)]
#[serde(untagged)]
enum DefinitionSrc {
    Wrapped { sections: Vec<Section> },
    Bare(Vec<Section>),
}

impl From<DefinitionSrc> for Definition {
    fn from(src: DefinitionSrc) -> Self {
        match src {
            DefinitionSrc::Wrapped { sections } | DefinitionSrc::Bare(sections) => {
                Definition { sections }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub title: String,
    pub route_start: String,
    #[serde(default)]
    pub settings: SectionSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Completing this section completes the whole wizard.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub wizard_complete: bool,
    pub routes: Vec<Route>,
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SectionSettings {
    /// All earlier sections must be completed before this one can be entered by `goto`.
    #[serde(default)]
    pub previous_required: bool,
    /// Collection in the data model this section repeats over, one pass per item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_key: Option<String>,
}

/// Where a route leads once its page is done.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteNext {
    /// Literal id of the next route.
    Static(String),
    /// Rule groups evaluated against the data model.
    Dynamic(Vec<RuleGroup>),
    /// Terminal route of its section.
    SectionComplete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RouteSrc", into = "RouteSrc")]
pub struct Route {
    pub id: String,
    pub page_id: String,
    pub next: RouteNext,
}

/// Wire shape of a route: exactly one of `routeNext` / `sectionComplete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteSrc {
    id: String,
    page_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    route_next: Option<RouteNextSrc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    section_complete: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RouteNextSrc {
    Static(String),
    Dynamic(Vec<RuleGroup>),
}

impl TryFrom<RouteSrc> for Route {
    type Error = String;

    fn try_from(src: RouteSrc) -> Result<Self, Self::Error> {
        let next = match (src.route_next, src.section_complete.unwrap_or(false)) {
            (Some(_), true) => {
                return Err(format!(
                    "route '{}' sets both routeNext and sectionComplete",
                    src.id
                ));
            }
            (None, false) => {
                return Err(format!(
                    "route '{}' needs either routeNext or sectionComplete",
                    src.id
                ));
            }
            (Some(RouteNextSrc::Static(id)), false) => RouteNext::Static(id),
            (Some(RouteNextSrc::Dynamic(groups)), false) => RouteNext::Dynamic(groups),
            (None, true) => RouteNext::SectionComplete,
        };
        Ok(Route {
            id: src.id,
            page_id: src.page_id,
            next,
        })
    }
}

impl From<Route> for RouteSrc {
    fn from(route: Route) -> Self {
        let (route_next, section_complete) = match route.next {
            RouteNext::Static(id) => (Some(RouteNextSrc::Static(id)), None),
            RouteNext::Dynamic(groups) => (Some(RouteNextSrc::Dynamic(groups)), None),
            RouteNext::SectionComplete => (None, Some(true)),
        };
        RouteSrc {
            id: route.id,
            page_id: route.page_id,
            route_next,
            section_complete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default)]
    pub settings: PageSettings,
    /// Name of a registered [`PageEvents`](crate::hooks::PageEvents) implementation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<String>,
    /// Name of a registered [`PageValidator`](crate::hooks::PageValidator).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
    #[serde(default)]
    pub content: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_short: Option<String>,
    /// Whether the renderer shows the title; it is still used for analytics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_show: Option<bool>,
    /// Id of an element on the page that describes it (`aria-describedby`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria_described_by_id: Option<String>,
    /// Data transformations or parent actions, passed through to the renderer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Value>,
    /// Legacy spelling of `settings.backButtonVisible`; the setting wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_button_back: Option<bool>,
    /// Legacy spelling of `settings.nextButtonVisible`; the setting wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_button_next: Option<bool>,
}

impl Page {
    pub fn back_button_visible(&self) -> Option<bool> {
        self.settings.back_button_visible.or(self.show_button_back)
    }

    pub fn next_button_visible(&self) -> Option<bool> {
        self.settings.next_button_visible.or(self.show_button_next)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageSettings {
    #[serde(default)]
    pub full_screen: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_button_visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_button_visible: Option<bool>,
    #[serde(default)]
    pub can_save: bool,
}

/// Content tree node. The tag set is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Content {
    Html(Html),
    Feature(Feature),
    Row(Row),
    FormField(FormField),
}

impl Content {
    pub fn common(&self) -> &ContentCommon {
        match self {
            Content::Html(html) => &html.common,
            Content::Feature(feature) => &feature.common,
            Content::Row(row) => &row.common,
            Content::FormField(field) => &field.common,
        }
    }
}

/// Attributes shared by every content node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContentCommon {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<String>,
    #[serde(default, skip_serializing_if = "Hidden::is_default")]
    pub hidden: Hidden,
}

/// `hidden` is either a flag or a list of conditions kept for the renderer.
///
/// The engine treats a non-empty condition list as hidden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Hidden {
    Flag(bool),
    Conditions(Vec<Value>),
}

impl Default for Hidden {
    fn default() -> Self {
        Hidden::Flag(false)
    }
}

impl Hidden {
    pub fn is_hidden(&self) -> bool {
        match self {
            Hidden::Flag(hidden) => *hidden,
            Hidden::Conditions(conditions) => !conditions.is_empty(),
        }
    }

    fn is_default(&self) -> bool {
        *self == Hidden::Flag(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Html {
    pub html: String,
    #[serde(flatten)]
    pub common: ContentCommon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub feature_id: String,
    #[serde(flatten)]
    pub common: ContentCommon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub columns: Vec<Column>,
    #[serde(flatten)]
    pub common: ContentCommon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    #[serde(default)]
    pub column_size: u32,
    #[serde(default)]
    pub content: Vec<Content>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    /// Field or path in the external data model. `key[]` binds to the current array item.
    pub field: String,
    pub form_field_type: FormFieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Input attribute for the renderer; validation uses `validators.minLength`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minlength: Option<usize>,
    /// Input attribute for the renderer; validation uses `validators.maxLength`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxlength: Option<usize>,
    /// Fixed options for selects and button groups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_field_data: Option<Vec<Value>>,
    /// Options for selects and button groups, read from this data-model field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_field: Option<String>,
    /// Display format handed to the control's pipe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validators: Option<Validators>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(flatten)]
    pub common: ContentCommon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormFieldType {
    Text,
    Number,
    Select,
    Textarea,
    Checkbox,
    ButtonGroup,
    Toggle,
    IconGroup,
    Currency,
    PhoneNumber,
    Email,
    Date,
    AutoComplete,
    Ssn,
    AutoCompleteAddress,
    MapAutoCompleteCity,
    MapAutoCompleteZip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Validators {
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub email: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_route_requires_exactly_one_target() {
        let both = json!({ "id": "r1", "pageId": "p1", "routeNext": "r2", "sectionComplete": true });
        let neither = json!({ "id": "r1", "pageId": "p1" });
        assert!(serde_json::from_value::<Route>(both).is_err());
        assert!(serde_json::from_value::<Route>(neither).is_err());

        let terminal: Route =
            serde_json::from_value(json!({ "id": "r2", "pageId": "p2", "sectionComplete": true }))
                .unwrap();
        assert_eq!(terminal.next, RouteNext::SectionComplete);
    }

    #[test]
    fn test_route_next_static_or_dynamic() {
        let linear: Route =
            serde_json::from_value(json!({ "id": "r1", "pageId": "p1", "routeNext": "r2" }))
                .unwrap();
        assert_eq!(linear.next, RouteNext::Static("r2".into()));

        let branching: Route = serde_json::from_value(json!({
            "id": "r1",
            "pageId": "p1",
            "routeNext": [{ "rules": [], "routeNext": "r2", "default": true }]
        }))
        .unwrap();
        assert!(matches!(branching.next, RouteNext::Dynamic(ref groups) if groups.len() == 1));
    }

    #[test]
    fn test_content_tree_nests_rows() {
        let content: Content = serde_json::from_value(json!({
            "type": "row",
            "columns": [{
                "columnSize": 6,
                "content": [
                    { "type": "html", "html": "<p>Hi</p>" },
                    { "type": "formField", "field": "email", "formFieldType": "email",
                      "validators": { "required": true, "email": true } }
                ]
            }]
        }))
        .unwrap();

        let Content::Row(row) = content else {
            panic!("expected row");
        };
        assert_eq!(row.columns[0].content.len(), 2);
        assert!(matches!(row.columns[0].content[1], Content::FormField(ref f) if f.field == "email"));
    }

    #[test]
    fn test_definition_accepts_bare_array() {
        let bare = json!([{
            "id": "s1", "title": "One", "routeStart": "r1",
            "routes": [{ "id": "r1", "pageId": "p1", "sectionComplete": true }],
            "pages": [{ "id": "p1", "content": [] }]
        }]);
        let definition: Definition = serde_json::from_value(bare).unwrap();
        assert_eq!(definition.sections.len(), 1);
        assert!(!definition.sections[0].settings.previous_required);
    }

    #[test]
    fn test_renderer_fields_survive_a_round_trip() {
        let page: Page = serde_json::from_value(json!({
            "id": "income",
            "titleShort": "Income",
            "titleShow": false,
            "ariaDescribedById": "income-help",
            "actions": [{ "type": "copy", "from": "a", "to": "b" }],
            "showButtonBack": false,
            "settings": { "nextButtonVisible": true },
            "showButtonNext": false,
            "content": [
                { "type": "formField", "field": "salary", "formFieldType": "currency",
                  "tooltip": "Before tax", "prefix": "$", "suffix": "/yr",
                  "minlength": 1, "maxlength": 9, "format": "1.0-0" },
                { "type": "formField", "field": "frequency", "formFieldType": "select",
                  "formFieldData": [{ "label": "Monthly", "value": 12 }],
                  "dataField": "frequencies", "hidden": [] }
            ]
        }))
        .unwrap();

        assert_eq!(page.title_short.as_deref(), Some("Income"));
        assert_eq!(page.back_button_visible(), Some(false));
        assert_eq!(page.next_button_visible(), Some(true));

        let Content::FormField(salary) = &page.content[0] else {
            panic!("expected formField");
        };
        assert_eq!(salary.prefix.as_deref(), Some("$"));
        assert_eq!(salary.maxlength, Some(9));
        let Content::FormField(frequency) = &page.content[1] else {
            panic!("expected formField");
        };
        assert_eq!(frequency.common.hidden, Hidden::Conditions(vec![]));
        assert!(!frequency.common.hidden.is_hidden());

        let back: Page = serde_json::from_value(serde_json::to_value(&page).unwrap()).unwrap();
        assert_eq!(back, page);
    }

    #[test]
    fn test_hidden_accepts_flag_or_conditions() {
        let common: ContentCommon = serde_json::from_value(json!({ "hidden": true })).unwrap();
        assert!(common.hidden.is_hidden());
        let common: ContentCommon =
            serde_json::from_value(json!({ "hidden": [{ "field": "x" }] })).unwrap();
        assert!(common.hidden.is_hidden());
        let common: ContentCommon = serde_json::from_value(json!({})).unwrap();
        assert_eq!(common.hidden, Hidden::Flag(false));
    }
}
