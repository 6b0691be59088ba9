//! Control Model - the navigable, id-indexed form of a [`Definition`](crate::definition::Definition).
//!
//! Built once per definition load by `waymark-flow` and shared read-only (behind
//! an `Arc`) between the engine and the session facade. Nothing here is mutated
//! after construction; a changed definition means a new model.

use crate::definition::{
    Content, FormFieldType, Page, PageSettings, RouteNext, Section, SectionSettings, Validators,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ControlModel {
    sections: Vec<SectionControl>,
    section_index: HashMap<String, usize>,
    /// route id -> index of the owning section
    route_index: HashMap<String, usize>,
}

impl ControlModel {
    /// Index already-linked sections. Route ids are expected to be unique across sections.
    pub fn new(sections: Vec<SectionControl>) -> Self {
        let mut section_index = HashMap::with_capacity(sections.len());
        let mut route_index = HashMap::new();
        for (idx, section) in sections.iter().enumerate() {
            section_index.insert(section.id.clone(), idx);
            for route_id in section.routes.keys() {
                route_index.insert(route_id.clone(), idx);
            }
        }
        Self {
            sections,
            section_index,
            route_index,
        }
    }

    pub fn sections(&self) -> &[SectionControl] {
        &self.sections
    }

    pub fn first_section(&self) -> Option<&SectionControl> {
        self.sections.first()
    }

    pub fn section(&self, id: &str) -> Option<&SectionControl> {
        self.section_index.get(id).map(|&idx| &self.sections[idx])
    }

    pub fn section_position(&self, id: &str) -> Option<usize> {
        self.section_index.get(id).copied()
    }

    /// Sections authored before `id`, in order.
    pub fn sections_before(&self, id: &str) -> &[SectionControl] {
        match self.section_position(id) {
            Some(idx) => &self.sections[..idx],
            None => &[],
        }
    }

    pub fn route(&self, id: &str) -> Option<&RouteControl> {
        self.section_of_route(id)
            .and_then(|section| section.routes.get(id))
    }

    pub fn section_of_route(&self, route_id: &str) -> Option<&SectionControl> {
        self.route_index
            .get(route_id)
            .map(|&idx| &self.sections[idx])
    }

    pub fn page_for_route(&self, route_id: &str) -> Option<&PageControl> {
        let section = self.section_of_route(route_id)?;
        let route = section.routes.get(route_id)?;
        section.pages.get(&route.page_id)
    }

    pub fn contains_route(&self, route_id: &str) -> bool {
        self.route_index.contains_key(route_id)
    }

    /// Section repeating over the collection `key`, if any.
    pub fn section_for_array_key(&self, key: &str) -> Option<&SectionControl> {
        self.sections
            .iter()
            .find(|section| section.array_key() == Some(key))
    }
}

#[derive(Debug, Clone)]
pub struct SectionControl {
    pub id: String,
    /// Authored slug, or the `id` itself.
    pub slug: String,
    pub title: String,
    pub route_start: String,
    pub settings: SectionSettings,
    pub data: Option<Value>,
    pub wizard_complete: bool,
    pub section_previous_id: Option<String>,
    pub section_next_id: Option<String>,
    pub routes: HashMap<String, RouteControl>,
    pub pages: HashMap<String, PageControl>,
    /// Route ids in authored order.
    pub route_order: Vec<String>,
    pub src: Arc<Section>,
}

impl SectionControl {
    pub fn array_key(&self) -> Option<&str> {
        self.settings.array_key.as_deref()
    }

    pub fn is_array(&self) -> bool {
        self.settings.array_key.is_some()
    }

    /// Routes in authored order.
    pub fn ordered_routes(&self) -> impl Iterator<Item = &RouteControl> {
        self.route_order.iter().filter_map(|id| self.routes.get(id))
    }
}

#[derive(Debug, Clone)]
pub struct RouteControl {
    pub id: String,
    pub section_id: String,
    pub page_id: String,
    pub next: RouteNext,
}

impl RouteControl {
    pub fn is_section_complete(&self) -> bool {
        matches!(self.next, RouteNext::SectionComplete)
    }

    /// Literal next route id, when the route is static.
    pub fn static_next(&self) -> Option<&str> {
        match &self.next {
            RouteNext::Static(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageControl {
    pub id: String,
    pub slug: String,
    pub title: Option<String>,
    pub settings: PageSettings,
    pub events: Option<String>,
    pub validator: Option<String>,
    pub content: Vec<Content>,
    /// Bound form fields, depth-first left-to-right.
    pub controls: Vec<ControlRef>,
    /// control id -> index into `controls`
    pub controls_by_id: HashMap<String, usize>,
    pub src: Arc<Page>,
}

impl PageControl {
    pub fn control(&self, id: &str) -> Option<&ControlRef> {
        self.controls_by_id.get(id).map(|&idx| &self.controls[idx])
    }

    pub fn has_controls(&self) -> bool {
        !self.controls.is_empty()
    }
}

/// A `formField` leaf flattened out of a page's content tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlRef {
    /// Unique within the page: the field path, suffixed `#n` on repeats.
    pub id: String,
    pub field: String,
    pub form_field_type: FormFieldType,
    pub validators: Validators,
    pub disabled: bool,
    pub hidden: bool,
}
