use crate::control::ControlModel;
use crate::definition::RouteNext;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// The static analysis view of a wizard.
///
/// `Schematic` is the route graph extracted from a [`ControlModel`]. It is used
/// for visualization, documentation, and reachability checks; the engine
/// never reads it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Schematic {
    pub name: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Schematic {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn from_model(name: impl Into<String>, model: &ControlModel) -> Self {
        let mut schematic = Schematic::new(name);

        for section in model.sections() {
            for route in section.ordered_routes() {
                let kind = match &route.next {
                    RouteNext::SectionComplete => NodeKind::Terminal,
                    RouteNext::Dynamic(_) => NodeKind::Branch,
                    RouteNext::Static(_) if route.id == section.route_start => NodeKind::Start,
                    RouteNext::Static(_) => NodeKind::Step,
                };
                schematic.nodes.push(Node {
                    id: route.id.clone(),
                    kind,
                    section: section.id.clone(),
                    page: route.page_id.clone(),
                    label: section
                        .pages
                        .get(&route.page_id)
                        .and_then(|p| p.title.clone())
                        .unwrap_or_else(|| route.page_id.clone()),
                });

                match &route.next {
                    RouteNext::Static(target) => schematic.edges.push(Edge {
                        from: route.id.clone(),
                        to: target.clone(),
                        kind: EdgeType::Linear,
                        label: None,
                    }),
                    RouteNext::Dynamic(groups) => {
                        for (idx, group) in groups.iter().enumerate() {
                            let label = if group.default {
                                "default".to_string()
                            } else {
                                format!("rule {}", idx + 1)
                            };
                            schematic.edges.push(Edge {
                                from: route.id.clone(),
                                to: group.route_next.clone(),
                                kind: EdgeType::Branch,
                                label: Some(label),
                            });
                        }
                    }
                    RouteNext::SectionComplete => {
                        if section.is_array() {
                            schematic.edges.push(Edge {
                                from: route.id.clone(),
                                to: section.route_start.clone(),
                                kind: EdgeType::Iteration,
                                label: section.array_key().map(str::to_string),
                            });
                        }
                        let next = section
                            .section_next_id
                            .as_deref()
                            .and_then(|id| model.section(id));
                        if let (false, Some(next)) = (section.wizard_complete, next) {
                            schematic.edges.push(Edge {
                                from: route.id.clone(),
                                to: next.route_start.clone(),
                                kind: EdgeType::Section,
                                label: Some(next.id.clone()),
                            });
                        }
                    }
                }
            }
        }

        schematic
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.from == id)
    }

    /// Nodes no edge path from `start` reaches. Such routes are only
    /// enterable through `goto`.
    pub fn unreachable_from(&self, start: &str) -> Vec<&Node> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([start]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            queue.extend(self.edges_from(id).map(|e| e.to.as_str()));
        }
        self.nodes
            .iter()
            .filter(|n| !seen.contains(n.id.as_str()))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub section: String,
    pub page: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Start,    // routeStart of a section
    Step,     // static routeNext
    Branch,   // rule-driven routeNext
    Terminal, // sectionComplete
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeType {
    Linear,
    Branch,
    Section,
    Iteration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub kind: EdgeType,
    pub label: Option<String>, // e.g. "rule 2", "default", next section id
}
