//! Control Model Builder.
//!
//! Compiles an authored [`Definition`] into a [`ControlModel`]: resolves slugs,
//! links sections in order, indexes routes and pages, flattens page content into
//! controls, and checks referential integrity. Every problem found is reported
//! at once in a single [`DefinitionError`].

use crate::flatten::{flatten_controls, index_controls};
use crate::slug::resolve_slug;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use waymark_core::definition::{Definition, PageSettings, RouteNext, Section};
use waymark_core::error::{DefinitionError, Violation};
use waymark_core::hooks::Registry;
use waymark_core::{ControlModel, PageControl, RouteControl, SectionControl};

/// Build a control model, or fail with every violation found.
pub fn build(definition: &Definition, registry: &Registry) -> Result<ControlModel, DefinitionError> {
    let violations = validate(definition, registry);
    if !violations.is_empty() {
        tracing::warn!(count = violations.len(), "Wizard definition rejected");
        return Err(DefinitionError { violations });
    }

    let sections = &definition.sections;
    let controls = sections
        .iter()
        .enumerate()
        .map(|(idx, section)| {
            let previous = idx
                .checked_sub(1)
                .and_then(|p| sections.get(p))
                .map(|s| s.id.clone());
            let next = sections.get(idx + 1).map(|s| s.id.clone());
            compile_section(section, previous, next)
        })
        .collect::<Vec<_>>();

    let model = ControlModel::new(controls);
    tracing::info!(
        sections = model.sections().len(),
        routes = model.sections().iter().map(|s| s.routes.len()).sum::<usize>(),
        "Control model built"
    );
    Ok(model)
}

fn compile_section(
    section: &Section,
    section_previous_id: Option<String>,
    section_next_id: Option<String>,
) -> SectionControl {
    let routes = section
        .routes
        .iter()
        .map(|route| {
            (
                route.id.clone(),
                RouteControl {
                    id: route.id.clone(),
                    section_id: section.id.clone(),
                    page_id: route.page_id.clone(),
                    next: route.next.clone(),
                },
            )
        })
        .collect::<HashMap<_, _>>();

    let pages = section
        .pages
        .iter()
        .map(|page| {
            let controls = flatten_controls(&page.content);
            let controls_by_id = index_controls(&controls);
            (
                page.id.clone(),
                PageControl {
                    id: page.id.clone(),
                    slug: resolve_slug(page.slug.as_deref(), &page.id),
                    title: page.title.clone(),
                    settings: PageSettings {
                        back_button_visible: page.back_button_visible(),
                        next_button_visible: page.next_button_visible(),
                        ..page.settings.clone()
                    },
                    events: page.events.clone(),
                    validator: page.validator.clone(),
                    content: page.content.clone(),
                    controls,
                    controls_by_id,
                    src: Arc::new(page.clone()),
                },
            )
        })
        .collect::<HashMap<_, _>>();

    tracing::debug!(
        section = %section.id,
        routes = routes.len(),
        pages = pages.len(),
        "Section compiled"
    );

    SectionControl {
        id: section.id.clone(),
        slug: resolve_slug(section.slug.as_deref(), &section.id),
        title: section.title.clone(),
        route_start: section.route_start.clone(),
        settings: section.settings.clone(),
        data: section.data.clone(),
        wizard_complete: section.wizard_complete,
        section_previous_id,
        section_next_id,
        routes,
        pages,
        route_order: section.routes.iter().map(|r| r.id.clone()).collect(),
        src: Arc::new(section.clone()),
    }
}

/// Collect every referential-integrity problem in `definition`.
pub fn validate(definition: &Definition, registry: &Registry) -> Vec<Violation> {
    let mut violations = Vec::new();
    if definition.sections.is_empty() {
        violations.push(Violation::NoSections);
        return violations;
    }

    let mut section_ids = HashSet::new();
    let mut route_ids = HashSet::new();
    let mut array_keys: HashMap<&str, &str> = HashMap::new();
    let mut section_slugs: HashMap<String, &str> = HashMap::new();

    for section in &definition.sections {
        if !section_ids.insert(section.id.as_str()) {
            violations.push(Violation::DuplicateSection(section.id.clone()));
        }

        // A repeated id is already reported; only distinct ids can clash on slug.
        let slug = resolve_slug(section.slug.as_deref(), &section.id);
        match section_slugs.get(&slug) {
            Some(&first) if first != section.id => {
                violations.push(Violation::DuplicateSectionSlug {
                    slug,
                    first: first.to_string(),
                    second: section.id.clone(),
                });
            }
            Some(_) => {}
            None => {
                section_slugs.insert(slug, section.id.as_str());
            }
        }

        if let Some(key) = section.settings.array_key.as_deref() {
            if key.trim().is_empty() {
                violations.push(Violation::EmptyArrayKey {
                    section: section.id.clone(),
                });
            } else if let Some(first) = array_keys.insert(key, section.id.as_str()) {
                violations.push(Violation::SharedArrayKey {
                    key: key.to_string(),
                    first: first.to_string(),
                    second: section.id.clone(),
                });
            }
        }

        let mut page_ids = HashSet::new();
        let mut page_slugs: HashMap<String, &str> = HashMap::new();
        for page in &section.pages {
            if !page_ids.insert(page.id.as_str()) {
                violations.push(Violation::DuplicatePage {
                    section: section.id.clone(),
                    page: page.id.clone(),
                });
            }
            let slug = resolve_slug(page.slug.as_deref(), &page.id);
            match page_slugs.get(&slug) {
                Some(&first) if first != page.id => {
                    violations.push(Violation::DuplicatePageSlug {
                        section: section.id.clone(),
                        slug,
                        first: first.to_string(),
                        second: page.id.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    page_slugs.insert(slug, page.id.as_str());
                }
            }
            if let Some(name) = &page.events {
                if !registry.has_events(name) {
                    violations.push(Violation::UnknownEvents {
                        page: page.id.clone(),
                        name: name.clone(),
                    });
                }
            }
            if let Some(name) = &page.validator {
                if !registry.has_validator(name) {
                    violations.push(Violation::UnknownValidator {
                        page: page.id.clone(),
                        name: name.clone(),
                    });
                }
            }
        }

        let local_routes: HashSet<&str> = section.routes.iter().map(|r| r.id.as_str()).collect();
        for route in &section.routes {
            // Route ids are global: goto and resume address a route without its section.
            if !route_ids.insert(route.id.as_str()) {
                violations.push(Violation::DuplicateRoute {
                    section: section.id.clone(),
                    route: route.id.clone(),
                });
            }
            if !page_ids.contains(route.page_id.as_str()) {
                violations.push(Violation::UnknownPage {
                    section: section.id.clone(),
                    route: route.id.clone(),
                    page: route.page_id.clone(),
                });
            }

            let unknown_target = |target: &str| Violation::UnknownRouteNext {
                section: section.id.clone(),
                route: route.id.clone(),
                target: target.to_string(),
            };
            match &route.next {
                RouteNext::Static(target) => {
                    if !local_routes.contains(target.as_str()) {
                        violations.push(unknown_target(target));
                    }
                }
                RouteNext::Dynamic(groups) => {
                    if groups.is_empty() {
                        violations.push(Violation::EmptyRuleGroups {
                            route: route.id.clone(),
                        });
                    }
                    let defaults = groups.iter().filter(|g| g.default).count();
                    let last_is_default = groups.last().map(|g| g.default).unwrap_or(false);
                    if defaults > 1 || (defaults == 1 && !last_is_default) {
                        violations.push(Violation::MisplacedDefaultGroup {
                            route: route.id.clone(),
                        });
                    }
                    for group in groups {
                        if !local_routes.contains(group.route_next.as_str()) {
                            violations.push(unknown_target(&group.route_next));
                        }
                    }
                }
                RouteNext::SectionComplete => {}
            }
        }

        if !local_routes.contains(section.route_start.as_str()) {
            violations.push(Violation::UnknownRouteStart {
                section: section.id.clone(),
                route: section.route_start.clone(),
            });
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use waymark_core::Schematic;
    use waymark_core::schematic::{EdgeType, NodeKind};

    fn definition(value: serde_json::Value) -> Definition {
        serde_json::from_value(value).unwrap()
    }

    fn two_sections() -> Definition {
        definition(json!({ "sections": [
            {
                "id": "S1", "title": "About you", "routeStart": "r1",
                "routes": [
                    { "id": "r1", "pageId": "p1", "routeNext": "r2" },
                    { "id": "r2", "pageId": "p2", "sectionComplete": true }
                ],
                "pages": [
                    { "id": "p1", "title": "Name", "content": [
                        { "type": "formField", "field": "name", "formFieldType": "text" }
                    ]},
                    { "id": "p2", "slug": "contact", "content": [] }
                ]
            },
            {
                "id": "S2", "slug": "wrap-up", "title": "Done", "routeStart": "r3",
                "wizardComplete": true,
                "routes": [{ "id": "r3", "pageId": "p3", "sectionComplete": true }],
                "pages": [{ "id": "p3", "content": [] }]
            }
        ]}))
    }

    #[test]
    fn test_build_links_and_indexes_sections() {
        let model = build(&two_sections(), &Registry::new()).unwrap();

        let s1 = model.section("S1").unwrap();
        let s2 = model.section("S2").unwrap();
        assert_eq!(s1.slug, "S1");
        assert_eq!(s2.slug, "wrap-up");
        assert_eq!(s1.section_previous_id, None);
        assert_eq!(s1.section_next_id.as_deref(), Some("S2"));
        assert_eq!(s2.section_previous_id.as_deref(), Some("S1"));
        assert_eq!(s2.section_next_id, None);

        assert_eq!(model.section_of_route("r3").unwrap().id, "S2");
        assert_eq!(model.route("r1").unwrap().static_next(), Some("r2"));
        assert!(model.route("r2").unwrap().is_section_complete());
        assert_eq!(model.page_for_route("r1").unwrap().controls.len(), 1);
        assert_eq!(s1.pages["p2"].slug, "contact");
        assert_eq!(s1.src.title, "About you");
    }

    #[test]
    fn test_every_violation_is_reported() {
        let broken = definition(json!([
            {
                "id": "S1", "title": "One", "routeStart": "nowhere",
                "routes": [
                    { "id": "r1", "pageId": "missing-page", "routeNext": "r9" },
                    { "id": "r2", "pageId": "p1", "routeNext": [
                        { "default": true, "routeNext": "r1" },
                        { "rules": [], "routeNext": "ghost" }
                    ]}
                ],
                "pages": [{ "id": "p1", "events": "unregistered", "content": [] }]
            },
            {
                "id": "S1", "title": "Dup", "routeStart": "r1",
                "routes": [{ "id": "r1", "pageId": "p1", "sectionComplete": true }],
                "pages": [{ "id": "p1", "content": [] }]
            }
        ]));

        let err = build(&broken, &Registry::new()).unwrap_err();
        let v = &err.violations;
        assert!(v.contains(&Violation::UnknownRouteStart {
            section: "S1".into(),
            route: "nowhere".into()
        }));
        assert!(v.contains(&Violation::UnknownPage {
            section: "S1".into(),
            route: "r1".into(),
            page: "missing-page".into()
        }));
        assert!(v.contains(&Violation::UnknownRouteNext {
            section: "S1".into(),
            route: "r1".into(),
            target: "r9".into()
        }));
        assert!(v.contains(&Violation::UnknownRouteNext {
            section: "S1".into(),
            route: "r2".into(),
            target: "ghost".into()
        }));
        assert!(v.contains(&Violation::MisplacedDefaultGroup { route: "r2".into() }));
        assert!(v.contains(&Violation::UnknownEvents {
            page: "p1".into(),
            name: "unregistered".into()
        }));
        assert!(v.contains(&Violation::DuplicateSection("S1".into())));
        assert!(v.contains(&Violation::DuplicateRoute {
            section: "S1".into(),
            route: "r1".into()
        }));
        assert_eq!(v.len(), 8);
    }

    #[test]
    fn test_static_next_cannot_leave_its_section() {
        let mut def = two_sections();
        def.sections[0].routes[0].next = RouteNext::Static("r3".into());
        let err = build(&def, &Registry::new()).unwrap_err();
        assert_eq!(
            err.violations,
            vec![Violation::UnknownRouteNext {
                section: "S1".into(),
                route: "r1".into(),
                target: "r3".into()
            }]
        );
    }

    #[test]
    fn test_registered_names_resolve() {
        let mut def = two_sections();
        def.sections[0].pages[0].validator = Some("name-check".into());
        assert!(build(&def, &Registry::new()).is_err());

        let registry = Registry::new().validator_fn("name-check", |_| true);
        assert!(build(&def, &registry).is_ok());
    }

    #[test]
    fn test_array_keys_must_be_distinct() {
        let mut def = two_sections();
        def.sections[0].settings.array_key = Some("people".into());
        def.sections[1].settings.array_key = Some("people".into());
        let err = build(&def, &Registry::new()).unwrap_err();
        assert_eq!(
            err.violations,
            vec![Violation::SharedArrayKey {
                key: "people".into(),
                first: "S1".into(),
                second: "S2".into()
            }]
        );
    }

    #[test]
    fn test_empty_definition_is_rejected() {
        let err = build(&Definition::default(), &Registry::new()).unwrap_err();
        assert_eq!(err.violations, vec![Violation::NoSections]);
    }

    #[test]
    fn test_schematic_reflects_route_graph() {
        let model = build(&two_sections(), &Registry::new()).unwrap();
        let schematic = Schematic::from_model("two", &model);

        assert_eq!(schematic.nodes.len(), 3);
        assert_eq!(schematic.node("r1").unwrap().kind, NodeKind::Start);
        assert_eq!(schematic.node("r1").unwrap().label, "Name");
        assert_eq!(schematic.node("r2").unwrap().kind, NodeKind::Terminal);

        let from_r2: Vec<_> = schematic.edges_from("r2").collect();
        assert_eq!(from_r2.len(), 1);
        assert_eq!(from_r2[0].kind, EdgeType::Section);
        assert_eq!(from_r2[0].to, "r3");
        assert_eq!(schematic.edges_from("r3").count(), 0);
    }

    #[test]
    fn test_goto_only_routes_are_unreachable() {
        let mut definition = two_sections();
        definition.sections[1].routes.push(
            serde_json::from_value(json!({ "id": "r4", "pageId": "p3", "sectionComplete": true }))
                .unwrap(),
        );
        let model = build(&definition, &Registry::new()).unwrap();
        let schematic = Schematic::from_model("two", &model);

        let unreachable: Vec<&str> = schematic
            .unreachable_from("r1")
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(unreachable, vec!["r4"]);
        assert_eq!(schematic.unreachable_from("r3").len(), 3);
    }

    #[test]
    fn test_distinct_ids_cannot_share_a_slug() {
        let clash = definition(json!([
            {
                "id": "About_You", "title": "One", "routeStart": "r1",
                "routes": [{ "id": "r1", "pageId": "p1", "sectionComplete": true }],
                "pages": [
                    { "id": "p1", "slug": "details", "content": [] },
                    { "id": "p2", "slug": "details", "content": [] }
                ]
            },
            {
                "id": "about-you", "title": "Two", "slug": "About_You", "routeStart": "r2",
                "routes": [{ "id": "r2", "pageId": "p1", "sectionComplete": true }],
                "pages": [{ "id": "p1", "content": [] }]
            }
        ]));

        let err = build(&clash, &Registry::new()).unwrap_err();
        assert_eq!(
            err.violations,
            vec![
                Violation::DuplicatePageSlug {
                    section: "About_You".into(),
                    slug: "details".into(),
                    first: "p1".into(),
                    second: "p2".into()
                },
                Violation::DuplicateSectionSlug {
                    slug: "About_You".into(),
                    first: "About_You".into(),
                    second: "about-you".into()
                },
            ]
        );
    }

    #[test]
    fn test_ids_differing_only_in_case_keep_their_own_slugs() {
        let model = build(
            &definition(json!([
                {
                    "id": "About_You", "title": "One", "routeStart": "r1",
                    "routes": [{ "id": "r1", "pageId": "p1", "sectionComplete": true }],
                    "pages": [{ "id": "p1", "content": [] }]
                },
                {
                    "id": "about-you", "title": "Two", "routeStart": "r2",
                    "routes": [{ "id": "r2", "pageId": "p1", "sectionComplete": true }],
                    "pages": [{ "id": "p1", "content": [] }]
                }
            ])),
            &Registry::new(),
        )
        .unwrap();
        assert_eq!(model.section("About_You").unwrap().slug, "About_You");
        assert_eq!(model.section("about-you").unwrap().slug, "about-you");
    }

    #[test]
    fn test_legacy_button_flags_fill_unset_settings() {
        let mut def = two_sections();
        def.sections[0].pages[0].show_button_back = Some(false);
        def.sections[0].pages[0].show_button_next = Some(false);
        def.sections[0].pages[0].settings.next_button_visible = Some(true);

        let model = build(&def, &Registry::new()).unwrap();
        let page = &model.section("S1").unwrap().pages["p1"];
        assert_eq!(page.settings.back_button_visible, Some(false));
        assert_eq!(page.settings.next_button_visible, Some(true));
    }
}
