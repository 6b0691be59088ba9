//! Definition validation and summary

use crate::{read_definition, registry_for};
use anyhow::Result;
use std::path::Path;
use waymark::Schematic;
use waymark::flow::{build, validate};

/// Validate a definition file, listing every problem, then summarize it.
pub fn run_check_command(path: &Path, stub_hooks: bool) -> Result<()> {
    println!("Checking wizard definition: {}", path.display());

    let definition = read_definition(path)?;
    let registry = registry_for(&definition, stub_hooks);

    let violations = validate(&definition, &registry);
    if !violations.is_empty() {
        for violation in &violations {
            println!("  ❌ {violation}");
        }
        anyhow::bail!("{} problem(s) found", violations.len());
    }

    let model = build(&definition, &registry)?;
    for section in model.sections() {
        let controls: usize = section.pages.values().map(|p| p.controls.len()).sum();
        let mut flags = Vec::new();
        if section.settings.previous_required {
            flags.push("previousRequired".to_string());
        }
        if let Some(key) = section.array_key() {
            flags.push(format!("arrayKey={key}"));
        }
        if section.wizard_complete {
            flags.push("wizardComplete".to_string());
        }
        println!(
            "  ✅ {} (/{}) - {} route(s), {} page(s), {} control(s){}",
            section.id,
            section.slug,
            section.routes.len(),
            section.pages.len(),
            controls,
            if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            }
        );
    }

    if let Some(first) = model.first_section() {
        let schematic = Schematic::from_model("check", &model);
        for node in schematic.unreachable_from(&first.route_start) {
            println!(
                "  ⚠️  route '{}' in section '{}' is only reachable through goto",
                node.id, node.section
            );
        }
    }

    println!();
    println!("✅ Check complete!");
    Ok(())
}
