//! Scripted sessions: drive the engine from the command line.

use crate::config::CliConfig;
use crate::{read_definition, registry_for};
use anyhow::{Context, Result};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use waymark::prelude::*;

pub struct WalkArgs {
    pub definition: PathBuf,
    pub steps: Vec<String>,
    pub data: Option<PathBuf>,
    pub state: Option<PathBuf>,
    pub save: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub keep_going: bool,
    pub stub_hooks: bool,
}

/// One scripted request.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Next,
    Prev,
    Goto(String),
    Set { field: String, value: Value },
    Index { key: String, index: usize },
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "next" => return Ok(Step::Next),
            "prev" => return Ok(Step::Prev),
            _ => {}
        }

        let Some((verb, rest)) = s.split_once(':') else {
            anyhow::bail!("unknown step '{s}' (expected next, prev, goto:, set: or index:)");
        };
        match verb {
            "goto" if !rest.is_empty() => Ok(Step::Goto(rest.to_string())),
            "set" => {
                let (field, raw) = rest
                    .split_once('=')
                    .with_context(|| format!("step '{s}' needs set:<field>=<json>"))?;
                // Bare words are taken as strings so `set:name=Ada` works unquoted.
                let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.into()));
                Ok(Step::Set {
                    field: field.to_string(),
                    value,
                })
            }
            "index" => {
                let (key, raw) = rest
                    .split_once('=')
                    .with_context(|| format!("step '{s}' needs index:<key>=<n>"))?;
                let index = raw
                    .parse()
                    .with_context(|| format!("'{raw}' is not an item index"))?;
                Ok(Step::Index {
                    key: key.to_string(),
                    index,
                })
            }
            _ => anyhow::bail!("unknown step '{s}'"),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Next => write!(f, "next"),
            Step::Prev => write!(f, "prev"),
            Step::Goto(route) => write!(f, "goto:{route}"),
            Step::Set { field, value } => write!(f, "set:{field}={value}"),
            Step::Index { key, index } => write!(f, "index:{key}={index}"),
        }
    }
}

pub fn run_walk_command(args: WalkArgs) -> Result<()> {
    let state = walk(&args)?;
    let json = serde_json::to_string_pretty(&state)?;

    match &args.save {
        Some(out) => {
            std::fs::write(out, json.as_bytes())
                .with_context(|| format!("Failed to write state {}", out.display()))?;
            println!("State saved to: {}", out.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Run every step and return the final state.
fn walk(args: &WalkArgs) -> Result<State> {
    let steps = args
        .steps
        .iter()
        .map(|s| s.parse())
        .collect::<Result<Vec<Step>>>()?;

    let config = CliConfig::load(args.config.as_deref())?;
    let definition = read_definition(&args.definition)?;
    let registry = registry_for(&definition, args.stub_hooks);
    let model = Arc::new(build(&definition, &registry)?);

    let engine = match &args.state {
        Some(path) => Engine::resume(model, registry, config.engine, read_json(path)?)
            .with_context(|| format!("{} does not fit this definition", path.display()))?,
        None => Engine::new(model, registry, config.engine),
    };
    let data = match &args.data {
        Some(path) => JsonDataModel::new(read_json(path)?),
        None => JsonDataModel::default(),
    };

    let mut session = Session::new(engine, data);
    print_position(&session);

    for step in &steps {
        let result = match step {
            Step::Next => session.request_next().map(|o| describe(&o)),
            Step::Prev => session.request_prev().map(|o| describe(&o)),
            Step::Goto(route) => session.request_goto(route).map(|o| describe(&o)),
            Step::Index { key, index } => session
                .request_array_index(key, *index)
                .map(|()| format!("{key} -> item {index}")),
            Step::Set { field, value } => {
                session
                    .set_field(field, value.clone())
                    .with_context(|| format!("step '{step}' failed"))?;
                println!("{step}: ok");
                continue;
            }
        };

        match result {
            Ok(summary) => {
                println!("{step}: {summary}");
                print_position(&session);
            }
            Err(err) if args.keep_going => println!("{step}: refused ({err})"),
            Err(err) => return Err(err).with_context(|| format!("step '{step}' refused")),
        }
    }

    Ok(session.state().clone())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&source).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn describe(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Route { from, to } => format!("{from} -> {to}"),
        Outcome::Section { from, to, route } => format!("section {from} -> {to} ({route})"),
        Outcome::Iteration { section, index } => format!("{section} item {index}"),
        Outcome::Complete { section } => format!("wizard complete after {section}"),
        Outcome::Vetoed => "vetoed by page events".to_string(),
        Outcome::Stay => "stayed".to_string(),
    }
}

fn print_position(session: &Session<JsonDataModel>) {
    if session.is_complete() {
        println!("  = complete");
        return;
    }
    let state = session.state();
    let route = state.route_active_id.as_deref().unwrap_or("-");
    let section = state.section_active_id.as_deref().unwrap_or("-");
    match session.array_index() {
        Some(index) => println!("  @ {section}/{route} [item {index}]"),
        None => println!("  @ {section}/{route}"),
    }
    if let Some(page) = session.page() {
        for failure in &page.failures {
            println!("    ! {failure}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WIZARD: &str = r#"[
        { "id": "about", "title": "About", "routeStart": "name",
          "routes": [
            { "id": "name", "pageId": "name", "routeNext": "age" },
            { "id": "age", "pageId": "age", "sectionComplete": true }
          ],
          "pages": [
            { "id": "name", "content": [
              { "type": "formField", "field": "name", "formFieldType": "text",
                "validators": { "required": true } }
            ] },
            { "id": "age", "content": [] }
          ] },
        { "id": "done", "title": "Done", "routeStart": "thanks", "wizardComplete": true,
          "routes": [{ "id": "thanks", "pageId": "thanks", "sectionComplete": true }],
          "pages": [{ "id": "thanks", "content": [] }] }
    ]"#;

    fn args(dir: &tempfile::TempDir, steps: &[&str]) -> WalkArgs {
        let definition = dir.path().join("wizard.json");
        std::fs::write(&definition, WIZARD).unwrap();
        WalkArgs {
            definition,
            steps: steps.iter().map(|s| s.to_string()).collect(),
            data: None,
            state: None,
            save: None,
            config: None,
            keep_going: false,
            stub_hooks: false,
        }
    }

    #[test]
    fn test_parse_steps() {
        assert_eq!("next".parse::<Step>().unwrap(), Step::Next);
        assert_eq!("goto:age".parse::<Step>().unwrap(), Step::Goto("age".into()));
        assert_eq!(
            "set:name=Ada".parse::<Step>().unwrap(),
            Step::Set {
                field: "name".into(),
                value: json!("Ada")
            }
        );
        assert_eq!(
            "set:members[].age=42".parse::<Step>().unwrap(),
            Step::Set {
                field: "members[].age".into(),
                value: json!(42)
            }
        );
        assert_eq!(
            "index:members=2".parse::<Step>().unwrap(),
            Step::Index {
                key: "members".into(),
                index: 2
            }
        );
        assert!("goto:".parse::<Step>().is_err());
        assert!("index:members=two".parse::<Step>().is_err());
        assert!("jump".parse::<Step>().is_err());
    }

    #[test]
    fn test_walk_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let state = walk(&args(&dir, &["set:name=Ada", "next", "next", "next"])).unwrap();
        assert!(state.complete);
        assert_eq!(state.route_path, vec!["name", "age", "thanks"]);
        assert!(state.is_completed("about"));
    }

    #[test]
    fn test_refused_step_stops_unless_keep_going() {
        let dir = tempfile::tempdir().unwrap();
        let err = walk(&args(&dir, &["next"])).unwrap_err();
        assert_eq!(err.to_string(), "step 'next' refused");

        let mut lenient = args(&dir, &["next", "goto:age"]);
        lenient.keep_going = true;
        let state = walk(&lenient).unwrap();
        assert_eq!(state.route_active_id.as_deref(), Some("age"));
    }

    #[test]
    fn test_resume_saved_state() {
        let dir = tempfile::tempdir().unwrap();
        let saved = dir.path().join("state.json");

        let mut first = args(&dir, &["goto:age"]);
        first.save = Some(saved.clone());
        run_walk_command(first).unwrap();

        let mut second = args(&dir, &["next"]);
        second.state = Some(saved);
        let state = walk(&second).unwrap();
        assert_eq!(state.route_active_id.as_deref(), Some("thanks"));
        assert_eq!(state.route_path, vec!["name", "age", "thanks"]);
    }
}
