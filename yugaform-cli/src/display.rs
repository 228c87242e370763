//! Terminal output for plans and apply progress

use std::collections::HashMap;

use colored::{ColoredString, Colorize};
use yugaform_core::differ::find_changed_attributes;
use yugaform_core::effect::Effect;
use yugaform_core::plan::Plan;
use yugaform_core::resource::Value;
use yugaform_core::schema::ResourceSchema;

const SENSITIVE: &str = "(sensitive value)";

fn symbol(effect: &Effect) -> ColoredString {
    match effect {
        Effect::Create(_) => "+".green().bold(),
        Effect::Update { .. } => "~".yellow().bold(),
        Effect::Replace { .. } => "-/+".magenta().bold(),
        Effect::Delete { .. } => "-".red().bold(),
        Effect::Read(_) => "?".normal(),
    }
}

/// One-line description of an effect
pub fn format_effect(effect: &Effect) -> String {
    match effect {
        Effect::Read(id) => format!("read {}", id),
        Effect::Create(resource) => format!("create {}", resource.id),
        Effect::Update { id, .. } => format!("update {}", id),
        Effect::Replace { id, .. } => format!("replace {}", id),
        Effect::Delete { id, .. } => format!("delete {}", id),
    }
}

pub fn print_plan(plan: &Plan, schemas: &HashMap<String, ResourceSchema>) {
    if plan.is_empty() {
        println!("{}", "No changes. Platform is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    for effect in plan.effects() {
        let id = effect.resource_id();
        let schema = schemas.get(&id.resource_type);
        println!("  {} {}", symbol(effect), id.to_string().bold());

        match effect {
            Effect::Create(resource) => {
                let mut keys: Vec<&String> = resource.attributes.keys().collect();
                keys.sort();
                for key in keys {
                    println!(
                        "      {}: {}",
                        key,
                        shown(schema, key, &resource.attributes[key])
                    );
                }
            }
            Effect::Update { from, to, .. } | Effect::Replace { from, to, .. } => {
                for key in find_changed_attributes(&to.attributes, &from.attributes) {
                    let old = from
                        .attributes
                        .get(&key)
                        .map(|v| shown(schema, &key, v))
                        .unwrap_or_else(|| "(none)".dimmed().to_string());
                    let forces = matches!(effect, Effect::Replace { .. })
                        && schema.is_some_and(|s| s.is_force_new(&key));
                    println!(
                        "      {}: {} → {}{}",
                        key,
                        old.red(),
                        shown(schema, &key, &to.attributes[&key]).green(),
                        if forces {
                            " (forces replacement)".magenta().to_string()
                        } else {
                            String::new()
                        }
                    );
                }
            }
            Effect::Delete { .. } | Effect::Read(_) => {}
        }
    }

    println!();
    println!("{}", plan.summary().to_string().bold());
}

fn shown(schema: Option<&ResourceSchema>, key: &str, value: &Value) -> String {
    if schema.is_some_and(|s| s.is_sensitive(key)) {
        SENSITIVE.to_string()
    } else {
        format_value(value)
    }
}

/// Render a value the way it is written in configuration
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let items: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Map(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by_key(|(k, _)| *k);
            let entries: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        Value::ResourceRef(binding, attr) => format!("{}.{}", binding, attr),
    }
}
