//! `tevent events`: list declared events and their schemas.

use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use typed_event_types::event::EventDescriptor;
use typed_event_types::schema::FieldSpec;

use crate::state::AppState;

/// Render one field as `name: type`, marking optional fields and defaults.
pub fn describe_field(field: &FieldSpec) -> String {
    let marker = if field.required { "" } else { "?" };
    match &field.default {
        Some(default) => format!("{}{marker}: {} = {default}", field.name, field.ty),
        None => format!("{}{marker}: {}", field.name, field.ty),
    }
}

fn describe_fields(descriptor: &EventDescriptor) -> String {
    if descriptor.schema.fields.is_empty() {
        return "(none)".to_string();
    }
    descriptor
        .schema
        .fields
        .iter()
        .map(describe_field)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn list_events(state: &AppState, json: bool) -> anyhow::Result<()> {
    let descriptors = state.registry.descriptors();

    if json {
        let list: Vec<&EventDescriptor> = descriptors.iter().map(|d| d.as_ref()).collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    if descriptors.is_empty() {
        println!();
        println!(
            "  {} No events declared in {}.",
            style("i").blue().bold(),
            style(state.config_path.display()).yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Event").fg(Color::White),
        Cell::new("Fields").fg(Color::White),
        Cell::new("Extra keys").fg(Color::White),
        Cell::new("Description").fg(Color::White),
    ]);

    for descriptor in &descriptors {
        let extra = if descriptor.schema.allow_extra {
            Cell::new("allowed").fg(Color::Yellow)
        } else {
            Cell::new("rejected").fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(&descriptor.name).fg(Color::Cyan),
            Cell::new(describe_fields(descriptor)),
            extra,
            Cell::new(descriptor.description.as_deref().unwrap_or("")),
        ]);
    }

    println!();
    println!("{table}");
    println!(
        "  {} event(s) from {} (error policy: {:?})",
        descriptors.len(),
        style(state.config_path.display()).dim(),
        state.registry.policy()
    );
    println!();

    Ok(())
}
