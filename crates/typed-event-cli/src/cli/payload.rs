//! `tevent check` and `tevent dispatch`: push a JSON payload at a declared event.

use anyhow::Context;
use console::style;
use serde::Serialize;
use serde_json::Value;
use typed_event_core::{EventBus, EventRegistry};
use typed_event_infra::config::resolve_bus_capacity;
use typed_event_types::config::EventConfig;
use typed_event_types::schema::Payload;

use crate::state::AppState;

/// Outcome of a successful `dispatch`.
#[derive(Debug, Serialize)]
pub struct DispatchReport {
    pub event: String,
    pub invoked: usize,
    pub delivered: Vec<Payload>,
}

fn parse_payload(raw: &str) -> anyhow::Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("payload is not valid JSON: {raw}"))
}

/// Bind `raw` against the schema of `event` without running any handler.
pub fn check_payload(registry: &EventRegistry, event: &str, raw: &str) -> anyhow::Result<Payload> {
    let value = parse_payload(raw)?;
    Ok(registry.check(event, value)?)
}

/// Validate and dispatch `raw`, collecting what reached handlers through a bus bridge.
pub fn dispatch_payload(
    registry: &EventRegistry,
    config: &EventConfig,
    event: &str,
    raw: &str,
    bus_capacity: Option<usize>,
) -> anyhow::Result<DispatchReport> {
    let value = parse_payload(raw)?;

    let bus = EventBus::<Payload>::new(resolve_bus_capacity(config, bus_capacity));
    let mut rx = bus.subscribe();
    let bridge = registry.forward_to(event, &bus)?;

    let invoked = registry.dispatch(event, value);
    bridge.unsubscribe();
    let invoked = invoked?;

    let mut delivered = Vec::new();
    while let Ok(payload) = rx.try_recv() {
        delivered.push(payload);
    }

    tracing::info!(event, invoked, "dispatched from command line");
    Ok(DispatchReport {
        event: event.to_string(),
        invoked,
        delivered,
    })
}

pub fn run_check(
    state: &AppState,
    event: &str,
    raw: &str,
    json: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let payload = check_payload(&state.registry, event, raw)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if !quiet {
        println!(
            "  {} Payload fits {}",
            style("ok").green().bold(),
            style(event).cyan()
        );
        println!("    {}", payload.to_value());
    }
    Ok(())
}

pub fn run_dispatch(
    state: &AppState,
    event: &str,
    raw: &str,
    bus_capacity: Option<usize>,
    json: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let report = dispatch_payload(&state.registry, &state.config, event, raw, bus_capacity)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !quiet {
        println!(
            "  {} Dispatched {} to {} handler(s)",
            style("*").cyan().bold(),
            style(&report.event).bold(),
            report.invoked
        );
        for payload in &report.delivered {
            println!("    {}", payload.to_value());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use typed_event_core::DispatchError;
    use typed_event_types::event::EventDescriptor;
    use typed_event_types::schema::{FieldSpec, FieldType};

    fn registry() -> EventRegistry {
        let registry = EventRegistry::new();
        registry
            .declare(EventDescriptor::new(
                "user_login",
                vec![
                    FieldSpec::required("username", FieldType::String),
                    FieldSpec::required("user_id", FieldType::Integer),
                    FieldSpec::with_default("remember", FieldType::Boolean, json!(false)),
                ],
            ))
            .unwrap();
        registry
    }

    #[test]
    fn check_binds_positional_payload() {
        let payload = check_payload(&registry(), "user_login", r#"["Alice", 5]"#).unwrap();
        assert_eq!(payload.get_str("username"), Some("Alice"));
        assert_eq!(payload.get_i64("user_id"), Some(5));
        assert_eq!(payload.get_bool("remember"), Some(false));
    }

    #[test]
    fn check_rejects_malformed_json() {
        let err = check_payload(&registry(), "user_login", "[Alice").unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn dispatch_delivers_bound_payload() {
        let registry = registry();
        let report = dispatch_payload(
            &registry,
            &EventConfig::default(),
            "user_login",
            r#"{"username": "Alice", "user_id": 1, "remember": true}"#,
            None,
        )
        .unwrap();

        assert_eq!(report.invoked, 1);
        assert_eq!(report.delivered.len(), 1);
        assert_eq!(report.delivered[0].get_bool("remember"), Some(true));
        assert_eq!(registry.listener_count("user_login"), Some(0));
    }

    #[test]
    fn dispatch_rejects_bad_payload_and_releases_bridge() {
        let registry = registry();
        let err = dispatch_payload(
            &registry,
            &EventConfig::default(),
            "user_login",
            r#"["Alice", "ddd"]"#,
            None,
        )
        .unwrap_err();

        let dispatch = err.downcast_ref::<DispatchError>().unwrap();
        assert!(dispatch.is_rejection());
        assert_eq!(registry.listener_count("user_login"), Some(0));
    }

    #[test]
    fn dispatch_unknown_event_fails() {
        let err = dispatch_payload(&registry(), &EventConfig::default(), "nope", "[]", None)
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn small_bus_capacity_still_collects_a_single_dispatch() {
        let report = dispatch_payload(
            &registry(),
            &EventConfig::default(),
            "user_login",
            r#"["Alice", 2]"#,
            Some(1),
        )
        .unwrap();
        assert_eq!(report.delivered.len(), 1);
        assert_eq!(report.delivered[0].get_bool("remember"), Some(false));
    }
}
