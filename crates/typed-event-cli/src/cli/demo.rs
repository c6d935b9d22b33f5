//! `tevent demo`: the user-login walkthrough.
//!
//! A typed `UserLogin` payload goes through the [`Dispatcher`] to two
//! handlers. The same event is then declared by name and handed a payload
//! whose id is a string, which the registry refuses before any handler runs.

use std::sync::{Arc, Mutex};

use console::style;
use serde::Serialize;
use serde_json::json;
use typed_event_core::{Dispatcher, EventPayload, EventRegistry};
use typed_event_types::event::EventDescriptor;
use typed_event_types::schema::{FieldSpec, FieldType};

/// A user signed in.
#[derive(Debug, Clone, Serialize)]
pub struct UserLogin {
    pub username: String,
    pub user_id: u64,
}

impl EventPayload for UserLogin {
    const NAME: &'static str = "user_login";
}

/// What the walkthrough observed.
#[derive(Debug, Serialize)]
pub struct DemoReport {
    pub event: &'static str,
    pub invoked: usize,
    pub messages: Vec<String>,
    pub rejected_payload: serde_json::Value,
    pub rejection: Option<String>,
}

fn user_login_descriptor() -> EventDescriptor {
    EventDescriptor::new(
        UserLogin::NAME,
        vec![
            FieldSpec::required("username", FieldType::String),
            FieldSpec::required("user_id", FieldType::Integer),
        ],
    )
    .with_description("A user signed in")
}

pub fn run_demo(username: &str, user_id: u64) -> anyhow::Result<DemoReport> {
    let dispatcher = Dispatcher::new();
    let messages = Arc::new(Mutex::new(Vec::new()));

    let out = Arc::clone(&messages);
    dispatcher.subscribe(move |login: &UserLogin| {
        out.lock().expect("demo transcript lock poisoned").push(format!(
            "Welcome, {}! Your user ID is {}.",
            login.username, login.user_id
        ));
    });

    let out = Arc::clone(&messages);
    dispatcher.subscribe(move |login: &UserLogin| {
        out.lock().expect("demo transcript lock poisoned").push(format!(
            "User {} logged in with ID {}.",
            login.username, login.user_id
        ));
    });

    let invoked = dispatcher.dispatch(&UserLogin {
        username: username.to_string(),
        user_id,
    })?;

    let registry = EventRegistry::new();
    registry.declare(user_login_descriptor())?;
    let after_rejection = Arc::clone(&messages);
    registry.subscribe(UserLogin::NAME, move |_| {
        after_rejection
            .lock()
            .expect("demo transcript lock poisoned")
            .push("unreachable: rejected payload was delivered".to_string());
    })?;

    let rejected_payload = json!([username, "ddd"]);
    let rejection = match registry.dispatch(UserLogin::NAME, rejected_payload.clone()) {
        Ok(_) => None,
        Err(err) if err.is_rejection() => Some(err.to_string()),
        Err(err) => return Err(err.into()),
    };

    let messages = messages.lock().expect("demo transcript lock poisoned").clone();
    Ok(DemoReport {
        event: UserLogin::NAME,
        invoked,
        messages,
        rejected_payload,
        rejection,
    })
}

pub fn print_demo(report: &DemoReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Dispatched {} to {} handler(s)",
        style("*").cyan().bold(),
        style(report.event).bold(),
        report.invoked
    );
    for message in &report.messages {
        println!("    {}", message);
    }

    println!();
    match &report.rejection {
        Some(reason) => println!(
            "  {} Rejected {}: {}",
            style("x").red().bold(),
            style(report.rejected_payload.to_string()).yellow(),
            reason
        ),
        None => println!(
            "  {} Payload {} was accepted",
            style("!").yellow().bold(),
            report.rejected_payload
        ),
    }
    println!();

    Ok(())
}
