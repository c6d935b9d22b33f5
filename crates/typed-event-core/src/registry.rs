//! Name-keyed event registry with runtime payload schemas.
//!
//! Events are declared by name together with a [`PayloadSchema`]. Dispatch
//! takes a JSON payload, binds it against the schema and only then hands the
//! bound [`Payload`] to handlers. A payload that does not fit is rejected
//! before any handler runs.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};
use typed_event_types::config::{ErrorPolicy, EventConfig};
use typed_event_types::error::{RegistryError, SchemaError};
use typed_event_types::event::{EventDescriptor, is_valid_event_name};
use typed_event_types::schema::Payload;
use typed_event_types::subscription::SubscriptionId;

use crate::bus::EventBus;
use crate::error::DispatchError;
use crate::event::{Event, Handler, HandlerResult, SubscriptionGuard};

#[derive(Clone)]
struct Declared {
    descriptor: Arc<EventDescriptor>,
    event: Event<Payload>,
}

/// Events declared by name.
///
/// Cloning produces a shared view (backed by `Arc<DashMap<...>>`).
#[derive(Clone)]
pub struct EventRegistry {
    events: Arc<DashMap<String, Declared>>,
    policy: ErrorPolicy,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::with_policy(ErrorPolicy::default())
    }

    pub fn with_policy(policy: ErrorPolicy) -> Self {
        Self {
            events: Arc::new(DashMap::new()),
            policy,
        }
    }

    /// Build a registry with the configured policy and every configured event declared.
    pub fn from_config(config: &EventConfig) -> Result<Self, RegistryError> {
        let registry = Self::with_policy(config.dispatch.error_policy);
        registry.declare_all(config.events.iter().cloned())?;
        Ok(registry)
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Declare a new event.
    ///
    /// Fails if the name is malformed, already declared, or the schema is
    /// invalid (duplicate fields, defaults of the wrong type).
    pub fn declare(&self, descriptor: EventDescriptor) -> Result<(), RegistryError> {
        if !is_valid_event_name(&descriptor.name) {
            return Err(RegistryError::InvalidName(descriptor.name));
        }
        descriptor
            .schema
            .validate()
            .map_err(|source| RegistryError::InvalidSchema {
                event: descriptor.name.clone(),
                source,
            })?;

        match self.events.entry(descriptor.name.clone()) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateEvent(descriptor.name)),
            Entry::Vacant(slot) => {
                info!(
                    event = %descriptor.name,
                    fields = descriptor.schema.fields.len(),
                    "declared event"
                );
                let event = Event::with_policy(descriptor.name.clone(), self.policy);
                slot.insert(Declared {
                    descriptor: Arc::new(descriptor),
                    event,
                });
                Ok(())
            }
        }
    }

    /// Declare several events, stopping at the first failure.
    pub fn declare_all<I>(&self, descriptors: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = EventDescriptor>,
    {
        for descriptor in descriptors {
            self.declare(descriptor)?;
        }
        Ok(())
    }

    /// Remove a declared event along with its subscriptions.
    pub fn remove(&self, name: &str) -> Option<Arc<EventDescriptor>> {
        let (_, declared) = self.events.remove(name)?;
        let dropped = declared.event.clear();
        debug!(event = %name, dropped, "removed event");
        Some(declared.descriptor)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.events.contains_key(name)
    }

    pub fn descriptor(&self, name: &str) -> Option<Arc<EventDescriptor>> {
        self.events.get(name).map(|d| d.descriptor.clone())
    }

    /// Every declared descriptor, sorted by name.
    pub fn descriptors(&self) -> Vec<Arc<EventDescriptor>> {
        let mut all: Vec<Arc<EventDescriptor>> =
            self.events.iter().map(|d| d.descriptor.clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Declared event names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.events.iter().map(|d| d.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    // Clone out of the map so no shard lock is held while handlers run.
    fn get(&self, name: &str) -> Result<Declared, RegistryError> {
        self.events
            .get(name)
            .map(|d| d.value().clone())
            .ok_or_else(|| RegistryError::UnknownEvent(name.to_string()))
    }

    pub fn subscribe<F>(&self, name: &str, f: F) -> Result<SubscriptionId, RegistryError>
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        Ok(self.get(name)?.event.subscribe(f))
    }

    pub fn subscribe_fallible<F>(&self, name: &str, f: F) -> Result<SubscriptionId, RegistryError>
    where
        F: Fn(&Payload) -> HandlerResult + Send + Sync + 'static,
    {
        Ok(self.get(name)?.event.subscribe_fallible(f))
    }

    pub fn subscribe_handler(
        &self,
        name: &str,
        handler: &Handler<Payload>,
    ) -> Result<SubscriptionId, RegistryError> {
        Ok(self.get(name)?.event.subscribe_handler(handler))
    }

    pub fn subscribe_scoped<F>(&self, name: &str, f: F) -> Result<SubscriptionGuard, RegistryError>
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        Ok(self.get(name)?.event.subscribe_scoped(f))
    }

    pub fn unsubscribe(&self, name: &str, id: SubscriptionId) -> Result<(), RegistryError> {
        self.get(name)?.event.unsubscribe(id)?;
        Ok(())
    }

    /// Subscribe `f` to `name` and hand it back as a [`Handler`], which can
    /// later be removed with [`EventRegistry::unsubscribe_handler`].
    pub fn listener<F>(&self, name: &str, f: F) -> Result<Handler<Payload>, RegistryError>
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        Ok(self.get(name)?.event.listener(f))
    }

    /// Remove the first subscription of `handler` on `name`.
    pub fn unsubscribe_handler(
        &self,
        name: &str,
        handler: &Handler<Payload>,
    ) -> Result<SubscriptionId, RegistryError> {
        Ok(self.get(name)?.event.unsubscribe_handler(handler)?)
    }

    pub fn contains_handler(&self, name: &str, handler: &Handler<Payload>) -> bool {
        self.events
            .get(name)
            .is_some_and(|d| d.event.contains_handler(handler))
    }

    /// Forward every accepted payload of `name` onto `bus` while the guard lives.
    pub fn forward_to(
        &self,
        name: &str,
        bus: &EventBus<Payload>,
    ) -> Result<SubscriptionGuard, RegistryError> {
        Ok(bus.attach(&self.get(name)?.event))
    }

    /// Number of subscriptions on `name`, or `None` if it is not declared.
    pub fn listener_count(&self, name: &str) -> Option<usize> {
        self.events.get(name).map(|d| d.event.len())
    }

    /// Bind `payload` against the schema of `name` without dispatching.
    pub fn check(&self, name: &str, payload: Value) -> Result<Payload, DispatchError> {
        let declared = self.get(name)?;
        Self::bind(&declared, payload)
    }

    /// Validate `payload` against the schema of `name`, then dispatch it.
    ///
    /// Returns the number of handlers invoked. Unknown events and payloads
    /// that do not fit the schema are rejected before any handler runs.
    pub fn dispatch(&self, name: &str, payload: Value) -> Result<usize, DispatchError> {
        let declared = self.get(name)?;
        let bound = Self::bind(&declared, payload)?;
        declared.event.dispatch(&bound)
    }

    /// Like [`EventRegistry::check`], with leading positional values followed
    /// by named ones.
    pub fn check_parts(
        &self,
        name: &str,
        positional: Vec<Value>,
        named: Map<String, Value>,
    ) -> Result<Payload, DispatchError> {
        let declared = self.get(name)?;
        Self::bind_parts(&declared, positional, named)
    }

    /// Like [`EventRegistry::dispatch`], with leading positional values
    /// followed by named ones.
    pub fn dispatch_parts(
        &self,
        name: &str,
        positional: Vec<Value>,
        named: Map<String, Value>,
    ) -> Result<usize, DispatchError> {
        let declared = self.get(name)?;
        let bound = Self::bind_parts(&declared, positional, named)?;
        declared.event.dispatch(&bound)
    }

    /// Serialize `payload` to JSON and dispatch it under `name`.
    pub fn dispatch_serialized<T: Serialize>(
        &self,
        name: &str,
        payload: &T,
    ) -> Result<usize, DispatchError> {
        let value = serde_json::to_value(payload).map_err(|source| DispatchError::Encode {
            event: name.to_string(),
            source,
        })?;
        self.dispatch(name, value)
    }

    fn bind(declared: &Declared, payload: Value) -> Result<Payload, DispatchError> {
        let bound = declared.descriptor.schema.bind(payload);
        Self::rejected(declared, bound)
    }

    fn bind_parts(
        declared: &Declared,
        positional: Vec<Value>,
        named: Map<String, Value>,
    ) -> Result<Payload, DispatchError> {
        let bound = declared.descriptor.schema.bind_parts(positional, named);
        Self::rejected(declared, bound)
    }

    fn rejected(
        declared: &Declared,
        bound: Result<Payload, SchemaError>,
    ) -> Result<Payload, DispatchError> {
        bound.map_err(|source| {
            debug!(event = %declared.descriptor.name, error = %source, "payload rejected");
            DispatchError::InvalidPayload {
                event: declared.descriptor.name.clone(),
                source,
            }
        })
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("policy", &self.policy)
            .field("events", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use typed_event_types::error::{SchemaError, SubscriptionError};
    use typed_event_types::schema::{FieldSpec, FieldType, PayloadSchema};

    fn login_descriptor() -> EventDescriptor {
        EventDescriptor::new(
            "user_login",
            vec![
                FieldSpec::required("username", FieldType::String),
                FieldSpec::required("user_id", FieldType::Integer),
                FieldSpec::with_default("active", FieldType::Boolean, json!(true)),
            ],
        )
    }

    fn registry() -> EventRegistry {
        let registry = EventRegistry::new();
        registry.declare(login_descriptor()).unwrap();
        registry
    }

    #[test]
    fn dispatch_binds_and_delivers_payload() {
        let registry = registry();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        registry
            .subscribe("user_login", move |p| {
                sink.lock().unwrap().push((
                    p.get_str("username").unwrap().to_string(),
                    p.get_i64("user_id").unwrap(),
                    p.get_bool("active").unwrap(),
                ))
            })
            .unwrap();

        registry.dispatch("user_login", json!(["Alice", 30, false])).unwrap();
        registry
            .dispatch("user_login", json!({"username": "Bob", "user_id": 25}))
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("Alice".to_string(), 30, false),
                ("Bob".to_string(), 25, true)
            ]
        );
    }

    #[test]
    fn invalid_payload_is_rejected_before_any_handler_runs() {
        let registry = registry();
        let calls = Arc::new(Mutex::new(0));
        let sink = calls.clone();
        registry
            .subscribe("user_login", move |_| *sink.lock().unwrap() += 1)
            .unwrap();

        let err = registry
            .dispatch("user_login", json!(["Alice", "ddd"]))
            .unwrap_err();
        assert!(err.is_rejection());
        match err {
            DispatchError::InvalidPayload { event, source } => {
                assert_eq!(event, "user_login");
                assert!(matches!(source, SchemaError::TypeMismatch { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn unknown_event_is_rejected() {
        let registry = registry();
        let err = registry.dispatch("user_logout", json!({})).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Registry(RegistryError::UnknownEvent(ref name)) if name == "user_logout"
        ));
        assert!(registry.subscribe("user_logout", |_| {}).is_err());
    }

    #[test]
    fn duplicate_declaration_is_rejected() {
        let registry = registry();
        assert_eq!(
            registry.declare(login_descriptor()),
            Err(RegistryError::DuplicateEvent("user_login".to_string()))
        );
    }

    #[test]
    fn invalid_names_and_schemas_are_rejected() {
        let registry = EventRegistry::new();
        assert_eq!(
            registry.declare(EventDescriptor::new("user login", vec![])),
            Err(RegistryError::InvalidName("user login".to_string()))
        );

        let bad = EventDescriptor::new(
            "dup",
            vec![
                FieldSpec::required("a", FieldType::String),
                FieldSpec::required("a", FieldType::String),
            ],
        );
        assert!(matches!(
            registry.declare(bad),
            Err(RegistryError::InvalidSchema { ref event, .. }) if event == "dup"
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let registry = registry();
        let calls = Arc::new(Mutex::new(0));
        let sink = calls.clone();
        let id = registry
            .subscribe("user_login", move |_| *sink.lock().unwrap() += 1)
            .unwrap();

        registry.dispatch("user_login", json!(["A", 1])).unwrap();
        registry.unsubscribe("user_login", id).unwrap();
        assert_eq!(registry.dispatch("user_login", json!(["A", 1])).unwrap(), 0);
        assert_eq!(*calls.lock().unwrap(), 1);

        assert_eq!(
            registry.unsubscribe("user_login", id),
            Err(RegistryError::Subscription(SubscriptionError::NotSubscribed {
                event: "user_login".to_string(),
                id
            }))
        );
    }

    #[test]
    fn check_binds_without_dispatching() {
        let registry = registry();
        let calls = Arc::new(Mutex::new(0));
        let sink = calls.clone();
        registry
            .subscribe("user_login", move |_| *sink.lock().unwrap() += 1)
            .unwrap();

        let payload = registry.check("user_login", json!(["Eve", 9])).unwrap();
        assert_eq!(payload.get_bool("active"), Some(true));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn dispatch_serialized_encodes_structs() {
        #[derive(Serialize)]
        struct Login<'a> {
            username: &'a str,
            user_id: u32,
        }

        let registry = registry();
        let names = Arc::new(Mutex::new(Vec::new()));
        let sink = names.clone();
        registry
            .subscribe("user_login", move |p| {
                sink.lock().unwrap().push(p.get_str("username").unwrap().to_string())
            })
            .unwrap();

        registry
            .dispatch_serialized(
                "user_login",
                &Login {
                    username: "Zed",
                    user_id: 3,
                },
            )
            .unwrap();
        assert_eq!(*names.lock().unwrap(), vec!["Zed".to_string()]);
    }

    #[test]
    fn from_config_declares_events_with_policy() {
        let config: EventConfig = serde_json::from_value(json!({
            "dispatch": { "error_policy": "continue" },
            "events": [
                { "name": "b_event" },
                { "name": "a_event", "fields": [{ "name": "n", "type": "integer" }] }
            ]
        }))
        .unwrap();

        let registry = EventRegistry::from_config(&config).unwrap();
        assert_eq!(registry.policy(), ErrorPolicy::Continue);
        assert_eq!(registry.names(), vec!["a_event", "b_event"]);
        assert_eq!(registry.descriptors()[0].schema.fields.len(), 1);

        registry
            .subscribe_fallible("b_event", |_| Err(anyhow::anyhow!("first")))
            .unwrap();
        registry
            .subscribe_fallible("b_event", |_| Err(anyhow::anyhow!("second")))
            .unwrap();
        match registry.dispatch("b_event", json!({})).unwrap_err() {
            DispatchError::HandlersFailed { invoked, failures, .. } => {
                assert_eq!(invoked, 2);
                assert_eq!(failures.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn remove_drops_event_and_subscribers() {
        let registry = registry();
        let calls = Arc::new(Mutex::new(0));
        let sink = calls.clone();
        let handler = registry
            .listener("user_login", move |_| *sink.lock().unwrap() += 1)
            .unwrap();

        let removed = registry.remove("user_login").unwrap();
        assert_eq!(removed.name, "user_login");
        assert!(!registry.contains("user_login"));
        assert!(!registry.contains_handler("user_login", &handler));
        assert!(registry.remove("user_login").is_none());

        registry.declare(login_descriptor()).unwrap();
        registry.dispatch("user_login", json!(["A", 1])).unwrap();
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn handler_may_dispatch_other_events_reentrantly() {
        let registry = registry();
        registry
            .declare(
                EventDescriptor::new("audit", vec![])
                    .with_schema(PayloadSchema::default().allow_extra(true)),
            )
            .unwrap();

        let audits = Arc::new(Mutex::new(Vec::new()));
        let sink = audits.clone();
        registry
            .subscribe("audit", move |p| sink.lock().unwrap().push(p.to_value()))
            .unwrap();

        let inner = registry.clone();
        registry
            .subscribe_fallible("user_login", move |p| {
                inner.dispatch("audit", json!({ "who": p.get_str("username") }))?;
                Ok(())
            })
            .unwrap();

        registry.dispatch("user_login", json!(["Ann", 1])).unwrap();
        assert_eq!(*audits.lock().unwrap(), vec![json!({ "who": "Ann" })]);
    }

    #[test]
    fn listener_count_tracks_subscriptions() {
        let registry = registry();
        assert_eq!(registry.listener_count("user_login"), Some(0));
        let guard = registry.subscribe_scoped("user_login", |_| {}).unwrap();
        assert_eq!(registry.listener_count("user_login"), Some(1));
        drop(guard);
        assert_eq!(registry.listener_count("user_login"), Some(0));
        assert_eq!(registry.listener_count("missing"), None);
    }

    #[test]
    fn handlers_only_see_bound_payloads() {
        let registry = registry();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        registry
            .subscribe("user_login", move |p| sink.lock().unwrap().push(p.to_value()))
            .unwrap();

        assert!(registry.dispatch("user_login", json!({"user_id": "ddd"})).is_err());
        registry
            .dispatch("user_login", json!({"username": "Ann", "user_id": 4, "active": null}))
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![json!({"username": "Ann", "user_id": 4, "active": true})]
        );
    }

    #[test]
    fn listener_can_be_removed_by_identity() {
        let registry = registry();
        let calls = Arc::new(Mutex::new(0));
        let sink = calls.clone();
        let handler = registry
            .listener("user_login", move |_| *sink.lock().unwrap() += 1)
            .unwrap();
        registry.subscribe_handler("user_login", &handler).unwrap();

        assert_eq!(registry.dispatch("user_login", json!(["A", 1])).unwrap(), 2);
        registry.unsubscribe_handler("user_login", &handler).unwrap();
        assert!(registry.contains_handler("user_login", &handler));
        registry.unsubscribe_handler("user_login", &handler).unwrap();
        assert!(!registry.contains_handler("user_login", &handler));
        assert!(matches!(
            registry.unsubscribe_handler("user_login", &handler),
            Err(RegistryError::Subscription(SubscriptionError::HandlerNotSubscribed(_)))
        ));
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[test]
    fn dispatch_parts_mixes_positional_and_named_values() {
        let registry = registry();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        registry
            .subscribe("user_login", move |p| sink.lock().unwrap().push(p.get_bool("active")))
            .unwrap();

        let mut named = Map::new();
        named.insert("active".to_string(), json!(false));
        registry
            .dispatch_parts("user_login", vec![json!("Charlie"), json!(35)], named)
            .unwrap();

        let mut twice = Map::new();
        twice.insert("user_id".to_string(), json!(2));
        let err = registry
            .check_parts("user_login", vec![json!("Dana"), json!(1)], twice)
            .unwrap_err();
        match err {
            DispatchError::InvalidPayload { source, .. } => {
                assert_eq!(source, SchemaError::MultipleValues("user_id".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(*seen.lock().unwrap(), vec![Some(false)]);
    }

    #[tokio::test]
    async fn forward_to_bus_carries_accepted_payloads_until_dropped() {
        let registry = registry();
        let bus = EventBus::<Payload>::new(8);
        let mut rx = bus.subscribe();

        let bridge = registry.forward_to("user_login", &bus).unwrap();
        registry.dispatch("user_login", json!(["Ann", 1])).unwrap();
        let _ = registry.dispatch("user_login", json!(["Ann", "x"]));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.get_str("username"), Some("Ann"));
        assert!(rx.try_recv().is_err());

        drop(bridge);
        assert_eq!(registry.listener_count("user_login"), Some(0));
        assert!(registry.forward_to("missing", &bus).is_err());
    }
}
