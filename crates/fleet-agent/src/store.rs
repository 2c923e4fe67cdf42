//! In-memory component state and the endpoints that expose it.
//!
//! | Method | Route | Body | Effect |
//! |--------|-------|------|--------|
//! | GET | `instances` | `InstancesPayload` or empty | list stored components |
//! | POST | `instances` | `InstancesPayload` | upsert components by name |
//! | DELETE | `instances` | `InstancesPayload` | remove components by name |
//! | GET | `greetings` | - | liveness text |

use fleet_telemetry::log_call_event;
use fr_01_pubsub_binding::{Endpoint, HandlerError, HandlerResult};
use parking_lot::RwLock;
use shared_types::{ComponentSpec, Envelope, InstancesPayload, Request, Response};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const INSTANCES_ROUTE: &str = "instances";
pub const GREETINGS_ROUTE: &str = "greetings";
pub const GREETING: &str = "Hi there!!";

/// Components currently deployed on this agent, keyed by name.
#[derive(Debug, Default)]
pub struct ComponentStore {
    components: RwLock<BTreeMap<String, ComponentSpec>>,
}

impl ComponentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.components.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.read().is_empty()
    }

    /// Stored components; all of them when `names` is empty.
    pub fn list(&self, names: &[String]) -> Vec<ComponentSpec> {
        let components = self.components.read();
        if names.is_empty() {
            return components.values().cloned().collect();
        }
        names
            .iter()
            .filter_map(|name| components.get(name).cloned())
            .collect()
    }

    pub fn upsert(&self, specs: Vec<ComponentSpec>) -> usize {
        let mut components = self.components.write();
        let count = specs.len();
        for spec in specs {
            components.insert(spec.name.clone(), spec);
        }
        count
    }

    /// Remove by name; unknown names are ignored. Returns how many existed.
    pub fn remove(&self, names: &[String]) -> usize {
        let mut components = self.components.write();
        names
            .iter()
            .filter(|name| components.remove(name.as_str()).is_some())
            .count()
    }
}

fn payload(request: &Request, allow_empty: bool) -> Result<InstancesPayload, HandlerError> {
    if request.body.is_empty() {
        return if allow_empty {
            Ok(InstancesPayload::default())
        } else {
            Err(HandlerError::bad_request("missing instances payload"))
        };
    }
    request
        .json::<InstancesPayload>()
        .map_err(|e| HandlerError::bad_request(e.to_string()))
}

fn names(payload: &InstancesPayload) -> Vec<String> {
    payload.components.iter().map(|c| c.name.clone()).collect()
}

fn key(request: &Request) -> &str {
    request.correlation_key().unwrap_or("-")
}

fn list_instances(store: &ComponentStore, request: &Request) -> HandlerResult {
    let payload = payload(request, true)?;
    let found = store.list(&names(&payload));
    log_call_event!(
        debug,
        INSTANCES_ROUTE,
        request.method,
        key(request),
        "Listing components",
        instance = %payload.deployment.instance_name,
        count = found.len()
    );
    Response::json_ok(&found).map_err(|e| HandlerError::internal(e.to_string()))
}

fn apply_instances(store: &ComponentStore, request: &Request) -> HandlerResult {
    let payload = payload(request, false)?;
    let instance = payload.deployment.instance_name.clone();
    let count = store.upsert(payload.components);
    log_call_event!(
        info,
        INSTANCES_ROUTE,
        request.method,
        key(request),
        "Components updated",
        instance = %instance,
        count = count
    );
    Ok(Response::ok(""))
}

fn delete_instances(store: &ComponentStore, request: &Request) -> HandlerResult {
    let payload = payload(request, false)?;
    let removed = store.remove(&names(&payload));
    log_call_event!(
        info,
        INSTANCES_ROUTE,
        request.method,
        key(request),
        "Components deleted",
        instance = %payload.deployment.instance_name,
        requested = payload.components.len(),
        removed = removed
    );
    Ok(Response::ok(""))
}

/// Endpoint table served by the agent.
pub fn endpoints(store: Arc<ComponentStore>) -> Vec<Endpoint> {
    let get_store = Arc::clone(&store);
    let post_store = Arc::clone(&store);
    let delete_store = store;
    vec![
        Endpoint::new(INSTANCES_ROUTE, &["GET"], move |request| {
            let store = Arc::clone(&get_store);
            async move { list_instances(&store, &request) }
        }),
        Endpoint::new(INSTANCES_ROUTE, &["POST"], move |request| {
            let store = Arc::clone(&post_store);
            async move { apply_instances(&store, &request) }
        }),
        Endpoint::new(INSTANCES_ROUTE, &["DELETE"], move |request| {
            let store = Arc::clone(&delete_store);
            async move { delete_instances(&store, &request) }
        }),
        Endpoint::new(GREETINGS_ROUTE, &["GET"], |_| async {
            Ok(Response::ok(GREETING))
        }),
    ]
}
