//! Async access to the routing table.
//!
//! redb transactions block, so every call runs on the blocking pool and
//! is abandoned after the store timeout. An abandoned write may still
//! land later; callers treat it as failed either way.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use medea_state::{NewRoutingRecord, RoutingRecord, RoutingTable, StateError, StateResult};

#[derive(Debug, Error)]
pub enum RoutingCallError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error("routing store did not answer within {0:?}")]
    Timeout(Duration),

    #[error("routing store task failed: {0}")]
    Task(String),
}

impl RoutingCallError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RoutingCallError::State(e) if e.is_not_found())
    }
}

/// Blocking routing storage behind [`RoutingHandle`].
pub trait RouteStore: Send + Sync + 'static {
    fn put(&self, record: NewRoutingRecord) -> StateResult<RoutingRecord>;
    fn resolve(&self, workflow_name: &str, namespace: &str) -> StateResult<String>;
}

impl RouteStore for RoutingTable {
    fn put(&self, record: NewRoutingRecord) -> StateResult<RoutingRecord> {
        RoutingTable::put(self, record)
    }

    fn resolve(&self, workflow_name: &str, namespace: &str) -> StateResult<String> {
        RoutingTable::resolve(self, workflow_name, namespace)
    }
}

/// Cloneable handle pairing the store with its call timeout.
#[derive(Clone)]
pub struct RoutingHandle {
    store: Arc<dyn RouteStore>,
    timeout: Duration,
}

impl RoutingHandle {
    pub fn new(table: RoutingTable, timeout: Duration) -> Self {
        Self::with_store(Arc::new(table), timeout)
    }

    pub fn with_store(store: Arc<dyn RouteStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    async fn call<T, F>(&self, op: F) -> Result<T, RoutingCallError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn RouteStore) -> StateResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || op(store.as_ref()));
        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result.map_err(RoutingCallError::from),
            Ok(Err(e)) => Err(RoutingCallError::Task(e.to_string())),
            Err(_) => Err(RoutingCallError::Timeout(self.timeout)),
        }
    }

    pub async fn record(&self, record: NewRoutingRecord) -> Result<RoutingRecord, RoutingCallError> {
        self.call(move |store| store.put(record)).await
    }

    pub async fn resolve(
        &self,
        workflow_name: &str,
        namespace: &str,
    ) -> Result<String, RoutingCallError> {
        let (workflow_name, namespace) = (workflow_name.to_string(), namespace.to_string());
        self.call(move |store| store.resolve(&workflow_name, &namespace))
            .await
    }
}
