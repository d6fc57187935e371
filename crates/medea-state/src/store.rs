//! RoutingTable — redb-backed persistence of workflow placements.
//!
//! Records are only ever appended. `put` assigns the next id inside the
//! write transaction, so ids follow commit order and "most recent" means
//! "largest id". The store supports both on-disk and in-memory backends
//! (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe routing table backed by redb.
#[derive(Clone)]
pub struct RoutingTable {
    db: Arc<Database>,
}

impl RoutingTable {
    /// Open (or create) a persistent routing table at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "routing table opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory routing table (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory routing table opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(ROUTING_RECORDS).map_err(map_err!(Table))?;
        txn.open_table(ROUTING_INDEX).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Append a routing record and return it with its assigned id.
    pub fn put(&self, record: NewRoutingRecord) -> StateResult<RoutingRecord> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let stored;
        {
            let mut records = txn.open_table(ROUTING_RECORDS).map_err(map_err!(Table))?;
            let id = match records.last().map_err(map_err!(Read))? {
                Some((key, _)) => key.value() + 1,
                None => 1,
            };
            stored = record.with_id(id);

            let value = serde_json::to_vec(&stored).map_err(map_err!(Serialize))?;
            records
                .insert(id, value.as_slice())
                .map_err(map_err!(Write))?;

            let mut index = txn.open_table(ROUTING_INDEX).map_err(map_err!(Table))?;
            let key = index_key(&stored.namespace, &stored.workflow_name, id);
            index.insert(key.as_str(), id).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(
            id = stored.id,
            workflow = %stored.workflow_name,
            namespace = %stored.namespace,
            cluster = %stored.cluster,
            "routing record stored"
        );
        Ok(stored)
    }

    /// Cluster of the most recent record for a workflow in a namespace.
    pub fn resolve(&self, workflow_name: &str, namespace: &str) -> StateResult<String> {
        self.latest(workflow_name, namespace)?
            .map(|record| record.cluster)
            .ok_or_else(|| StateError::NotFound(format!("{namespace}/{workflow_name}")))
    }

    /// Most recent record for a workflow in a namespace, if any.
    pub fn latest(&self, workflow_name: &str, namespace: &str) -> StateResult<Option<RoutingRecord>> {
        let start = index_prefix(namespace, workflow_name);
        let end = index_prefix_end(namespace, workflow_name);

        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let index = txn.open_table(ROUTING_INDEX).map_err(map_err!(Table))?;
        let id = match index
            .range(start.as_str()..end.as_str())
            .map_err(map_err!(Read))?
            .next_back()
        {
            Some(entry) => {
                let (_, id) = entry.map_err(map_err!(Read))?;
                id.value()
            }
            None => return Ok(None),
        };

        let records = txn.open_table(ROUTING_RECORDS).map_err(map_err!(Table))?;
        match records.get(id).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: RoutingRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Err(StateError::Read(format!(
                "index entry {id} has no routing record"
            ))),
        }
    }

    /// All records for a workflow in a namespace, oldest first.
    pub fn history(&self, workflow_name: &str, namespace: &str) -> StateResult<Vec<RoutingRecord>> {
        let start = index_prefix(namespace, workflow_name);
        let end = index_prefix_end(namespace, workflow_name);

        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let index = txn.open_table(ROUTING_INDEX).map_err(map_err!(Table))?;
        let records = txn.open_table(ROUTING_RECORDS).map_err(map_err!(Table))?;

        let mut results = Vec::new();
        for entry in index
            .range(start.as_str()..end.as_str())
            .map_err(map_err!(Read))?
        {
            let (_, id) = entry.map_err(map_err!(Read))?;
            if let Some(guard) = records.get(id.value()).map_err(map_err!(Read))? {
                let record: RoutingRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                results.push(record);
            }
        }
        Ok(results)
    }

    /// Total number of records ever written.
    pub fn len(&self) -> StateResult<u64> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let records = txn.open_table(ROUTING_RECORDS).map_err(map_err!(Table))?;
        records.len().map_err(map_err!(Read))
    }

    pub fn is_empty(&self) -> StateResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, ns: &str, cluster: &str, created_at: u64) -> NewRoutingRecord {
        NewRoutingRecord {
            workflow_name: name.to_string(),
            workflow_template: "spark-pi".to_string(),
            namespace: ns.to_string(),
            cluster: cluster.to_string(),
            created_at,
        }
    }

    #[test]
    fn put_and_resolve() {
        let store = RoutingTable::open_in_memory().unwrap();
        let stored = store.put(record("wf-123", "ns1", "http://c2", 1000)).unwrap();

        assert_eq!(stored.id, 1);
        assert_eq!(store.resolve("wf-123", "ns1").unwrap(), "http://c2");
    }

    #[test]
    fn resolve_unknown_is_not_found() {
        let store = RoutingTable::open_in_memory().unwrap();
        let err = store.resolve("nope", "ns1").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn newest_record_wins() {
        let store = RoutingTable::open_in_memory().unwrap();
        store.put(record("wf", "ns1", "http://c1", 1000)).unwrap();
        store.put(record("wf", "ns1", "http://c2", 2000)).unwrap();

        assert_eq!(store.resolve("wf", "ns1").unwrap(), "http://c2");

        let latest = store.latest("wf", "ns1").unwrap().unwrap();
        assert_eq!(latest.created_at, 2000);
        assert_eq!(latest.id, 2);
    }

    #[test]
    fn namespace_scopes_resolution() {
        let store = RoutingTable::open_in_memory().unwrap();
        store.put(record("wf", "ns1", "http://c1", 1000)).unwrap();
        store.put(record("wf", "ns2", "http://c2", 2000)).unwrap();

        assert_eq!(store.resolve("wf", "ns1").unwrap(), "http://c1");
        assert_eq!(store.resolve("wf", "ns2").unwrap(), "http://c2");
        assert!(store.resolve("wf", "ns3").unwrap_err().is_not_found());
    }

    #[test]
    fn similar_names_do_not_collide() {
        let store = RoutingTable::open_in_memory().unwrap();
        store.put(record("wf", "ns1", "http://c1", 1000)).unwrap();
        store.put(record("wf-2", "ns1", "http://c2", 2000)).unwrap();

        assert_eq!(store.resolve("wf", "ns1").unwrap(), "http://c1");
        assert_eq!(store.history("wf", "ns1").unwrap().len(), 1);
    }

    #[test]
    fn history_is_oldest_first() {
        let store = RoutingTable::open_in_memory().unwrap();
        for (i, cluster) in ["http://a", "http://b", "http://c"].iter().enumerate() {
            store.put(record("wf", "ns", cluster, 1000 + i as u64)).unwrap();
        }

        let history = store.history("wf", "ns").unwrap();
        let clusters: Vec<_> = history.iter().map(|r| r.cluster.as_str()).collect();
        assert_eq!(clusters, vec!["http://a", "http://b", "http://c"]);
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn empty_store_operations() {
        let store = RoutingTable::open_in_memory().unwrap();
        assert!(store.is_empty().unwrap());
        assert!(store.latest("wf", "ns").unwrap().is_none());
        assert!(store.history("wf", "ns").unwrap().is_empty());
    }

    // ── Persistence (on-disk) ──────────────────────────────────────

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("routing.redb");

        {
            let store = RoutingTable::open(&db_path).unwrap();
            store.put(record("wf", "prod", "http://c1", 1000)).unwrap();
        }

        let store = RoutingTable::open(&db_path).unwrap();
        assert_eq!(store.resolve("wf", "prod").unwrap(), "http://c1");

        // Ids keep increasing after a reopen.
        let next = store.put(record("wf", "prod", "http://c3", 3000)).unwrap();
        assert_eq!(next.id, 2);
        assert_eq!(store.resolve("wf", "prod").unwrap(), "http://c3");
    }
}
