//! Persisted routing types.

use serde::{Deserialize, Serialize};

/// Durable fact binding a workflow to the cluster that accepted it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutingRecord {
    /// Insertion id; newer records have larger ids.
    pub id: u64,
    /// Name assigned by the downstream cluster.
    pub workflow_name: String,
    /// Template the workflow was submitted from.
    pub workflow_template: String,
    pub namespace: String,
    /// Base address of the owning cluster.
    pub cluster: String,
    /// Unix timestamp (seconds) when the record was written.
    pub created_at: u64,
}

/// A record as supplied by the writer, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRoutingRecord {
    pub workflow_name: String,
    pub workflow_template: String,
    pub namespace: String,
    pub cluster: String,
    pub created_at: u64,
}

impl NewRoutingRecord {
    pub(crate) fn with_id(self, id: u64) -> RoutingRecord {
        RoutingRecord {
            id,
            workflow_name: self.workflow_name,
            workflow_template: self.workflow_template,
            namespace: self.namespace,
            cluster: self.cluster,
            created_at: self.created_at,
        }
    }
}

/// Index key prefix shared by every record of one workflow.
pub(crate) fn index_prefix(namespace: &str, workflow_name: &str) -> String {
    format!("{namespace}\0{workflow_name}\0")
}

/// Exclusive upper bound of [`index_prefix`] for range scans.
pub(crate) fn index_prefix_end(namespace: &str, workflow_name: &str) -> String {
    format!("{namespace}\0{workflow_name}\u{1}")
}

pub(crate) fn index_key(namespace: &str, workflow_name: &str, id: u64) -> String {
    format!("{}{id:020}", index_prefix(namespace, workflow_name))
}
