//! redb table definitions for the routing table.

use redb::TableDefinition;

/// Append-only routing records keyed by insertion id.
pub const ROUTING_RECORDS: TableDefinition<u64, &[u8]> = TableDefinition::new("routing_records");

/// Record ids keyed by `{namespace}\0{workflow}\0{id:020}`.
pub const ROUTING_INDEX: TableDefinition<&str, u64> = TableDefinition::new("routing_index");
