//! medea-state — durable workflow routing table.
//!
//! Backed by [redb](https://docs.rs/redb). Every successful submission
//! appends a [`RoutingRecord`] binding a workflow name in a namespace to
//! the cluster that accepted it; lifecycle requests resolve the newest
//! record for that pair.
//!
//! # Layout
//!
//! Records are JSON-serialized into an append-only table keyed by a
//! monotonically increasing id. A second table indexes ids under
//! `{namespace}\0{workflow}\0{id:020}` so a resolution is one reverse
//! range scan over a prefix.
//!
//! The `RoutingTable` is `Clone` + `Send` + `Sync` (backed by
//! `Arc<Database>`) and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::RoutingTable;
pub use types::*;
