//! Medea placement — resource requirements and cluster selection.
//!
//! This crate is pure: it turns submission parameters into a
//! [`ResourceRequirement`] and picks a cluster from capacity snapshots.
//! Fetching the snapshots is the scout's job (`medea-scout`).
//!
//! # Components
//!
//! - **`calculator`** — `key=value` parameters → CPU cores and RAM gigabytes
//! - **`snapshot`** — Per-resource available capacity keyed by cluster
//! - **`selector`** — Candidate filtering and uniform random choice
//! - **`wire`** — Scout request and response bodies

pub mod calculator;
pub mod selector;
pub mod snapshot;
pub mod wire;

pub use calculator::{ResourceRequirement, ValidationError, calculate, parse_parameters};
pub use selector::{candidates, select_cluster};
pub use snapshot::{CapacitySnapshot, ResourceKind};
pub use wire::{PlacementRequest, PlacementResponse};
