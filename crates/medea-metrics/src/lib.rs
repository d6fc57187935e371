//! medea-metrics — self-observability for the Medea services.
//!
//! Each service owns a handful of [`CounterFamily`] values (submission
//! outcomes, placement outcomes, routing write failures) and serves them
//! on `/metrics` through [`render_prometheus`].
//!
//! # Architecture
//!
//! ```text
//! CounterFamily
//!   ├── inc(label) ← called on every request outcome
//!   └── series()   → sorted (label, value) pairs
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for the /metrics endpoint
//! ```

pub mod counter;
pub mod prometheus;

pub use counter::CounterFamily;
pub use prometheus::{CONTENT_TYPE, render_prometheus};
