//! medea-upstream — outbound HTTP for the Medea services.
//!
//! Every call Medea makes to another system goes through one pooled
//! [`UpstreamClient`]: Prometheus queries from the scout, placement
//! requests from the balancer, and forwarded workflow requests to the
//! target clusters.
//!
//! # Behavior
//!
//! - A single timeout bounds connect, request, and reading the whole body.
//! - No retries. A failed call is reported once to the caller.
//! - Bodies are buffered; responses are relayed verbatim by the callers.

pub mod client;

pub use client::{UpstreamClient, UpstreamError, UpstreamRequest, UpstreamResponse};
