//! Resource requirement calculation from submission parameters.
//!
//! Workflow submissions carry their sizing as flat `key=value` strings:
//!
//! ```text
//! executor_num=2
//! executor_cores_limit=1
//! executor_memory_limit=6g
//! driver_cores_limit=1
//! driver_memory_limit=0.25g
//! ```
//!
//! The requirement is the executor share times the executor count plus
//! the driver share, for both CPU cores and RAM gigabytes.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

pub const EXECUTOR_NUM: &str = "executor_num";
pub const DRIVER_CORES_LIMIT: &str = "driver_cores_limit";
pub const EXECUTOR_CORES_LIMIT: &str = "executor_cores_limit";
pub const DRIVER_MEMORY_LIMIT: &str = "driver_memory_limit";
pub const EXECUTOR_MEMORY_LIMIT: &str = "executor_memory_limit";

/// Unit marker every memory parameter must carry.
pub const GIGABYTE_MARKER: char = 'g';

/// Rejected submission parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("memory param {key} must contain 'g' (gigabytes)")]
    MissingUnit { key: String },

    #[error("memory param {key} has non-numeric value '{value}'")]
    InvalidNumber { key: String, value: String },
}

/// CPU and RAM needed by a whole submission (driver plus all executors).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResourceRequirement {
    pub cpu_cores: f64,
    pub ram_gigabytes: f64,
}

/// Split raw `key=value` entries into a map.
///
/// Entries without exactly one `=` are dropped rather than rejected, and a
/// repeated key keeps its last value.
pub fn parse_parameters<S: AsRef<str>>(params: &[S]) -> HashMap<&str, &str> {
    let mut values = HashMap::new();
    for raw in params {
        let raw = raw.as_ref();
        let mut parts = raw.split('=');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) => {
                values.insert(key, value);
            }
            _ => debug!(parameter = raw, "dropping malformed parameter"),
        }
    }
    values
}

/// Compute the resource requirement of a submission.
pub fn calculate<S: AsRef<str>>(params: &[S]) -> Result<ResourceRequirement, ValidationError> {
    let values = parse_parameters(params);

    let executor_num = plain_value(&values, EXECUTOR_NUM);
    let driver_cores = plain_value(&values, DRIVER_CORES_LIMIT);
    let executor_cores = plain_value(&values, EXECUTOR_CORES_LIMIT);

    let driver_memory = memory_value(&values, DRIVER_MEMORY_LIMIT)?;
    let executor_memory = memory_value(&values, EXECUTOR_MEMORY_LIMIT)?;

    Ok(ResourceRequirement {
        cpu_cores: executor_cores * executor_num + driver_cores,
        ram_gigabytes: executor_memory * executor_num + driver_memory,
    })
}

/// Plain decimal; absent, unparsable or non-finite counts as zero.
fn plain_value(values: &HashMap<&str, &str>, key: &str) -> f64 {
    let Some(raw) = values.get(key) else {
        return 0.0;
    };
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            debug!(key, value = raw, "non-numeric parameter treated as 0");
            0.0
        }
    }
}

/// Gigabyte value; absent counts as zero, a missing unit marker is an error.
fn memory_value(values: &HashMap<&str, &str>, key: &str) -> Result<f64, ValidationError> {
    let Some(raw) = values.get(key) else {
        return Ok(0.0);
    };
    if !raw.contains(GIGABYTE_MARKER) {
        return Err(ValidationError::MissingUnit {
            key: key.to_string(),
        });
    }
    raw.replace(GIGABYTE_MARKER, "")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ValidationError::InvalidNumber {
            key: key.to_string(),
            value: raw.to_string(),
        })
}
