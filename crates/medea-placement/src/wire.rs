//! Scout request/response bodies, shared by the scout and its clients.

use serde::{Deserialize, Serialize};

use crate::calculator::ResourceRequirement;

/// `POST /api/request` body. Missing numbers read as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRequest {
    pub namespace: String,
    #[serde(default)]
    pub cpu: f64,
    #[serde(default)]
    pub ram: f64,
}

impl PlacementRequest {
    pub fn new(namespace: impl Into<String>, req: &ResourceRequirement) -> Self {
        Self {
            namespace: namespace.into(),
            cpu: req.cpu_cores,
            ram: req.ram_gigabytes,
        }
    }

    pub fn requirement(&self) -> ResourceRequirement {
        ResourceRequirement {
            cpu_cores: self.cpu,
            ram_gigabytes: self.ram,
        }
    }
}

/// Successful placement answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementResponse {
    pub cluster: String,
}
