//! Cloud Detection Types
//!
//! Core types shared by the node-label and IMDS detection paths.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cloud provider identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Azure,
    Gcp,
    /// No provider could be established from the available data.
    Unknown,
}

impl std::fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloudProvider::Aws => write!(f, "aws"),
            CloudProvider::Azure => write!(f, "azure"),
            CloudProvider::Gcp => write!(f, "gcp"),
            CloudProvider::Unknown => write!(f, "unknown"),
        }
    }
}

/// Which detection strategy produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionSource {
    NodeLabels,
    Imds,
}

impl std::fmt::Display for DetectionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionSource::NodeLabels => write!(f, "node-labels"),
            DetectionSource::Imds => write!(f, "imds"),
        }
    }
}

/// Detected cloud provider and region of the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudInfo {
    /// Cloud provider (aws, azure, gcp, or unknown)
    pub provider: CloudProvider,
    /// Region in the provider's own format (e.g. "us-west-2", "eastus")
    pub region: String,
    /// Strategy that produced this result
    pub source: DetectionSource,
}

/// Options selecting the detection strategy
///
/// The flags are not mutually validated: when both are set, node-label
/// detection takes precedence and IMDS is never attempted.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectionOptions {
    /// Detect from node labels and spec.providerID via the cluster API
    pub use_node_labels: bool,
    /// Detect by probing cloud instance metadata endpoints
    pub use_imds: bool,
}

/// Errors that can occur during cloud info detection
#[derive(Debug, Error)]
pub enum DetectError {
    /// Neither detection method was enabled in the options
    #[error("no cloud info detection method specified")]
    NoMethodSpecified,

    /// The cluster API was unreachable or the node list failed
    #[error(transparent)]
    Cluster(#[from] kube::Error),

    /// The cluster reported an empty node list
    #[error("no nodes found")]
    NoNodes,

    /// A node carried an empty provider ID
    #[error("empty provider ID")]
    EmptyProviderId,

    /// A provider ID had no `://` separator or an unrecognized scheme
    #[error("unknown provider ID format: {0}")]
    UnknownProviderId(String),

    /// Nodes referenced more than one distinct cloud provider
    #[error("multiple cloud providers found: {}", .0.join(", "))]
    MultipleProviders(Vec<String>),

    /// Nodes carried zero or several distinct region labels
    #[error("multiple regions found: [{}]", .0.join(" "))]
    MultipleRegions(Vec<String>),

    /// An IMDS request could not be constructed
    #[error("failed to build {0} IMDS request")]
    ImdsRequest(CloudProvider, #[source] reqwest::Error),

    /// An IMDS response body could not be read
    #[error("failed to read {0} IMDS response")]
    ImdsBody(CloudProvider, #[source] reqwest::Error),

    /// The Azure metadata response was not the expected JSON shape
    #[error("failed to decode Azure location: {0}")]
    AzureLocation(#[from] serde_json::Error),

    /// The GCP zone path did not have the expected shape
    #[error("invalid GCP zone format: {0}")]
    InvalidGcpZone(String),

    /// Every metadata endpoint was probed without a successful response
    #[error("failed to detect cloud provider using IMDS")]
    ImdsUnavailable,
}
