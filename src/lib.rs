//! Cloud Info Library
//!
//! Detects the cloud provider and region a Kubernetes cluster runs on,
//! using one of two strategies: inspecting node metadata (region labels
//! and provider IDs) through the cluster API, or probing the AWS, Azure,
//! and GCP instance metadata endpoints from the host.

pub mod detect;
pub mod imds;
pub mod node;
pub mod types;

pub use detect::{detect_cloud_info, detect_cloud_info_with};
pub use imds::{
    default_imds_client, detect_imds_cloud_info, detect_imds_cloud_info_with_client, ImdsConfig,
};
pub use node::{
    detect_node_cloud_info, get_node_attributes, parse_provider_id, resolve_provider,
    ClusterNodeSource, NodeAttributes, NodeSource, REGION_LABEL,
};
pub use types::{CloudInfo, CloudProvider, DetectError, DetectionOptions, DetectionSource};
