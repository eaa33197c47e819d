//! Detection Coordinator
//!
//! Dispatches to node-label or IMDS detection based on the configured
//! options. Node-label detection takes precedence when both are enabled;
//! a failure in one strategy is never retried with the other.

use crate::imds::{default_imds_client, detect_imds_cloud_info_with_client, ImdsConfig};
use crate::node::{detect_node_cloud_info, NodeSource};
use crate::types::{CloudInfo, DetectError, DetectionOptions};

/// Detect cloud provider and region using the selected strategy
pub async fn detect_cloud_info(
    source: &impl NodeSource,
    options: DetectionOptions,
) -> Result<CloudInfo, DetectError> {
    detect_cloud_info_with(source, &default_imds_client(), &ImdsConfig::default(), options).await
}

/// Detect cloud provider and region with an injected IMDS client and config
pub async fn detect_cloud_info_with(
    source: &impl NodeSource,
    http: &reqwest::Client,
    imds: &ImdsConfig,
    options: DetectionOptions,
) -> Result<CloudInfo, DetectError> {
    if options.use_node_labels {
        detect_node_cloud_info(source).await
    } else if options.use_imds {
        detect_imds_cloud_info_with_client(http, imds).await
    } else {
        Err(DetectError::NoMethodSpecified)
    }
}
