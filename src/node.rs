//! Node Label Detection
//!
//! Derives the cluster's cloud provider and region from node metadata:
//! the topology region label and the provider ID each node carries.

use std::collections::BTreeSet;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::{api::ListParams, Api, Client};
use tracing::{debug, info};

use crate::types::{CloudInfo, CloudProvider, DetectError, DetectionSource};

/// Label key carrying the topological region of a node
pub const REGION_LABEL: &str = "topology.kubernetes.io/region";

/// Source of cluster node data
///
/// The detection logic only needs "list all nodes"; this seam lets tests
/// substitute a static node list for a live cluster.
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// List all nodes visible to this source
    async fn list_nodes(&self) -> Result<Vec<Node>, DetectError>;
}

#[async_trait]
impl NodeSource for Client {
    async fn list_nodes(&self) -> Result<Vec<Node>, DetectError> {
        let api: Api<Node> = Api::all(self.clone());
        let nodes = api.list(&ListParams::default()).await?;
        Ok(nodes.items)
    }
}

/// Node source backed by the default Kubernetes client
///
/// The connection is established on first use, so callers that never take
/// the node-label path never touch the cluster API.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterNodeSource;

#[async_trait]
impl NodeSource for ClusterNodeSource {
    async fn list_nodes(&self) -> Result<Vec<Node>, DetectError> {
        let client = Client::try_default().await?;
        client.list_nodes().await
    }
}

/// Region labels and provider IDs observed across the node set
#[derive(Debug, Clone, Default)]
pub struct NodeAttributes {
    /// Distinct region labels, in first-seen order
    pub regions: Vec<String>,
    /// All non-empty provider IDs, duplicates retained
    pub provider_ids: Vec<String>,
}

impl NodeAttributes {
    /// Aggregate region labels and provider IDs from a node list
    pub fn from_nodes(nodes: &[Node]) -> Result<Self, DetectError> {
        if nodes.is_empty() {
            return Err(DetectError::NoNodes);
        }

        let mut attributes = NodeAttributes::default();
        for node in nodes {
            let region = node
                .metadata
                .labels
                .as_ref()
                .and_then(|labels| labels.get(REGION_LABEL));
            if let Some(region) = region {
                if !region.is_empty() && !attributes.regions.contains(region) {
                    attributes.regions.push(region.clone());
                }
            }

            let provider_id = node.spec.as_ref().and_then(|spec| spec.provider_id.as_ref());
            if let Some(provider_id) = provider_id {
                if !provider_id.is_empty() {
                    attributes.provider_ids.push(provider_id.clone());
                }
            }
        }

        Ok(attributes)
    }
}

/// Retrieve node attributes from the cluster
pub async fn get_node_attributes(source: &impl NodeSource) -> Result<NodeAttributes, DetectError> {
    let nodes = source.list_nodes().await?;
    let attributes = NodeAttributes::from_nodes(&nodes)?;
    debug!(
        "Aggregated {} provider IDs and {} distinct regions from {} nodes",
        attributes.provider_ids.len(),
        attributes.regions.len(),
        nodes.len()
    );
    Ok(attributes)
}

/// Parse a provider ID of the form `<scheme>://<opaque-path>`
pub fn parse_provider_id(provider_id: &str) -> Result<CloudProvider, DetectError> {
    if provider_id.is_empty() {
        return Err(DetectError::EmptyProviderId);
    }

    match provider_id.split_once("://") {
        Some(("aws", _)) => Ok(CloudProvider::Aws),
        Some(("azure", _)) => Ok(CloudProvider::Azure),
        Some(("gce", _)) => Ok(CloudProvider::Gcp),
        _ => Err(DetectError::UnknownProviderId(provider_id.to_string())),
    }
}

/// Resolve the single provider referenced by a set of provider IDs
///
/// An empty set resolves to [`CloudProvider::Unknown`]; more than one
/// distinct provider is an error listing every name found.
pub fn resolve_provider(provider_ids: &[String]) -> Result<CloudProvider, DetectError> {
    let mut providers = BTreeSet::new();
    for provider_id in provider_ids {
        providers.insert(parse_provider_id(provider_id)?);
    }

    let providers: Vec<CloudProvider> = providers.into_iter().collect();
    match providers.as_slice() {
        [] => Ok(CloudProvider::Unknown),
        [provider] => Ok(*provider),
        _ => Err(DetectError::MultipleProviders(
            providers.iter().map(|p| p.to_string()).collect(),
        )),
    }
}

/// Detect cloud provider and region from node labels and provider IDs
pub async fn detect_node_cloud_info(source: &impl NodeSource) -> Result<CloudInfo, DetectError> {
    let attributes = get_node_attributes(source).await?;

    let provider = resolve_provider(&attributes.provider_ids)?;

    let region = match attributes.regions.as_slice() {
        [region] => region.clone(),
        _ => return Err(DetectError::MultipleRegions(attributes.regions)),
    };

    info!("Detected {} ({}) from node labels", provider, region);
    Ok(CloudInfo {
        provider,
        region,
        source: DetectionSource::NodeLabels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::NodeSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    struct StaticNodes(Vec<Node>);

    #[async_trait]
    impl NodeSource for StaticNodes {
        async fn list_nodes(&self) -> Result<Vec<Node>, DetectError> {
            Ok(self.0.clone())
        }
    }

    fn node(region: Option<&str>, provider_id: Option<&str>) -> Node {
        Node {
            metadata: ObjectMeta {
                labels: region.map(|r| {
                    BTreeMap::from([(REGION_LABEL.to_string(), r.to_string())])
                }),
                ..Default::default()
            },
            spec: provider_id.map(|id| NodeSpec {
                provider_id: Some(id.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_aws_provider_id() {
        let provider = parse_provider_id("aws:///us-west-2a/i-1234567890abcdef0").unwrap();
        assert_eq!(provider, CloudProvider::Aws);
    }

    #[test]
    fn test_parse_azure_provider_id() {
        let provider = parse_provider_id(
            "azure:///subscriptions/12345678-1234-1234-1234-123456789012/resourceGroups/myResourceGroup/providers/Microsoft.Compute/virtualMachines/myVM",
        )
        .unwrap();
        assert_eq!(provider, CloudProvider::Azure);
    }

    #[test]
    fn test_parse_gce_provider_id() {
        let provider = parse_provider_id("gce://my-project/us-central1-a/my-instance").unwrap();
        assert_eq!(provider, CloudProvider::Gcp);
    }

    #[test]
    fn test_parse_empty_provider_id() {
        let err = parse_provider_id("").unwrap_err();
        assert!(matches!(err, DetectError::EmptyProviderId));
        assert_eq!(err.to_string(), "empty provider ID");
    }

    #[test]
    fn test_parse_unknown_provider_id() {
        let err = parse_provider_id("unknown://format").unwrap_err();
        match err {
            DetectError::UnknownProviderId(id) => assert_eq!(id, "unknown://format"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_provider_id_without_separator() {
        let err = parse_provider_id("aws:/missing-separator").unwrap_err();
        assert!(matches!(err, DetectError::UnknownProviderId(_)));
    }

    #[test]
    fn test_resolve_provider_deduplicates() {
        let ids = vec![
            "aws:///us-west-2a/i-1234567890abcdef0".to_string(),
            "aws:///us-west-2b/i-0987654321fedcba0".to_string(),
        ];
        assert_eq!(resolve_provider(&ids).unwrap(), CloudProvider::Aws);
    }

    #[test]
    fn test_resolve_provider_empty_set_is_unknown() {
        assert_eq!(resolve_provider(&[]).unwrap(), CloudProvider::Unknown);
    }

    #[test]
    fn test_aggregation_preserves_first_seen_region_order() {
        let nodes = vec![
            node(Some("us-west-2"), Some("aws:///us-west-2a/i-1")),
            node(Some("us-east-1"), Some("aws:///us-east-1a/i-2")),
            node(Some("us-west-2"), Some("aws:///us-west-2b/i-3")),
            node(None, None),
        ];

        let attributes = NodeAttributes::from_nodes(&nodes).unwrap();
        assert_eq!(attributes.regions, vec!["us-west-2", "us-east-1"]);
        assert_eq!(attributes.provider_ids.len(), 3);
    }

    #[tokio::test]
    async fn test_detects_single_provider_and_region() {
        let source = StaticNodes(vec![
            node(Some("us-west-2"), Some("aws:///us-west-2a/i-1234567890abcdef0")),
            node(Some("us-west-2"), Some("aws:///us-west-2b/i-0987654321fedcba0")),
        ]);

        let info = detect_node_cloud_info(&source).await.unwrap();
        assert_eq!(info.provider, CloudProvider::Aws);
        assert_eq!(info.region, "us-west-2");
        assert_eq!(info.source, DetectionSource::NodeLabels);
    }

    #[tokio::test]
    async fn test_empty_node_list_fails() {
        let source = StaticNodes(Vec::new());
        let err = detect_node_cloud_info(&source).await.unwrap_err();
        assert!(matches!(err, DetectError::NoNodes));
    }

    #[tokio::test]
    async fn test_multiple_regions_fail_in_first_seen_order() {
        let source = StaticNodes(vec![
            node(Some("us-west-2"), Some("aws:///us-west-2a/i-1")),
            node(Some("us-east-1"), Some("aws:///us-east-1a/i-2")),
        ]);

        let err = detect_node_cloud_info(&source).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "multiple regions found: [us-west-2 us-east-1]"
        );
    }

    #[tokio::test]
    async fn test_multiple_providers_fail_naming_both() {
        let source = StaticNodes(vec![
            node(Some("us-west-2"), Some("aws:///us-west-2a/i-1")),
            node(Some("eastus"), Some("azure:///subscriptions/123/virtualMachines/vm")),
        ]);

        let err = detect_node_cloud_info(&source).await.unwrap_err();
        match err {
            DetectError::MultipleProviders(names) => {
                assert_eq!(names.len(), 2);
                assert!(names.contains(&"aws".to_string()));
                assert!(names.contains(&"azure".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unparseable_provider_id_aborts() {
        let source = StaticNodes(vec![node(Some("us-west-2"), Some("unknown://format"))]);

        let err = detect_node_cloud_info(&source).await.unwrap_err();
        assert_eq!(err.to_string(), "unknown provider ID format: unknown://format");
    }

    #[tokio::test]
    async fn test_nodes_without_provider_ids_resolve_to_unknown() {
        let source = StaticNodes(vec![node(Some("us-west-2"), None)]);

        let info = detect_node_cloud_info(&source).await.unwrap();
        assert_eq!(info.provider, CloudProvider::Unknown);
        assert_eq!(info.region, "us-west-2");
    }
}
