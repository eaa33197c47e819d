//! Instance Metadata Service Prober
//!
//! Probes the AWS, Azure, and GCP metadata endpoints in a fixed order and
//! extracts the region from the first one that answers successfully.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::types::{CloudInfo, CloudProvider, DetectError, DetectionSource};

/// IMDS endpoint configuration
///
/// Each endpoint is independently overridable; the defaults are the
/// standard link-local metadata addresses.
#[derive(Debug, Clone)]
pub struct ImdsConfig {
    pub aws_endpoint: String,
    pub azure_endpoint: String,
    pub gcp_endpoint: String,
}

impl Default for ImdsConfig {
    fn default() -> Self {
        Self {
            aws_endpoint: "http://169.254.169.254/latest/meta-data/placement/region".to_string(),
            azure_endpoint:
                "http://169.254.169.254/metadata/instance/compute/location?api-version=2021-02-01"
                    .to_string(),
            gcp_endpoint: "http://metadata.google.internal/computeMetadata/v1/instance/zone"
                .to_string(),
        }
    }
}

/// HTTP client configured for IMDS requests
pub fn default_imds_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("Failed to build IMDS HTTP client")
}

/// One entry in the ordered probe chain
struct Probe<'a> {
    provider: CloudProvider,
    endpoint: &'a str,
    header: Option<(&'static str, &'static str)>,
    parse: fn(&str) -> Result<String, DetectError>,
}

/// Detect cloud provider and region using the default client and endpoints
pub async fn detect_imds_cloud_info() -> Result<CloudInfo, DetectError> {
    detect_imds_cloud_info_with_client(&default_imds_client(), &ImdsConfig::default()).await
}

/// Detect cloud provider and region by probing IMDS endpoints
///
/// Probes run strictly sequentially in AWS, Azure, GCP order; a transport
/// error or non-200 status means "not this provider" and moves on to the
/// next candidate. Callers wanting a bound on the whole sequence should
/// wrap the returned future in `tokio::time::timeout`.
pub async fn detect_imds_cloud_info_with_client(
    client: &reqwest::Client,
    config: &ImdsConfig,
) -> Result<CloudInfo, DetectError> {
    let probes = [
        Probe {
            provider: CloudProvider::Aws,
            endpoint: &config.aws_endpoint,
            header: None,
            parse: parse_aws_region,
        },
        Probe {
            provider: CloudProvider::Azure,
            endpoint: &config.azure_endpoint,
            header: Some(("Metadata", "true")),
            parse: parse_azure_location,
        },
        Probe {
            provider: CloudProvider::Gcp,
            endpoint: &config.gcp_endpoint,
            header: Some(("Metadata-Flavor", "Google")),
            parse: parse_gcp_zone,
        },
    ];

    for probe in probes {
        let mut request = client.get(probe.endpoint);
        if let Some((name, value)) = probe.header {
            request = request.header(name, value);
        }
        let request = request
            .build()
            .map_err(|err| DetectError::ImdsRequest(probe.provider, err))?;

        let response = match client.execute(request).await {
            Ok(response) if response.status() == StatusCode::OK => response,
            Ok(response) => {
                debug!(
                    "IMDS probe for {} answered {}, trying next",
                    probe.provider,
                    response.status()
                );
                continue;
            }
            Err(err) => {
                debug!("IMDS probe for {} unreachable: {}", probe.provider, err);
                continue;
            }
        };

        let body = response
            .text()
            .await
            .map_err(|err| DetectError::ImdsBody(probe.provider, err))?;
        let region = (probe.parse)(&body)?;

        info!("Detected {} ({}) from IMDS", probe.provider, region);
        return Ok(CloudInfo {
            provider: probe.provider,
            region,
            source: DetectionSource::Imds,
        });
    }

    Err(DetectError::ImdsUnavailable)
}

/// AWS returns the region verbatim
fn parse_aws_region(body: &str) -> Result<String, DetectError> {
    Ok(body.to_string())
}

/// Azure returns a JSON object with a `location` field
fn parse_azure_location(body: &str) -> Result<String, DetectError> {
    #[derive(Deserialize)]
    struct Compute {
        location: String,
    }

    let compute: Compute = serde_json::from_str(body)?;
    Ok(compute.location)
}

/// GCP returns a path like `projects/123456789/zones/us-central1-a`; the
/// region is the zone name minus its trailing `-a`/`-b` suffix
fn parse_gcp_zone(body: &str) -> Result<String, DetectError> {
    let parts: Vec<&str> = body.split('/').collect();
    if parts.len() < 4 {
        return Err(DetectError::InvalidGcpZone(body.to_string()));
    }

    let zone = parts[parts.len() - 1];
    let segments: Vec<&str> = zone.split('-').collect();
    if segments.len() < 2 {
        return Err(DetectError::InvalidGcpZone(zone.to_string()));
    }

    Ok(segments[..segments.len() - 1].join("-"))
}
