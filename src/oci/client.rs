//! OCI Core Services API client implementation.
//!
//! This module provides the signed HTTP client for the Core Services REST
//! API (`20160918`) covering networking, compute and the image catalog.

use async_trait::async_trait;
use reqwest::{header, Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{OciError, Result, RonzzError};

use super::api::{ComputeApi, ImageCatalog, LifecycleApi, VirtualNetworkApi};
use super::auth::OciCredentials;
use super::signer::{RequestSigner, JSON_CONTENT_TYPE};
use super::types::{
    CreateInternetGatewayDetails, CreateRouteTableDetails, CreateSecurityListDetails,
    CreateSubnetDetails, CreateVcnDetails, Image, ImageQuery, Instance, InternetGateway,
    LaunchInstanceDetails, LifecycleProbe, LifecycleState, ResourceKind, RouteTable,
    SecurityList, Subnet, Vcn, Vnic, VnicAttachment,
};

/// Core Services API version path segment.
pub const API_VERSION: &str = "20160918";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of attempts for idempotent requests.
const MAX_RETRIES: u32 = 3;

/// Delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Upper bound on a server-requested retry delay.
const MAX_RETRY_DELAY_SECS: u64 = 30;

/// Error body returned by OCI.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: String,
    message: String,
}

/// OCI Core Services API client.
#[derive(Debug, Clone)]
pub struct OciClient {
    /// HTTP client.
    client: Client,
    /// Request signer.
    signer: RequestSigner,
    /// Base URL including the API version.
    endpoint: String,
    /// Region the client targets.
    region: String,
    /// Longest delay honored before a retry.
    max_retry_delay: Duration,
}

impl OciClient {
    /// Creates a client for a region from loaded credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the private key is unusable or the HTTP client
    /// cannot be created.
    pub fn new(credentials: &OciCredentials, region: &str) -> Result<Self> {
        let signer = RequestSigner::from_key_file(credentials.key_id(), &credentials.key_file)?;
        let endpoint = format!("https://iaas.{region}.oraclecloud.com/{API_VERSION}");
        Self::with_endpoint(signer, region, endpoint)
    }

    /// Creates a client against an explicit endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_endpoint(
        signer: RequestSigner,
        region: &str,
        endpoint: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| OciError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            signer,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            region: region.to_string(),
            max_retry_delay: Duration::from_secs(MAX_RETRY_DELAY_SECS),
        })
    }

    /// Caps the delay honored from a `retry-after` header.
    #[must_use]
    pub const fn with_max_retry_delay(mut self, max_retry_delay: Duration) -> Self {
        self.max_retry_delay = max_retry_delay;
        self
    }

    /// Returns the region the client targets.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/{path}", self.endpoint))
            .map_err(|e| OciError::network(format!("Invalid URL for {path}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Executes an idempotent request, retrying transient failures.
    async fn execute_idempotent(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<String> {
        let url = self.url(path, query)?;
        let mut last_error = None;
        let mut delay = Duration::ZERO;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                debug!(
                    "Retry attempt {attempt} of {MAX_RETRIES} for {method} {path} in {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match self.execute_once(method.clone(), &url, None).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() => {
                    delay = self.retry_delay(&e, attempt + 1);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            RonzzError::Oci(OciError::NetworkError {
                message: String::from("Max retries exceeded"),
            })
        }))
    }

    /// Delay before the next attempt: the server's `retry-after` when rate
    /// limited, otherwise linear backoff. Never longer than `max_retry_delay`.
    fn retry_delay(&self, error: &RonzzError, attempt: u32) -> Duration {
        error
            .retry_delay_secs()
            .map_or_else(
                || Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt)),
                Duration::from_secs,
            )
            .min(self.max_retry_delay)
    }

    /// Executes a create request once; creates are never retried.
    async fn execute_create<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<String> {
        let url = self.url(path, &[])?;
        let payload = serde_json::to_vec(body)
            .map_err(|e| OciError::invalid_response(format!("Failed to encode request: {e}")))?;
        self.execute_once(Method::POST, &url, Some(payload)).await
    }

    /// Executes a single signed request and returns the response body.
    async fn execute_once(&self, method: Method, url: &Url, body: Option<Vec<u8>>) -> Result<String> {
        trace!("{method} {url}");

        let signed = self.signer.sign(&method, url, body.as_deref())?;

        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .header(header::DATE, &signed.date)
            .header(header::AUTHORIZATION, &signed.authorization)
            .header(header::ACCEPT, JSON_CONTENT_TYPE);

        if let Some(body) = body {
            if let Some(digest) = &signed.content_sha256 {
                request = request.header("x-content-sha256", digest);
            }
            request = request
                .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
                .header("opc-retry-token", uuid::Uuid::new_v4().simple().to_string())
                .body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| OciError::network(format!("Request failed: {e}")))?;

        Self::read_response(response, url.path()).await
    }

    async fn read_response(response: Response, resource: &str) -> Result<String> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or_default();
            let retry_after = if retry_after == 0 { 60 } else { retry_after };

            return Err(RonzzError::Oci(OciError::RateLimited {
                retry_after_secs: retry_after,
            }));
        }

        let body = response
            .text()
            .await
            .map_err(|e| OciError::network(format!("Failed to read response: {e}")))?;

        if status.is_success() {
            return Ok(body);
        }

        let (code, message) = serde_json::from_str::<ApiErrorBody>(&body)
            .map_or_else(|_| (String::from("Unknown"), body.clone()), |e| (e.code, e.message));

        match status {
            StatusCode::NOT_FOUND => Err(RonzzError::Oci(OciError::NotFound {
                resource: resource.to_string(),
            })),
            StatusCode::UNAUTHORIZED => Err(RonzzError::Oci(OciError::AuthenticationFailed {
                message: format!("{code}: {message}"),
            })),
            _ => Err(OciError::api_error(status.as_u16(), code, message).into()),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let body = self.execute_idempotent(Method::GET, path, query).await?;
        parse(&body)
    }

    async fn create<B, T>(&self, path: &str, details: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let body = self.execute_create(path, details).await?;
        parse(&body)
    }
}

fn parse<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| OciError::invalid_response(format!("Failed to parse response: {e}")).into())
}

#[async_trait]
impl VirtualNetworkApi for OciClient {
    async fn create_vcn(&self, details: &CreateVcnDetails) -> Result<Vcn> {
        self.create("vcns", details).await
    }

    async fn create_internet_gateway(
        &self,
        details: &CreateInternetGatewayDetails,
    ) -> Result<InternetGateway> {
        self.create("internetGateways", details).await
    }

    async fn create_route_table(&self, details: &CreateRouteTableDetails) -> Result<RouteTable> {
        self.create("routeTables", details).await
    }

    async fn create_security_list(
        &self,
        details: &CreateSecurityListDetails,
    ) -> Result<SecurityList> {
        self.create("securityLists", details).await
    }

    async fn create_subnet(&self, details: &CreateSubnetDetails) -> Result<Subnet> {
        self.create("subnets", details).await
    }

    async fn get_subnet(&self, subnet_id: &str) -> Result<Subnet> {
        self.get(&format!("subnets/{subnet_id}"), &[]).await
    }

    async fn get_vnic(&self, vnic_id: &str) -> Result<Vnic> {
        self.get(&format!("vnics/{vnic_id}"), &[]).await
    }
}

#[async_trait]
impl ComputeApi for OciClient {
    async fn launch_instance(&self, details: &LaunchInstanceDetails) -> Result<Instance> {
        self.create("instances", details).await
    }

    async fn get_instance(&self, instance_id: &str) -> Result<Instance> {
        self.get(&format!("instances/{instance_id}"), &[]).await
    }

    async fn list_vnic_attachments(
        &self,
        compartment_id: &str,
        instance_id: &str,
    ) -> Result<Vec<VnicAttachment>> {
        let query = [
            ("compartmentId", compartment_id.to_string()),
            ("instanceId", instance_id.to_string()),
        ];
        self.get("vnicAttachments", &query).await
    }
}

#[async_trait]
impl ImageCatalog for OciClient {
    async fn list_images(&self, query: &ImageQuery) -> Result<Vec<Image>> {
        self.get("images", &query.to_params()).await
    }

    async fn get_image(&self, image_id: &str) -> Result<Option<Image>> {
        match self.get(&format!("images/{image_id}"), &[]).await {
            Ok(image) => Ok(Some(image)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl LifecycleApi for OciClient {
    async fn resource_state(
        &self,
        kind: ResourceKind,
        id: &str,
    ) -> Result<Option<LifecycleState>> {
        let path = format!("{}/{id}", kind.api_path());
        match self.get::<LifecycleProbe>(&path, &[]).await {
            Ok(probe) => Ok(Some(probe.lifecycle_state)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn delete_resource(&self, kind: ResourceKind, id: &str) -> Result<()> {
        let path = format!("{}/{id}", kind.api_path());
        let query = if kind == ResourceKind::Instance {
            vec![("preserveBootVolume", String::from("false"))]
        } else {
            Vec::new()
        };
        self.execute_idempotent(Method::DELETE, &path, &query).await?;
        Ok(())
    }
}
