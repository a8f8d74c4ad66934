// # GoDaddy Record Store
//
// `RecordStore` implementation for the GoDaddy v1 domains API.
//
// ## Behavior
//
// - One HTTP request per store call, raced against the caller's
//   cancellation token
// - No retries and no rate limiting: pacing is done by the caller's shared
//   token bucket, failures are returned as they are
// - Per-request timeout from `StoreConfig::http_timeout_secs`
// - Dry-run mode performs reads and logs writes without sending them
//
// ## Security
//
// - API key and secret NEVER appear in logs or Debug output
// - Construction fails if either is empty
//
// ## API Reference
//
// - Docs: https://developer.godaddy.com/doc/endpoint/domains/
// - Get set:     GET    `/v1/domains/{domain}/records/{type}/{name}`
// - Replace set: PUT    `/v1/domains/{domain}/records/{type}/{name}`
// - Delete set:  DELETE `/v1/domains/{domain}/records/{type}/{name}`
// - Add records: PATCH  `/v1/domains/{domain}/records`
//
// Inspect the live records of a domain with:
//
// ```text
// curl -H "Authorization: sso-key $GODADDY_API_KEY:$GODADDY_API_SECRET" \
//      https://api.godaddy.com/v1/domains/<domain>/records
// ```

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use rrsync_core::{
    DnsRecord, DnsUpdateRecord, Error, RecordStore, RecordType, Result, StoreConfig, StoreMode,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Path prefix of the domains API
const DOMAINS_PATH: [&str; 2] = ["v1", "domains"];

/// Record as sent to and received from the API
///
/// Zero and empty fields are left out of request bodies. Priority is only
/// sent for MX and SRV, the remaining SRV fields only for SRV.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ApiRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    data: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    record_type: Option<RecordType>,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    ttl: u32,
    #[serde(default, skip_serializing_if = "is_zero_u16")]
    priority: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    protocol: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    service: String,
    #[serde(default, skip_serializing_if = "is_zero_u16")]
    port: u16,
    #[serde(default, skip_serializing_if = "is_zero_u16")]
    weight: u16,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

fn is_zero_u16(v: &u16) -> bool {
    *v == 0
}

impl ApiRecord {
    /// Body entry of a whole-set replace; name and type come from the URL
    fn from_update(rec: &DnsUpdateRecord, record_type: RecordType) -> Self {
        let mut api = ApiRecord {
            data: rec.data.clone(),
            ttl: rec.ttl,
            ..Default::default()
        };
        if record_type.has_priority() {
            api.priority = rec.priority;
        }
        if record_type == RecordType::Srv {
            api.protocol = rec.protocol.clone();
            api.service = rec.service.clone();
            api.port = rec.port;
            api.weight = rec.weight;
        }
        api
    }

    /// Body entry of an add, which carries name and type itself
    fn from_record(rec: &DnsRecord) -> Self {
        ApiRecord {
            name: rec.name.clone(),
            record_type: Some(rec.record_type),
            ..Self::from_update(&rec.to_update_record(), rec.record_type)
        }
    }

    /// Convert a fetched entry, filling name and type from the request
    /// when the reply leaves them out
    fn into_record(self, record_type: RecordType, name: &str) -> DnsRecord {
        DnsRecord {
            name: if self.name.is_empty() {
                name.to_string()
            } else {
                self.name
            },
            record_type: self.record_type.unwrap_or(record_type),
            data: self.data,
            ttl: self.ttl,
            priority: self.priority,
            weight: self.weight,
            protocol: self.protocol,
            service: self.service,
            port: self.port,
        }
    }
}

/// Error reply body, like `{"code": "INVALID_VALUE_ENUM", "message": "..."}`
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

/// Record store backed by the GoDaddy v1 domains API
///
/// # Dry-Run Mode
///
/// When built from a config in [`StoreMode::DryRun`], the store will:
/// - Perform all GET requests
/// - Log the method, URL and payload of every write
/// - **NOT** send the write
///
/// # Security
///
/// The Debug implementation does NOT expose the API key or secret.
pub struct GoDaddyStore {
    /// API base URL, like `https://api.godaddy.com`
    api_url: Url,

    /// ⚠️ NEVER log this value
    api_key: String,

    /// ⚠️ NEVER log this value
    api_secret: String,

    /// HTTP client with the configured timeout
    client: reqwest::Client,

    /// If true, perform GET requests but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for GoDaddyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoDaddyStore")
            .field("api_url", &self.api_url.as_str())
            .field("api_key", &"<REDACTED>")
            .field("api_secret", &"<REDACTED>")
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl GoDaddyStore {
    /// Create a store from a validated configuration
    pub fn new(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let api_url = Url::parse(&config.api_url).map_err(|e| {
            Error::config(format!("invalid API URL '{}': {}", config.api_url, e))
        })?;
        if api_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "API URL '{}' cannot be used as a base URL",
                config.api_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| Error::config(format!("cannot build HTTP client: {}", e)))?;

        let dry_run = config.mode == StoreMode::DryRun;
        if dry_run {
            tracing::warn!("GoDaddy store running in DRY-RUN mode - no changes will be made");
        }

        Ok(Self {
            api_url,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            client,
            dry_run,
        })
    }

    /// Whether writes are logged instead of sent
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// URL of `{domain}/records` followed by `segments`
    fn records_url(&self, domain: &str, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config("API URL cannot be used as a base URL"))?
            .pop_if_empty()
            .extend(DOMAINS_PATH)
            .extend([domain, "records"])
            .extend(segments);
        Ok(url)
    }

    fn set_url(&self, domain: &str, record_type: RecordType, name: &str) -> Result<Url> {
        self.records_url(domain, &[record_type.as_str(), name])
    }

    /// Send one request and map a non-2xx reply to an error
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&[ApiRecord]>,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response> {
        tracing::debug!("GoDaddy API request: {} {}", method, url);

        let mut request = self
            .client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(
                AUTHORIZATION,
                format!("sso-key {}:{}", self.api_key, self.api_secret),
            );
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            sent = request.send() => sent.map_err(|e| {
                Error::transport(format!("HTTP request failed: {}", e.without_url()))
            })?,
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            body = response.bytes() => body.map_err(|e| {
                Error::transport(format!(
                    "cannot read error reply ({}): {}",
                    status,
                    e.without_url()
                ))
            })?,
        };
        match serde_json::from_slice::<ApiErrorBody>(&body) {
            Ok(err) => Err(Error::remote_api(status.as_u16(), err.code, err.message)),
            Err(_) => Err(Error::remote_api(
                status.as_u16(),
                None,
                format!("bad http reply status ({})", status),
            )),
        }
    }

    /// Send a write, or only log it in dry-run mode
    async fn write(
        &self,
        method: Method,
        url: Url,
        body: Option<&[ApiRecord]>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if self.dry_run {
            let payload = match body {
                Some(records) => serde_json::to_string(records)?,
                None => String::new(),
            };
            tracing::info!(
                "[DRY-RUN] Would send {} request to {} with payload: {}",
                method,
                url,
                payload
            );
            return Ok(());
        }

        self.send(method, url, body, cancel).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for GoDaddyStore {
    async fn get_records(
        &self,
        domain: &str,
        record_type: RecordType,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<DnsRecord>> {
        let url = self.set_url(domain, record_type, name)?;
        let response = self.send(Method::GET, url, None, cancel).await?;

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            body = response.bytes() => body.map_err(|e| {
                Error::transport(format!("cannot read reply: {}", e.without_url()))
            })?,
        };
        let records: Vec<ApiRecord> = serde_json::from_slice(&body)
            .map_err(|e| Error::decode(format!("cannot decode json reply: {}", e)))?;

        tracing::debug!("GoDaddy API returned {} records", records.len());
        Ok(records
            .into_iter()
            .map(|r| r.into_record(record_type, name))
            .collect())
    }

    async fn add_records(
        &self,
        domain: &str,
        records: &[DnsRecord],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let url = self.records_url(domain, &[])?;
        let body: Vec<ApiRecord> = records.iter().map(ApiRecord::from_record).collect();
        self.write(Method::PATCH, url, Some(&body), cancel).await
    }

    async fn set_records(
        &self,
        domain: &str,
        record_type: RecordType,
        name: &str,
        records: &[DnsUpdateRecord],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let url = self.set_url(domain, record_type, name)?;
        let body: Vec<ApiRecord> = records
            .iter()
            .map(|r| ApiRecord::from_update(r, record_type))
            .collect();
        self.write(Method::PUT, url, Some(&body), cancel).await
    }

    async fn del_records(
        &self,
        domain: &str,
        record_type: RecordType,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let url = self.set_url(domain, record_type, name)?;
        self.write(Method::DELETE, url, None, cancel).await
    }

    fn store_name(&self) -> &'static str {
        "godaddy"
    }
}
