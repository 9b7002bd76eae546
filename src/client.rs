use std::time::SystemTime;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};

/// Azure Blob REST API version sent with every request.
const AZURE_API_VERSION: &str = "2023-11-03";

/// Outcome of a create-if-missing container request. "Already exists" is the
/// expected steady state, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Created,
    AlreadyExists,
}

/// Client for the three blob-store operations the tool needs: idempotent
/// container creation, overwrite blob upload, and container enumeration.
///
/// Authentication is SAS-as-query-string: the token's key/value pairs are
/// appended to every request URL after the operation's own parameters.
pub struct BlobStoreClient {
    client: reqwest::Client,
    endpoint: Url,
    sas: String,
}

impl BlobStoreClient {
    /// Build a client for the account endpoint derived from `config`.
    /// Performs no network I/O.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_endpoint(config.endpoint_url()?, &config.sas_token)
    }

    /// Build a client against an explicit endpoint, for emulators and tests.
    pub fn with_endpoint(endpoint: Url, sas_token: &str) -> Result<Self> {
        if endpoint.cannot_be_a_base() {
            return Err(Error::EndpointNotABase {
                endpoint: endpoint.to_string(),
            });
        }
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            sas: normalize_sas(sas_token),
        })
    }

    /// Create the container if it does not exist.
    pub async fn ensure_container(&self, container: &str) -> Result<ContainerStatus> {
        let operation = "create container";
        let url = self.operation_url(&[container], &[("restype", "container")])?;
        let response = self
            .request(self.client.put(url))
            .send()
            .await
            .map_err(|source| Error::Transport { operation, source })?;

        let status = response.status();
        debug!(container, status = status.as_u16(), "create container response");
        if status == StatusCode::CREATED {
            Ok(ContainerStatus::Created)
        } else if status == StatusCode::CONFLICT
            && error_code(&response).as_deref() == Some("ContainerAlreadyExists")
        {
            Ok(ContainerStatus::AlreadyExists)
        } else {
            Err(service_error(operation, response).await)
        }
    }

    /// Upload `body` to `container`/`blob`, unconditionally replacing any
    /// existing blob of that name. No conditional headers are ever sent.
    pub async fn put_blob(&self, container: &str, blob: &str, body: Vec<u8>) -> Result<()> {
        let operation = "upload blob";
        let mut segments = vec![container];
        // Split so '/' in the blob name survives as a path separator.
        segments.extend(blob.split('/'));
        let url = self.operation_url(&segments, &[])?;

        debug!(
            container,
            blob,
            len = body.len(),
            crc32 = crc32fast::hash(&body),
            "uploading blob"
        );

        let response = self
            .request(self.client.put(url))
            .header("x-ms-blob-type", "BlockBlob")
            .header("Content-Type", "application/octet-stream")
            .body(body)
            .send()
            .await
            .map_err(|source| Error::Transport { operation, source })?;

        let status = response.status();
        debug!(container, blob, status = status.as_u16(), "upload response");
        if status == StatusCode::CREATED {
            Ok(())
        } else {
            Err(service_error(operation, response).await)
        }
    }

    /// Enumerate all container names visible to the credential, following
    /// continuation markers until the listing is exhausted.
    pub async fn list_containers(&self) -> Result<Vec<String>> {
        let operation = "list containers";
        let mut names = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut query = vec![("comp", "list")];
            if let Some(marker) = marker.as_deref() {
                query.push(("marker", marker));
            }
            let url = self.operation_url(&[], &query)?;
            let response = self
                .request(self.client.get(url))
                .send()
                .await
                .map_err(|source| Error::Transport { operation, source })?;

            let status = response.status();
            debug!(status = status.as_u16(), "list containers response");
            if status != StatusCode::OK {
                return Err(service_error(operation, response).await);
            }

            let body = response
                .text()
                .await
                .map_err(|source| Error::Transport { operation, source })?;
            let page = parse_container_listing(&body)?;
            names.extend(page.names);
            match page.next_marker {
                Some(next) if !next.is_empty() => marker = Some(next),
                _ => break,
            }
        }

        Ok(names)
    }

    /// Build `{endpoint}/{segments...}?{query}&{sas}`. The SAS token is
    /// appended raw after the operation's own parameters.
    fn operation_url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| Error::EndpointNotABase {
                endpoint: self.endpoint.to_string(),
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        for (key, value) in query {
            url.query_pairs_mut().append_pair(key, value);
        }
        let joined = match url.query() {
            Some(_) => format!("{url}&{}", self.sas),
            None => format!("{url}?{}", self.sas),
        };
        Url::parse(&joined).map_err(|source| Error::InvalidEndpoint {
            account: self.endpoint.to_string(),
            source,
        })
    }

    /// Attach the headers every request carries.
    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("x-ms-version", AZURE_API_VERSION)
            .header("x-ms-date", httpdate::fmt_http_date(SystemTime::now()))
    }
}

/// SAS tokens are sometimes issued with a leading `?`; strip it so the token
/// always joins cleanly onto a query string.
fn normalize_sas(token: &str) -> String {
    token.strip_prefix('?').unwrap_or(token).to_owned()
}

fn error_code(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get("x-ms-error-code")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

/// Turn a non-success response into a service error carrying the
/// `x-ms-error-code` and body text.
async fn service_error(operation: &'static str, response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let code = error_code(&response);
    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    let message = match (code, body.is_empty()) {
        (Some(code), true) => code,
        (Some(code), false) => format!("{code}: {body}"),
        (None, false) => body.to_owned(),
        (None, true) => "no error detail in response".to_owned(),
    };
    Error::Service {
        operation,
        status,
        message,
    }
}

#[derive(Debug, Deserialize)]
struct EnumerationResults {
    #[serde(rename = "Containers", default)]
    containers: Containers,
    #[serde(rename = "NextMarker")]
    next_marker: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Containers {
    #[serde(rename = "Container", default)]
    container: Vec<ContainerEntry>,
}

#[derive(Debug, Deserialize)]
struct ContainerEntry {
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Debug)]
struct ListingPage {
    names: Vec<String>,
    next_marker: Option<String>,
}

fn parse_container_listing(body: &str) -> Result<ListingPage> {
    let results: EnumerationResults =
        serde_xml_rs::from_str(body).map_err(|e| Error::Decode {
            operation: "list containers",
            message: e.to_string(),
        })?;
    Ok(ListingPage {
        names: results
            .containers
            .container
            .into_iter()
            .map(|entry| entry.name)
            .collect(),
        next_marker: results.next_marker,
    })
}
