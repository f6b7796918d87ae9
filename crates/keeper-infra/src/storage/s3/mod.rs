//! S3-compatible blob store over plain HTTPS.
//!
//! Requests are signed with SigV4 (see [`sigv4`]). The object ETag is the
//! version token; conditional writes use `If-Match` / `If-None-Match: *`,
//! which S3 and most S3-compatible services honour on PUT.

pub mod sigv4;

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{Client, Method, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};

use keeper_core::storage::blob_store::BlobStore;
use keeper_types::config::BucketConfig;
use keeper_types::error::{ConfigError, StorageError};
use keeper_types::storage::{ObjectVersion, StoredObject, WriteCondition};

use self::sigv4::{RequestToSign, Signer};

/// Version used when a response carries no ETag. `If-Match: *` still
/// requires the object to exist.
const FALLBACK_VERSION: &str = "*";

/// S3 implementation of `BlobStore`.
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    region: String,
    endpoint: Option<Url>,
    path_style: bool,
    access_key_id: String,
    secret_access_key: SecretString,
}

impl S3BlobStore {
    /// Build a client for the `[bucket]` config section.
    ///
    /// Fails if the bucket name or either half of the credentials is missing,
    /// or if the custom endpoint is not a valid URL.
    pub fn new(config: &BucketConfig, timeout: Duration) -> Result<Self, ConfigError> {
        let bucket = config.bucket_name()?.to_string();
        let credentials = config.credentials()?;

        let endpoint = match config.endpoint.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(
                Url::parse(raw)
                    .map_err(|e| ConfigError::Invalid(format!("bucket.endpoint {raw:?}: {e}")))?,
            ),
            _ => None,
        };

        let mut builder = Client::builder().timeout(timeout);
        // Local S3-compatible servers are never reached through a proxy.
        if endpoint.as_ref().is_some_and(is_loopback) {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            bucket,
            region: config.region.clone(),
            endpoint,
            path_style: config.path_style,
            access_key_id: credentials.access_key_id,
            secret_access_key: credentials.secret_access_key,
        })
    }

    /// Absolute URL of `key`.
    ///
    /// AWS: `https://{bucket}.s3.{region}.amazonaws.com/{key}`. With a custom
    /// endpoint the bucket goes into the path when `path_style` is set,
    /// otherwise it is prefixed to the endpoint host.
    ///
    /// The key is encoded as a single path segment (`/` becomes `%2F`), so
    /// `.` and `..` inside a key never collapse into another object's path.
    pub fn object_url(&self, key: &str) -> Result<Url, StorageError> {
        let encoded = sigv4::uri_encode(key, false);
        let raw = match &self.endpoint {
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{encoded}",
                self.bucket, self.region
            ),
            Some(endpoint) if self.path_style => format!(
                "{}/{}/{encoded}",
                endpoint.as_str().trim_end_matches('/'),
                self.bucket
            ),
            Some(endpoint) => {
                let host = endpoint.host_str().unwrap_or_default();
                let port = endpoint
                    .port()
                    .map(|p| format!(":{p}"))
                    .unwrap_or_default();
                format!(
                    "{}://{}.{host}{port}/{encoded}",
                    endpoint.scheme(),
                    self.bucket
                )
            }
        };
        let url = Url::parse(&raw).map_err(|e| StorageError::InvalidKey(format!("{key}: {e}")))?;
        if !url.path().ends_with(&format!("/{encoded}")) {
            return Err(StorageError::InvalidKey(format!(
                "{key}: does not map to a single object path"
            )));
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        key: &str,
        body: Vec<u8>,
        extra_headers: Vec<(&'static str, String)>,
    ) -> Result<reqwest::Response, StorageError> {
        let url = self.object_url(key)?;
        let now = chrono::Utc::now();
        let payload_sha256 = sigv4::sha256_hex(&body);

        let host = match url.port() {
            Some(port) => format!("{}:{port}", url.host_str().unwrap_or_default()),
            None => url.host_str().unwrap_or_default().to_string(),
        };

        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), host);
        headers.insert("x-amz-content-sha256".to_string(), payload_sha256.clone());
        headers.insert("x-amz-date".to_string(), sigv4::amz_date(&now));
        for (name, value) in extra_headers {
            headers.insert(name.to_string(), value);
        }

        let method_name = method.as_str().to_string();
        let to_sign = RequestToSign {
            method: &method_name,
            canonical_uri: url.path(),
            canonical_query: "",
            headers,
            payload_sha256: &payload_sha256,
        };
        let signer = Signer {
            access_key_id: &self.access_key_id,
            secret_access_key: self.secret_access_key.expose_secret(),
            region: &self.region,
        };
        let authorization = signer.authorization(&to_sign, &now)?;

        let mut request = self
            .client
            .request(method, url.clone())
            .header("authorization", authorization);
        // reqwest derives Host from the URL itself.
        for (name, value) in to_sign.headers.iter().filter(|(name, _)| *name != "host") {
            request = request.header(name.as_str(), value.as_str());
        }

        request
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_matches(['[', ']'])
            .parse::<std::net::IpAddr>()
            .is_ok_and(|ip| ip.is_loopback()),
        None => false,
    }
}

fn etag_version(response: &reqwest::Response) -> ObjectVersion {
    let etag = response
        .headers()
        .get(reqwest::header::ETAG)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty());
    ObjectVersion::new(etag.unwrap_or(FALLBACK_VERSION))
}

/// Pull `<Code>` out of an S3 XML error body, falling back to the raw text.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Some(start) = body.find("<Code>") {
        let rest = &body[start + "<Code>".len()..];
        if let Some(end) = rest.find("</Code>") {
            return rest[..end].to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

/// Classify a non-success PUT status.
fn put_failure(status: StatusCode, condition: &WriteCondition, body: &str) -> StorageError {
    match status {
        StatusCode::PRECONDITION_FAILED | StatusCode::CONFLICT => StorageError::PreconditionFailed,
        // The object we expected to replace is gone.
        StatusCode::NOT_FOUND if matches!(condition, WriteCondition::IfMatch(_)) => {
            StorageError::PreconditionFailed
        }
        _ => StorageError::Backend {
            status: status.as_u16(),
            message: error_message(status, body),
        },
    }
}

impl BlobStore for S3BlobStore {
    fn name(&self) -> &str {
        "s3"
    }

    async fn get_object(&self, key: &str) -> Result<StoredObject, StorageError> {
        let response = self.send(Method::GET, key, Vec::new(), Vec::new()).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Backend {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        let version = etag_version(&response);
        let body = response
            .bytes()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        tracing::trace!(key, version = %version, bytes = body.len(), "fetched object");
        Ok(StoredObject {
            body: body.to_vec(),
            version,
        })
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        condition: &WriteCondition,
    ) -> Result<ObjectVersion, StorageError> {
        let mut headers = vec![("content-type", "application/json".to_string())];
        match condition {
            WriteCondition::Unconditional => {}
            WriteCondition::IfMatch(version) => headers.push(("if-match", version.to_string())),
            WriteCondition::IfAbsent => headers.push(("if-none-match", "*".to_string())),
        }

        let response = self.send(Method::PUT, key, body, headers).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = put_failure(status, condition, &body);
            tracing::debug!(key, status = status.as_u16(), error = %err, "put rejected");
            return Err(err);
        }

        Ok(etag_version(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn bucket_config() -> BucketConfig {
        BucketConfig {
            name: Some("bookmarks".to_string()),
            key: Some("bookmarks.json".to_string()),
            region: "eu-west-1".to_string(),
            access_key_id: Some("AKIDTEST".to_string()),
            secret_access_key: Some(SecretString::from("secret".to_string())),
            ..BucketConfig::default()
        }
    }

    fn store(config: &BucketConfig) -> S3BlobStore {
        S3BlobStore::new(config, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_new_requires_bucket_name() {
        let mut config = bucket_config();
        config.name = Some("  ".to_string());
        let err = S3BlobStore::new(&config, Duration::from_secs(5)).err().unwrap();
        assert_eq!(err, ConfigError::MissingBucketName);
    }

    #[test]
    fn test_new_requires_credentials() {
        let mut config = bucket_config();
        config.secret_access_key = None;
        let err = S3BlobStore::new(&config, Duration::from_secs(5)).err().unwrap();
        assert_eq!(err, ConfigError::MissingCredentials);
    }

    #[test]
    fn test_new_rejects_bad_endpoint() {
        let mut config = bucket_config();
        config.endpoint = Some("not a url".to_string());
        let err = S3BlobStore::new(&config, Duration::from_secs(5)).err().unwrap();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_aws_virtual_hosted_url() {
        let url = store(&bucket_config()).object_url("42-bookmarks.json").unwrap();
        assert_eq!(
            url.as_str(),
            "https://bookmarks.s3.eu-west-1.amazonaws.com/42-bookmarks.json"
        );
    }

    #[test]
    fn test_custom_endpoint_path_style_url() {
        let mut config = bucket_config();
        config.endpoint = Some("http://localhost:9000/".to_string());
        config.path_style = true;
        let url = store(&config).object_url("a b.json").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/bookmarks/a%20b.json");
    }

    #[test]
    fn test_dot_segments_in_key_stay_inside_the_object_name() {
        let mut config = bucket_config();
        let aws = store(&config);
        let traversal = aws.object_url("mallory/../bob-bookmarks.json").unwrap();
        let direct = aws.object_url("bob-bookmarks.json").unwrap();
        assert_ne!(traversal, direct);
        assert_eq!(traversal.path(), "/mallory%2F..%2Fbob-bookmarks.json");

        config.endpoint = Some("http://localhost:9000".to_string());
        config.path_style = true;
        let url = store(&config).object_url("../bob-bookmarks.json").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/bookmarks/..%2Fbob-bookmarks.json");
        let err = store(&config).object_url("..").unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[test]
    fn test_custom_endpoint_virtual_hosted_url() {
        let mut config = bucket_config();
        config.endpoint = Some("https://storage.example.com".to_string());
        let url = store(&config).object_url("k").unwrap();
        assert_eq!(url.as_str(), "https://bookmarks.storage.example.com/k");
    }

    #[test]
    fn test_is_loopback() {
        for raw in ["http://localhost:9000", "http://127.0.0.1:9000", "http://[::1]:9000"] {
            assert!(is_loopback(&Url::parse(raw).unwrap()), "{raw}");
        }
        assert!(!is_loopback(&Url::parse("https://storage.example.com").unwrap()));
    }

    #[test]
    fn test_error_message_extracts_code() {
        let body = "<?xml version=\"1.0\"?><Error><Code>AccessDenied</Code><Message>no</Message></Error>";
        assert_eq!(error_message(StatusCode::FORBIDDEN, body), "AccessDenied");
        assert_eq!(error_message(StatusCode::FORBIDDEN, ""), "Forbidden");
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, " upstream down "), "upstream down");
    }

    #[test]
    fn test_put_failure_classification() {
        let stale = WriteCondition::IfMatch(ObjectVersion::new("\"abc\""));
        assert_eq!(
            put_failure(StatusCode::PRECONDITION_FAILED, &stale, ""),
            StorageError::PreconditionFailed
        );
        assert_eq!(
            put_failure(StatusCode::CONFLICT, &WriteCondition::IfAbsent, ""),
            StorageError::PreconditionFailed
        );
        assert_eq!(
            put_failure(StatusCode::NOT_FOUND, &stale, ""),
            StorageError::PreconditionFailed
        );
        assert_eq!(
            put_failure(StatusCode::NOT_FOUND, &WriteCondition::Unconditional, ""),
            StorageError::Backend {
                status: 404,
                message: "Not Found".to_string()
            }
        );
    }

    /// Serve one canned HTTP response and hand back the raw request head.
    async fn one_shot_server(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 16 * 1024];
            let mut received = Vec::new();
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                received.extend_from_slice(&buf[..n]);
                if n == 0 || received.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&received).to_string()
        });
        (endpoint, handle)
    }

    fn local_config(endpoint: String) -> BucketConfig {
        BucketConfig {
            endpoint: Some(endpoint),
            path_style: true,
            ..bucket_config()
        }
    }

    #[tokio::test]
    async fn test_get_maps_404_to_not_found() {
        let (endpoint, server) = one_shot_server(
            "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;
        let store = store(&local_config(endpoint));

        let err = store.get_object("42-bookmarks.json").await.unwrap_err();
        assert_eq!(err, StorageError::NotFound);

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /bookmarks/42-bookmarks.json HTTP/1.1"));
        assert!(request.to_lowercase().contains("authorization: aws4-hmac-sha256 credential=akidtest/"));
    }

    #[tokio::test]
    async fn test_get_returns_body_and_etag() {
        let (endpoint, server) = one_shot_server(
            "HTTP/1.1 200 OK\r\netag: \"v1\"\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}",
        )
        .await;
        let store = store(&local_config(endpoint));

        let object = store.get_object("k").await.unwrap();
        assert_eq!(object.body, b"{}");
        assert_eq!(object.version, ObjectVersion::new("\"v1\""));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_conditional_put_sends_if_match_and_maps_412() {
        let (endpoint, server) = one_shot_server(
            "HTTP/1.1 412 Precondition Failed\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;
        let store = store(&local_config(endpoint));

        let err = store
            .put_object(
                "k",
                b"{}".to_vec(),
                &WriteCondition::IfMatch(ObjectVersion::new("\"v1\"")),
            )
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::PreconditionFailed);

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("put /bookmarks/k http/1.1"));
        assert!(request.contains("if-match: \"v1\""));
    }
}
