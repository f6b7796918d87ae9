//! AWS Signature Version 4 request signing for S3.
//!
//! Only the header-based flavour is implemented: the caller supplies the
//! headers to sign (including `host`, `x-amz-date` and
//! `x-amz-content-sha256`) and gets back the `Authorization` value.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use keeper_types::error::StorageError;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";

/// SHA-256 of an empty payload, the content hash of a body-less GET.
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Format a timestamp as `YYYYMMDDTHHMMSSZ`.
pub fn amz_date(time: &DateTime<Utc>) -> String {
    time.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Lowercase hex encoding.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, StorageError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| StorageError::Transport(format!("request signing failed: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// URI-encode per the SigV4 rules: unreserved characters pass through,
/// everything else is `%XX`. `/` is kept when `keep_slash` is set (paths).
pub fn uri_encode(input: &str, keep_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b'/' if keep_slash => out.push('/'),
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}

/// A request about to be signed.
///
/// `headers` maps lowercase names to values; the map's ordering gives the
/// canonical header order.
#[derive(Debug, Clone)]
pub struct RequestToSign<'a> {
    pub method: &'a str,
    /// Already URI-encoded absolute path.
    pub canonical_uri: &'a str,
    /// Already encoded and sorted query string, or empty.
    pub canonical_query: &'a str,
    pub headers: BTreeMap<String, String>,
    pub payload_sha256: &'a str,
}

impl RequestToSign<'_> {
    /// `name1;name2;...` in canonical order.
    pub fn signed_headers(&self) -> String {
        self.headers
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(";")
    }

    pub fn canonical_request(&self) -> String {
        let mut canonical_headers = String::new();
        for (name, value) in &self.headers {
            let _ = writeln!(canonical_headers, "{name}:{}", value.trim());
        }
        format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            self.method,
            self.canonical_uri,
            self.canonical_query,
            canonical_headers,
            self.signed_headers(),
            self.payload_sha256
        )
    }
}

/// Signing identity and scope.
pub struct Signer<'a> {
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
    pub region: &'a str,
}

impl Signer<'_> {
    fn scope(&self, time: &DateTime<Utc>) -> String {
        format!(
            "{}/{}/{SERVICE}/aws4_request",
            time.format("%Y%m%d"),
            self.region
        )
    }

    pub fn string_to_sign(&self, request: &RequestToSign<'_>, time: &DateTime<Utc>) -> String {
        format!(
            "{ALGORITHM}\n{}\n{}\n{}",
            amz_date(time),
            self.scope(time),
            sha256_hex(request.canonical_request().as_bytes())
        )
    }

    fn signing_key(&self, time: &DateTime<Utc>) -> Result<Vec<u8>, StorageError> {
        let secret = format!("AWS4{}", self.secret_access_key);
        let date_key = hmac_sha256(secret.as_bytes(), time.format("%Y%m%d").to_string().as_bytes())?;
        let region_key = hmac_sha256(&date_key, self.region.as_bytes())?;
        let service_key = hmac_sha256(&region_key, SERVICE.as_bytes())?;
        hmac_sha256(&service_key, b"aws4_request")
    }

    pub fn signature(
        &self,
        request: &RequestToSign<'_>,
        time: &DateTime<Utc>,
    ) -> Result<String, StorageError> {
        let key = self.signing_key(time)?;
        let string_to_sign = self.string_to_sign(request, time);
        Ok(hex_encode(&hmac_sha256(&key, string_to_sign.as_bytes())?))
    }

    /// Value of the `Authorization` header for `request`.
    pub fn authorization(
        &self,
        request: &RequestToSign<'_>,
        time: &DateTime<Utc>,
    ) -> Result<String, StorageError> {
        Ok(format!(
            "{ALGORITHM} Credential={}/{}, SignedHeaders={}, Signature={}",
            self.access_key_id,
            self.scope(time),
            request.signed_headers(),
            self.signature(request, time)?
        ))
    }
}
