//! AWS Signature Version 4 request signing for the knowledge-base `Retrieve` call.
//!
//! Credentials come from `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` /
//! `AWS_SESSION_TOKEN`, or from a profile in the shared credentials file
//! (`AWS_SHARED_CREDENTIALS_FILE`, else `~/.aws/credentials`, profile `AWS_PROFILE` or
//! `default`).

use crate::advisor::tools::knowledge_base::KnowledgeBaseError;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNING_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Signing name of the Bedrock runtime services, `bedrock-agent-runtime` included.
pub const BEDROCK_SIGNING_NAME: &str = "bedrock";

/// Long-term or temporary AWS credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AwsCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Resolve credentials from the process environment, then the shared credentials file.
    pub fn resolve() -> Option<Self> {
        Self::resolve_with(|key| std::env::var(key).ok())
    }

    pub fn resolve_with<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(credentials) = Self::from_lookup(&lookup) {
            return Some(credentials);
        }

        let path = shared_credentials_path(&lookup)?;
        let contents = std::fs::read_to_string(&path).ok()?;
        let profile = non_empty(lookup("AWS_PROFILE")).unwrap_or_else(|| "default".to_string());
        let credentials = Self::from_profile(&contents, &profile);
        if credentials.is_some() {
            log::debug!("AWS credentials from profile '{}' in {}", profile, path.display());
        }
        credentials
    }

    /// Credentials from the `AWS_*` environment variables.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_key_id = non_empty(lookup("AWS_ACCESS_KEY_ID"))?;
        let secret_access_key = non_empty(lookup("AWS_SECRET_ACCESS_KEY"))?;
        Some(Self {
            access_key_id,
            secret_access_key,
            session_token: non_empty(lookup("AWS_SESSION_TOKEN")),
        })
    }

    /// Credentials from `profile` in the INI-style shared credentials file.
    pub fn from_profile(contents: &str, profile: &str) -> Option<Self> {
        let mut in_profile = false;
        let mut access_key_id = None;
        let mut secret_access_key = None;
        let mut session_token = None;

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                in_profile = section.trim() == profile;
                continue;
            }
            if !in_profile {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().to_string();
                match key.trim() {
                    "aws_access_key_id" => access_key_id = Some(value),
                    "aws_secret_access_key" => secret_access_key = Some(value),
                    "aws_session_token" => session_token = Some(value),
                    _ => {}
                }
            }
        }

        Some(Self {
            access_key_id: non_empty(access_key_id)?,
            secret_access_key: non_empty(secret_access_key)?,
            session_token: non_empty(session_token),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn shared_credentials_path<F>(lookup: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = non_empty(lookup("AWS_SHARED_CREDENTIALS_FILE")) {
        return Some(PathBuf::from(path));
    }
    non_empty(lookup("HOME")).map(|home| PathBuf::from(home).join(".aws").join("credentials"))
}

/// Lowercase hex SHA-256 of `data`, the `x-amz-content-sha256` value.
pub fn payload_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Path with every segment URI-encoded once more, as SigV4 requires outside S3.
pub fn canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn canonical_query(url: &reqwest::Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            (
                urlencoding::encode(&k).into_owned(),
                urlencoding::encode(&v).into_owned(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn host_header(url: &reqwest::Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, KnowledgeBaseError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| KnowledgeBaseError::Request(format!("signing key rejected: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derive the per-day signing key from the secret access key.
pub fn signing_key(
    secret_access_key: &str,
    date: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, KnowledgeBaseError> {
    let k_date = hmac_sha256(format!("AWS4{}", secret_access_key).as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

/// Signs requests for one region and service.
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    credentials: AwsCredentials,
    region: String,
    service: String,
}

impl SigV4Signer {
    pub fn new(
        credentials: AwsCredentials,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            region: region.into(),
            service: service.into(),
        }
    }

    /// Headers to add to a request so it carries a valid signature at `now`.
    ///
    /// `host` is signed but not returned; the HTTP client derives it from the URL.
    pub fn sign(
        &self,
        method: &str,
        url: &reqwest::Url,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Vec<(String, String)>, KnowledgeBaseError> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let content_hash = payload_hash(body);

        let mut headers = vec![
            ("host".to_string(), host_header(url)),
            ("x-amz-content-sha256".to_string(), content_hash.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }

        let authorization = self.authorization(
            method,
            &canonical_uri(url.path()),
            &canonical_query(url),
            &headers,
            &content_hash,
            &amz_date,
        )?;

        headers.retain(|(name, _)| name != "host");
        headers.push(("authorization".to_string(), authorization));
        Ok(headers)
    }

    /// The `Authorization` header value for an already canonicalized request.
    pub fn authorization(
        &self,
        method: &str,
        canonical_uri: &str,
        canonical_query: &str,
        headers: &[(String, String)],
        content_hash: &str,
        amz_date: &str,
    ) -> Result<String, KnowledgeBaseError> {
        let mut sorted: Vec<(String, String)> = headers
            .iter()
            .map(|(name, value)| (name.to_lowercase(), value.trim().to_string()))
            .collect();
        sorted.sort();

        let canonical_headers: String = sorted
            .iter()
            .map(|(name, value)| format!("{}:{}\n", name, value))
            .collect();
        let signed_headers = sorted
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method, canonical_uri, canonical_query, canonical_headers, signed_headers, content_hash
        );

        let date = amz_date.get(..8).ok_or_else(|| {
            KnowledgeBaseError::Request(format!("malformed signing date: {}", amz_date))
        })?;
        let scope = format!("{}/{}/{}/aws4_request", date, self.region, self.service);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            SIGNING_ALGORITHM,
            amz_date,
            scope,
            payload_hash(canonical_request.as_bytes())
        );

        let key = signing_key(
            &self.credentials.secret_access_key,
            date,
            &self.region,
            &self.service,
        )?;
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

        Ok(format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            SIGNING_ALGORITHM, self.credentials.access_key_id, scope, signed_headers, signature
        ))
    }
}
