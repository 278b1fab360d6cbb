//! Knowledge-Base Retrieval
//!
//! The course catalogue and program requirements live in a managed retrieval index. This
//! module only knows how to ask it a question: [`KnowledgeBase`] is the backend seam,
//! [`HttpKnowledgeBase`] speaks the Bedrock Agent Runtime `Retrieve` REST call (SigV4
//! signed through [`aws_auth`](super::aws_auth), or with a bearer token for proxies), and
//! [`RetrieveSettings`] picks up the environment prepared by
//! [`bootstrap`](crate::bootstrap).
//!
//! Results scoring below the minimum score are dropped before formatting:
//!
//! ```text
//! Retrieved 2 results with score >= 0.4:
//!
//! Score: 0.8123
//! Document ID: s3://catalog/2024-2025.pdf
//! Content: BIOL P110 General Biology ...
//! ```

use crate::advisor::http_client_pool::get_or_create_client;
use crate::advisor::tools::aws_auth::{AwsCredentials, SigV4Signer, BEDROCK_SIGNING_NAME};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;

/// Minimum relevance score applied when `MIN_SCORE` is unset or unparsable.
pub const DEFAULT_MIN_SCORE: f64 = 0.4;

/// Number of results requested when the caller does not say.
pub const DEFAULT_NUMBER_OF_RESULTS: u32 = 10;

/// Region used by the retrieval tool when `AWS_REGION` is unset.
pub const DEFAULT_RETRIEVE_REGION: &str = "us-west-2";

/// Errors surfaced by knowledge-base backends.
#[derive(Debug, Clone, PartialEq)]
pub enum KnowledgeBaseError {
    /// No knowledge base id is configured or supplied.
    NotConfigured,
    /// The backend could not be reached or rejected the request.
    Request(String),
    /// The backend reply did not have the expected shape.
    InvalidReply(String),
}

impl fmt::Display for KnowledgeBaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnowledgeBaseError::NotConfigured => write!(
                f,
                "No knowledge base ID provided. Set KNOWLEDGE_BASE_ID or pass knowledgeBaseId."
            ),
            KnowledgeBaseError::Request(msg) => write!(f, "Retrieval request failed: {}", msg),
            KnowledgeBaseError::InvalidReply(msg) => {
                write!(f, "Unexpected retrieval response: {}", msg)
            }
        }
    }
}

impl Error for KnowledgeBaseError {}

/// Environment-derived defaults for retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveSettings {
    pub knowledge_base_id: Option<String>,
    pub region: String,
    pub min_score: f64,
}

impl RetrieveSettings {
    /// Read `KNOWLEDGE_BASE_ID`, `AWS_REGION` and `MIN_SCORE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            knowledge_base_id: get("KNOWLEDGE_BASE_ID"),
            region: get("AWS_REGION").unwrap_or_else(|| DEFAULT_RETRIEVE_REGION.to_string()),
            min_score: get("MIN_SCORE")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_MIN_SCORE),
        }
    }
}

/// One retrieval query.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveRequest {
    pub knowledge_base_id: String,
    pub region: String,
    pub text: String,
    pub number_of_results: u32,
}

/// One retrieved passage.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResult {
    pub score: f64,
    pub document_id: String,
    pub content: String,
    pub metadata: HashMap<String, JsonValue>,
}

/// Backend that answers retrieval queries.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    async fn retrieve(
        &self,
        request: &RetrieveRequest,
    ) -> Result<Vec<RetrievalResult>, Box<dyn Error + Send + Sync>>;
}

/// Drop results scoring below `min_score`, keeping order.
pub fn filter_by_score(results: Vec<RetrievalResult>, min_score: f64) -> Vec<RetrievalResult> {
    results
        .into_iter()
        .filter(|r| r.score >= min_score)
        .collect()
}

/// Render filtered results as the text handed back to the model.
pub fn format_results(results: &[RetrievalResult], min_score: f64) -> String {
    if results.is_empty() {
        return "No results found above score threshold.".to_string();
    }

    let mut out = format!(
        "Retrieved {} results with score >= {}:\n",
        results.len(),
        min_score
    );
    for result in results {
        out.push_str(&format!("\nScore: {:.4}\n", result.score));
        out.push_str(&format!("Document ID: {}\n", result.document_id));
        out.push_str(&format!("Content: {}\n", result.content));
    }
    out
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveReply {
    #[serde(default)]
    retrieval_results: Vec<RawResult>,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    #[serde(default)]
    content: Option<RawContent>,
    #[serde(default)]
    location: Option<JsonValue>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    metadata: Option<HashMap<String, JsonValue>>,
}

#[derive(Debug, Deserialize)]
struct RawContent {
    #[serde(default)]
    text: String,
}

/// Best identifier a location block offers: S3 URI, web URL, custom id, or `Unknown`.
fn document_id(location: Option<&JsonValue>) -> String {
    let location = match location {
        Some(location) => location,
        None => return "Unknown".to_string(),
    };
    let candidates = [
        location.pointer("/s3Location/uri"),
        location.pointer("/webLocation/url"),
        location.pointer("/customDocumentLocation/id"),
    ];
    candidates
        .iter()
        .flatten()
        .find_map(|v| v.as_str())
        .unwrap_or("Unknown")
        .to_string()
}

/// Parse a `Retrieve` reply body.
pub fn parse_retrieve_reply(body: &str) -> Result<Vec<RetrievalResult>, KnowledgeBaseError> {
    let reply: RetrieveReply = serde_json::from_str(body)
        .map_err(|e| KnowledgeBaseError::InvalidReply(e.to_string()))?;
    Ok(reply
        .retrieval_results
        .into_iter()
        .map(|raw| RetrievalResult {
            score: raw.score.unwrap_or(0.0),
            document_id: document_id(raw.location.as_ref()),
            content: raw.content.map(|c| c.text).unwrap_or_default(),
            metadata: raw.metadata.unwrap_or_default(),
        })
        .collect())
}

/// How `Retrieve` requests are authenticated.
#[derive(Debug, Clone, PartialEq)]
pub enum KnowledgeBaseAuth {
    /// No credentials; only useful against a local or signing proxy.
    None,
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// AWS Signature Version 4 with the given credentials.
    SigV4(AwsCredentials),
}

impl KnowledgeBaseAuth {
    /// SigV4 when AWS credentials resolve, else a Bedrock API key as bearer token, else none.
    pub fn resolve_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(credentials) = AwsCredentials::resolve_with(&lookup) {
            return KnowledgeBaseAuth::SigV4(credentials);
        }
        match lookup(crate::advisor::clients::bedrock::BEDROCK_API_KEY_ENV)
            .filter(|t| !t.trim().is_empty())
        {
            Some(token) => KnowledgeBaseAuth::Bearer(token),
            None => KnowledgeBaseAuth::None,
        }
    }
}

/// Bedrock Agent Runtime `Retrieve` over HTTPS.
///
/// Requests go to `<endpoint>/knowledgebases/<id>/retrieve`. The endpoint defaults to
/// `https://bedrock-agent-runtime.<region>.amazonaws.com`.
pub struct HttpKnowledgeBase {
    endpoint: Option<String>,
    auth: KnowledgeBaseAuth,
}

impl HttpKnowledgeBase {
    pub fn new() -> Self {
        Self {
            endpoint: None,
            auth: KnowledgeBaseAuth::None,
        }
    }

    /// Use a fixed endpoint instead of the regional default.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into().trim_end_matches('/').to_string());
        self
    }

    pub fn with_auth(mut self, auth: KnowledgeBaseAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_bearer_token(self, token: impl Into<String>) -> Self {
        self.with_auth(KnowledgeBaseAuth::Bearer(token.into()))
    }

    pub fn with_credentials(self, credentials: AwsCredentials) -> Self {
        self.with_auth(KnowledgeBaseAuth::SigV4(credentials))
    }

    pub fn auth(&self) -> &KnowledgeBaseAuth {
        &self.auth
    }

    /// Endpoint for `region`.
    pub fn endpoint_for(&self, region: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://bedrock-agent-runtime.{}.amazonaws.com", region),
        }
    }
}

impl Default for HttpKnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KnowledgeBase for HttpKnowledgeBase {
    async fn retrieve(
        &self,
        request: &RetrieveRequest,
    ) -> Result<Vec<RetrievalResult>, Box<dyn Error + Send + Sync>> {
        let endpoint = self.endpoint_for(&request.region);
        let url = format!(
            "{}/knowledgebases/{}/retrieve",
            endpoint,
            urlencoding::encode(&request.knowledge_base_id)
        );
        let body = serde_json::to_vec(&serde_json::json!({
            "retrievalQuery": { "text": request.text },
            "retrievalConfiguration": {
                "vectorSearchConfiguration": { "numberOfResults": request.number_of_results }
            }
        }))?;

        let mut http = get_or_create_client(&endpoint)
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        match &self.auth {
            KnowledgeBaseAuth::None => {}
            KnowledgeBaseAuth::Bearer(token) => http = http.bearer_auth(token),
            KnowledgeBaseAuth::SigV4(credentials) => {
                let parsed = reqwest::Url::parse(&url)
                    .map_err(|e| KnowledgeBaseError::Request(format!("{}: {}", url, e)))?;
                let signer = SigV4Signer::new(
                    credentials.clone(),
                    request.region.clone(),
                    BEDROCK_SIGNING_NAME,
                );
                for (name, value) in signer.sign("POST", &parsed, &body, chrono::Utc::now())? {
                    http = http.header(name, value);
                }
            }
        }

        let response = http
            .body(body)
            .send()
            .await
            .map_err(|e| KnowledgeBaseError::Request(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| KnowledgeBaseError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(Box::new(KnowledgeBaseError::Request(format!(
                "HTTP {}: {}",
                status.as_u16(),
                text
            ))));
        }

        Ok(parse_retrieve_reply(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(score: f64, id: &str) -> RetrievalResult {
        RetrievalResult {
            score,
            document_id: id.to_string(),
            content: format!("content of {}", id),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn test_settings_defaults_and_overrides() {
        let defaults = RetrieveSettings::from_lookup(|_| None);
        assert_eq!(defaults.knowledge_base_id, None);
        assert_eq!(defaults.region, "us-west-2");
        assert_eq!(defaults.min_score, 0.4);

        let set = RetrieveSettings::from_lookup(|key| match key {
            "KNOWLEDGE_BASE_ID" => Some("KB123".to_string()),
            "AWS_REGION" => Some("us-east-1".to_string()),
            "MIN_SCORE" => Some("0.55".to_string()),
            _ => None,
        });
        assert_eq!(set.knowledge_base_id.as_deref(), Some("KB123"));
        assert_eq!(set.region, "us-east-1");
        assert_eq!(set.min_score, 0.55);
    }

    #[test]
    fn test_filter_and_format() {
        let kept = filter_by_score(
            vec![result(0.9, "a"), result(0.2, "b"), result(0.4, "c")],
            0.4,
        );
        assert_eq!(kept.len(), 2);

        let text = format_results(&kept, 0.4);
        assert!(text.starts_with("Retrieved 2 results with score >= 0.4:"));
        assert!(text.contains("Score: 0.9000"));
        assert!(text.contains("Document ID: c"));
        assert!(!text.contains("Document ID: b"));
    }

    #[test]
    fn test_format_empty() {
        assert_eq!(
            format_results(&[], 0.4),
            "No results found above score threshold."
        );
    }

    #[test]
    fn test_parse_retrieve_reply() {
        let body = r#"{
            "retrievalResults": [
                {
                    "content": {"text": "BIOL P110 requires MATH P101."},
                    "location": {"type": "S3", "s3Location": {"uri": "s3://kb/catalog.pdf"}},
                    "score": 0.71,
                    "metadata": {"page": 42}
                },
                {"content": {"text": "orphan"}}
            ]
        }"#;
        let results = parse_retrieve_reply(body).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document_id, "s3://kb/catalog.pdf");
        assert_eq!(results[0].score, 0.71);
        assert_eq!(results[0].metadata["page"], 42);
        assert_eq!(results[1].document_id, "Unknown");
        assert_eq!(results[1].score, 0.0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_retrieve_reply("not json"),
            Err(KnowledgeBaseError::InvalidReply(_))
        ));
    }

    #[test]
    fn test_endpoint_for_region() {
        let kb = HttpKnowledgeBase::new();
        assert_eq!(
            kb.endpoint_for("us-east-1"),
            "https://bedrock-agent-runtime.us-east-1.amazonaws.com"
        );
        let kb = HttpKnowledgeBase::new().with_endpoint("http://localhost:4000/");
        assert_eq!(kb.endpoint_for("us-east-1"), "http://localhost:4000");
    }

    #[test]
    fn test_auth_prefers_aws_credentials() {
        let both = KnowledgeBaseAuth::resolve_with(|key| match key {
            "AWS_ACCESS_KEY_ID" => Some("AKID".to_string()),
            "AWS_SECRET_ACCESS_KEY" => Some("secret".to_string()),
            "AWS_BEARER_TOKEN_BEDROCK" => Some("bedrock-key".to_string()),
            _ => None,
        });
        assert_eq!(
            both,
            KnowledgeBaseAuth::SigV4(AwsCredentials::new("AKID", "secret"))
        );

        let bearer = KnowledgeBaseAuth::resolve_with(|key| match key {
            "AWS_BEARER_TOKEN_BEDROCK" => Some("bedrock-key".to_string()),
            _ => None,
        });
        assert_eq!(bearer, KnowledgeBaseAuth::Bearer("bedrock-key".to_string()));

        assert_eq!(KnowledgeBaseAuth::resolve_with(|_| None), KnowledgeBaseAuth::None);
    }
}
