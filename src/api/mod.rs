pub mod operations;
pub mod types;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use operations::{
    ArticleById, ArticleVariables, CreateQa, CreateQaVariables, DeleteQa, DeleteQaVariables,
    DiseaseIds, Diseases, FetchDiseases, NoVariables, Operation, OperationKind, Qas,
    QasVariables, UpdateQa, UpdateQaVariables,
};
use types::{Article, Disease, DiseaseRef, Qa, QaId};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded {status}: {body}")]
    Status { status: u16, body: String },

    #[error("graphql errors: {}", .0.join("; "))]
    Graphql(Vec<String>),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response carried no data")]
    MissingData,
}

impl ApiError {
    /// The token was rejected and the curator has to log in again.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Status { status: 401, .. })
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    message: String,
}

/// Typed read/write access to the dataset API. `GraphqlClient` is the real
/// implementation; tests substitute an in-memory one.
#[async_trait]
pub trait CurationApi: Send + Sync {
    async fn disease_ids(&self) -> Result<Vec<DiseaseRef>, ApiError>;
    async fn diseases(&self) -> Result<Vec<Disease>, ApiError>;
    async fn article(&self, article_id: &str) -> Result<Option<Article>, ApiError>;
    async fn qas(&self, disease_id: &str) -> Result<Vec<Qa>, ApiError>;
    async fn create_qa(&self, vars: CreateQaVariables) -> Result<Option<QaId>, ApiError>;
    async fn update_qa(&self, vars: UpdateQaVariables) -> Result<Option<QaId>, ApiError>;
    async fn delete_qa(&self, qa_id: &str) -> Result<(), ApiError>;
    async fn fetch_diseases(&self) -> Result<bool, ApiError>;
    /// Drop cached results of a query family so the next read refetches.
    async fn invalidate(&self, family: &str);
}

pub struct GraphqlClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    /// Query results keyed by `<operation>:<variables json>`.
    cache: RwLock<HashMap<String, serde_json::Value>>,
}

impl GraphqlClient {
    pub fn new(endpoint: &str, token: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            token: token.to_string(),
            cache: RwLock::new(HashMap::new()),
        })
    }

    fn cache_key(name: &str, variables: &serde_json::Value) -> String {
        format!("{}:{}", name, variables)
    }

    pub async fn execute<O: Operation>(&self, variables: O::Variables) -> Result<O::Response, ApiError> {
        let variables = serde_json::to_value(&variables)?;
        let key = Self::cache_key(O::NAME, &variables);

        if O::KIND == OperationKind::Query {
            let cache = self.cache.read().await;
            if let Some(data) = cache.get(&key) {
                debug!(operation = O::NAME, "served from cache");
                return Ok(serde_json::from_value(data.clone())?);
            }
        }

        let body = serde_json::json!({
            "operationName": O::NAME,
            "query": O::DOCUMENT,
            "variables": variables,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            warn!(operation = O::NAME, status = status.as_u16(), "graphql request rejected");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let data = decode_envelope(&text)?;
        let typed: O::Response = serde_json::from_value(data.clone())?;

        if O::KIND == OperationKind::Query {
            self.cache.write().await.insert(key, data);
        }
        debug!(operation = O::NAME, "graphql request complete");
        Ok(typed)
    }
}

/// Pull `data` out of a GraphQL response body, turning a non-empty `errors`
/// array into an error even when partial data is present.
fn decode_envelope(text: &str) -> Result<serde_json::Value, ApiError> {
    let envelope: GraphqlResponse = serde_json::from_str(text)?;
    if !envelope.errors.is_empty() {
        return Err(ApiError::Graphql(
            envelope.errors.into_iter().map(|e| e.message).collect(),
        ));
    }
    match envelope.data {
        Some(data) if !data.is_null() => Ok(data),
        _ => Err(ApiError::MissingData),
    }
}

#[async_trait]
impl CurationApi for GraphqlClient {
    async fn disease_ids(&self) -> Result<Vec<DiseaseRef>, ApiError> {
        Ok(self.execute::<DiseaseIds>(NoVariables::default()).await?.diseases)
    }

    async fn diseases(&self) -> Result<Vec<Disease>, ApiError> {
        Ok(self.execute::<Diseases>(NoVariables::default()).await?.diseases)
    }

    async fn article(&self, article_id: &str) -> Result<Option<Article>, ApiError> {
        let vars = ArticleVariables {
            article_id: article_id.to_string(),
        };
        Ok(self.execute::<ArticleById>(vars).await?.article)
    }

    async fn qas(&self, disease_id: &str) -> Result<Vec<Qa>, ApiError> {
        let vars = QasVariables {
            disease_id: disease_id.to_string(),
        };
        Ok(self.execute::<Qas>(vars).await?.qas.unwrap_or_default())
    }

    async fn create_qa(&self, vars: CreateQaVariables) -> Result<Option<QaId>, ApiError> {
        let data = self.execute::<CreateQa>(vars).await?;
        Ok(data.create_qa.qa.map(|qa| qa.id))
    }

    async fn update_qa(&self, vars: UpdateQaVariables) -> Result<Option<QaId>, ApiError> {
        let data = self.execute::<UpdateQa>(vars).await?;
        Ok(data.update_qa.qa.map(|qa| qa.id))
    }

    async fn delete_qa(&self, qa_id: &str) -> Result<(), ApiError> {
        let vars = DeleteQaVariables {
            id: qa_id.to_string(),
        };
        let data = self.execute::<DeleteQa>(vars).await?;
        debug!(payload = ?data.delete_qa, "qa delete acknowledged");
        Ok(())
    }

    async fn fetch_diseases(&self) -> Result<bool, ApiError> {
        Ok(self
            .execute::<FetchDiseases>(NoVariables::default())
            .await?
            .fetch_diseases)
    }

    async fn invalidate(&self, family: &str) {
        let prefix = format!("{}:", family);
        let mut cache = self.cache.write().await;
        let before = cache.len();
        cache.retain(|key, _| !key.starts_with(&prefix));
        debug!(family, dropped = before - cache.len(), "query family invalidated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_envelope_data() {
        let data = decode_envelope(r#"{"data": {"fetchDiseases": true}}"#).unwrap();
        assert_eq!(data["fetchDiseases"], true);
    }

    #[test]
    fn test_decode_envelope_errors_win_over_data() {
        let err = decode_envelope(
            r#"{"data": {"qas": null}, "errors": [{"message": "not authorized"}, {"message": "boom"}]}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "graphql errors: not authorized; boom");
    }

    #[test]
    fn test_decode_envelope_missing_data() {
        assert!(matches!(
            decode_envelope(r#"{"data": null}"#),
            Err(ApiError::MissingData)
        ));
        assert!(matches!(decode_envelope("not json"), Err(ApiError::Decode(_))));
    }

    #[test]
    fn test_unauthorized_detection() {
        let err = ApiError::Status {
            status: 401,
            body: String::new(),
        };
        assert!(err.is_unauthorized());
        assert!(!ApiError::MissingData.is_unauthorized());
    }

    #[tokio::test]
    async fn test_invalidate_only_drops_family() {
        let client =
            GraphqlClient::new("http://localhost/graphql", "t", Duration::from_secs(1)).unwrap();
        {
            let mut cache = client.cache.write().await;
            cache.insert("qas:{\"diseaseId\":\"a\"}".to_string(), serde_json::json!({}));
            cache.insert("qas:{\"diseaseId\":\"b\"}".to_string(), serde_json::json!({}));
            cache.insert("diseases:{}".to_string(), serde_json::json!({}));
        }
        client.invalidate("qas").await;
        let cache = client.cache.read().await;
        assert_eq!(cache.len(), 1);
        assert!(cache.contains_key("diseases:{}"));
    }
}
