//! Client for the hosted content store HTTP API

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ContentStore, StoreError};
use crate::config::StoreConfig;
use crate::content::NewComment;
use crate::query::Query;

/// Wrapper for query responses
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: Value,
}

/// Mutation request body
#[derive(Debug, Serialize)]
struct Mutations<'a> {
    mutations: [Mutation<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Mutation<'a> {
    create: &'a NewComment,
}

/// Mutation response with `returnIds=true`
#[derive(Debug, Deserialize)]
struct MutateResponse {
    #[serde(rename = "transactionId")]
    transaction_id: Option<String>,
    #[serde(default)]
    results: Vec<MutateResult>,
}

#[derive(Debug, Deserialize)]
struct MutateResult {
    id: String,
}

/// Content store reached over HTTPS
pub struct HttpStore {
    client: reqwest::Client,
    query_url: String,
    mutate_url: String,
    token: Option<String>,
}

impl HttpStore {
    /// Build a client for the configured project.
    ///
    /// Reads go to the CDN host when `use_cdn` is set; writes always go to
    /// the live API host.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let api = format!("https://{}.api.sanity.io", config.project_id);
        let reads = if config.use_cdn {
            format!("https://{}.apicdn.sanity.io", config.project_id)
        } else {
            api.clone()
        };
        Self::with_hosts(config, &reads, &api)
    }

    /// Build a client against explicit hosts
    pub fn with_hosts(
        config: &StoreConfig,
        read_host: &str,
        write_host: &str,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let version = format!("v{}", config.api_version);
        Ok(Self {
            client,
            query_url: format!(
                "{}/{}/data/query/{}",
                read_host.trim_end_matches('/'),
                version,
                config.dataset
            ),
            mutate_url: format!(
                "{}/{}/data/mutate/{}",
                write_host.trim_end_matches('/'),
                version,
                config.dataset
            ),
            token: config.token.clone(),
        })
    }

    async fn read_body<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, StoreError> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        serde_json::from_str(&body).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ContentStore for HttpStore {
    async fn fetch(&self, query: &Query) -> Result<Value, StoreError> {
        let mut params = vec![("query".to_string(), query.groq().to_string())];
        for (name, value) in query.params() {
            params.push((format!("${}", name), value.to_string()));
        }

        let resp = self
            .client
            .get(&self.query_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let body: QueryResponse = Self::read_body(resp).await?;
        Ok(body.result)
    }

    async fn create(&self, document: &NewComment) -> Result<String, StoreError> {
        let token = self.token.as_deref().ok_or(StoreError::MissingToken)?;

        let resp = self
            .client
            .post(&self.mutate_url)
            .query(&[("returnIds", "true")])
            .bearer_auth(token)
            .json(&Mutations {
                mutations: [Mutation { create: document }],
            })
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let body: MutateResponse = Self::read_body(resp).await?;
        let id = body
            .results
            .into_iter()
            .next()
            .map(|r| r.id)
            .ok_or_else(|| StoreError::Decode("mutation returned no document id".to_string()))?;

        tracing::debug!(
            id = %id,
            transaction = body.transaction_id.as_deref().unwrap_or("-"),
            "Created document"
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(token: Option<&str>) -> StoreConfig {
        StoreConfig {
            project_id: "abc123".to_string(),
            dataset: "production".to_string(),
            use_cdn: false,
            token: token.map(str::to_string),
            api_version: "2021-10-21".to_string(),
            timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_hosts() {
        let mut cfg = config(None);
        cfg.use_cdn = true;
        let store = HttpStore::new(&cfg).unwrap();
        assert_eq!(
            store.query_url,
            "https://abc123.apicdn.sanity.io/v2021-10-21/data/query/production"
        );
        assert_eq!(
            store.mutate_url,
            "https://abc123.api.sanity.io/v2021-10-21/data/mutate/production"
        );
    }

    #[tokio::test]
    async fn test_fetch_binds_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2021-10-21/data/query/production"))
            .and(query_param("query", Query::post_by_slug("x").groq()))
            .and(query_param("$slug", "\"hello\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ms": 3,
                "query": "...",
                "result": { "_id": "post-1" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = HttpStore::with_hosts(&config(None), &server.uri(), &server.uri()).unwrap();
        let value = store.fetch(&Query::post_by_slug("hello")).await.unwrap();
        assert_eq!(value, json!({ "_id": "post-1" }));
    }

    #[tokio::test]
    async fn test_fetch_null_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": null })))
            .mount(&server)
            .await;

        let store = HttpStore::with_hosts(&config(None), &server.uri(), &server.uri()).unwrap();
        let value = store.fetch(&Query::post_by_slug("nope")).await.unwrap();
        assert!(value.is_null());
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let store = HttpStore::with_hosts(&config(None), &server.uri(), &server.uri()).unwrap();
        let err = store.fetch(&Query::PostSlugs).await.unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 503, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let store =
            HttpStore::with_hosts(&config(None), "http://127.0.0.1:1", "http://127.0.0.1:1")
                .unwrap();
        let err = store.fetch(&Query::PostSlugs).await.unwrap_err();
        assert!(matches!(err, StoreError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_create_comment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2021-10-21/data/mutate/production"))
            .and(query_param("returnIds", "true"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "mutations": [{
                    "create": {
                        "_type": "comment",
                        "post": { "_type": "reference", "_ref": "post-1" },
                        "name": "Alice"
                    }
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "transactionId": "tx1",
                "results": [{ "id": "comment-abc", "operation": "create" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store =
            HttpStore::with_hosts(&config(Some("sk-test")), &server.uri(), &server.uri()).unwrap();
        let id = store
            .create(&NewComment::new("post-1", "Alice", "a@x.com", "Nice post!"))
            .await
            .unwrap();
        assert_eq!(id, "comment-abc");
    }

    #[tokio::test]
    async fn test_create_without_token() {
        let store = HttpStore::with_hosts(&config(None), "http://127.0.0.1:1", "http://127.0.0.1:1")
            .unwrap();
        let err = store
            .create(&NewComment::new("post-1", "Alice", "a@x.com", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingToken));
    }
}
