use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use uf_common::{ApiSettings, Producer, ProducerScope};

use crate::operation::{RecoveryRequestIssuer, RecoveryScope};
use crate::{RecoveryError, Result};

/// Process-wide recovery request id sequence; ids are unique per node.
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// One entry of the producers listing. Threshold fields are optional;
/// configured defaults apply where the listing stays silent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerListing {
    pub id: u16,
    pub name: String,
    pub api_url: String,
    pub scope: ProducerScope,
    pub active: bool,
    #[serde(default)]
    pub inactivity_seconds: Option<u64>,
    #[serde(default)]
    pub max_recovery_time_seconds: Option<u64>,
    #[serde(default)]
    pub stateful_recovery_window_minutes: Option<u64>,
}

/// REST client for the producers listing and recovery endpoints.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            access_token: settings.access_token.clone(),
        })
    }

    pub async fn fetch_producers(&self) -> Result<Vec<ProducerListing>> {
        let url = format!("{}/v1/descriptions/producers", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(RecoveryError::ApiStatus {
                status: response.status().as_u16(),
                url,
            });
        }
        Ok(response.json().await?)
    }

    /// Triggers a replay of everything after `after` for one producer.
    /// A 2xx status means the request was accepted; completion arrives
    /// out-of-band over the feed.
    pub async fn request_recovery(
        &self,
        producer: &Producer,
        after: DateTime<Utc>,
        request_id: u64,
        node_id: u32,
        scope: RecoveryScope,
    ) -> Result<()> {
        let url = format!(
            "{}/v1/{}/recovery/initiateRequest",
            self.base_url, producer.api_url
        );
        let mut request = self.client.post(&url).query(&[
            ("after", after.timestamp_millis().to_string()),
            ("request_id", request_id.to_string()),
            ("node_id", node_id.to_string()),
        ]);
        if scope == RecoveryScope::StatefulOnly {
            request = request.query(&[("stateful_only", "true")]);
        }
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(RecoveryError::ApiStatus {
                status: response.status().as_u16(),
                url,
            });
        }
        debug!(
            producer = %producer.name,
            request_id,
            status = response.status().as_u16(),
            "Recovery request accepted"
        );
        Ok(())
    }
}

/// [`RecoveryRequestIssuer`] over the REST client.
pub struct HttpRecoveryIssuer {
    client: Arc<ApiClient>,
}

impl HttpRecoveryIssuer {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecoveryRequestIssuer for HttpRecoveryIssuer {
    async fn issue(
        &self,
        producer: &Producer,
        after: DateTime<Utc>,
        node_id: u32,
        scope: RecoveryScope,
    ) -> anyhow::Result<u64> {
        let request_id = NEXT_REQUEST_ID.fetch_add(1, Ordering::SeqCst);
        self.client
            .request_recovery(producer, after, request_id, node_id, scope)
            .await?;
        Ok(request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn producer() -> Producer {
        Producer {
            id: 1,
            name: "liveodds".to_string(),
            api_url: "liveodds".to_string(),
            scope: ProducerScope::Live,
            active: true,
            inactivity_seconds: 20,
            max_recovery_time_seconds: 3600,
            stateful_recovery_window_minutes: None,
        }
    }

    fn client_for(server: &MockServer, token: Option<&str>) -> ApiClient {
        ApiClient::new(&ApiSettings {
            base_url: server.uri(),
            access_token: token.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fetches_and_parses_the_producer_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/descriptions/producers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "id": 1,
                    "name": "liveodds",
                    "apiUrl": "liveodds",
                    "scope": "live",
                    "active": true,
                    "inactivitySeconds": 30
                },
                {
                    "id": 3,
                    "name": "betradar_ctrl",
                    "apiUrl": "pre",
                    "scope": "prematch",
                    "active": false
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let listing = client_for(&server, None).fetch_producers().await.unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].inactivity_seconds, Some(30));
        assert_eq!(listing[0].max_recovery_time_seconds, None);
        assert_eq!(listing[1].scope, ProducerScope::Prematch);
        assert!(!listing[1].active);
    }

    #[tokio::test]
    async fn recovery_request_carries_window_node_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/liveodds/recovery/initiateRequest"))
            .and(query_param("after", "1700000000000"))
            .and(query_param("request_id", "9"))
            .and(query_param("node_id", "7"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let after = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        client_for(&server, Some("secret-token"))
            .request_recovery(&producer(), after, 9, 7, RecoveryScope::FullReplay)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stateful_scope_adds_the_query_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/liveodds/recovery/initiateRequest"))
            .and(query_param("stateful_only", "true"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let after = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        client_for(&server, None)
            .request_recovery(&producer(), after, 1, 1, RecoveryScope::StatefulOnly)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_success_statuses_become_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/liveodds/recovery/initiateRequest"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let after = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let err = client_for(&server, None)
            .request_recovery(&producer(), after, 1, 1, RecoveryScope::FullReplay)
            .await
            .unwrap_err();
        assert!(matches!(err, RecoveryError::ApiStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn issuer_hands_out_unique_request_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/liveodds/recovery/initiateRequest"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let issuer = HttpRecoveryIssuer::new(Arc::new(client_for(&server, None)));
        let after = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let first = issuer
            .issue(&producer(), after, 1, RecoveryScope::FullReplay)
            .await
            .unwrap();
        let second = issuer
            .issue(&producer(), after, 1, RecoveryScope::FullReplay)
            .await
            .unwrap();
        assert_ne!(first, second);
    }
}
