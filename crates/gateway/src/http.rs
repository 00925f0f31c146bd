//! HTTP adapter for the deletion-request endpoints of the backend API.
//!
//! Responses use the `{ success, data, message }` envelope; failures carry
//! `{ error: { code }, message }` next to the HTTP status. A request that
//! never produced a response is reported as [`GatewayError::Network`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use harvestdesk_core::config::{BackendConfig, EndpointConfig};
use harvestdesk_core::workflow::gateway::{
    CreateDeletionRequest, DeletionRequestGateway, ProcessDeletionRequest, RevokeDeletionRequest,
};
use harvestdesk_core::{DeletionRequest, DeletionStatus, GatewayError, PartnerId, SessionContext};

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<DeletionRequest>),
    One(Box<DeletionRequest>),
}

pub struct HttpDeletionRequestGateway {
    client: Client,
    base_url: String,
    endpoints: EndpointConfig,
    api_token: Option<SecretString>,
}

impl HttpDeletionRequestGateway {
    pub fn from_config(backend: &BackendConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(backend.timeout_secs))
            .build()
            .map_err(|error| GatewayError::Configuration(error.to_string()))?;

        Ok(Self {
            client,
            base_url: backend.base_url.trim().trim_end_matches('/').to_string(),
            endpoints: backend.endpoints.clone(),
            api_token: backend.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn partner_list_url(&self, partner_id: &PartnerId) -> String {
        self.url(&self.endpoints.partner_list.replace("{partner_id}", partner_id.0.trim()))
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Envelope, GatewayError> {
        let request = match &self.api_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        };

        let response = request.send().await.map_err(|error| {
            warn!(
                event_name = "gateway.http.no_response",
                operation,
                timeout = error.is_timeout(),
                error = %error,
                "backend request produced no response"
            );
            GatewayError::Network(error.to_string())
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|error| GatewayError::Network(error.to_string()))?;
        debug!(event_name = "gateway.http.response", operation, status, "backend responded");

        let envelope = if body.trim().is_empty() {
            Envelope::default()
        } else {
            match serde_json::from_str::<Envelope>(&body) {
                Ok(envelope) => envelope,
                Err(_) if !(200..300).contains(&status) => Envelope::default(),
                Err(error) => return Err(GatewayError::Decode(error.to_string())),
            }
        };

        let rejected = envelope.success == Some(false);
        if !(200..300).contains(&status) || rejected {
            return Err(GatewayError::Api {
                status,
                code: envelope.error.and_then(|error| error.code),
                message: envelope.message,
            });
        }

        Ok(envelope)
    }

    async fn list(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Vec<DeletionRequest>, GatewayError> {
        let envelope = self.send(operation, request).await?;
        match envelope.data {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(data) => match serde_json::from_value::<OneOrMany>(data) {
                Ok(OneOrMany::Many(requests)) => Ok(requests),
                Ok(OneOrMany::One(request)) => Ok(vec![*request]),
                Err(error) => Err(GatewayError::Decode(error.to_string())),
            },
        }
    }

    async fn mutate(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Option<DeletionRequest>, GatewayError> {
        let envelope = self.send(operation, request).await?;
        let updated = envelope.data.and_then(|data| {
            serde_json::from_value::<DeletionRequest>(data)
                .map_err(|error| {
                    debug!(
                        event_name = "gateway.http.partial_payload",
                        operation,
                        error = %error,
                        "mutation succeeded without a full request payload"
                    );
                })
                .ok()
        });
        Ok(updated)
    }
}

#[async_trait]
impl DeletionRequestGateway for HttpDeletionRequestGateway {
    async fn list_for_partner(
        &self,
        partner_id: &PartnerId,
        status: Option<&DeletionStatus>,
    ) -> Result<Vec<DeletionRequest>, GatewayError> {
        let mut request = self.client.get(self.partner_list_url(partner_id));
        if let Some(status) = status {
            request = request.query(&[("status", status.as_str())]);
        }
        self.list("list_for_partner", request).await
    }

    async fn list_all(&self) -> Result<Vec<DeletionRequest>, GatewayError> {
        let request = self.client.get(self.url(&self.endpoints.list_all));
        self.list("list_all", request).await
    }

    async fn create(
        &self,
        _session: &SessionContext,
        payload: CreateDeletionRequest,
    ) -> Result<Option<DeletionRequest>, GatewayError> {
        let request = self.client.post(self.url(&self.endpoints.create)).json(&payload);
        self.mutate("create", request).await
    }

    async fn revoke(
        &self,
        _session: &SessionContext,
        payload: RevokeDeletionRequest,
    ) -> Result<Option<DeletionRequest>, GatewayError> {
        let request = self.client.post(self.url(&self.endpoints.revoke)).json(&payload);
        self.mutate("revoke", request).await
    }

    async fn process(
        &self,
        _session: &SessionContext,
        payload: ProcessDeletionRequest,
    ) -> Result<Option<DeletionRequest>, GatewayError> {
        let request = self.client.post(self.url(&self.endpoints.process)).json(&payload);
        self.mutate("process", request).await
    }
}
