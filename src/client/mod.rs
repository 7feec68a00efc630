//! HTTP client for the Pwig API.
//!
//! Non-2xx responses carrying a `{"message": ...}` body surface as
//! [`ClientError::Api`]; anything else that goes wrong is reported to users as
//! [`UNKNOWN_ERROR_MESSAGE`].

use bytes::Bytes;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::error::ErrorResponse;
use crate::library::TemplateDocument;
use crate::pipeline::{ExportRequest, RenderRequest, RenderResponse};

/// Shown for failures that carry no API message
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

#[derive(Debug, Error)]
pub enum ClientError {
    /// The API rejected the request with a message meant for the user
    #[error("{0}")]
    Api(String),

    #[error("http error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response status {status}")]
    Unexpected { status: StatusCode },

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ClientError {
    /// Text suitable for a user-facing notification
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api(message) => message.clone(),
            _ => UNKNOWN_ERROR_MESSAGE.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .build()?;
        Self::with_client(client, base)
    }

    /// Use a preconfigured `reqwest` client (timeouts, proxies, ...)
    pub fn with_client(client: Client, base: &str) -> Result<Self, ClientError> {
        let mut base = Url::parse(base).map_err(|e| ClientError::InvalidBaseUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(format!("{} cannot be a base", base)));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("pwig-client/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|e| ClientError::InvalidBaseUrl(e.to_string()))
    }

    /// Template names, sorted
    pub async fn list_templates(&self) -> Result<Vec<String>, ClientError> {
        let response = self.client.get(self.url("api/templates")?).send().await?;
        let mut names: Vec<String> = Self::json(response).await?;
        names.sort();
        Ok(names)
    }

    pub async fn get_template(&self, name: &str) -> Result<TemplateDocument, ClientError> {
        let mut url = self.url("api/templates/")?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .push(name);

        let response = self.client.get(url).send().await?;
        Self::json(response).await
    }

    /// Render `template` with the raw JSON text of `variables`
    pub async fn render(&self, template: &str, variables: &str) -> Result<String, ClientError> {
        let request = RenderRequest {
            template: Some(template.to_string()),
            variables: Some(Value::String(variables.to_string())),
        };

        let response = self
            .client
            .post(self.url("api/render")?)
            .json(&request)
            .send()
            .await?;
        let rendered: RenderResponse = Self::json(response).await?;
        Ok(rendered.html)
    }

    /// Export `template` to PDF and return the document bytes
    pub async fn export_pdf(
        &self,
        template: &str,
        variables: &str,
        filename: &str,
    ) -> Result<Bytes, ClientError> {
        let request = ExportRequest {
            template: Some(template.to_string()),
            variables: Some(Value::String(variables.to_string())),
            filename: Some(filename.to_string()),
            options: None,
        };

        let response = self
            .client
            .post(self.url("api/export")?)
            .json(&request)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.bytes().await?)
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        match serde_json::from_slice::<ErrorResponse>(&body) {
            Ok(error) => Err(ClientError::Api(error.message)),
            Err(_) => {
                tracing::debug!(status = %status, "API error without message body");
                Err(ClientError::Unexpected { status })
            }
        }
    }
}
