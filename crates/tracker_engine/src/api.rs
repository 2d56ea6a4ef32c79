use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::COOKIE;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracker_logging::tracker_trace;
use url::Url;

use crate::settings::ApiSettings;
use crate::types::PreloadListResponse;
use crate::{CommitResponse, FailureKind, PreviewResponse, ProgressResponse, TransportError};

const XSRF_FIELD: &str = "_xsrf";

/// The HTTP surface the tracker consumes.
#[async_trait::async_trait]
pub trait TrackerApi: Send + Sync {
    async fn preview(&self, source_url: &str) -> Result<PreviewResponse, TransportError>;

    async fn commit(&self, file_id: &str) -> Result<CommitResponse, TransportError>;

    async fn progress(&self, file_id: &str) -> Result<ProgressResponse, TransportError>;

    async fn preload_urls(&self, file_id: &str) -> Result<Vec<String>, TransportError>;

    /// Fetches one tile and discards it; returns the number of bytes read.
    async fn load_tile(&self, url: &str) -> Result<u64, TransportError>;

    async fn hit(&self) -> Result<(), TransportError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestApi {
    settings: ApiSettings,
    base_url: Url,
    client: reqwest::Client,
}

impl ReqwestApi {
    pub fn new(settings: ApiSettings) -> Result<Self, TransportError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| TransportError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| TransportError::new(FailureKind::Client, err.to_string()))?;

        Ok(Self {
            settings,
            base_url,
            client,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path)
            .map_err(|err| TransportError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    /// Form POST carrying the anti-forgery token both as a field and as the
    /// cookie the server compares it against.
    fn post_form(&self, url: Url, fields: &[(&str, &str)], timeout: Duration) -> RequestBuilder {
        let mut form: Vec<(&str, &str)> = fields.to_vec();
        let mut request = self.client.post(url).timeout(timeout);
        if let Some(token) = self.settings.xsrf_token.as_deref() {
            form.push((XSRF_FIELD, token));
            request = request.header(COOKIE, format!("{XSRF_FIELD}={token}"));
        }
        request.form(&form)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, TransportError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let response = check_status(response).await?;
        let body = response.text().await.map_err(map_reqwest_error)?;
        serde_json::from_str(&body).map_err(|err| {
            TransportError::new(FailureKind::Decode, format!("parsererror: {err}")).with_body(body)
        })
    }
}

#[async_trait::async_trait]
impl TrackerApi for ReqwestApi {
    async fn preview(&self, source_url: &str) -> Result<PreviewResponse, TransportError> {
        let url = self.endpoint(&self.settings.preview_path)?;
        let request = self.post_form(url, &[("url", source_url)], self.settings.request_timeout);
        self.send_json(request).await
    }

    async fn commit(&self, file_id: &str) -> Result<CommitResponse, TransportError> {
        let url = self.endpoint(&self.settings.commit_path)?;
        let request = self.post_form(url, &[("fileid", file_id)], self.settings.commit_timeout);
        self.send_json(request).await
    }

    async fn progress(&self, file_id: &str) -> Result<ProgressResponse, TransportError> {
        let url = self.endpoint(&self.settings.progress_path)?;
        let request = self
            .client
            .get(url)
            .timeout(self.settings.request_timeout)
            .query(&[("fileid", file_id)]);
        self.send_json(request).await
    }

    async fn preload_urls(&self, file_id: &str) -> Result<Vec<String>, TransportError> {
        let url = self.endpoint(&self.settings.preload_path_for(file_id))?;
        let request = self.client.get(url).timeout(self.settings.request_timeout);
        let listing: PreloadListResponse = self.send_json(request).await?;
        Ok(listing.urls)
    }

    async fn load_tile(&self, url: &str) -> Result<u64, TransportError> {
        let url = self.endpoint(url)?;
        let response = self
            .client
            .get(url.clone())
            .timeout(self.settings.request_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response).await?;

        let mut bytes = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            bytes += chunk.len() as u64;
        }
        tracker_trace!("Loaded tile {} ({} bytes)", url, bytes);
        Ok(bytes)
    }

    async fn hit(&self) -> Result<(), TransportError> {
        let url = self.endpoint(&self.settings.hit_path)?;
        let response = self
            .post_form(url, &[], self.settings.request_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        check_status(response).await?;
        Ok(())
    }
}

/// Non-2xx responses become `HttpStatus` errors carrying the body text.
async fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::new(FailureKind::HttpStatus(status.as_u16()), status.to_string())
        .with_body(body))
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::new(FailureKind::Timeout, "timeout");
    }
    if err.is_decode() {
        return TransportError::new(FailureKind::Decode, err.to_string());
    }
    TransportError::new(FailureKind::Network, err.to_string())
}
