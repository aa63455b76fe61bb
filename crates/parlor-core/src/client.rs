//! HTTP client for the chat backend.

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::chats::{ChatSummary, HistoryMessage, Mode, ModeStatus};
use crate::decoder::LineStream;
use crate::error::{ClientError, ClientErrorKind, ClientResult, classify_reqwest_error};

/// Raw response body of a streaming request.
pub type BodyStream = BoxStream<'static, reqwest::Result<Bytes>>;

/// Body of `POST /ask`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AskRequest {
    pub message: String,
    pub chat_id: String,
}

impl AskRequest {
    pub fn new(message: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            chat_id: chat_id.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ModeRequest {
    mode: Mode,
}

/// Backend client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base: Url,
    token: Option<String>,
    http: reqwest::Client,
}

impl BackendClient {
    /// Creates a client for `base_url`. The token, when present, is sent as
    /// a bearer token on every request.
    ///
    /// # Errors
    /// Returns a parse error if `base_url` is not an absolute `http(s)` URL.
    pub fn new(base_url: &str, token: Option<String>) -> ClientResult<Self> {
        let base = Url::parse(base_url.trim())
            .map_err(|e| ClientError::parse(format!("Invalid base URL '{base_url}': {e}")))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(ClientError::parse(format!(
                "Invalid base URL '{base_url}': expected an http(s) URL"
            )));
        }

        Ok(Self {
            base,
            token: token.filter(|t| !t.trim().is_empty()),
            http: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// Starts one exchange and returns the reply as a line stream.
    ///
    /// Only the response head is awaited here; the body is read lazily by the
    /// caller.
    pub async fn ask(&self, request: &AskRequest) -> ClientResult<LineStream<BodyStream>> {
        tracing::info!(chat_id = %request.chat_id, "starting exchange");
        let response = self
            .request(Method::POST, &["ask"])?
            .header("accept", "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        let response = check_status(response).await?;

        Ok(LineStream::new(response.bytes_stream().boxed()))
    }

    pub async fn list_chats(&self) -> ClientResult<Vec<ChatSummary>> {
        self.fetch_json(self.request(Method::GET, &["chats"])?).await
    }

    pub async fn history(&self, chat_id: &str) -> ClientResult<Vec<HistoryMessage>> {
        self.fetch_json(self.request(Method::GET, &["history", chat_id])?)
            .await
    }

    pub async fn delete_chat(&self, chat_id: &str) -> ClientResult<()> {
        let response = self
            .request(Method::DELETE, &["delete", chat_id])?
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        check_status(response).await?;
        tracing::debug!(chat_id, "chat deleted");
        Ok(())
    }

    pub async fn mode(&self) -> ClientResult<ModeStatus> {
        self.fetch_json(self.request(Method::GET, &["mode"])?).await
    }

    pub async fn set_mode(&self, mode: Mode) -> ClientResult<ModeStatus> {
        let builder = self
            .request(Method::POST, &["mode"])?
            .json(&ModeRequest { mode });
        self.fetch_json(builder).await
    }

    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::parse(format!("Base URL cannot take a path: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> ClientResult<RequestBuilder> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%method, %url, "backend request");
        let builder = self.http.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn fetch_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        let response = check_status(response).await?;
        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        serde_json::from_str(&body).map_err(|e| ClientError {
            kind: ClientErrorKind::Parse,
            message: format!("Unexpected response body: {e}"),
            details: Some(body),
        })
    }
}

async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), "backend returned an error status");
    Err(ClientError::http_status(status.as_u16(), &body))
}
