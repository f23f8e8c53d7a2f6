//! HTTP transport - the boundary between API wrappers and the network

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use signage_common::Settings;

use crate::error::{E2eError, E2eResult};

/// Status code reported when a request never produced a response
pub const NO_RESPONSE: u16 = 0;

/// Status and raw body of an API response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> E2eResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Fail with `UnexpectedResponse` unless the status is 200
    pub fn require_success(self, context: impl Into<String>) -> E2eResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(E2eError::unexpected(context, self.status))
        }
    }
}

/// Authenticated request channel to the platform API.
///
/// Paths are relative to the API base URL; `download` takes an absolute URL.
pub trait Transport {
    fn get(&self, path: &str, query: &[(&str, String)]) -> E2eResult<ApiResponse>;

    fn post(&self, path: &str, body: Option<&Value>) -> E2eResult<ApiResponse>;

    fn put(&self, path: &str, body: &Value) -> E2eResult<ApiResponse>;

    fn download(&self, url: &str) -> E2eResult<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, path: &str, query: &[(&str, String)]) -> E2eResult<ApiResponse> {
        (**self).get(path, query)
    }

    fn post(&self, path: &str, body: Option<&Value>) -> E2eResult<ApiResponse> {
        (**self).post(path, body)
    }

    fn put(&self, path: &str, body: &Value) -> E2eResult<ApiResponse> {
        (**self).put(path, body)
    }

    fn download(&self, url: &str) -> E2eResult<Vec<u8>> {
        (**self).download(url)
    }
}

/// Blocking reqwest transport with a cookie-backed session
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(settings: &Settings) -> E2eResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: settings.api_url(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn execute(&self, method: &str, url: &str, request: RequestBuilder) -> E2eResult<ApiResponse> {
        info!("{} {}", method, url);

        let response = request
            .send()
            .map_err(|e| E2eError::unexpected(format!("{} {}: {}", method, url, e), NO_RESPONSE))?;

        let status = response.status();
        info!(
            "{} {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            response.url()
        );
        log_headers(response.headers());

        let body = read_body(method, url, response)?;
        Ok(ApiResponse::new(status.as_u16(), body))
    }
}

impl Transport for HttpTransport {
    fn get(&self, path: &str, query: &[(&str, String)]) -> E2eResult<ApiResponse> {
        let url = self.url(path);
        let request = self.client.get(&url).query(query);
        self.execute("GET", &url, request)
    }

    fn post(&self, path: &str, body: Option<&Value>) -> E2eResult<ApiResponse> {
        let url = self.url(path);
        let mut request = self.client.post(&url);
        if let Some(body) = body {
            debug!("Request body: {}", body);
            request = request.json(body);
        }
        self.execute("POST", &url, request)
    }

    fn put(&self, path: &str, body: &Value) -> E2eResult<ApiResponse> {
        let url = self.url(path);
        debug!("Request body: {}", body);
        let request = self.client.put(&url).json(body);
        self.execute("PUT", &url, request)
    }

    fn download(&self, url: &str) -> E2eResult<Vec<u8>> {
        let response = self.execute("GET", url, self.client.get(url))?;
        Ok(response
            .require_success(format!("download of {}", url))?
            .body)
    }
}

/// Coarse classification of a response body, used for log output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Html,
    Json,
    Jpeg,
    Other,
}

impl ContentKind {
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.contains("text/plain") {
            ContentKind::Text
        } else if content_type.contains("text/html") {
            ContentKind::Html
        } else if content_type.contains("application/json") {
            ContentKind::Json
        } else if content_type.contains("image/jpeg") {
            ContentKind::Jpeg
        } else {
            ContentKind::Other
        }
    }

    fn is_printable(self) -> bool {
        matches!(self, ContentKind::Text | ContentKind::Html | ContentKind::Json)
    }
}

fn log_headers(headers: &HeaderMap) {
    for (name, value) in headers {
        debug!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
    }
}

fn read_body(method: &str, url: &str, response: Response) -> E2eResult<Vec<u8>> {
    let kind = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(ContentKind::from_content_type)
        .unwrap_or(ContentKind::Other);

    let body = response
        .bytes()
        .map_err(|e| E2eError::unexpected(format!("{} {}: {}", method, url, e), NO_RESPONSE))?
        .to_vec();

    if kind.is_printable() {
        debug!("Response body: {}", String::from_utf8_lossy(&body));
    } else {
        debug!("Response body: {:?}, {} bytes", kind, body.len());
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_success() {
        assert!(ApiResponse::new(200, "{}").require_success("ok").is_ok());

        let err = ApiResponse::new(404, "").require_success("get device 7").unwrap_err();
        match err {
            E2eError::UnexpectedResponse { context, status } => {
                assert_eq!(context, "get device 7");
                assert_eq!(status, 404);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_created_is_not_success() {
        assert!(!ApiResponse::new(201, "").is_success());
    }

    #[test]
    fn test_content_kind() {
        assert_eq!(
            ContentKind::from_content_type("application/json; charset=utf-8"),
            ContentKind::Json
        );
        assert_eq!(ContentKind::from_content_type("image/jpeg"), ContentKind::Jpeg);
        assert_eq!(ContentKind::from_content_type("image/png"), ContentKind::Other);
    }

    #[test]
    fn test_transport_url() {
        let settings = Settings {
            server_name: "signage.example".into(),
            api_version: "5".into(),
            ..Default::default()
        };
        let transport = HttpTransport::new(&settings).unwrap();
        assert_eq!(transport.base_url(), "https://api.signage.example/v5");
        assert_eq!(
            transport.url("/platforms/17/devices/41"),
            "https://api.signage.example/v5/platforms/17/devices/41"
        );
    }
}
