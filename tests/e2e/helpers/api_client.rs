use anyhow::{Context, Result};
use http_body_util::{BodyExt, Full};
use hyper::{body::Bytes, header::CONTENT_TYPE, HeaderMap, Method, Request, StatusCode};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Plain HTTP/1 client bound to one test server
#[derive(Clone)]
pub struct TestClient {
    base_url: String,
    client: Client<HttpConnector, Full<Bytes>>,
}

impl TestClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder(TokioExecutor::new()).build_http(),
        }
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.send(Method::GET, path, Bytes::new(), &[]).await
    }

    pub async fn get_with_headers(
        &self,
        path: &str,
        headers: &[(&str, &str)],
    ) -> Result<ApiResponse> {
        self.send(Method::GET, path, Bytes::new(), headers).await
    }

    /// POST `body` as JSON
    pub async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        let payload = Bytes::from(serde_json::to_vec(body)?);
        self.send(
            Method::POST,
            path,
            payload,
            &[("content-type", "application/json")],
        )
        .await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Bytes,
        headers: &[(&str, &str)],
    ) -> Result<ApiResponse> {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("{}{}", self.base_url, path));
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let response = self
            .client
            .request(builder.body(Full::new(payload))?)
            .await
            .with_context(|| format!("request to {} failed", path))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response.into_body().collect().await?.to_bytes().to_vec();

        Ok(ApiResponse::new(status, headers, body_bytes))
    }
}

pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Parsed body when the server answered with JSON
    pub body: Option<Value>,
    pub body_bytes: Vec<u8>,
}

impl ApiResponse {
    fn new(status: StatusCode, headers: HeaderMap, body_bytes: Vec<u8>) -> Self {
        let is_json = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("application/json"))
            .unwrap_or(false);
        let body = if is_json {
            serde_json::from_slice(&body_bytes).ok()
        } else {
            None
        };

        Self {
            status,
            headers,
            body,
            body_bytes,
        }
    }

    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "unexpected status, body: {}",
            String::from_utf8_lossy(&self.body_bytes)
        );
        self
    }

    /// The `{ "message": ... }` error body contains `fragment`
    pub fn assert_error_message(&self, fragment: &str) -> &Self {
        let message = self
            .body
            .as_ref()
            .and_then(|body| body["message"].as_str())
            .unwrap_or_else(|| panic!("no error message in {:?}", self.body));
        assert!(
            message.contains(fragment),
            "error message {:?} does not mention {:?}",
            message,
            fragment
        );
        self
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body_bytes).context("response body is not the expected JSON")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn assert_header(&self, name: &str, expected: &str) -> &Self {
        assert_eq!(self.header(name), Some(expected), "header {}", name);
        self
    }

    pub fn assert_header_exists(&self, name: &str) -> &Self {
        assert!(self.headers.contains_key(name), "missing header {}", name);
        self
    }
}
