//! 网络传输抽象
//!
//! 批量上报与可达性探测共用一个"发送HTTP请求,拿回状态"的能力。

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::models::TransportError;

/// 请求超时
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
}

/// 传输请求
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn head() -> Self {
        Self {
            method: HttpMethod::Head,
            headers: Vec::new(),
            body: None,
        }
    }

    /// JSON POST请求,自动附带 Content-Type
    pub fn post_json(body: String) -> Self {
        Self {
            method: HttpMethod::Post,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(body),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// 传输响应
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpResponse {
    /// 状态码是否为2xx
    pub ok: bool,
    pub status: u16,
}

impl HttpResponse {
    pub fn from_status(status: u16) -> Self {
        Self {
            ok: (200..300).contains(&status),
            status,
        }
    }
}

/// 传输层
///
/// 返回 `Err` 表示请求本身失败(网络/超时),
/// 服务端返回非2xx时仍是 `Ok`,由 `HttpResponse::ok` 区分。
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, url: &str, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// 基于reqwest的传输实现
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, url: &str, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Head => self.client.head(url),
            HttpMethod::Post => self.client.post(url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::debug!(url = %url, error = %e, "HTTP请求失败");
            TransportError::from(e)
        })?;

        Ok(HttpResponse::from_status(response.status().as_u16()))
    }
}
