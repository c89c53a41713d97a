use std::{fmt, future::Future, path::Path, pin::Pin, time::Duration};

use log::debug;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use tokio::{fs::File, io::AsyncWriteExt};
use tokio_stream::{Stream, StreamExt};

use crate::error::{Error, Result};

pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// One JSON API call
#[derive(Clone)]
pub struct ApiCall {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    /// Sent as `Authorization: Bearer`; never printed
    pub bearer_token: Option<String>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

impl fmt::Debug for ApiCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCall")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("body", &self.body)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ApiCall {
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            headers: vec![],
            bearer_token: None,
            body: None,
            timeout,
        }
    }

    pub fn post(url: impl Into<String>, body: Value, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            method: Method::POST,
            headers: vec![("Content-Type".into(), "application/json".into())],
            bearer_token: None,
            body: Some(body),
            timeout,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer_auth(mut self, token: &str) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

/// The network boundary of the job handler and the materializer
pub trait Transport: Send + Sync {
    /// Non-2xx answers fail with [`Error::Remote`]
    fn send<'a>(&'a self, call: ApiCall) -> TransportFuture<'a, Value>;

    /// Streams `url` into `dest`, returning the number of bytes written
    fn download<'a>(
        &'a self,
        url: &'a str,
        dest: &'a Path,
        timeout: Duration,
    ) -> TransportFuture<'a, u64>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn build_request(&self, call: &ApiCall) -> RequestBuilder {
        let mut request = self
            .client
            .request(call.method.clone(), &call.url)
            .timeout(call.timeout);
        for (name, value) in &call.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &call.bearer_token {
            // reqwest marks the header sensitive
            request = request.bearer_auth(token);
        }
        if let Some(body) = &call.body {
            request = request.json(body);
        }
        request
    }
}

impl Transport for HttpTransport {
    fn send<'a>(&'a self, call: ApiCall) -> TransportFuture<'a, Value> {
        Box::pin(async move {
            debug!("{} {}", call.method, call.url);
            let resp = self.build_request(&call).send().await?;
            json_body(resp).await
        })
    }

    fn download<'a>(
        &'a self,
        url: &'a str,
        dest: &'a Path,
        timeout: Duration,
    ) -> TransportFuture<'a, u64> {
        Box::pin(async move {
            let resp = self.client.get(url).timeout(timeout).send().await?;
            let resp = ensure_success(resp).await?;
            let written = stream_to_file(resp.bytes_stream(), dest).await?;
            debug!("downloaded {written} bytes from {url} to {}", dest.display());
            Ok(written)
        })
    }
}

async fn json_body(resp: Response) -> Result<Value> {
    let text = ensure_success(resp).await?.text().await?;
    Ok(serde_json::from_str(&text)?)
}

async fn ensure_success(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.bytes().await.unwrap_or_default();
    Err(Error::Remote {
        status_code: status.as_u16(),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// Writes every chunk of `stream` to `dest`. A failed transfer removes the
/// partial file.
async fn stream_to_file<S, B, E>(stream: S, dest: &Path) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    Error: From<E>,
{
    let written = write_chunks(stream, dest).await;
    if written.is_err() {
        let _ = tokio::fs::remove_file(dest).await;
    }
    written
}

async fn write_chunks<S, B, E>(stream: S, dest: &Path) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    Error: From<E>,
{
    let mut file = File::create(dest).await?;
    let mut stream = std::pin::pin!(stream);
    let mut written = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(chunk.as_ref()).await?;
        written += chunk.as_ref().len() as u64;
    }
    file.flush().await?;
    Ok(written)
}
