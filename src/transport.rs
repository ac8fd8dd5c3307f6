//! reqwest-backed transport for JSON operation endpoints

use crate::{Message, OperationPoller, OperationStatus, OperationsClient, TransportError};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;

const CONTENT_TYPE: &str = "Content-Type";
const APPLICATION_JSON: &str = "application/json";

/// Header list in send order
pub type Headers = Vec<(String, String)>;

/// Merge two header lists, comparing names case-insensitively.
///
/// Entries from `primary` always win; `fallback` only fills in names the
/// primary list does not carry.
pub fn join_headers(primary: &[(String, String)], fallback: &[(String, String)]) -> Headers {
    let mut joined: Headers = primary.to_vec();
    for (name, value) in fallback {
        if !joined.iter().any(|(n, _)| n.eq_ignore_ascii_case(name)) {
            joined.push((name.clone(), value.clone()));
        }
    }
    joined
}

/// Status and body of a completed exchange
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: Vec<u8>,
}

/// Thin wrapper around an injected `reqwest::Client`
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    default_headers: Headers,
}

impl HttpTransport {
    /// Wrap a configured client
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            default_headers: Vec::new(),
        }
    }

    /// Add a header sent with every request unless the call overrides it
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Send a request and hand back the response with its body unread.
    ///
    /// A status of 300 or above is an error carrying the body text.
    pub async fn send_streamed(
        &self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response, TransportError> {
        let mut request = self.client.request(method.clone(), url);
        for (name, value) in join_headers(headers, &self.default_headers) {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string().into()))?;

        let status = response.status().as_u16();
        tracing::debug!(%method, url, status, "HTTP exchange");
        if status >= 300 {
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::Decode(e.to_string().into()))?;
            return Err(TransportError::Status {
                status,
                body: body.into(),
            });
        }
        Ok(response)
    }

    /// Send a request and read the whole body
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse, TransportError> {
        let response = self.send_streamed(method, url, headers, body).await?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Decode(e.to_string().into()))?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }

    /// Exchange JSON documents.
    ///
    /// `Content-Type: application/json` is added unless `headers` already
    /// names a content type.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<T, TransportError> {
        let headers = join_headers(
            headers,
            &[(CONTENT_TYPE.to_owned(), APPLICATION_JSON.to_owned())],
        );
        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| TransportError::Request(e.to_string().into()))?;

        let response = self.send(method, url, &headers, body).await?;
        serde_json::from_slice(&response.body).map_err(|e| TransportError::Decode(e.to_string().into()))
    }
}

/// Operations client for a JSON API.
///
/// Triggers with `POST {trigger_url}` carrying the request fields and polls
/// with `GET {operations_url}/{name}`.
pub struct HttpOperationsClient<Req> {
    transport: HttpTransport,
    trigger_url: String,
    operations_url: String,
    headers: Headers,
    _request: PhantomData<fn(&Req)>,
}

impl<Req> HttpOperationsClient<Req> {
    /// Create a client for one trigger endpoint
    pub fn new(
        transport: HttpTransport,
        trigger_url: impl Into<String>,
        operations_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            trigger_url: trigger_url.into(),
            operations_url: operations_url.into(),
            headers: Vec::new(),
            _request: PhantomData,
        }
    }

    /// Add a header to trigger and poll calls
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn operation_url(&self, name: &str) -> String {
        format!("{}/{}", self.operations_url.trim_end_matches('/'), name)
    }
}

impl<Req> OperationPoller for HttpOperationsClient<Req> {
    fn get(&self, name: &str) -> impl Future<Output = Result<OperationStatus, TransportError>> + Send {
        let url = self.operation_url(name);
        async move {
            self.transport
                .send_json(Method::GET, &url, &self.headers, None)
                .await
        }
    }
}

impl<Req: Message> OperationsClient<Req> for HttpOperationsClient<Req> {
    fn trigger(
        &self,
        request: &Req,
    ) -> impl Future<Output = Result<OperationStatus, TransportError>> + Send {
        let body = request
            .encode_fields()
            .map(Value::Object)
            .map_err(|e| TransportError::Request(e.to_string().into()));
        async move {
            let body = body?;
            self.transport
                .send_json(Method::POST, &self.trigger_url, &self.headers, Some(&body))
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EchoRequest, EchoResponse};
    use crate::AnyPayload;
    use serde_json::json;
    use wiremock::matchers::{self, body_json};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn h(name: &str, value: &str) -> (String, String) {
        (name.to_owned(), value.to_owned())
    }

    #[test]
    fn test_join_headers_primary_wins() {
        let joined = join_headers(
            &[h("content-type", "text/plain"), h("X-Trace", "1")],
            &[h("Content-Type", "application/json"), h("Accept", "*/*")],
        );
        assert_eq!(
            joined,
            vec![h("content-type", "text/plain"), h("X-Trace", "1"), h("Accept", "*/*")]
        );
    }

    #[tokio::test]
    async fn test_error_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .and(matchers::path("/v1/operations/op-1"))
            .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
            .mount(&server)
            .await;

        let client: HttpOperationsClient<EchoRequest> = HttpOperationsClient::new(
            HttpTransport::new(reqwest::Client::new()),
            format!("{}/v1/echo", server.uri()),
            format!("{}/v1/operations/", server.uri()),
        );
        let err = client.get("op-1").await.unwrap_err();
        match err {
            TransportError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body.as_ref(), "try later");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_trigger_posts_request_fields() {
        let server = MockServer::start().await;
        let done = OperationStatus::succeeded(
            "op-1",
            AnyPayload::pack(&EchoResponse { msg: "pong".into() }).unwrap(),
        );
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/v1/echo"))
            .and(matchers::header("Content-Type", "application/json"))
            .and(matchers::header("x-api-key", "secret"))
            .and(body_json(json!({"msg": "ping"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(&done))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpOperationsClient::new(
            HttpTransport::new(reqwest::Client::new()).with_default_header("x-api-key", "secret"),
            format!("{}/v1/echo", server.uri()),
            format!("{}/v1/operations", server.uri()),
        );
        let status = client
            .trigger(&EchoRequest { msg: "ping".into() })
            .await
            .unwrap();
        assert_eq!(status, done);
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(reqwest::Client::new());
        let raw = transport
            .send(Method::GET, &server.uri(), &[], None)
            .await
            .unwrap();
        assert_eq!(raw.status, 200);
        assert_eq!(raw.body, b"<html>");

        let err = transport
            .send_json::<OperationStatus>(Method::GET, &server.uri(), &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }
}
