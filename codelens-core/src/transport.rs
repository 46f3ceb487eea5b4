//! HTTP transport seam used by the API client.

use std::future::Future;
use std::pin::Pin;

use reqwest::Client;
use reqwest::multipart::{Form, Part};

use crate::error::{CodelensError, Result};

/// Boxed future returned by transports.
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + 'a>>;

/// HTTP method used by the backend contract.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Method {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// One part of a multipart form body.
#[derive(Debug, Clone, PartialEq)]
pub enum FormField {
    /// Plain text field.
    Text {
        /// Field name.
        name: String,
        /// Field value.
        value: String,
    },
    /// File field.
    File {
        /// Field name.
        name: String,
        /// Filename reported to the server.
        filename: String,
        /// File contents.
        bytes: Vec<u8>,
    },
}

/// Request body variants.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// JSON document.
    Json(serde_json::Value),
    /// Multipart form; the transport chooses the boundary.
    Multipart(Vec<FormField>),
}

/// A fully resolved HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: RequestBody,
}

/// Raw HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Reason phrase, e.g. `Not Found`.
    pub reason: String,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a single HTTP request.
///
/// Implementations report connection and I/O failures as
/// [`CodelensError::Request`]; any status code is a successful send.
pub trait HttpTransport {
    /// Send the request once.
    fn send<'a>(&'a self, request: HttpRequest) -> TransportFuture<'a>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for &T {
    fn send<'a>(&'a self, request: HttpRequest) -> TransportFuture<'a> {
        (**self).send(request)
    }
}

/// Reqwest-backed transport used in production.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport with the codelens user agent.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("codelens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| CodelensError::Other(format!("http client setup failed: {err}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn send<'a>(&'a self, request: HttpRequest) -> TransportFuture<'a> {
        Box::pin(send_with_reqwest(&self.client, request))
    }
}

async fn send_with_reqwest(client: &Client, request: HttpRequest) -> Result<HttpResponse> {
    let mut builder = match request.method {
        Method::Get => client.get(&request.url),
        Method::Post => client.post(&request.url),
    };
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder = match request.body {
        RequestBody::Empty => builder,
        RequestBody::Json(value) => builder.body(value.to_string()),
        RequestBody::Multipart(fields) => builder.multipart(build_form(fields)),
    };
    let response = builder.send().await.map_err(request_failed)?;
    let status = response.status();
    let reason = status.canonical_reason().unwrap_or_default().to_string();
    let body = response.bytes().await.map_err(request_failed)?;
    Ok(HttpResponse {
        status: status.as_u16(),
        reason,
        body: body.to_vec(),
    })
}

fn build_form(fields: Vec<FormField>) -> Form {
    fields.into_iter().fold(Form::new(), |form, field| match field {
        FormField::Text { name, value } => form.text(name, value),
        FormField::File {
            name,
            filename,
            bytes,
        } => form.part(name, Part::bytes(bytes).file_name(filename)),
    })
}

fn request_failed(err: reqwest::Error) -> CodelensError {
    CodelensError::Request(format!("Request failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_covers_2xx_only() {
        let mut response = HttpResponse {
            status: 204,
            reason: "No Content".to_string(),
            body: Vec::new(),
        };
        assert!(response.is_success());
        response.status = 302;
        assert!(!response.is_success());
        response.status = 199;
        assert!(!response.is_success());
    }

    #[test]
    fn method_names_are_upper_case() {
        assert_eq!(Method::Get.as_str(), "GET");
        assert_eq!(Method::Post.as_str(), "POST");
    }

    #[test]
    fn reqwest_transport_builds() {
        assert!(ReqwestTransport::new().is_ok());
    }
}
