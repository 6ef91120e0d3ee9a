//! Request and response descriptors passed through the gateway
//!
//! An [`ApiRequest`] is plain data so the gateway can rebuild it for the one
//! retry that follows a token refresh. Multipart bodies in particular are
//! kept as fields and turned into a fresh `reqwest` form per attempt.

use super::ClientError;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::borrow::Cow;

/// Method, target, headers and body of one API call
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, or an absolute `http(s)://` URL
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(Vec<FormField>),
}

#[derive(Debug, Clone)]
pub struct FormField {
    pub name: String,
    pub value: FormValue,
}

#[derive(Debug, Clone)]
pub enum FormValue {
    Text(String),
    File {
        file_name: String,
        mime: Option<String>,
        bytes: Bytes,
    },
}

impl FormField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            value: FormValue::File {
                file_name: file_name.into(),
                mime: None,
                bytes: bytes.into(),
            },
        }
    }

    /// Set the content type of a file field; ignored for text fields
    #[must_use]
    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        if let FormValue::File { mime: slot, .. } = &mut self.value {
            *slot = Some(mime.into());
        }
        self
    }
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ClientError> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Attach a multipart form body
    #[must_use]
    pub fn multipart(mut self, fields: Vec<FormField>) -> Self {
        self.body = RequestBody::Multipart(fields);
        self
    }

    /// Turn the descriptor into a sendable request, attaching `token` as a
    /// bearer credential when present.
    pub(crate) fn build(
        &self,
        http: &Client,
        base_url: &str,
        token: Option<&str>,
    ) -> Result<RequestBuilder, ClientError> {
        let url = if self.path.starts_with("http://") || self.path.starts_with("https://") {
            self.path.clone()
        } else {
            format!("{base_url}{}", self.path)
        };

        let mut headers = self.headers.clone();
        if token.is_some() {
            headers.remove(AUTHORIZATION);
        }

        let mut request = http.request(self.method.clone(), url).headers(headers);
        if !self.query.is_empty() {
            request = request.query(&self.query);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        request = match &self.body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(value),
            RequestBody::Multipart(fields) => request.multipart(build_form(fields)?),
        };

        Ok(request)
    }
}

fn build_form(fields: &[FormField]) -> Result<Form, ClientError> {
    let mut form = Form::new();
    for field in fields {
        form = match &field.value {
            FormValue::Text(value) => form.text(field.name.clone(), value.clone()),
            FormValue::File {
                file_name,
                mime,
                bytes,
            } => {
                let mut part = Part::bytes(bytes.to_vec()).file_name(file_name.clone());
                if let Some(mime) = mime {
                    part = part.mime_str(mime)?;
                }
                form.part(field.name.clone(), part)
            }
        };
    }
    Ok(form)
}

/// Fully read response: status, headers and body bytes
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ApiResponse {
    pub(crate) async fn read(response: reqwest::Response) -> Result<Self, ClientError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Map a non-2xx response to the matching [`ClientError`]
    pub fn error_for_status(self) -> Result<Self, ClientError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            let message = if self.body.is_empty() {
                self.status.to_string()
            } else {
                self.text().into_owned()
            };
            Err(ClientError::from_status(self.status, message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(request: &ApiRequest, token: Option<&str>) -> reqwest::Request {
        request
            .build(&Client::new(), "http://api.test", token)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_bearer_replaces_caller_authorization() {
        let request = ApiRequest::get("/feed/")
            .query("page", "2")
            .header(AUTHORIZATION, HeaderValue::from_static("Basic xyz"));

        let built = build(&request, Some("tok"));
        assert_eq!(built.url().as_str(), "http://api.test/feed/?page=2");
        let values: Vec<_> = built.headers().get_all(AUTHORIZATION).iter().collect();
        assert_eq!(values, vec![&HeaderValue::from_static("Bearer tok")]);
    }

    #[test]
    fn test_no_token_keeps_request_anonymous() {
        let built = build(&ApiRequest::get("/trips/"), None);
        assert!(built.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_absolute_url_bypasses_base() {
        let built = build(&ApiRequest::get("https://cdn.test/a.json"), None);
        assert_eq!(built.url().as_str(), "https://cdn.test/a.json");
    }

    #[test]
    fn test_json_body_is_set() {
        let request = ApiRequest::post("/trips/")
            .json(&json!({"title": "Lisbon"}))
            .unwrap();
        let built = build(&request, None);
        let body = built.body().and_then(reqwest::Body::as_bytes).unwrap();
        assert_eq!(serde_json::from_slice::<Value>(body).unwrap(), json!({"title": "Lisbon"}));
    }

    #[test]
    fn test_multipart_rejects_bad_mime() {
        let request = ApiRequest::post("/posts/").multipart(vec![
            FormField::file("image", "a.png", vec![1_u8, 2, 3]).mime("not a mime"),
        ]);
        let result = request.build(&Client::new(), "http://api.test", None);
        assert!(matches!(result, Err(ClientError::Request(_))));
    }

    #[test]
    fn test_error_for_status_uses_body_or_reason() {
        let response = ApiResponse {
            status: StatusCode::NOT_FOUND,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        };
        match response.error_for_status() {
            Err(ClientError::NotFound(message)) => assert_eq!(message, "404 Not Found"),
            other => panic!("unexpected: {other:?}"),
        }

        let response = ApiResponse {
            status: StatusCode::FORBIDDEN,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"{\"detail\":\"premium only\"}"),
        };
        assert!(matches!(
            response.error_for_status(),
            Err(ClientError::Forbidden(m)) if m.contains("premium only")
        ));
    }
}
