use std::fmt;

use reqwest::{
    header::{self, HeaderName, HeaderValue},
    Method, Url,
};
use serde::Serialize;

use crate::{FetchError, Result};

/// Transport options for one request: method, headers and body.
///
/// The fetcher never inspects these; they are replayed unchanged on every
/// attempt.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    method: Method,
    headers: Vec<HeaderEntry>,
    body: Option<Vec<u8>>,
}

#[derive(Clone)]
struct HeaderEntry {
    name: String,
    value: String,
    sensitive: bool,
}

impl fmt::Debug for HeaderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value: &dyn fmt::Debug = if self.sensitive {
            &"<redacted>"
        } else {
            &self.value
        };
        f.debug_tuple("Header").field(&self.name).field(value).finish()
    }
}

impl RequestOptions {
    /// Builds a `GET` request with no headers and no body.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get() -> Self {
        Self::new().method(Method::GET)
    }

    pub fn post() -> Self {
        Self::new().method(Method::POST)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Appends a header. Names and values are validated when the request
    /// is built.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(HeaderEntry {
            name: name.into(),
            value: value.into(),
            sensitive: false,
        });
        self
    }

    /// Sets `Authorization: Bearer <token>`.
    ///
    /// If the token already carries the `Bearer ` prefix it is kept as is.
    pub fn bearer_auth(mut self, token: impl AsRef<str>) -> Self {
        self.headers.push(HeaderEntry {
            name: header::AUTHORIZATION.as_str().to_owned(),
            value: normalize_bearer_authorization(token.as_ref()),
            sensitive: true,
        });
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as the JSON body and sets the content type.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)
            .map_err(|err| FetchError::InvalidRequest(format!("invalid JSON body: {err}")))?;
        Ok(self
            .header(header::CONTENT_TYPE.as_str(), "application/json")
            .body(body))
    }

    /// Builds the transport request for `url`.
    pub fn build(&self, http: &reqwest::Client, url: &str) -> Result<reqwest::Request> {
        let url = Url::parse(url.trim())
            .map_err(|err| FetchError::InvalidRequest(format!("invalid url '{url}': {err}")))?;

        let mut builder = http.request(self.method.clone(), url);
        for entry in &self.headers {
            let name = HeaderName::from_bytes(entry.name.as_bytes()).map_err(|err| {
                FetchError::InvalidRequest(format!("invalid header name '{}': {err}", entry.name))
            })?;
            let mut value = HeaderValue::from_str(&entry.value).map_err(|err| {
                FetchError::InvalidRequest(format!("invalid value for header '{name}': {err}"))
            })?;
            value.set_sensitive(entry.sensitive);
            builder = builder.header(name, value);
        }
        if let Some(body) = &self.body {
            builder = builder.body(body.clone());
        }

        builder.build().map_err(FetchError::Transport)
    }
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use reqwest::{header, Method};
    use serde_json::json;

    use super::{normalize_bearer_authorization, RequestOptions};
    use crate::FetchError;

    #[test]
    fn normalize_bearer_adds_prefix_when_missing() {
        assert_eq!(
            normalize_bearer_authorization("abc123"),
            "Bearer abc123".to_owned()
        );
    }

    #[test]
    fn normalize_bearer_keeps_existing_prefix() {
        assert_eq!(
            normalize_bearer_authorization("bEaReR abc123"),
            "bEaReR abc123".to_owned()
        );
    }

    #[test]
    fn build_carries_method_headers_and_body() {
        let http = reqwest::Client::new();
        let request = RequestOptions::post()
            .header("User-Agent", "CarDetective/1.0")
            .json(&json!({ "vin": "1N4BL4BVXPN411697" }))
            .expect("json body must serialize")
            .build(&http, "https://example.test/functions/v1/unified-decode")
            .expect("request must build");

        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.headers()[header::USER_AGENT], "CarDetective/1.0");
        assert_eq!(
            request.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let body = request
            .body()
            .and_then(|body| body.as_bytes())
            .expect("body must be buffered");
        assert_eq!(body, br#"{"vin":"1N4BL4BVXPN411697"}"#);
    }

    #[test]
    fn bearer_header_is_marked_sensitive() {
        let http = reqwest::Client::new();
        let request = RequestOptions::get()
            .bearer_auth("secret-token")
            .build(&http, "https://example.test/")
            .expect("request must build");

        let value = &request.headers()[header::AUTHORIZATION];
        assert!(value.is_sensitive());
        assert!(!format!("{value:?}").contains("secret-token"));
    }

    #[test]
    fn debug_redacts_bearer_token() {
        let options = RequestOptions::get().bearer_auth("secret-token");
        let debug = format!("{options:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn build_rejects_invalid_url_and_header() {
        let http = reqwest::Client::new();

        let err = RequestOptions::get()
            .build(&http, "not a url")
            .expect_err("url must be rejected");
        assert!(matches!(err, FetchError::InvalidRequest(_)));

        let err = RequestOptions::get()
            .header("bad header", "value")
            .build(&http, "https://example.test/")
            .expect_err("header name must be rejected");
        assert!(matches!(err, FetchError::InvalidRequest(_)));
    }
}
