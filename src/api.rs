// API client module: contains a small blocking HTTP client that talks to
// the platform's REST API. Every call is a one-shot request; the resource
// commands and the upload pipeline build their endpoint URLs on top of it.

use crate::error::{Error, Result};
use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

/// Server used when no `--url` is given.
pub const DEFAULT_URL: &str = "https://zegami.com";

/// Max number of chunk operations to have in flight at once.
pub const CONCURRENCY: usize = 16;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

const UPLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// API client that holds a reqwest blocking client, the server base URL
/// and an optional bearer token for authenticated calls.
///
/// The token is only ever attached to requests aimed at the server itself,
/// never to third-party storage hosts that signed upload URLs point at.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

/// Client for storage uploads. Only connecting is time-limited; a large
/// file may take arbitrarily long to transfer.
pub fn upload_client() -> Result<Client> {
    let client = Client::builder()
        .connect_timeout(UPLOAD_CONNECT_TIMEOUT)
        .timeout(None::<Duration>)
        .build()?;
    Ok(client)
}

impl ApiClient {
    /// Create a client for `base_url`, optionally authenticated.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Returns whether a token is present in the client.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Project scoped API prefix, always ending in `/`.
    pub fn api_url(&self, project: &str) -> String {
        format!("{}/api/v0/project/{}/", self.base_url, project)
    }

    fn authorizes(&self, url: &str) -> bool {
        self.token.is_some() && url.starts_with(&self.base_url)
    }

    fn request(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        tracing::debug!(%method, url, "request");
        let mut req = self.client.request(method, url);
        if let (true, Some(token)) = (self.authorizes(url), &self.token) {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|e| Error::Config(format!("token is not a valid header value: {e}")))?;
            req = req.header(AUTHORIZATION, value);
        }
        Ok(req)
    }

    /// Get a json response.
    pub fn get_json(&self, url: &str) -> Result<Value> {
        let res = self.request(Method::GET, url)?.send()?;
        handle_response(res)
    }

    /// Send a json request and decode the json response.
    pub fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<Value> {
        let res = self.request(Method::POST, url)?.json(body).send()?;
        handle_response(res)
    }

    /// Put json content and decode the json response.
    pub fn put_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<Value> {
        let res = self.request(Method::PUT, url)?.json(body).send()?;
        handle_response(res)
    }

    /// Delete a resource.
    pub fn delete(&self, url: &str) -> Result<()> {
        let res = self.request(Method::DELETE, url)?.send()?;
        check_status(res).map(|_| ())
    }

    /// Upload a data file as multipart/form-data under the `file` field.
    pub fn post_file(&self, url: &str, path: &Path, mime: &str) -> Result<Value> {
        let file = File::open(path)?;
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("upload")
            .to_string();
        let part = multipart::Part::reader(file)
            .file_name(file_name)
            .mime_str(mime)?;
        let form = multipart::Form::new().part("file", part);

        let res = self.request(Method::POST, url)?.multipart(form).send()?;
        handle_response(res)
    }
}

/// Turn a non-success response into an error carrying the server's body.
pub fn check_status(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let url = res.url().to_string();
    let body = res.text().unwrap_or_default();
    Err(Error::Status {
        url,
        status: status.as_u16(),
        body,
    })
}

/// Check the status of a response and decode its body as json.
pub fn handle_response(res: Response) -> Result<Value> {
    let res = check_status(res)?;
    let status = res.status();
    let bytes = res.bytes()?;
    decode_body(status, &bytes)
}

/// Decode a successful response body. No-content responses decode to `null`.
pub fn decode_body(status: StatusCode, body: &[u8]) -> Result<Value> {
    if status == StatusCode::NO_CONTENT || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_is_project_scoped() {
        let api = ApiClient::new("https://example.com/", None).unwrap();
        assert_eq!(
            api.api_url("proj1"),
            "https://example.com/api/v0/project/proj1/"
        );
    }

    #[test]
    fn token_only_sent_to_own_server() {
        let api = ApiClient::new("https://example.com", Some("abc".into())).unwrap();
        assert!(api.authorizes("https://example.com/api/v0/project/p/imagesets/1"));
        assert!(!api.authorizes("https://storage.googleapis.com/bucket/blob"));

        let anonymous = ApiClient::new("https://example.com", None).unwrap();
        assert!(!anonymous.authorizes("https://example.com/oauth/token/"));
    }

    #[test]
    fn no_content_decodes_to_null() {
        assert_eq!(decode_body(StatusCode::NO_CONTENT, b"").unwrap(), Value::Null);
        assert_eq!(decode_body(StatusCode::OK, b"  \n").unwrap(), Value::Null);
    }

    #[test]
    fn json_body_is_decoded() {
        let value = decode_body(StatusCode::OK, br#"{"new_size": 110}"#).unwrap();
        assert_eq!(value["new_size"], 110);
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(decode_body(StatusCode::OK, b"<html>").is_err());
    }

    #[test]
    fn upload_client_builds() {
        assert!(upload_client().is_ok());
    }
}
