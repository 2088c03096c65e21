use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Method, Url};
use serde::Serialize;

use crate::{
    builder::{QueryBuilder, RequestBuilder},
    request::{
        HeaderSet, RequestState, ACCEPT, ACCEPT_PROFILE, AUTHORIZATION, CONTENT_PROFILE,
        CONTENT_TYPE,
    },
    ClientOptions, PostgrestError, ReqwestTransport, Result, Transport,
};

/// Client for a PostgREST-style endpoint.
///
/// Holds the base URL, the default headers sent with every request and the
/// transport. Builders borrow the client, so independent queries can be
/// composed from the same client at once.
#[derive(Clone)]
pub struct PostgrestClient<T = ReqwestTransport> {
    transport: T,
    base_url: Url,
    headers: HeaderSet,
    options: ClientOptions,
}

impl<T> fmt::Debug for PostgrestClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(name, value)| {
                if name.eq_ignore_ascii_case(AUTHORIZATION) {
                    (name, "<redacted>")
                } else {
                    (name, value)
                }
            })
            .collect();
        f.debug_struct("PostgrestClient")
            .field("base_url", &self.base_url.as_str())
            .field("headers", &headers)
            .field("options", &self.options)
            .finish()
    }
}

impl PostgrestClient<ReqwestTransport> {
    /// Creates a client for `base_url` using the default reqwest transport.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use postgrest_http::PostgrestClient;
    ///
    /// let db = PostgrestClient::new("https://example.com/rest/v1")
    ///     .expect("valid url")
    ///     .with_bearer_auth("my-token");
    /// ```
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::with_transport(base_url, ReqwestTransport::default())
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `POSTGREST_URL` — base endpoint URL
    /// - `POSTGREST_TOKEN` — optional bearer token (Bearer prefix optional)
    ///
    /// **Not available on `wasm32` targets** — environment variables do not
    /// exist in browser runtimes.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("POSTGREST_URL").map_err(|_| {
            PostgrestError::Config("missing POSTGREST_URL environment variable".to_owned())
        })?;
        if url.trim().is_empty() {
            return Err(PostgrestError::Config(
                "POSTGREST_URL is set but empty".to_owned(),
            ));
        }

        let client = Self::new(url.trim())?;
        match std::env::var("POSTGREST_TOKEN") {
            Ok(token) if !token.trim().is_empty() => Ok(client.with_bearer_auth(token)),
            _ => Ok(client),
        }
    }
}

impl<T: Transport> PostgrestClient<T> {
    /// Creates a client that dispatches through a custom transport.
    pub fn with_transport(base_url: impl AsRef<str>, transport: T) -> Result<Self> {
        let base_url = normalize_base_url(base_url.as_ref())?;
        let options = ClientOptions::default();

        let mut headers = HeaderSet::new();
        headers.set(ACCEPT, "application/json");
        headers.set(CONTENT_TYPE, "application/json");
        headers.set(ACCEPT_PROFILE, options.schema.as_str());
        headers.set(CONTENT_PROFILE, options.schema.as_str());

        Ok(Self {
            transport,
            base_url,
            headers,
            options,
        })
    }

    /// Applies client options; the schema is written to both profile headers.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.headers.set(ACCEPT_PROFILE, opts.schema.as_str());
        self.headers.set(CONTENT_PROFILE, opts.schema.as_str());
        self.options = opts;
        self
    }

    /// Routes requests to `schema` instead of `public`.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        let schema = schema.into();
        self.headers.set(ACCEPT_PROFILE, schema.as_str());
        self.headers.set(CONTENT_PROFILE, schema.as_str());
        self.options.schema = schema;
        self
    }

    /// Sends `Authorization: Bearer <token>`.
    ///
    /// If the token already carries the `Bearer ` prefix, it is kept as is.
    pub fn with_bearer_auth(mut self, token: impl AsRef<str>) -> Self {
        self.headers
            .set(AUTHORIZATION, normalize_bearer_authorization(token.as_ref()));
        self
    }

    /// Sends `Authorization: Basic <base64(username:password)>`.
    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        let credentials = STANDARD.encode(format!("{username}:{password}"));
        self.headers
            .set(AUTHORIZATION, format!("Basic {credentials}"));
        self
    }

    /// Adds or replaces a default header sent with every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Default headers, before any builder overrides.
    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Starts a request against `table`.
    pub fn from(&self, table: &str) -> RequestBuilder<'_, T> {
        let state = RequestState::new(format!("/{table}"), self.headers.clone());
        RequestBuilder::new(self, state)
    }

    /// Prepares a call to the stored procedure `function` with `params` as body.
    pub fn rpc<P>(&self, function: &str, params: &P) -> QueryBuilder<'_, T>
    where
        P: Serialize + ?Sized,
    {
        let mut state = RequestState::new(format!("/rpc/{function}"), self.headers.clone());
        state.set_method(Method::POST);
        state.set_body(serde_json::to_vec(params).map_err(|err| err.to_string()));
        QueryBuilder::new(self, state)
    }
}

fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())
        .map_err(|err| PostgrestError::Config(format!("invalid base url '{raw}': {err}")))?;
    if url.cannot_be_a_base() {
        return Err(PostgrestError::Config(format!(
            "base url '{raw}' cannot carry a path"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
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
    use super::{normalize_base_url, normalize_bearer_authorization, PostgrestClient};
    use crate::{ClientOptions, PostgrestError};

    fn client() -> PostgrestClient {
        PostgrestClient::new("https://example.com").expect("valid url")
    }

    #[test]
    fn default_headers_are_seeded() {
        let client = client();
        let headers = client.headers();

        assert_eq!(client.base_url().as_str(), "https://example.com/");
        assert_eq!(headers.get("Accept"), Some("application/json"));
        assert_eq!(headers.get("Content-Type"), Some("application/json"));
        assert_eq!(headers.get("Accept-Profile"), Some("public"));
        assert_eq!(headers.get("Content-Profile"), Some("public"));
        assert_eq!(headers.get("Authorization"), None);
    }

    #[test]
    fn bearer_auth_sets_authorization() {
        let client = client().with_bearer_auth("s3cr3t");
        assert_eq!(client.headers().get("Authorization"), Some("Bearer s3cr3t"));
    }

    #[test]
    fn basic_auth_encodes_credentials() {
        let client = client().with_basic_auth("admin", "s3cr3t");
        assert_eq!(
            client.headers().get("Authorization"),
            Some("Basic YWRtaW46czNjcjN0")
        );
    }

    #[test]
    fn schema_sets_both_profiles() {
        let client = client().with_schema("private");
        assert_eq!(client.headers().get("Accept-Profile"), Some("private"));
        assert_eq!(client.headers().get("Content-Profile"), Some("private"));
        assert_eq!(client.options().schema, "private");
    }

    #[test]
    fn options_schema_sets_both_profiles() {
        let client = client().with_options(ClientOptions {
            timeout_ms: 500,
            schema: "audit".to_owned(),
        });
        assert_eq!(client.headers().get("Accept-Profile"), Some("audit"));
        assert_eq!(client.headers().get("Content-Profile"), Some("audit"));
        assert_eq!(client.options().timeout_ms, 500);
    }

    #[test]
    fn base_url_keeps_its_path() {
        let url = normalize_base_url("https://example.com/rest/v1").expect("valid url");
        assert_eq!(url.as_str(), "https://example.com/rest/v1/");

        let url = normalize_base_url("https://example.com/rest/v1/").expect("valid url");
        assert_eq!(url.as_str(), "https://example.com/rest/v1/");
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let err = PostgrestClient::new("not a url").expect_err("must fail");
        assert!(matches!(err, PostgrestError::Config(_)));

        let err = PostgrestClient::new("mailto:ops@example.com").expect_err("must fail");
        assert!(matches!(err, PostgrestError::Config(_)));
    }

    #[test]
    fn normalize_bearer_keeps_existing_prefix() {
        assert_eq!(normalize_bearer_authorization("abc123"), "Bearer abc123");
        assert_eq!(
            normalize_bearer_authorization("bEaReR abc123"),
            "bEaReR abc123"
        );
    }

    #[test]
    fn debug_redacts_authorization_value() {
        let client = client().with_bearer_auth("secret-token");
        let debug = format!("{client:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn rpc_posts_serialized_params() {
        let client = client();
        let builder = client.rpc("add_them", &serde_json::json!({"a": 1, "b": 2}));
        let state = builder.state();

        assert_eq!(state.path(), "/rpc/add_them");
        assert_eq!(state.method(), &reqwest::Method::POST);
        let body: serde_json::Value =
            serde_json::from_slice(state.body().expect("body")).expect("json body");
        assert_eq!(body, serde_json::json!({"a": 1, "b": 2}));
    }
}
