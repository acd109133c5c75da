//! NSX-T Policy API client
//!
//! The client owns the manager URL, the credentials, an executor and an
//! ordered list of request editors. Every request passes through the editors
//! in registration order before it is handed to the executor; the first
//! editor error aborts the request without sending it. Status codes are not
//! interpreted here.

use super::error::ApiError;
use super::session::{SessionInfo, SESSION_COOKIE};
use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, COOKIE};
use reqwest::{Method, Request, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tfplug::context::Context;
use url::Url;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const XSRF_TOKEN_HEADER: &str = "x-xsrf-token";

/// Executes a fully prepared request
#[async_trait]
pub trait HttpRequestDoer: Send + Sync {
    async fn do_request(&self, request: Request) -> Result<Response, reqwest::Error>;
}

#[async_trait]
impl HttpRequestDoer for reqwest::Client {
    async fn do_request(&self, request: Request) -> Result<Response, reqwest::Error> {
        self.execute(request).await
    }
}

/// Mutates a request right before it is sent
pub trait RequestEditor: Send + Sync {
    fn edit(&self, ctx: &Context, request: &mut Request) -> Result<(), ApiError>;
}

impl<F> RequestEditor for F
where
    F: Fn(&Context, &mut Request) -> Result<(), ApiError> + Send + Sync,
{
    fn edit(&self, ctx: &Context, request: &mut Request) -> Result<(), ApiError> {
        self(ctx, request)
    }
}

/// Sends `Authorization: Basic ...` built from the client credentials
pub struct BasicAuth {
    username: String,
    password: SecretString,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

impl RequestEditor for BasicAuth {
    fn edit(&self, _ctx: &Context, request: &mut Request) -> Result<(), ApiError> {
        let credentials = format!("{}:{}", self.username, self.password.expose_secret());
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        let mut value = HeaderValue::from_str(&format!("Basic {}", encoded)).map_err(|_| {
            ApiError::InvalidHeader {
                name: AUTHORIZATION.to_string(),
            }
        })?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// Replays the login session: the `JSESSIONID` cookie plus the XSRF token
pub struct SessionAuth {
    session: SessionInfo,
}

impl SessionAuth {
    pub fn new(session: SessionInfo) -> Self {
        Self { session }
    }
}

impl RequestEditor for SessionAuth {
    fn edit(&self, _ctx: &Context, request: &mut Request) -> Result<(), ApiError> {
        let cookie = format!("{}={}", SESSION_COOKIE, self.session.session);
        let mut value = HeaderValue::from_str(&cookie).map_err(|_| ApiError::InvalidHeader {
            name: COOKIE.to_string(),
        })?;
        value.set_sensitive(true);
        request.headers_mut().insert(COOKIE, value);

        if !self.session.xsrf_token.is_empty() {
            let mut token =
                HeaderValue::from_str(&self.session.xsrf_token).map_err(|_| {
                    ApiError::InvalidHeader {
                        name: XSRF_TOKEN_HEADER.to_string(),
                    }
                })?;
            token.set_sensitive(true);
            request
                .headers_mut()
                .insert(HeaderName::from_static(XSRF_TOKEN_HEADER), token);
        }
        Ok(())
    }
}

/// Parse a manager address. A bare host or `host:port` is served over https.
pub fn server_url(host: &str) -> Result<Url, ApiError> {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        Ok(Url::parse(host)?)
    } else {
        Ok(Url::parse(&format!("https://{}", host))?)
    }
}

/// The underlying HTTP client: per-request timeout, optional certificate checks
pub fn http_client(insecure: bool, timeout: Duration) -> Result<reqwest::Client, ApiError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(insecure)
        .build()?;
    Ok(client)
}

/// NSX-T API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    server: Url,
    username: String,
    doer: Box<dyn HttpRequestDoer>,
    editors: Vec<Box<dyn RequestEditor>>,
}

pub struct ClientBuilder {
    server: String,
    username: String,
    password: SecretString,
    insecure: bool,
    timeout: Duration,
    doer: Option<Box<dyn HttpRequestDoer>>,
    session: Option<SessionInfo>,
    editors: Vec<Box<dyn RequestEditor>>,
}

impl ClientBuilder {
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Per-request timeout of the default executor, [`REQUEST_TIMEOUT`] unless set
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the default reqwest executor
    pub fn http_client(mut self, doer: impl HttpRequestDoer + 'static) -> Self {
        self.doer = Some(Box::new(doer));
        self
    }

    /// Authenticate with the login session instead of basic credentials
    pub fn session(mut self, session: SessionInfo) -> Self {
        self.session = Some(session);
        self
    }

    /// Editors run after the credential editor, in the order added
    pub fn request_editor(mut self, editor: impl RequestEditor + 'static) -> Self {
        self.editors.push(Box::new(editor));
        self
    }

    pub fn build(self) -> Result<Client, ApiError> {
        let server = server_url(&self.server)?;

        let doer: Box<dyn HttpRequestDoer> = match self.doer {
            Some(doer) => doer,
            None => Box::new(http_client(self.insecure, self.timeout)?),
        };

        let credentials: Box<dyn RequestEditor> = match self.session {
            Some(session) => Box::new(SessionAuth::new(session)),
            None => Box::new(BasicAuth::new(self.username.clone(), self.password)),
        };

        let mut editors = Vec::with_capacity(self.editors.len() + 1);
        editors.push(credentials);
        editors.extend(self.editors);

        Ok(Client {
            inner: Arc::new(ClientInner {
                server,
                username: self.username,
                doer,
                editors,
            }),
        })
    }
}

impl Client {
    /// Client using basic auth for every request
    pub fn new(
        server: &str,
        username: &str,
        password: SecretString,
        insecure: bool,
    ) -> Result<Self, ApiError> {
        Self::builder(server, username, password)
            .insecure(insecure)
            .build()
    }

    pub fn builder(server: &str, username: &str, password: SecretString) -> ClientBuilder {
        ClientBuilder {
            server: server.to_string(),
            username: username.to_string(),
            password,
            insecure: false,
            timeout: REQUEST_TIMEOUT,
            doer: None,
            session: None,
            editors: Vec::new(),
        }
    }

    pub fn server(&self) -> &Url {
        &self.inner.server
    }

    pub fn username(&self) -> &str {
        &self.inner.username
    }

    /// True when both handles were cloned from the same built client
    pub fn same_client(&self, other: &Client) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Segment port operations
    pub fn segment_ports(&self) -> super::segment_ports::SegmentPortsApi<'_> {
        super::segment_ports::SegmentPortsApi::new(self)
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> Result<Request, ApiError> {
        let url = self.inner.server.join(path)?;
        Ok(Request::new(method, url))
    }

    pub(crate) fn json_request<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Request, ApiError> {
        let mut request = self.request(method, path)?;
        let bytes = serde_json::to_vec(body)?;
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *request.body_mut() = Some(bytes.into());
        Ok(request)
    }

    /// Apply every editor, then send. Resolves early with
    /// [`ApiError::Cancelled`] once `ctx` is cancelled.
    pub async fn execute(&self, ctx: &Context, mut request: Request) -> Result<Response, ApiError> {
        for editor in &self.inner.editors {
            editor.edit(ctx, &mut request)?;
        }

        tracing::debug!("{} request to: {}", request.method(), request.url());

        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(ApiError::Cancelled),
            response = self.inner.doer.do_request(request) => {
                let response = response?;
                tracing::debug!("API response status: {}", response.status());
                Ok(response)
            }
        }
    }
}
