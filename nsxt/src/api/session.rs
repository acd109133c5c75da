//! Session login against the NSX-T manager
//!
//! `POST /api/session/create` with form-encoded credentials returns a
//! `JSESSIONID` cookie and an `x-xsrf-token` header. Both are replayed on
//! every later request by [`super::client::SessionAuth`].

use super::client::HttpRequestDoer;
use super::error::ApiError;
use cookie::Cookie;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, SET_COOKIE};
use reqwest::{Method, Request, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tfplug::context::Context;
use url::Url;

pub const SESSION_PATH: &str = "/api/session/create";
pub const SESSION_COOKIE: &str = "JSESSIONID";
pub const XSRF_HEADER: &str = "x-xsrf-token";

/// Session state captured from a successful login
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    pub session: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: String,
    pub xsrf_token: String,
}

impl SessionInfo {
    /// Collect the session cookie attributes and XSRF token from login
    /// response headers. Cookies other than `JSESSIONID` are ignored.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut info = Self::default();

        for value in headers.get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            match Cookie::parse(raw) {
                Ok(cookie) if cookie.name() == SESSION_COOKIE => info.apply_cookie(&cookie),
                Ok(_) => {}
                Err(e) => tracing::debug!("ignoring malformed Set-Cookie header: {}", e),
            }
        }

        if let Some(token) = headers.get(XSRF_HEADER).and_then(|v| v.to_str().ok()) {
            info.xsrf_token = token.trim().to_string();
        }

        info
    }

    fn apply_cookie(&mut self, cookie: &Cookie<'_>) {
        self.session = cookie.value_trimmed().to_string();
        self.path = cookie.path().unwrap_or_default().to_string();
        self.secure = cookie.secure().unwrap_or(false);
        self.http_only = cookie.http_only().unwrap_or(false);
        self.same_site = cookie
            .same_site()
            .map(|same_site| same_site.to_string())
            .unwrap_or_default();
    }

    pub fn has_session(&self) -> bool {
        !self.session.is_empty()
    }
}

/// Log in once and return the session. Any status other than 200 is a
/// login failure.
pub async fn login(
    ctx: &Context,
    http: &dyn HttpRequestDoer,
    server: &Url,
    username: &str,
    password: &SecretString,
) -> Result<SessionInfo, ApiError> {
    let url = server.join(SESSION_PATH)?;
    tracing::debug!("POST request to: {}", url);

    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("j_username", username)
        .append_pair("j_password", password.expose_secret())
        .finish();

    let mut request = Request::new(Method::POST, url);
    request.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );
    *request.body_mut() = Some(body.into());

    let response = tokio::select! {
        biased;
        _ = ctx.cancelled() => return Err(ApiError::Cancelled),
        response = http.do_request(request) => response?,
    };

    let status = response.status();
    if status != StatusCode::OK {
        let message = response.text().await.unwrap_or_default();
        tracing::warn!("NSX-T login rejected with HTTP {}", status.as_u16());
        return Err(ApiError::LoginFailed {
            status: status.as_u16(),
            message,
        });
    }

    let session = SessionInfo::from_headers(response.headers());
    tracing::debug!(
        has_session = session.has_session(),
        has_xsrf_token = !session.xsrf_token.is_empty(),
        "NSX-T login succeeded"
    );
    Ok(session)
}
