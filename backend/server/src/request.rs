//! Per-request view the router works from.
//!
//! A [`RequestContext`] is derived fresh for every inbound request and never
//! mutated. Cookie changes flow the other way, as [`SetCookie`] values that
//! end up on the response.
use std::{collections::BTreeMap, fmt, time::Duration};

use axum::http::{
    HeaderMap, HeaderValue, Uri,
    header::{COOKIE, HOST, SET_COOKIE},
};
use url::form_urlencoded;

use crate::error::AppError;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub hostname: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub cookies: CookieJar,
}

impl RequestContext {
    pub fn from_parts(uri: &Uri, headers: &HeaderMap) -> Result<Self, AppError> {
        let hostname = headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
            .or_else(|| uri.authority().map(|a| a.as_str().to_string()))
            .ok_or(AppError::MissingHost)?
            .to_ascii_lowercase();

        let query = uri
            .query()
            .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        Ok(Self {
            hostname,
            path: uri.path().to_string(),
            query,
            cookies: CookieJar::from_headers(headers),
        })
    }

    /// Re-encoded query string including the leading `?`, or empty.
    pub fn query_string(&self) -> String {
        if self.query.is_empty() {
            return String::new();
        }

        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();

        format!("?{encoded}")
    }

    /// `path.split('/')[1]`, empty for top-level paths.
    pub fn first_segment(&self) -> &str {
        self.path.split('/').nth(1).unwrap_or("")
    }

    pub fn first_named_segment(&self) -> Option<&str> {
        self.path.split('/').find(|s| !s.is_empty())
    }

    pub fn path_and_query(&self) -> String {
        format!("{}{}", self.path, self.query_string())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let cookies = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| {
                let (name, value) = pair.split_once('=')?;
                let name = name.trim();

                (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
            })
            .collect();

        Self { cookies }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => f.write_str("Strict"),
            SameSite::Lax => f.write_str("Lax"),
            SameSite::None => f.write_str("None"),
        }
    }
}

/// A cookie mutation to be emitted as a `Set-Cookie` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub max_age: Option<Duration>,
    pub path: String,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

impl SetCookie {
    pub fn session(name: &str, value: &str, max_age: Duration, secure: bool) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            max_age: Some(max_age),
            path: "/".to_string(),
            http_only: true,
            secure,
            same_site: SameSite::Lax,
        }
    }

    pub fn removal(name: &str, secure: bool) -> Self {
        Self::session(name, "", Duration::ZERO, secure)
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; Path={}", self.name, self.value, self.path)?;

        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age.as_secs())?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }

        write!(f, "; SameSite={}", self.same_site)
    }
}

pub fn append_set_cookies(headers: &mut HeaderMap, cookies: &[SetCookie]) {
    for cookie in cookies {
        if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
            headers.append(SET_COOKIE, value);
        }
    }
}
