//! Per-request modifiers applied before a GET is sent.

use std::fmt;
use std::str::FromStr;

use reqwest::RequestBuilder;
use reqwest::header::COOKIE;

/// A change applied to an outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestModifier {
    /// Attach a cookie. All cookie modifiers on one request share a single
    /// `Cookie` header.
    Cookie {
        /// Cookie name.
        name: String,
        /// Cookie value.
        value: String,
    },
    /// Set an arbitrary header.
    Header {
        /// Header name.
        name: String,
        /// Header value.
        value: String,
    },
}

impl RequestModifier {
    /// Creates a cookie modifier.
    pub fn cookie(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Cookie {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Creates a header modifier.
    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Header {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for RequestModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cookie { name, .. } => write!(f, "cookie {name}"),
            Self::Header { name, .. } => write!(f, "header {name}"),
        }
    }
}

/// Parses `NAME=VALUE` into a cookie modifier.
impl FromStr for RequestModifier {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (name, value) = raw
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=VALUE, got `{raw}`"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("cookie name is empty in `{raw}`"));
        }
        Ok(Self::cookie(name, value.trim()))
    }
}

/// Applies every modifier to `request`, in order.
pub(crate) fn apply_modifiers<'a, I>(mut request: RequestBuilder, modifiers: I) -> RequestBuilder
where
    I: IntoIterator<Item = &'a RequestModifier> + Clone,
{
    if let Some(cookie_header) = cookie_header(modifiers.clone()) {
        request = request.header(COOKIE, cookie_header);
    }
    for modifier in modifiers {
        if let RequestModifier::Header { name, value } = modifier {
            request = request.header(name.as_str(), value.as_str());
        }
    }
    request
}

fn cookie_header<'a>(modifiers: impl IntoIterator<Item = &'a RequestModifier>) -> Option<String> {
    let pairs: Vec<String> = modifiers
        .into_iter()
        .filter_map(|modifier| match modifier {
            RequestModifier::Cookie { name, value } => Some(format!("{name}={value}")),
            RequestModifier::Header { .. } => None,
        })
        .collect();
    (!pairs.is_empty()).then(|| pairs.join("; "))
}
