//! Registration pattern parsing.
//!
//! A registration string has the form `[METHOD:]/uri[@domain]`. The method defaults to
//! [`MethodFilter::All`] and the domain defaults to [`DEFAULT_DOMAIN`]. Parsing has no side
//! effects; segment classification happens later in the route compiler.

use http::Method;
use std::fmt;

use crate::router::RegistrationError;

/// Domain used when a pattern carries no `@domain` suffix.
///
/// Routes under this domain are searched for every request after the request's own host.
pub const DEFAULT_DOMAIN: &str = "default";

/// The nine HTTP verbs a route can be registered for.
pub const SUPPORTED_METHODS: [Method; 9] = [
    Method::GET,
    Method::PUT,
    Method::POST,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::CONNECT,
    Method::OPTIONS,
    Method::TRACE,
];

/// Returns true if `method` is one of the nine supported verbs.
#[inline]
#[must_use]
pub fn is_supported_method(method: &Method) -> bool {
    SUPPORTED_METHODS.contains(method)
}

/// Which request methods a route answers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MethodFilter {
    /// Every supported verb (`ALL`, or no method prefix at all).
    All,
    /// Exactly one verb.
    Only(Method),
}

impl MethodFilter {
    /// Parse a method prefix, case-insensitively. `ALL` maps to [`MethodFilter::All`].
    pub fn parse(raw: &str) -> Result<Self, RegistrationError> {
        let upper = raw.trim().to_ascii_uppercase();
        if upper == "ALL" {
            return Ok(MethodFilter::All);
        }
        SUPPORTED_METHODS
            .iter()
            .find(|m| m.as_str() == upper)
            .map(|m| MethodFilter::Only(m.clone()))
            .ok_or_else(|| RegistrationError::InvalidMethod {
                method: raw.to_string(),
            })
    }

    /// Whether a request with `method` is accepted by this filter.
    #[inline]
    #[must_use]
    pub fn accepts(&self, method: &Method) -> bool {
        match self {
            MethodFilter::All => is_supported_method(method),
            MethodFilter::Only(m) => m == method,
        }
    }

    /// True for a single-verb filter.
    #[inline]
    #[must_use]
    pub fn is_specific(&self) -> bool {
        matches!(self, MethodFilter::Only(_))
    }
}

impl fmt::Display for MethodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodFilter::All => f.write_str("ALL"),
            MethodFilter::Only(m) => f.write_str(m.as_str()),
        }
    }
}

/// A parsed registration pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    /// Method filter from the `METHOD:` prefix.
    pub method: MethodFilter,
    /// Lower-cased domain from the `@domain` suffix, or [`DEFAULT_DOMAIN`].
    pub domain: String,
    /// The URI template. Always starts with `/`; never ends with `/` unless it is the root.
    pub uri: String,
}

impl Pattern {
    /// Parse a `[METHOD:]/uri[@domain]` registration string.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::EmptyUri`] if nothing remains after stripping method and domain
    /// - [`RegistrationError::MissingLeadingSlash`] if the URI does not start with `/`
    /// - [`RegistrationError::InvalidMethod`] for an unknown method prefix
    ///
    /// # Example
    ///
    /// ```rust
    /// use hookrouter::pattern::{MethodFilter, Pattern};
    ///
    /// let p = Pattern::parse("POST:/user/:id/@Example.com").unwrap();
    /// assert_eq!(p.method, MethodFilter::Only(http::Method::POST));
    /// assert_eq!(p.uri, "/user/:id");
    /// assert_eq!(p.domain, "example.com");
    /// ```
    pub fn parse(pattern: &str) -> Result<Self, RegistrationError> {
        let trimmed = pattern.trim();
        let (method, rest) = split_method(trimmed)?;
        let (uri, domain) = split_domain(rest);
        let uri = uri.trim();

        if uri.is_empty() {
            return Err(RegistrationError::EmptyUri {
                pattern: pattern.to_string(),
            });
        }
        if !uri.starts_with('/') {
            return Err(RegistrationError::MissingLeadingSlash {
                pattern: pattern.to_string(),
            });
        }

        Ok(Self {
            method,
            domain,
            uri: normalize_uri(uri),
        })
    }

    /// Same pattern bound under another domain.
    #[must_use]
    pub fn with_domain(&self, domain: &str) -> Self {
        Self {
            method: self.method.clone(),
            domain: domain.trim().to_ascii_lowercase(),
            uri: self.uri.clone(),
        }
    }

    /// Same pattern with `prefix` prepended to its URI.
    #[must_use]
    pub fn with_prefix(&self, prefix: &str) -> Self {
        let prefix = prefix.trim().trim_end_matches('/');
        let uri = if prefix.is_empty() {
            self.uri.clone()
        } else if self.uri == "/" {
            normalize_uri(prefix)
        } else {
            normalize_uri(&format!("{prefix}{}", self.uri))
        };
        let uri = if uri.starts_with('/') {
            uri
        } else {
            format!("/{uri}")
        };
        Self {
            method: self.method.clone(),
            domain: self.domain.clone(),
            uri,
        }
    }

    /// Same pattern with `/action` appended to the URI.
    pub(crate) fn with_action(&self, action: &str) -> Self {
        let action = action.trim_matches('/');
        let uri = if self.uri == "/" {
            format!("/{action}")
        } else {
            format!("{}/{action}", self.uri)
        };
        Self {
            method: self.method.clone(),
            domain: self.domain.clone(),
            uri,
        }
    }

    /// Same pattern restricted to one method.
    #[must_use]
    pub fn with_method(&self, method: MethodFilter) -> Self {
        Self {
            method,
            domain: self.domain.clone(),
            uri: self.uri.clone(),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.method, self.uri, self.domain)
    }
}

/// Split an optional `METHOD:` prefix. Only an all-alphabetic head counts as a method, so
/// `/user/:id` is left alone.
fn split_method(pattern: &str) -> Result<(MethodFilter, &str), RegistrationError> {
    if let Some((head, tail)) = pattern.split_once(':') {
        let head = head.trim();
        if !head.is_empty() && head.chars().all(|c| c.is_ascii_alphabetic()) {
            return Ok((MethodFilter::parse(head)?, tail.trim()));
        }
    }
    Ok((MethodFilter::All, pattern))
}

/// Split an optional `@domain` suffix. The suffix must look like a host name
/// (`[A-Za-z0-9_.-]+`), otherwise the `@` stays part of the URI.
fn split_domain(rest: &str) -> (&str, String) {
    if let Some((uri, domain)) = rest.rsplit_once('@') {
        let domain = domain.trim();
        if !uri.is_empty()
            && !domain.is_empty()
            && domain
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        {
            return (uri, domain.to_ascii_lowercase());
        }
    }
    (rest, DEFAULT_DOMAIN.to_string())
}

fn normalize_uri(uri: &str) -> String {
    let trimmed = uri.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
