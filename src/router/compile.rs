//! Route compilation.
//!
//! Turns a parsed [`Pattern`] into a [`CompiledRoute`]: a segment list used to place the route in
//! the tree, one anchored regex used for final disambiguation, the ordered capture names and the
//! route's priority.
//!
//! | Segment        | Kind     | Regex fragment      |
//! |----------------|----------|---------------------|
//! | `list`         | literal  | `/list`             |
//! | `:id`          | named    | `/([^/]+)`          |
//! | `{page}.html`  | template | `/([^/]+)\.html`    |
//! | `*path`        | wildcard | `(?:/(.*))?`        |
//!
//! The wildcard fragment makes the separator optional so `/user/*any` also matches `/user`.

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use super::error::RegistrationError;
use super::ParamVec;
use crate::dispatcher::SharedHandler;
use crate::hooks::HookStage;
use crate::pattern::Pattern;

/// Piece of a template segment such as `{page}.html`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePiece {
    /// Literal text, matched verbatim.
    Text(String),
    /// `{name}` capture, matches one or more non-`/` characters.
    Capture(String),
}

/// One `/`-delimited component of a route URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Exact text.
    Literal(String),
    /// `:name`, or a bare `:` which matches without capturing.
    Named(Option<String>),
    /// A literal segment with one or more embedded `{name}` captures.
    Template(Vec<TemplatePiece>),
    /// `*name` (or bare `*`), matches the rest of the path. Always last.
    Wildcard(Option<String>),
}

impl Segment {
    /// Fuzzy segments share a node's single fuzzy child in the route tree.
    #[inline]
    #[must_use]
    pub fn is_fuzzy(&self) -> bool {
        !matches!(self, Segment::Literal(_))
    }

    fn classify(raw: &str) -> Result<Self, RegistrationError> {
        if let Some(name) = raw.strip_prefix(':') {
            return Ok(Segment::Named(capture_name(name, raw)?));
        }
        if let Some(name) = raw.strip_prefix('*') {
            return Ok(Segment::Wildcard(capture_name(name, raw)?));
        }
        if raw.contains('{') || raw.contains('}') {
            return parse_template(raw).map(Segment::Template);
        }
        Ok(Segment::Literal(raw.to_string()))
    }

    fn push_regex(&self, out: &mut String, names: &mut Vec<Arc<str>>) {
        match self {
            Segment::Literal(text) => {
                out.push('/');
                out.push_str(&regex::escape(text));
            }
            Segment::Named(Some(name)) => {
                out.push_str("/([^/]+)");
                names.push(Arc::from(name.as_str()));
            }
            Segment::Named(None) => out.push_str("/[^/]+"),
            Segment::Template(pieces) => {
                out.push('/');
                for piece in pieces {
                    match piece {
                        TemplatePiece::Text(text) => out.push_str(&regex::escape(text)),
                        TemplatePiece::Capture(name) => {
                            out.push_str("([^/]+)");
                            names.push(Arc::from(name.as_str()));
                        }
                    }
                }
            }
            Segment::Wildcard(Some(name)) => {
                out.push_str("(?:/(.*))?");
                names.push(Arc::from(name.as_str()));
            }
            Segment::Wildcard(None) => out.push_str("(?:/.*)?"),
        }
    }
}

fn is_capture_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

fn capture_name(name: &str, segment: &str) -> Result<Option<String>, RegistrationError> {
    if name.is_empty() {
        return Ok(None);
    }
    if name.chars().all(is_capture_char) {
        Ok(Some(name.to_string()))
    } else {
        Err(RegistrationError::InvalidCaptureName {
            segment: segment.to_string(),
        })
    }
}

fn parse_template(segment: &str) -> Result<Vec<TemplatePiece>, RegistrationError> {
    let mut pieces = Vec::new();
    let mut rest = segment;
    while !rest.is_empty() {
        match rest.find(['{', '}']) {
            None => {
                pieces.push(TemplatePiece::Text(rest.to_string()));
                break;
            }
            Some(idx) if rest[idx..].starts_with('}') => {
                return Err(RegistrationError::UnterminatedCapture {
                    segment: segment.to_string(),
                });
            }
            Some(open) => {
                if open > 0 {
                    pieces.push(TemplatePiece::Text(rest[..open].to_string()));
                }
                let after = &rest[open + 1..];
                let close = after.find('}').ok_or_else(|| RegistrationError::UnterminatedCapture {
                    segment: segment.to_string(),
                })?;
                let name = &after[..close];
                if name.is_empty() || !name.chars().all(is_capture_char) {
                    return Err(RegistrationError::InvalidCaptureName {
                        segment: segment.to_string(),
                    });
                }
                pieces.push(TemplatePiece::Capture(name.to_string()));
                rest = &after[close + 1..];
            }
        }
    }
    Ok(pieces)
}

/// Split a route URI into classified segments. The root URI is the single literal segment `/`;
/// empty components (`/a//b`) are skipped.
pub(crate) fn parse_segments(uri: &str) -> Result<Vec<Segment>, RegistrationError> {
    if uri == "/" {
        return Ok(vec![Segment::Literal("/".to_string())]);
    }
    let raw: Vec<&str> = uri
        .trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let mut segments = Vec::with_capacity(raw.len());
    for (idx, part) in raw.iter().enumerate() {
        let segment = Segment::classify(part)?;
        if matches!(segment, Segment::Wildcard(_)) && idx + 1 != raw.len() {
            return Err(RegistrationError::MisplacedWildcard {
                uri: uri.to_string(),
            });
        }
        segments.push(segment);
    }
    Ok(segments)
}

/// Build the anchored regex for a segment list, returning it with the ordered capture names.
pub(crate) fn segments_to_regex(
    uri: &str,
    segments: &[Segment],
) -> Result<(Regex, Vec<Arc<str>>), RegistrationError> {
    let mut pattern = String::with_capacity(uri.len() + 16);
    let mut names = Vec::new();
    pattern.push('^');
    if uri == "/" {
        pattern.push('/');
    } else {
        for segment in segments {
            segment.push_regex(&mut pattern, &mut names);
        }
    }
    pattern.push('$');
    let regex = Regex::new(&pattern).map_err(|e| RegistrationError::InvalidRegex {
        uri: uri.to_string(),
        message: e.to_string(),
    })?;
    debug_assert_eq!(regex.captures_len() - 1, names.len());
    Ok((regex, names))
}

/// A registered route: pattern, tree placement, matcher and handler.
///
/// Compiled routes are created at registration time and shared (`Arc`) between every terminal
/// list they are anchored in.
pub struct CompiledRoute {
    /// Registration id, unique within one router. Hook chains are deduplicated by it.
    pub id: u64,
    /// Method, domain and URI this route was registered with.
    pub pattern: Pattern,
    /// Classified URI segments.
    pub segments: Vec<Segment>,
    /// Anchored regex equivalent to the whole URI.
    pub regex: Regex,
    /// Capture group names in regex order.
    pub capture_names: Vec<Arc<str>>,
    /// Number of segments, a trailing wildcard excluded. More segments means more specific.
    pub priority: usize,
    /// The bound handler.
    pub handler: SharedHandler,
    /// Type name of the handler, for route listings and logs.
    pub handler_name: String,
    /// `None` for serve routes, the stage for hooks.
    pub stage: Option<HookStage>,
}

impl CompiledRoute {
    /// Compile `pattern` into a route bound to `handler`.
    ///
    /// # Errors
    ///
    /// Misplaced wildcards, malformed `{...}` captures and regex failures.
    pub fn compile(
        id: u64,
        pattern: Pattern,
        handler: SharedHandler,
        handler_name: String,
        stage: Option<HookStage>,
    ) -> Result<Self, RegistrationError> {
        let segments = parse_segments(&pattern.uri)?;
        let (regex, capture_names) = segments_to_regex(&pattern.uri, &segments)?;
        // a trailing wildcard also matches the bare prefix and ranks by the segments before it
        let tail = usize::from(matches!(segments.last(), Some(Segment::Wildcard(_))));
        Ok(Self {
            id,
            priority: segments.len() - tail,
            pattern,
            segments,
            regex,
            capture_names,
            handler,
            handler_name,
            stage,
        })
    }

    /// Copy of this route with a different handler, keeping id and placement.
    #[must_use]
    pub fn with_handler(&self, handler: SharedHandler, handler_name: String) -> Self {
        Self {
            id: self.id,
            pattern: self.pattern.clone(),
            segments: self.segments.clone(),
            regex: self.regex.clone(),
            capture_names: self.capture_names.clone(),
            priority: self.priority,
            handler,
            handler_name,
            stage: self.stage,
        }
    }

    /// Match `path` against the route regex and return the captured parameters.
    ///
    /// An optional tail capture that did not participate (`/user` against `/user/*any`) binds to
    /// an empty string.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<ParamVec> {
        if self.capture_names.is_empty() {
            return self.regex.is_match(path).then(ParamVec::new);
        }
        let caps = self.regex.captures(path)?;
        let mut params = ParamVec::new();
        for (idx, name) in self.capture_names.iter().enumerate() {
            let value = caps.get(idx + 1).map_or("", |m| m.as_str());
            params.push((Arc::clone(name), value.to_string()));
        }
        Some(params)
    }

    fn count_segments(&self, pred: impl Fn(&Segment) -> bool) -> usize {
        self.segments.iter().filter(|s| pred(*s)).count()
    }

    /// Length of the literal text, captures excluded.
    fn literal_len(&self) -> usize {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(text) => text.len(),
                Segment::Template(pieces) => pieces
                    .iter()
                    .map(|p| match p {
                        TemplatePiece::Text(text) => text.len(),
                        TemplatePiece::Capture(_) => 0,
                    })
                    .sum(),
                Segment::Named(_) | Segment::Wildcard(_) => 0,
            })
            .sum()
    }
}

impl fmt::Debug for CompiledRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRoute")
            .field("id", &self.id)
            .field("pattern", &self.pattern.to_string())
            .field("regex", &self.regex.as_str())
            .field("capture_names", &self.capture_names)
            .field("priority", &self.priority)
            .field("handler_name", &self.handler_name)
            .field("stage", &self.stage)
            .finish()
    }
}

/// Specificity ordering between two routes anchored in the same terminal list.
///
/// `Greater` means `a` is more specific and must be tried first. In order:
/// 1. more segments, not counting a trailing wildcard
/// 2. fewer fuzzy segments
/// 3. more `{name}` templates, then more `:name` segments (`{x}` > `:x` > `*x`)
/// 4. longer literal text
/// 5. a single method over `ALL`
///
/// `Equal` leaves registration order in place.
#[must_use]
pub fn specificity(a: &CompiledRoute, b: &CompiledRoute) -> Ordering {
    let fuzzy = |r: &CompiledRoute| r.count_segments(Segment::is_fuzzy);
    let templates = |r: &CompiledRoute| r.count_segments(|s| matches!(s, Segment::Template(_)));
    let named = |r: &CompiledRoute| r.count_segments(|s| matches!(s, Segment::Named(_)));

    a.priority
        .cmp(&b.priority)
        .then_with(|| fuzzy(b).cmp(&fuzzy(a)))
        .then_with(|| templates(a).cmp(&templates(b)))
        .then_with(|| named(a).cmp(&named(b)))
        .then_with(|| a.literal_len().cmp(&b.literal_len()))
        .then_with(|| {
            a.pattern
                .method
                .is_specific()
                .cmp(&b.pattern.method.is_specific())
        })
}
