//! Resource URI routing.
//!
//! A resource URI has the form `scheme://segment[/segment]*`. URIs with a
//! single segment are looked up in a fixed allow-set ([`DirectRouter`]);
//! longer URIs are matched positionally against an ordered list of
//! [`ResourceTemplate`]s ([`TemplateRouter`]). The first template that
//! matches wins. Resolution is pure: the same URI against the same router
//! always yields the same [`RouteMatch`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::Utf8Error;
use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::operation::{ResourceDefinition, ResourceTemplateDefinition, JSON_MIME_TYPE};
use crate::path::endpoint;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{([A-Za-z_][A-Za-z0-9_]*)\}$").expect("valid placeholder regex")
});

static OPTIONAL_TAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{/([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid optional-tail regex")
});

/// Builds the upstream endpoint path from captured variables.
pub type EndpointBuilder = fn(&RouteParams) -> String;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A resource URI that could not be routed. Every variant carries the
/// original URI.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteFailure {
    #[error("Malformed resource URI: {uri}")]
    Malformed { uri: String },
    #[error("Unknown resource type `{resource_type}` in {uri}")]
    UnknownResourceType { uri: String, resource_type: String },
    #[error("No resource template matches {uri}")]
    NoMatchingTemplate { uri: String },
}

impl RouteFailure {
    #[must_use]
    pub fn uri(&self) -> &str {
        match self {
            Self::Malformed { uri }
            | Self::UnknownResourceType { uri, .. }
            | Self::NoMatchingTemplate { uri } => uri,
        }
    }
}

/// A pattern rejected while building the router.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template `{pattern}` does not start with `{scheme}://`")]
    WrongScheme { pattern: String, scheme: String },
    #[error("template `{pattern}` has an invalid segment `{segment}`")]
    InvalidSegment { pattern: String, segment: String },
    #[error("template `{pattern}` declares `{name}` more than once")]
    DuplicateVariable { pattern: String, name: String },
    #[error("template `{pattern}` has fewer than two segments")]
    TooShort { pattern: String },
}

// ---------------------------------------------------------------------------
// RouteParams / RouteMatch
// ---------------------------------------------------------------------------

/// Variables captured from a resource URI, percent-decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(BTreeMap<String, String>);

impl RouteParams {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Captured value of a placeholder the template always binds.
    ///
    /// Returns an empty string for names the template does not declare.
    #[must_use]
    pub fn value(&self, name: &str) -> &str {
        self.get(name).unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn insert(&mut self, name: &str, value: &str) -> Result<(), Utf8Error> {
        let decoded = percent_decode_str(value).decode_utf8()?.into_owned();
        self.0.insert(name.to_string(), decoded);
        Ok(())
    }
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Upstream path to GET.
    pub endpoint: String,
    pub params: RouteParams,
    /// Pattern of the template that matched; `None` for direct resources.
    pub template: Option<String>,
}

// ---------------------------------------------------------------------------
// UriPattern
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSegment {
    Literal(String),
    Variable(String),
}

/// Parsed form of `scheme://literal/{var}/literal{/optional}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriPattern {
    source: String,
    segments: Vec<PatternSegment>,
    optional: Vec<String>,
}

impl UriPattern {
    /// # Errors
    ///
    /// Returns [`TemplateError`] if the pattern does not use `scheme`, has an
    /// empty or half-braced segment, repeats a variable name, or has fewer
    /// than two mandatory segments.
    pub fn parse(pattern: &str, scheme: &str) -> Result<Self, TemplateError> {
        let body = strip_scheme(pattern, scheme).ok_or_else(|| TemplateError::WrongScheme {
            pattern: pattern.to_string(),
            scheme: scheme.to_string(),
        })?;

        let (head, tail) = match body.find("{/") {
            Some(idx) => body.split_at(idx),
            None => (body, ""),
        };

        let invalid = |segment: &str| TemplateError::InvalidSegment {
            pattern: pattern.to_string(),
            segment: segment.to_string(),
        };

        let mut optional = Vec::new();
        let mut consumed = 0;
        for caps in OPTIONAL_TAIL_RE.captures_iter(tail) {
            let whole = caps.get(0).ok_or_else(|| invalid(tail))?;
            if whole.start() != consumed {
                return Err(invalid(&tail[consumed..whole.start()]));
            }
            consumed = whole.end();
            optional.push(caps[1].to_string());
        }
        if consumed != tail.len() {
            return Err(invalid(&tail[consumed..]));
        }

        let mut segments = Vec::new();
        for raw in head.split('/') {
            if raw.is_empty() {
                return Err(invalid(raw));
            }
            if let Some(caps) = PLACEHOLDER_RE.captures(raw) {
                segments.push(PatternSegment::Variable(caps[1].to_string()));
            } else if raw.contains(['{', '}']) {
                return Err(invalid(raw));
            } else {
                segments.push(PatternSegment::Literal(raw.to_string()));
            }
        }
        if segments.len() < 2 {
            return Err(TemplateError::TooShort {
                pattern: pattern.to_string(),
            });
        }

        let mut seen = Vec::new();
        let names = segments
            .iter()
            .filter_map(|s| match s {
                PatternSegment::Variable(name) => Some(name),
                PatternSegment::Literal(_) => None,
            })
            .chain(optional.iter());
        for name in names {
            if seen.contains(&name) {
                return Err(TemplateError::DuplicateVariable {
                    pattern: pattern.to_string(),
                    name: name.clone(),
                });
            }
            seen.push(name);
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
            optional,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Captures variables if `input` matches this pattern positionally.
    ///
    /// Returns `Ok(None)` when the shape does not match and an error when it
    /// does but a captured value is not valid percent-encoded UTF-8.
    fn capture(&self, input: &[&str]) -> Result<Option<RouteParams>, Utf8Error> {
        let mandatory = self.segments.len();
        if input.len() < mandatory || input.len() > mandatory + self.optional.len() {
            return Ok(None);
        }
        let literals_match = self.segments.iter().zip(input).all(|(segment, value)| match segment {
            PatternSegment::Literal(literal) => literal == value,
            PatternSegment::Variable(_) => true,
        });
        if !literals_match {
            return Ok(None);
        }
        let mut params = RouteParams::default();
        for (segment, value) in self.segments.iter().zip(input) {
            if let PatternSegment::Variable(name) = segment {
                params.insert(name, value)?;
            }
        }
        for (name, value) in self.optional.iter().zip(&input[mandatory..]) {
            params.insert(name, value)?;
        }
        Ok(Some(params))
    }
}

impl fmt::Display for UriPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// ---------------------------------------------------------------------------
// ResourceTemplate
// ---------------------------------------------------------------------------

/// A parameterized resource and the endpoint it reads from.
#[derive(Debug, Clone)]
pub struct ResourceTemplate {
    pub pattern: UriPattern,
    pub name: String,
    pub description: String,
    pub mime_type: String,
    pub endpoint: EndpointBuilder,
}

impl ResourceTemplate {
    #[must_use]
    pub fn definition(&self) -> ResourceTemplateDefinition {
        ResourceTemplateDefinition {
            uri_template: self.pattern.as_str().to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Routers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct DirectResource {
    resource_type: String,
    name: String,
    description: String,
}

/// Single-segment resources, each mapped to `/{type}` upstream.
#[derive(Debug, Clone, Default)]
pub struct DirectRouter {
    entries: Vec<DirectResource>,
}

impl DirectRouter {
    #[must_use]
    pub fn contains(&self, resource_type: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.resource_type == resource_type)
    }

    fn resolve(&self, uri: &str, resource_type: &str) -> Result<RouteMatch, RouteFailure> {
        if !self.contains(resource_type) {
            return Err(RouteFailure::UnknownResourceType {
                uri: uri.to_string(),
                resource_type: resource_type.to_string(),
            });
        }
        Ok(RouteMatch {
            endpoint: endpoint([resource_type]),
            params: RouteParams::default(),
            template: None,
        })
    }
}

/// Ordered list of templates; the first full match wins.
#[derive(Debug, Clone, Default)]
pub struct TemplateRouter {
    templates: Vec<ResourceTemplate>,
}

impl TemplateRouter {
    #[must_use]
    pub fn templates(&self) -> &[ResourceTemplate] {
        &self.templates
    }

    fn resolve(&self, uri: &str, segments: &[&str]) -> Result<RouteMatch, RouteFailure> {
        for template in &self.templates {
            let Ok(captured) = template.pattern.capture(segments) else {
                return Err(RouteFailure::Malformed {
                    uri: uri.to_string(),
                });
            };
            if let Some(params) = captured {
                return Ok(RouteMatch {
                    endpoint: (template.endpoint)(&params),
                    template: Some(template.pattern.as_str().to_string()),
                    params,
                });
            }
        }
        Err(RouteFailure::NoMatchingTemplate {
            uri: uri.to_string(),
        })
    }
}

/// Entry point: scheme handling plus the direct and template routers.
#[derive(Debug, Clone)]
pub struct ResourceRouter {
    scheme: String,
    direct: DirectRouter,
    templates: TemplateRouter,
}

impl ResourceRouter {
    #[must_use]
    pub fn new(scheme: &str) -> Self {
        Self {
            scheme: scheme.to_string(),
            direct: DirectRouter::default(),
            templates: TemplateRouter::default(),
        }
    }

    /// Adds a single-segment resource to the allow-set.
    #[must_use]
    pub fn direct(mut self, resource_type: &str, name: &str, description: &str) -> Self {
        self.direct.entries.push(DirectResource {
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        });
        self
    }

    /// Appends a template after every previously registered one.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] if `pattern` does not parse.
    pub fn template(
        mut self,
        pattern: &str,
        name: &str,
        description: &str,
        endpoint: EndpointBuilder,
    ) -> Result<Self, TemplateError> {
        let pattern = UriPattern::parse(pattern, &self.scheme)?;
        self.templates.templates.push(ResourceTemplate {
            pattern,
            name: name.to_string(),
            description: description.to_string(),
            mime_type: JSON_MIME_TYPE.to_string(),
            endpoint,
        });
        Ok(self)
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[must_use]
    pub fn direct_router(&self) -> &DirectRouter {
        &self.direct
    }

    #[must_use]
    pub fn template_router(&self) -> &TemplateRouter {
        &self.templates
    }

    /// Descriptors of the direct resources, in registration order.
    #[must_use]
    pub fn resources(&self) -> Vec<ResourceDefinition> {
        self.direct
            .entries
            .iter()
            .map(|e| ResourceDefinition {
                uri: format!("{}://{}", self.scheme, e.resource_type),
                name: e.name.clone(),
                description: e.description.clone(),
                mime_type: JSON_MIME_TYPE.to_string(),
            })
            .collect()
    }

    /// Descriptors of the templates, in registration order.
    #[must_use]
    pub fn resource_templates(&self) -> Vec<ResourceTemplateDefinition> {
        self.templates
            .templates
            .iter()
            .map(ResourceTemplate::definition)
            .collect()
    }

    /// Resolves `uri` to the upstream endpoint it reads from.
    ///
    /// # Errors
    ///
    /// - [`RouteFailure::Malformed`] for a foreign scheme, an empty segment,
    ///   or a captured value that does not decode to UTF-8.
    /// - [`RouteFailure::UnknownResourceType`] for a single segment outside
    ///   the allow-set.
    /// - [`RouteFailure::NoMatchingTemplate`] when no template matches.
    pub fn resolve(&self, uri: &str) -> Result<RouteMatch, RouteFailure> {
        let malformed = || RouteFailure::Malformed {
            uri: uri.to_string(),
        };
        let body = strip_scheme(uri, &self.scheme).ok_or_else(malformed)?;
        let segments: Vec<&str> = body.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(malformed());
        }
        match segments.as_slice() {
            [single] => self.direct.resolve(uri, single),
            _ => self.templates.resolve(uri, &segments),
        }
    }
}

/// First path segment of a resource URI under `scheme`.
///
/// `resource_type("postman://collections/c-1", "postman")` is `Some("collections")`.
#[must_use]
pub fn resource_type<'a>(uri: &'a str, scheme: &str) -> Option<&'a str> {
    let body = strip_scheme(uri, scheme)?;
    body.split('/').next().filter(|s| !s.is_empty())
}

fn strip_scheme<'a>(uri: &'a str, scheme: &str) -> Option<&'a str> {
    uri.strip_prefix(scheme)?.strip_prefix("://")
}
