use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Canonical HTTP method tokens. Anything else is simply not
/// configurable on a route, which the Method Policy Resolver treats the
/// same as an absent table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl Method {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "PATCH" => Some(Self::Patch),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

/// Per-method policy. A tagged variant, rather than a `(bool,
/// Option<AuthType>)` pair — `NotConfigured` is represented by the
/// method's absence from `Route::methods`, not by a fourth variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodPolicy {
    Public,
    RequireKey,
    RequireSignature,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: String,
    pub pattern: String,
    pub domain: String,
    pub methods: HashMap<Method, MethodPolicy>,
    pub service_name: String,
}

impl Route {
    /// `pattern` must start with `/`; it is either an exact path or a
    /// `/*`-suffixed prefix. `domain` is normalized to lowercase so domain
    /// matching stays case-insensitive.
    pub fn new(
        id: impl Into<String>,
        pattern: impl Into<String>,
        domain: impl Into<String>,
        methods: HashMap<Method, MethodPolicy>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            pattern: pattern.into(),
            domain: domain.into().to_ascii_lowercase(),
            methods,
            service_name: service_name.into(),
        }
    }
}

fn path_matches(pattern: &str, path: &str) -> bool {
    match pattern.strip_suffix("/*") {
        Some(prefix) => path == prefix || path.starts_with(&format!("{prefix}/")),
        None => path == pattern,
    }
}

fn domain_matches(route_domain: &str, request_domain: &str) -> bool {
    if route_domain == "*" {
        return true;
    }
    match route_domain.strip_prefix("*.") {
        Some(suffix) => request_domain != suffix && request_domain.ends_with(&format!(".{suffix}")),
        None => route_domain == request_domain,
    }
}

/// Specificity rank: (domain rank, path rank, wildcard-prefix length).
/// Higher is more specific; compared lexicographically as a tuple.
fn rank(route: &Route) -> (u8, u8, usize) {
    let domain_rank = if route.domain == "*" {
        0
    } else if route.domain.starts_with("*.") {
        1
    } else {
        2
    };
    let (path_rank, prefix_len) = match route.pattern.strip_suffix("/*") {
        Some(prefix) => (0u8, prefix.len()),
        None => (1u8, 0usize),
    };
    (domain_rank, path_rank, prefix_len)
}

/// Select the single best-matching route out of `candidates`, applying the
/// total ordering below and the id-lexicographic tie-break.
/// `request_domain` must already be lowercased by the caller (the Authorizer
/// lowercases it once up front so every consumer of it agrees).
pub fn match_route<'a>(candidates: &'a [Route], request_domain: &str, path: &str) -> Option<&'a Route> {
    let mut best: Option<&Route> = None;
    for candidate in candidates {
        if !path_matches(&candidate.pattern, path) || !domain_matches(&candidate.domain, request_domain) {
            continue;
        }
        best = Some(match best {
            None => candidate,
            Some(current) => {
                let (r_candidate, r_current) = (rank(candidate), rank(current));
                if r_candidate > r_current || (r_candidate == r_current && candidate.id < current.id) {
                    candidate
                } else {
                    current
                }
            }
        });
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(id: &str, pattern: &str, domain: &str) -> Route {
        Route::new(id, pattern, domain, HashMap::new(), "svc")
    }

    #[test]
    fn root_wildcard_matches_bare_slash() {
        assert!(path_matches("/*", "/"));
        assert!(path_matches("/*", "/anything"));
    }

    #[test]
    fn wildcard_prefix_requires_trailing_slash_boundary() {
        assert!(!path_matches("/a/*", "/a"));
        assert!(path_matches("/a/*", "/a/"));
        assert!(path_matches("/a/*", "/a/b"));
    }

    #[test]
    fn exact_pattern_matches_only_itself() {
        assert!(path_matches("/api/users", "/api/users"));
        assert!(!path_matches("/api/users", "/api/users/1"));
    }

    #[test]
    fn domain_case_insensitivity_and_subdomain_wildcard() {
        assert!(domain_matches("api.example.com", "api.example.com"));
        assert!(domain_matches("*.example.com", "api.example.com"));
        assert!(!domain_matches("*.example.com", "example.com"));
        assert!(domain_matches("*", "anything.at.all"));
    }

    #[test]
    fn exact_domain_beats_any_domain() {
        let routes = vec![
            route("r-any", "/x", "*"),
            route("r-exact", "/x", "a.example"),
        ];
        let matched = match_route(&routes, "a.example", "/x").unwrap();
        assert_eq!(matched.id, "r-exact");
    }

    #[test]
    fn exact_path_beats_wildcard_path() {
        let routes = vec![
            Route::new("r-wild", "/a/*", "*", HashMap::new(), "svc"),
            Route::new("r-exact", "/a/b", "*", HashMap::new(), "svc"),
        ];
        let matched = match_route(&routes, "", "/a/b").unwrap();
        assert_eq!(matched.id, "r-exact");
    }

    #[test]
    fn longer_wildcard_prefix_wins() {
        let routes = vec![
            Route::new("r-short", "/a/*", "*", HashMap::new(), "svc"),
            Route::new("r-long", "/a/b/*", "*", HashMap::new(), "svc"),
        ];
        let matched = match_route(&routes, "", "/a/b/c").unwrap();
        assert_eq!(matched.id, "r-long");
    }

    #[test]
    fn tie_breaks_on_lexicographically_smaller_id() {
        let routes = vec![
            Route::new("z-route", "/x", "*", HashMap::new(), "svc"),
            Route::new("a-route", "/x", "*", HashMap::new(), "svc"),
        ];
        let matched = match_route(&routes, "", "/x").unwrap();
        assert_eq!(matched.id, "a-route");
    }

    #[test]
    fn no_candidate_matches_returns_none() {
        let routes = vec![Route::new("r", "/a/*", "a.example", HashMap::new(), "svc")];
        assert!(match_route(&routes, "b.example", "/a/1").is_none());
    }
}
