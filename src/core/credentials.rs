use std::collections::HashMap;

/// Case-insensitive header bag. The adapter is responsible for populating
/// this from whatever header representation the HTTP layer hands it; the
/// core never touches `axum::http::HeaderMap` directly so the parser stays
/// pure and framework-agnostic.
#[derive(Debug, Clone, Default)]
pub struct Headers(HashMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0.insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Empty values are treated as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct SignatureBundle {
    pub signature: String,
    /// The timestamp exactly as received — the canonical string hashes this
    /// raw text, not a reformatted integer.
    pub timestamp_raw: String,
    pub body_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedCredentials {
    pub api_key: Option<String>,
    pub signature_bundle: Option<SignatureBundle>,
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// `Authorization: Bearer <token>` / `Authorization: ApiKey <token>` / a bare
/// token, falling back to the `api_key` query parameter. Header wins over
/// query when both are present.
fn parse_api_key(headers: &Headers, query: &HashMap<String, String>) -> Option<String> {
    if let Some(auth) = headers.get("authorization") {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            return non_empty(token.trim());
        }
        if let Some(token) = auth.strip_prefix("ApiKey ") {
            return non_empty(token.trim());
        }
        return non_empty(auth.trim());
    }
    query
        .get("api_key")
        .and_then(|v| non_empty(v))
}

/// A partial bundle (any of the three headers missing or empty) is treated
/// as no bundle at all.
fn parse_signature_bundle(headers: &Headers) -> Option<SignatureBundle> {
    let signature = headers.get("x-signature")?.to_string();
    let timestamp_raw = headers.get("x-timestamp")?.to_string();
    let body_hash = headers.get("x-body-hash")?.to_string();
    Some(SignatureBundle {
        signature,
        timestamp_raw,
        body_hash,
    })
}

pub fn parse_credentials(headers: &Headers, query: &HashMap<String, String>) -> ParsedCredentials {
    ParsedCredentials {
        api_key: parse_api_key(headers, query),
        signature_bundle: parse_signature_bundle(headers),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_extracts_token() {
        let mut h = Headers::new();
        h.insert("Authorization", "Bearer k-abc");
        assert_eq!(parse_api_key(&h, &HashMap::new()).as_deref(), Some("k-abc"));
    }

    #[test]
    fn apikey_prefix_extracts_token() {
        let mut h = Headers::new();
        h.insert("authorization", "ApiKey k-abc");
        assert_eq!(parse_api_key(&h, &HashMap::new()).as_deref(), Some("k-abc"));
    }

    #[test]
    fn bare_token_is_accepted() {
        let mut h = Headers::new();
        h.insert("authorization", "k-abc");
        assert_eq!(parse_api_key(&h, &HashMap::new()).as_deref(), Some("k-abc"));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut h = Headers::new();
        h.insert("AUTHORIZATION", "Bearer k-abc");
        assert_eq!(h.get("authorization"), Some("Bearer k-abc"));
    }

    #[test]
    fn query_param_used_only_when_header_absent() {
        let mut query = HashMap::new();
        query.insert("api_key".to_string(), "from-query".to_string());
        assert_eq!(parse_api_key(&Headers::new(), &query).as_deref(), Some("from-query"));

        let mut h = Headers::new();
        h.insert("authorization", "Bearer from-header");
        assert_eq!(parse_api_key(&h, &query).as_deref(), Some("from-header"));
    }

    #[test]
    fn empty_string_is_treated_as_absent() {
        let mut h = Headers::new();
        h.insert("authorization", "");
        assert!(parse_api_key(&h, &HashMap::new()).is_none());
    }

    #[test]
    fn partial_signature_bundle_is_treated_as_missing() {
        let mut h = Headers::new();
        h.insert("x-signature", "sig");
        h.insert("x-timestamp", "1700000000");
        // x-body-hash absent
        assert!(parse_signature_bundle(&h).is_none());
    }

    #[test]
    fn complete_signature_bundle_parses() {
        let mut h = Headers::new();
        h.insert("x-signature", "sig");
        h.insert("x-timestamp", "1700000000");
        h.insert("x-body-hash", "deadbeef");
        let bundle = parse_signature_bundle(&h).unwrap();
        assert_eq!(bundle.signature, "sig");
        assert_eq!(bundle.timestamp_raw, "1700000000");
        assert_eq!(bundle.body_hash, "deadbeef");
    }
}
