//! The HTTP boundary: an axum handler that receives a proxy subrequest,
//! translates it into an `AuthorizeInput`, and maps the resulting
//! `Decision` back onto an HTTP response.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::core::{AuthorizeInput, Authorizer, Decision, Headers, ReasonTag, Repository};
use crate::errors::AppError;

pub struct AdapterState<R> {
    pub authorizer: Authorizer<R>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).filter(|v| !v.is_empty())
}

/// Strips a trailing `:port` from a host header, matching the `X-Original-Host:
/// api.example.com:8443` → `api.example.com` boundary behavior.
fn domain_from_host(host: &str) -> String {
    host.rsplit_once(':').map(|(host, _port)| host).unwrap_or(host).to_ascii_lowercase()
}

fn headers_to_core(src: &HeaderMap) -> Headers {
    let mut out = Headers::new();
    for (name, value) in src.iter() {
        if let Ok(v) = value.to_str() {
            out.insert(name.as_str(), v);
        }
    }
    out
}

/// `X-Original-Host` is omitted when the edge proxy legitimately has no host
/// to forward (domain is optional to the core), but `X-Original-URI` and
/// `X-Original-Method` are never optional — without them there is no request
/// to decide on, so their absence is a malformed subrequest, not a decision.
pub async fn authorize_subrequest<R>(
    State(state): State<Arc<AdapterState<R>>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Response, AppError>
where
    R: Repository + 'static,
{
    let original_host = header_str(&headers, "x-original-host").unwrap_or("");
    let domain = domain_from_host(original_host);
    let path = header_str(&headers, "x-original-uri").ok_or(AppError::MissingHeader("x-original-uri"))?;
    let method =
        header_str(&headers, "x-original-method").ok_or(AppError::MissingHeader("x-original-method"))?;
    let core_headers = headers_to_core(&headers);

    let decision = state
        .authorizer
        .authorize(AuthorizeInput {
            domain: Some(domain.as_str()),
            path,
            method,
            headers: &core_headers,
            query: &query,
            body: &body,
        })
        .await;

    Ok(decision_to_response(decision))
}

fn decision_to_response(decision: Decision) -> Response {
    if decision.allowed {
        let mut response = StatusCode::OK.into_response();
        let headers = response.headers_mut();
        if let Some(client_id) = &decision.client_id {
            if let Ok(v) = client_id.parse() {
                headers.insert("X-Auth-Client-ID", v);
            }
        }
        if let Some(client_name) = &decision.client_name {
            if let Ok(v) = client_name.parse() {
                headers.insert("X-Auth-Client-Name", v);
            }
        }
        if let Some(route_id) = &decision.route_id {
            if let Ok(v) = route_id.parse() {
                headers.insert("X-Auth-Route-ID", v);
            }
        }
        return response;
    }

    if decision.reason == ReasonTag::InternalError {
        tracing::error!(sub_reason = ?decision.sub_reason, "authorization returned internal_error");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "reason": decision.reason, "sub_reason": decision.sub_reason })),
        )
            .into_response();
    }

    (StatusCode::FORBIDDEN, Json(json!({ "reason": decision.reason }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_port_suffix_from_host() {
        assert_eq!(domain_from_host("api.example.com:8443"), "api.example.com");
        assert_eq!(domain_from_host("API.Example.com"), "api.example.com");
    }

    #[test]
    fn host_without_port_is_unchanged_but_lowercased() {
        assert_eq!(domain_from_host("Api.Example.com"), "api.example.com");
    }
}
