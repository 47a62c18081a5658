use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use super::client::ClientStatus;
use super::credentials::{self, Headers};
use super::decision::{Decision, ReasonTag, SubReason};
use super::repository::{Repository, RepositoryError};
use super::route::{self, Method, MethodPolicy};
use super::signature::{self, Clock};

/// Everything the Authorizer needs for one decision. `domain`
/// is optional because the adapter may not always resolve one; an absent
/// domain is treated as the empty string by the Route Matcher.
pub struct AuthorizeInput<'a> {
    pub domain: Option<&'a str>,
    pub path: &'a str,
    pub method: &'a str,
    pub headers: &'a Headers,
    pub query: &'a HashMap<String, String>,
    pub body: &'a [u8],
}

pub struct Authorizer<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    signature_tolerance_secs: i64,
    repository_timeout: Duration,
}

impl<R> Authorizer<R>
where
    R: Repository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        clock: Arc<dyn Clock>,
        signature_tolerance_secs: i64,
        repository_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            clock,
            signature_tolerance_secs,
            repository_timeout,
        }
    }

    /// The single public entry point. Every code path through
    /// here — including a panic anywhere in the pipeline — resolves to a
    /// typed `Decision`; nothing is ever allowed to escape as an exception.
    pub async fn authorize(&self, input: AuthorizeInput<'_>) -> Decision {
        match AssertUnwindSafe(self.authorize_inner(input)).catch_unwind().await {
            Ok(decision) => decision,
            Err(_) => {
                tracing::error!("authorization pipeline panicked");
                Decision::internal_error(SubReason::Panic)
            }
        }
    }

    async fn with_deadline<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, RepositoryError>>,
    ) -> Result<T, Decision> {
        match tokio::time::timeout(self.repository_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                tracing::error!(error = %err, "repository call failed");
                Err(Decision::internal_error(SubReason::RepositoryError))
            }
            Err(_) => {
                tracing::warn!("repository call exceeded its deadline");
                Err(Decision::internal_error(SubReason::Timeout))
            }
        }
    }

    async fn authorize_inner(&self, input: AuthorizeInput<'_>) -> Decision {
        let domain = input.domain.unwrap_or("").to_ascii_lowercase();

        // Step 1: match route.
        let candidates = match self
            .with_deadline(self.repository.candidate_routes(&domain, input.path))
            .await
        {
            Ok(routes) => routes,
            Err(decision) => return decision,
        };
        let route = match route::match_route(&candidates, &domain, input.path) {
            Some(route) => route,
            None => return Decision::deny(ReasonTag::NoRoute),
        };

        // Unrecognized method tokens can never have a table entry, so they
        // collapse onto the same outcome as an absent one.
        let method = match Method::parse(input.method) {
            Some(method) => method,
            None => return Decision::deny(ReasonTag::MethodNotConfigured),
        };

        // Step 2: resolve method policy.
        let policy = match route.methods.get(&method) {
            Some(policy) => *policy,
            None => return Decision::deny(ReasonTag::MethodNotConfigured),
        };

        // Step 3: public methods short-circuit with no credential work at all.
        if policy == MethodPolicy::Public {
            return Decision::allow_public(route.id.clone());
        }

        // Step 4: parse credentials.
        let parsed = credentials::parse_credentials(input.headers, input.query);

        // Step 5: authenticate according to the route's declared auth_type.
        let client = match policy {
            MethodPolicy::RequireSignature => {
                let bundle = match &parsed.signature_bundle {
                    Some(bundle) => bundle,
                    None => return Decision::deny(ReasonTag::MissingCredentials),
                };
                match self.authenticate_by_signature(bundle, method, input.path, input.body).await {
                    Ok(client) => client,
                    Err(decision) => return decision,
                }
            }
            MethodPolicy::RequireKey => {
                let key = match &parsed.api_key {
                    Some(key) => key,
                    None => return Decision::deny(ReasonTag::MissingCredentials),
                };
                match self.with_deadline(self.repository.client_by_api_key(key)).await {
                    Ok(Some(client)) => client,
                    Ok(None) => return Decision::deny(ReasonTag::InvalidCredentials),
                    Err(decision) => return decision,
                }
            }
            MethodPolicy::Public => unreachable!("handled above"),
        };

        // Step 6: client lifecycle status, checked before permissions.
        if !client.status.is_active() {
            return match client.status {
                ClientStatus::Suspended => Decision::deny(ReasonTag::ClientSuspended),
                ClientStatus::Revoked => Decision::deny(ReasonTag::ClientRevoked),
                ClientStatus::Active => unreachable!("guarded by is_active() above"),
            };
        }

        // Step 7: permission.
        let permission = match self
            .with_deadline(self.repository.permission(&client.id, &route.id))
            .await
        {
            Ok(permission) => permission,
            Err(decision) => return decision,
        };
        let permission = match permission {
            Some(permission) => permission,
            None => return Decision::deny_with_route(ReasonTag::NoPermission, route.id.clone()),
        };
        if !permission.allows(method) {
            return Decision::deny_with_route(ReasonTag::MethodNotAllowed, route.id.clone());
        }

        // Step 8.
        Decision::allow_authenticated(route.id.clone(), client.id, client.name)
    }

    /// Secret discovery: iterate the candidate secret set and
    /// return the first client whose secret verifies the bundle.
    async fn authenticate_by_signature(
        &self,
        bundle: &super::credentials::SignatureBundle,
        method: Method,
        path: &str,
        body: &[u8],
    ) -> Result<super::client::Client, Decision> {
        let candidates = self
            .with_deadline(self.repository.candidate_secrets())
            .await?;

        let now = self.clock.now_unix();
        for (client_id, secret) in candidates {
            match signature::verify_bundle(
                bundle,
                secret.as_bytes(),
                method.as_str(),
                path,
                body,
                now,
                self.signature_tolerance_secs,
            ) {
                // A matching HMAC is proof of ownership of this secret, even
                // if the request then turns out stale or tampered — so from
                // here on we report the specific failure instead of scanning
                // further.
                Err(signature::SignatureFailure::InvalidSignature) => continue,
                Err(failure) => return Err(Decision::deny(map_signature_failure(failure))),
                Ok(()) => {
                    return match self
                        .with_deadline(self.repository.client_by_shared_secret(&secret))
                        .await?
                    {
                        Some(client) if client.id == client_id => Ok(client),
                        _ => Err(Decision::deny(ReasonTag::InvalidSignature)),
                    };
                }
            }
        }
        Err(Decision::deny(ReasonTag::InvalidSignature))
    }
}

fn map_signature_failure(failure: signature::SignatureFailure) -> ReasonTag {
    match failure {
        signature::SignatureFailure::InvalidSignature => ReasonTag::InvalidSignature,
        signature::SignatureFailure::Expired => ReasonTag::SignatureExpired,
        signature::SignatureFailure::BodyTampered => ReasonTag::BodyTampered,
    }
}
