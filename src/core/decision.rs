use serde::Serialize;

/// Closed vocabulary of decision reasons. One tag per decision,
/// never zero, never more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonTag {
    NoRoute,
    MethodNotConfigured,
    MissingCredentials,
    InvalidCredentials,
    InvalidSignature,
    SignatureExpired,
    BodyTampered,
    ClientSuspended,
    ClientRevoked,
    NoPermission,
    MethodNotAllowed,
    NoAuthRequired,
    Authenticated,
    InternalError,
}

/// Sub-tag carried only alongside `ReasonTag::InternalError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubReason {
    Timeout,
    RepositoryError,
    Panic,
}

#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub allowed: bool,
    pub reason: ReasonTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_reason: Option<SubReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
}

impl Decision {
    pub fn deny(reason: ReasonTag) -> Self {
        Self {
            allowed: false,
            reason,
            sub_reason: None,
            client_id: None,
            client_name: None,
            route_id: None,
        }
    }

    pub fn deny_with_route(reason: ReasonTag, route_id: impl Into<String>) -> Self {
        Self {
            route_id: Some(route_id.into()),
            ..Self::deny(reason)
        }
    }

    pub fn allow_public(route_id: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: ReasonTag::NoAuthRequired,
            sub_reason: None,
            client_id: None,
            client_name: None,
            route_id: Some(route_id.into()),
        }
    }

    pub fn allow_authenticated(
        route_id: impl Into<String>,
        client_id: impl Into<String>,
        client_name: impl Into<String>,
    ) -> Self {
        Self {
            allowed: true,
            reason: ReasonTag::Authenticated,
            sub_reason: None,
            client_id: Some(client_id.into()),
            client_name: Some(client_name.into()),
            route_id: Some(route_id.into()),
        }
    }

    pub fn internal_error(sub: SubReason) -> Self {
        Self {
            allowed: false,
            reason: ReasonTag::InternalError,
            sub_reason: Some(sub),
            client_id: None,
            client_name: None,
            route_id: None,
        }
    }
}
