use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use super::client::Client;
use super::permission::Permission;
use super::route::Route;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("repository query failed: {0}")]
    Query(#[source] anyhow::Error),
}

/// The narrow, read-only interface the core consumes. The
/// core never writes; mutation is entirely an external management concern.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn candidate_routes(&self, domain: &str, path: &str) -> Result<Vec<Route>, RepositoryError>;
    async fn client_by_api_key(&self, key: &str) -> Result<Option<Client>, RepositoryError>;
    async fn client_by_shared_secret(&self, secret: &str) -> Result<Option<Client>, RepositoryError>;
    /// `(client_id, shared_secret)` pairs the Signature Verifier iterates
    /// when no indexed client hint is available.
    async fn candidate_secrets(&self) -> Result<Vec<(String, String)>, RepositoryError>;
    async fn permission(&self, client_id: &str, route_id: &str) -> Result<Option<Permission>, RepositoryError>;
}

/// In-memory fake used by unit and integration tests. Over-approximates
/// `candidate_routes` by returning every route regardless of domain/path —
/// the Route Matcher is responsible for narrowing.
#[derive(Default)]
pub struct InMemoryRepository {
    routes: RwLock<Vec<Route>>,
    clients: RwLock<Vec<Client>>,
    permissions: RwLock<HashMap<(String, String), Permission>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(self, route: Route) -> Self {
        self.routes.write().unwrap().push(route);
        self
    }

    pub fn with_client(self, client: Client) -> Self {
        self.clients.write().unwrap().push(client);
        self
    }

    pub fn with_permission(self, permission: Permission) -> Self {
        self.permissions
            .write()
            .unwrap()
            .insert((permission.client_id.clone(), permission.route_id.clone()), permission);
        self
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn candidate_routes(&self, _domain: &str, _path: &str) -> Result<Vec<Route>, RepositoryError> {
        Ok(self.routes.read().unwrap().clone())
    }

    async fn client_by_api_key(&self, key: &str) -> Result<Option<Client>, RepositoryError> {
        Ok(self
            .clients
            .read()
            .unwrap()
            .iter()
            .find(|c| c.api_key.as_deref() == Some(key))
            .cloned())
    }

    async fn client_by_shared_secret(&self, secret: &str) -> Result<Option<Client>, RepositoryError> {
        Ok(self
            .clients
            .read()
            .unwrap()
            .iter()
            .find(|c| c.shared_secret.as_deref() == Some(secret))
            .cloned())
    }

    async fn candidate_secrets(&self) -> Result<Vec<(String, String)>, RepositoryError> {
        Ok(self
            .clients
            .read()
            .unwrap()
            .iter()
            .filter_map(|c| c.shared_secret.as_ref().map(|s| (c.id.clone(), s.clone())))
            .collect())
    }

    async fn permission(&self, client_id: &str, route_id: &str) -> Result<Option<Permission>, RepositoryError> {
        Ok(self
            .permissions
            .read()
            .unwrap()
            .get(&(client_id.to_string(), route_id.to_string()))
            .cloned())
    }
}
