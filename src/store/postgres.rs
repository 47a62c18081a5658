use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::route::{Method, MethodPolicy};
use crate::core::{Client, ClientStatus, Permission, Repository, RepositoryError, Route};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RouteRow {
    id: String,
    pattern: String,
    domain: String,
    service_name: String,
    /// JSON object, e.g. `{"GET": "public", "POST": "require_key"}`.
    methods: serde_json::Value,
}

#[derive(Debug, sqlx::FromRow)]
struct ClientRow {
    id: String,
    name: String,
    api_key: Option<String>,
    shared_secret: Option<String>,
    status: String,
}

#[derive(Debug, sqlx::FromRow)]
struct PermissionRow {
    client_id: String,
    route_id: String,
    allowed_methods: Vec<String>,
}

fn parse_method_policy(raw: &str) -> Option<MethodPolicy> {
    match raw {
        "public" => Some(MethodPolicy::Public),
        "require_key" => Some(MethodPolicy::RequireKey),
        "require_signature" => Some(MethodPolicy::RequireSignature),
        _ => None,
    }
}

/// Rows with a policy value outside the closed vocabulary are skipped
/// rather than failing the whole route — the unrecognized method simply
/// behaves as not configured.
fn route_from_row(row: RouteRow) -> Route {
    let mut methods = HashMap::new();
    if let Some(obj) = row.methods.as_object() {
        for (k, v) in obj {
            let (Some(method), Some(policy)) = (Method::parse(k), v.as_str().and_then(parse_method_policy)) else {
                continue;
            };
            methods.insert(method, policy);
        }
    }
    Route::new(row.id, row.pattern, row.domain, methods, row.service_name)
}

fn client_status_from_str(raw: &str) -> ClientStatus {
    match raw {
        "suspended" => ClientStatus::Suspended,
        "revoked" => ClientStatus::Revoked,
        _ => ClientStatus::Active,
    }
}

fn client_from_row(row: ClientRow) -> Client {
    Client {
        id: row.id,
        name: row.name,
        api_key: row.api_key,
        shared_secret: row.shared_secret,
        status: client_status_from_str(&row.status),
    }
}

fn permission_from_row(row: PermissionRow) -> Permission {
    Permission {
        client_id: row.client_id,
        route_id: row.route_id,
        allowed_methods: row.allowed_methods.iter().filter_map(|m| Method::parse(m)).collect(),
    }
}

fn query_err(err: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(err.into())
}

#[async_trait]
impl Repository for PgStore {
    /// Over-approximates by domain only; the Route Matcher narrows by path
    /// and specificity, so a broad filter that also returns every
    /// wildcard-domain row is sufficient here.
    async fn candidate_routes(&self, domain: &str, _path: &str) -> Result<Vec<Route>, RepositoryError> {
        let rows = sqlx::query_as::<_, RouteRow>(
            r#"SELECT id, pattern, domain, service_name, methods
               FROM routes
               WHERE domain = $1
                  OR domain = '*'
                  OR (domain LIKE '*.%' AND $1 LIKE '%.' || substring(domain from 3))
               "#,
        )
        .bind(domain)
        .fetch_all(&self.pool)
        .await
        .map_err(query_err)?;

        Ok(rows.into_iter().map(route_from_row).collect())
    }

    async fn client_by_api_key(&self, key: &str) -> Result<Option<Client>, RepositoryError> {
        let row = sqlx::query_as::<_, ClientRow>(
            "SELECT id, name, api_key, shared_secret, status FROM clients WHERE api_key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_err)?;

        Ok(row.map(client_from_row))
    }

    async fn client_by_shared_secret(&self, secret: &str) -> Result<Option<Client>, RepositoryError> {
        let row = sqlx::query_as::<_, ClientRow>(
            "SELECT id, name, api_key, shared_secret, status FROM clients WHERE shared_secret = $1",
        )
        .bind(secret)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_err)?;

        Ok(row.map(client_from_row))
    }

    /// Deliberately not filtered by status — a suspended/revoked client must
    /// still be found here so its signature can verify and the Authorizer's
    /// own status check (step 6) attributes the specific deny reason,
    /// instead of the scan silently excluding it and producing
    /// `invalid_signature` for what is actually a valid signature.
    async fn candidate_secrets(&self) -> Result<Vec<(String, String)>, RepositoryError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT id, shared_secret FROM clients WHERE shared_secret IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(query_err)?;

        Ok(rows)
    }

    async fn permission(&self, client_id: &str, route_id: &str) -> Result<Option<Permission>, RepositoryError> {
        let row = sqlx::query_as::<_, PermissionRow>(
            "SELECT client_id, route_id, allowed_methods FROM permissions WHERE client_id = $1 AND route_id = $2",
        )
        .bind(client_id)
        .bind(route_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_err)?;

        Ok(row.map(permission_from_row))
    }
}

/// Administrative reads used by the management surface — kept narrow and
/// separate from the `Repository` trait the authorization core consumes.
impl PgStore {
    pub async fn route_exists(&self, route_id: &str) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM routes WHERE id = $1)")
            .bind(route_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn client_exists(&self, client_id: &str) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM clients WHERE id = $1)")
            .bind(client_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}
