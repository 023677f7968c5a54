/// Service health endpoint
///
/// `GET /health` answers unauthenticated so load balancers and uptime
/// probes can poll it. Beyond a liveness bit it reports whether the
/// resource store is reachable and how the connection pool looks, which
/// distinguishes "database down" from "pool exhausted" without shell
/// access to the box.
use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Overall service state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// Database reachable, requests can be served
    Healthy,

    /// Process is up but the database round trip failed
    Degraded,
}

/// Connection pool snapshot
#[derive(Debug, Serialize)]
pub struct PoolHealth {
    /// Connections currently open (in use or idle)
    pub open: u32,

    /// Connections sitting idle and ready for checkout
    pub idle: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: ServiceStatus,

    /// Crate version, so deploys can be verified from the outside
    pub version: &'static str,

    /// Whether the database round trip succeeded
    pub database_reachable: bool,

    pub pool: PoolHealth,
}

/// Probes the database and reports service health
///
/// The probe is a plain round trip rather than a pool liveness flag so a
/// half-dead connection shows up here instead of on the next real query.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let database_reachable = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();

    let status = if database_reachable {
        ServiceStatus::Healthy
    } else {
        ServiceStatus::Degraded
    };

    Ok(Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        database_reachable,
        pool: PoolHealth {
            open: state.db.size(),
            idle: state.db.num_idle(),
        },
    }))
}
