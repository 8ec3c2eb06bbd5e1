use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    api::models::{
        OkResponse,
        simulations::{SimulationCreate, SimulationCreateResponse, SimulationListResponse, SimulationView},
        users::CurrentUser,
    },
    auth::access::{self, Decision},
    db::{
        handlers::{Repository, Simulations},
        models::simulations::{SIMULATION_DEFAULTS, SimulationCreateDBRequest},
    },
    errors::Error,
    types::{Operation, SimulationId},
};

/// List the caller's simulations
#[utoipa::path(
    get,
    path = "/api/simulations",
    tag = "simulations",
    responses(
        (status = 200, description = "Simulations the caller is a member of, newest first", body = SimulationListResponse),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = current_user.id))]
pub async fn list_simulations(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<SimulationListResponse>, Error> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Simulations::new(&mut pool_conn);

    let simulations = repo.list_for_member(current_user.id).await?;

    Ok(Json(SimulationListResponse {
        simulations: simulations.into_iter().map(SimulationView::from).collect(),
    }))
}

/// Create a simulation
#[utoipa::path(
    post,
    path = "/api/simulations",
    request_body = SimulationCreate,
    tag = "simulations",
    responses(
        (status = 200, description = "Simulation created", body = SimulationCreateResponse),
        (status = 400, description = "Simulation name missing"),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = current_user.id))]
pub async fn create_simulation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<SimulationCreate>,
) -> Result<Json<SimulationCreateResponse>, Error> {
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::BadRequest {
            message: "Simulation name is required".to_string(),
        });
    }

    let kind = request
        .kind
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .unwrap_or(SIMULATION_DEFAULTS.kind)
        .to_string();

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Simulations::new(&mut pool_conn);

    // The repository inserts the row and the creator's "admin" membership
    // in one transaction, then returns the freshly-read row.
    let created = repo
        .create(&SimulationCreateDBRequest {
            name,
            kind,
            created_by: current_user.id,
        })
        .await?;

    Ok(Json(SimulationCreateResponse {
        ok: true,
        simulation: SimulationView::from(created),
    }))
}

/// Delete a simulation
#[utoipa::path(
    delete,
    path = "/api/simulations/{id}",
    tag = "simulations",
    params(
        ("id" = i64, Path, description = "Simulation id"),
    ),
    responses(
        (status = 200, description = "Simulation deleted", body = OkResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Member without the required role"),
        (status = 404, description = "Unknown simulation, or caller is not a member"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = current_user.id, simulation_id = id))]
pub async fn delete_simulation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<SimulationId>,
) -> Result<Json<OkResponse>, Error> {
    // Authorization check and deletion share one transaction scope so a
    // concurrent delete cannot slip between them.
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Simulations::new(&mut tx);

    let grant = repo.find_grant(current_user.id, id).await?;
    match access::can_delete(grant.as_ref()) {
        Decision::NotFound => {
            return Err(Error::NotFound {
                resource: "Simulation".to_string(),
                id: id.to_string(),
            });
        }
        Decision::Forbidden => {
            return Err(Error::Forbidden {
                action: Operation::Delete,
                resource: format!("simulation {id}"),
            });
        }
        Decision::Allow => {}
    }

    if !repo.delete(id).await? {
        // Lost the race against another authorized delete
        return Err(Error::NotFound {
            resource: "Simulation".to_string(),
            id: id.to_string(),
        });
    }

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(OkResponse { ok: true }))
}
