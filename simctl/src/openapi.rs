//! OpenAPI documentation for the API surface.

use utoipa::OpenApi;

use crate::api::{handlers, models};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::me,
        handlers::simulations::list_simulations,
        handlers::simulations::create_simulation,
        handlers::simulations::delete_simulation,
    ),
    components(schemas(
        models::OkResponse,
        models::auth::LoginRequest,
        models::auth::AuthResponse,
        models::auth::MeResponse,
        models::users::UserResponse,
        models::simulations::SimulationCreate,
        models::simulations::SimulationView,
        models::simulations::SimulationListResponse,
        models::simulations::SimulationCreateResponse,
    )),
    tags(
        (name = "auth", description = "Session authentication"),
        (name = "simulations", description = "Membership-scoped simulation management")
    )
)]
pub struct ApiDoc;
