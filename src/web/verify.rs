use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path as AxumPath, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;
use uuid::Uuid;

use crate::{
    verification::{FlowError, FlowSnapshot, MAX_UPLOAD_BYTES},
    web::{
        AppState,
        gate::{self, JsonAuthError},
        responses::{ApiMessage, FlowSubmission, json_error, json_toast},
        uploads,
    },
};

/// Request body cap for the file route. Larger than the admission limit so the
/// oversize case still produces the size rejection instead of a transport error.
const UPLOAD_BODY_LIMIT: usize = 32 * 1024 * 1024;

type ApiError = (StatusCode, Json<ApiMessage>);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/verifications", post(create_flow))
        .route(
            "/api/verifications/:flow_id",
            get(flow_status).delete(discard_flow),
        )
        .route(
            "/api/verifications/:flow_id/file",
            post(upload_file).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/verifications/:flow_id/start", post(start_flow))
}

async fn require_user(state: &AppState, jar: &CookieJar) -> Result<Uuid, ApiError> {
    gate::current_user_or_json_error(state, jar)
        .await
        .map(|user| user.id)
        .map_err(|JsonAuthError { status, title, message }| json_error(status, title, message))
}

fn flow_error(err: FlowError) -> ApiError {
    match err {
        FlowError::NotFound => json_error(
            StatusCode::NOT_FOUND,
            "Not Found",
            "This verification session no longer exists",
        ),
        FlowError::Selection(err) => json_toast(StatusCode::BAD_REQUEST, err.toast()),
    }
}

async fn create_flow(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<FlowSubmission>, ApiError> {
    let owner = require_user(&state, &jar).await?;
    let flow_id = state.flows().create(owner).await;
    Ok(Json(FlowSubmission::new(flow_id)))
}

async fn flow_status(
    State(state): State<AppState>,
    jar: CookieJar,
    AxumPath(flow_id): AxumPath<Uuid>,
) -> Result<Json<FlowSnapshot>, ApiError> {
    let owner = require_user(&state, &jar).await?;
    state
        .flows()
        .snapshot(flow_id, owner)
        .await
        .map(Json)
        .map_err(flow_error)
}

async fn upload_file(
    State(state): State<AppState>,
    jar: CookieJar,
    AxumPath(flow_id): AxumPath<Uuid>,
    multipart: Multipart,
) -> Result<Json<FlowSnapshot>, ApiError> {
    let owner = require_user(&state, &jar).await?;
    let flows = state.flows();
    flows
        .ensure_owned(flow_id, owner)
        .await
        .map_err(flow_error)?;

    let dest_dir = flows.flow_dir(flow_id);
    let file = match uploads::receive_certificate(multipart, &dest_dir, MAX_UPLOAD_BYTES).await {
        Ok(file) => file,
        Err(err) => {
            warn!(%flow_id, %err, "certificate upload rejected");
            return Err(json_toast(StatusCode::BAD_REQUEST, err.toast()));
        }
    };

    flows
        .select_file(flow_id, owner, file)
        .await
        .map(Json)
        .map_err(|err| {
            if let FlowError::Selection(reason) = &err {
                warn!(%flow_id, %reason, "certificate upload rejected");
            }
            flow_error(err)
        })
}

async fn start_flow(
    State(state): State<AppState>,
    jar: CookieJar,
    AxumPath(flow_id): AxumPath<Uuid>,
) -> Result<Json<FlowSnapshot>, ApiError> {
    let owner = require_user(&state, &jar).await?;
    state
        .flows()
        .start(flow_id, owner)
        .await
        .map(Json)
        .map_err(flow_error)
}

async fn discard_flow(
    State(state): State<AppState>,
    jar: CookieJar,
    AxumPath(flow_id): AxumPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    let owner = require_user(&state, &jar).await?;
    state
        .flows()
        .discard(flow_id, owner)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(flow_error)
}
