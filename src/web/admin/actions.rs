use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::info;

use crate::{
    session::Portal,
    web::{AppState, gate},
};

pub async fn admin_action(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(action): Path<String>,
) -> Response {
    let user = match gate::require_portal(&state, &jar, Portal::Admin).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match action.as_str() {
        "add_institution" => {
            info!(user = %user.email, "add institution requested");
            Redirect::to("/admin?status=add_institution").into_response()
        }
        _ => Redirect::to("/admin?error=unknown_action").into_response(),
    }
}
