use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::{IssueTokenRequest, IssueTokenResponse},
    utils::ValidatedJson,
    AppState,
};

/// Mint a check-in token for one user, event, and scan direction.
///
/// The caller's identity and the event's existence are vouched for by the
/// surrounding platform; this service only binds them into a tamper-evident
/// token.
pub async fn issue_token(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<IssueTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let issued = state
        .tokens
        .issue(&req.user_id, &req.event_id, req.direction)
        .map_err(AppError::InternalError)?;

    tracing::debug!(
        user_id = %req.user_id,
        event_id = %req.event_id,
        direction = %req.direction,
        "Issued check-in token"
    );

    Ok((
        StatusCode::CREATED,
        Json(IssueTokenResponse {
            token: issued.token,
            issued_at_millis: issued.issued_at_millis,
            expires_at_millis: issued.expires_at_millis,
        }),
    ))
}
