use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::{ScanRequest, ScanResponse},
    services::TokenError,
    utils::ValidatedJson,
    AppState,
};

/// Verify a scanned token and consume it.
///
/// A token is good for exactly one scan: the registry rejects a tag it has
/// seen before, so a photographed or re-presented code is turned away.
pub async fn scan_token(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ScanRequest>,
) -> Result<impl IntoResponse, AppError> {
    let signed = state.tokens.verify_signed(&req.token).map_err(|e| match e {
        TokenError::Malformed => AppError::BadRequest(anyhow::anyhow!("token is malformed")),
        TokenError::Tampered => {
            // Tag mismatch means the payload was altered after issuance.
            tracing::warn!("Rejected check-in token with invalid tag");
            AppError::Unauthorized(anyhow::anyhow!("token failed integrity check"))
        }
        TokenError::Expired => AppError::Unauthorized(anyhow::anyhow!("token has expired")),
    })?;

    if let Some(expected) = req.expected_direction {
        if signed.direction != expected {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "token was issued for {} scans",
                signed.direction
            )));
        }
    }

    if !state.scans.consume(&signed.tag, signed.issued_at_millis) {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "token has already been scanned"
        )));
    }

    tracing::info!(
        user_id = %signed.user_id,
        event_id = %signed.event_id,
        direction = %signed.direction,
        "Recorded scan"
    );

    Ok((
        StatusCode::OK,
        Json(ScanResponse {
            user_id: signed.user_id,
            event_id: signed.event_id,
            direction: signed.direction,
            issued_at_millis: signed.issued_at_millis,
        }),
    ))
}
