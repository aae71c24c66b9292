use std::sync::Arc;

use secrecy::Secret;
use thiserror::Error;

use crate::config::TokenConfig;
use crate::models::{ScanDirection, SignedToken, TokenPayload};
use crate::services::clock::{Clock, SystemClock};
use service_core::utils::signature::{compute_tag, verify_tag};

/// Why a token failed verification.
///
/// The three failure kinds stay distinct so callers can log a tampered
/// token differently from a stale one, even where the caller ultimately
/// surfaces only a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The input could not be parsed into the expected token shape.
    #[error("token is malformed")]
    Malformed,

    /// The payload or tag was altered after issuance.
    #[error("token failed integrity check")]
    Tampered,

    /// The token is outside its validity window.
    #[error("token has expired")]
    Expired,
}

/// A freshly minted token and its issuance metadata.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at_millis: i64,
    pub expires_at_millis: i64,
}

/// Issues and verifies check-in tokens.
///
/// Proof of integrity travels inside the token itself: verification needs
/// only the shared secret and the current time, never a database lookup.
#[derive(Clone)]
pub struct TokenService {
    secret: Secret<String>,
    clock: Arc<dyn Clock>,
    validity_window_ms: i64,
    clock_skew_ms: i64,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &TokenConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret: config.secret.clone(),
            clock,
            validity_window_ms: config.validity_window_ms,
            clock_skew_ms: config.clock_skew_ms,
        }
    }

    /// Mint a token for one user, one event, one scan direction.
    ///
    /// Deterministic: identical inputs at the identical millisecond produce
    /// byte-identical tokens.
    pub fn issue(
        &self,
        user_id: &str,
        event_id: &str,
        direction: ScanDirection,
    ) -> Result<IssuedToken, anyhow::Error> {
        let issued_at_millis = self.clock.now_millis();

        let payload = TokenPayload {
            user_id: user_id.to_string(),
            event_id: event_id.to_string(),
            direction,
            issued_at_millis,
        };

        let canonical = payload.canonical_form()?;
        let tag = compute_tag(&self.secret, &canonical);

        let signed = SignedToken {
            user_id: payload.user_id,
            event_id: payload.event_id,
            direction: payload.direction,
            issued_at_millis: payload.issued_at_millis,
            tag,
        };

        let token = serde_json::to_string(&signed)?;

        Ok(IssuedToken {
            token,
            issued_at_millis,
            expires_at_millis: issued_at_millis + self.validity_window_ms,
        })
    }

    /// Verify a token and return its payload.
    pub fn verify(&self, token: &str) -> Result<TokenPayload, TokenError> {
        self.verify_signed(token).map(|signed| signed.payload())
    }

    /// Verify a token and return the full signed form, tag included.
    ///
    /// The tag is the canonical identity of a token; replay bookkeeping
    /// keys on it rather than on the raw string so re-serializing the same
    /// payload cannot dodge the single-use check.
    pub fn verify_signed(&self, token: &str) -> Result<SignedToken, TokenError> {
        let signed: SignedToken =
            serde_json::from_str(token).map_err(|_| TokenError::Malformed)?;

        let canonical = signed
            .payload()
            .canonical_form()
            .map_err(|_| TokenError::Malformed)?;

        if !verify_tag(&self.secret, &canonical, &signed.tag) {
            return Err(TokenError::Tampered);
        }

        let age = self.clock.now_millis() - signed.issued_at_millis;
        if age > self.validity_window_ms || age < -self.clock_skew_ms {
            return Err(TokenError::Expired);
        }

        Ok(signed)
    }

    pub fn is_valid(&self, token: &str) -> bool {
        self.verify(token).is_ok()
    }

    pub fn is_direction(&self, token: &str, direction: ScanDirection) -> bool {
        self.verify(token)
            .map(|payload| payload.direction == direction)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_CLOCK_SKEW_MS, DEFAULT_VALIDITY_WINDOW_MS};
    use crate::services::clock::FixedClock;

    const T0: i64 = 1_700_000_000_000;

    fn config() -> TokenConfig {
        TokenConfig {
            secret: Secret::new("test-secret".to_string()),
            validity_window_ms: DEFAULT_VALIDITY_WINDOW_MS,
            clock_skew_ms: DEFAULT_CLOCK_SKEW_MS,
        }
    }

    fn service_at(now_millis: i64) -> TokenService {
        TokenService::with_clock(&config(), Arc::new(FixedClock(now_millis)))
    }

    #[test]
    fn round_trip_preserves_payload() {
        let service = service_at(T0);
        let issued = service.issue("u1", "e1", ScanDirection::Entry).unwrap();

        let payload = service.verify(&issued.token).unwrap();
        assert_eq!(payload.user_id, "u1");
        assert_eq!(payload.event_id, "e1");
        assert_eq!(payload.direction, ScanDirection::Entry);
        assert_eq!(payload.issued_at_millis, T0);
        assert_eq!(issued.issued_at_millis, T0);
        assert_eq!(issued.expires_at_millis, T0 + DEFAULT_VALIDITY_WINDOW_MS);
    }

    #[test]
    fn issue_is_deterministic_at_the_same_millisecond() {
        let service = service_at(T0);
        let a = service.issue("u1", "e1", ScanDirection::Entry).unwrap();
        let b = service.issue("u1", "e1", ScanDirection::Entry).unwrap();
        assert_eq!(a.token, b.token);
    }

    #[test]
    fn tokens_issued_at_different_instants_differ() {
        let a = service_at(T0).issue("u1", "e1", ScanDirection::Entry).unwrap();
        let b = service_at(T0 + 1)
            .issue("u1", "e1", ScanDirection::Entry)
            .unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn tampered_user_id_is_rejected() {
        let service = service_at(T0);
        let issued = service.issue("u1", "e1", ScanDirection::Entry).unwrap();
        let forged = issued.token.replace(r#""userId":"u1""#, r#""userId":"u2""#);

        assert_eq!(service.verify(&forged), Err(TokenError::Tampered));
    }

    #[test]
    fn tampered_event_id_is_rejected() {
        let service = service_at(T0);
        let issued = service.issue("u1", "e1", ScanDirection::Entry).unwrap();
        let forged = issued
            .token
            .replace(r#""eventId":"e1""#, r#""eventId":"e2""#);

        assert_eq!(service.verify(&forged), Err(TokenError::Tampered));
    }

    #[test]
    fn tampered_direction_is_rejected() {
        let service = service_at(T0);
        let issued = service.issue("u1", "e1", ScanDirection::Entry).unwrap();
        let forged = issued.token.replace(r#""entry""#, r#""exit""#);

        assert_eq!(service.verify(&forged), Err(TokenError::Tampered));
    }

    #[test]
    fn tampered_timestamp_is_rejected() {
        let service = service_at(T0);
        let issued = service.issue("u1", "e1", ScanDirection::Entry).unwrap();
        let mut signed: SignedToken = serde_json::from_str(&issued.token).unwrap();
        signed.issued_at_millis += 1;
        let forged = serde_json::to_string(&signed).unwrap();

        assert_eq!(service.verify(&forged), Err(TokenError::Tampered));
    }

    #[test]
    fn tampered_tag_is_rejected() {
        let service = service_at(T0);
        let issued = service.issue("u1", "e1", ScanDirection::Entry).unwrap();

        let mut signed: SignedToken = serde_json::from_str(&issued.token).unwrap();
        let first = if signed.tag.starts_with('0') { "1" } else { "0" };
        signed.tag.replace_range(0..1, first);
        let forged = serde_json::to_string(&signed).unwrap();

        assert_eq!(service.verify(&forged), Err(TokenError::Tampered));
    }

    #[test]
    fn truncated_tag_is_rejected() {
        let service = service_at(T0);
        let issued = service.issue("u1", "e1", ScanDirection::Entry).unwrap();

        let mut signed: SignedToken = serde_json::from_str(&issued.token).unwrap();
        signed.tag.truncate(32);
        let forged = serde_json::to_string(&signed).unwrap();

        assert_eq!(service.verify(&forged), Err(TokenError::Tampered));
    }

    #[test]
    fn non_json_input_is_malformed() {
        let service = service_at(T0);
        assert_eq!(service.verify("not-json"), Err(TokenError::Malformed));
    }

    #[test]
    fn token_with_extra_field_is_malformed() {
        let service = service_at(T0);
        let issued = service.issue("u1", "e1", ScanDirection::Entry).unwrap();
        let forged = issued.token.replacen('{', r#"{"extra":1,"#, 1);

        assert_eq!(service.verify(&forged), Err(TokenError::Malformed));
    }

    #[test]
    fn token_exactly_at_the_window_edge_is_still_valid() {
        let issued = service_at(T0).issue("u1", "e1", ScanDirection::Entry).unwrap();
        let verifier = service_at(T0 + DEFAULT_VALIDITY_WINDOW_MS);

        assert!(verifier.verify(&issued.token).is_ok());
    }

    #[test]
    fn token_one_millisecond_past_the_window_is_expired() {
        let issued = service_at(T0).issue("u1", "e1", ScanDirection::Entry).unwrap();
        let verifier = service_at(T0 + DEFAULT_VALIDITY_WINDOW_MS + 1);

        assert_eq!(verifier.verify(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn token_one_millisecond_inside_the_window_is_valid() {
        let issued = service_at(T0).issue("u1", "e1", ScanDirection::Entry).unwrap();
        let verifier = service_at(T0 + DEFAULT_VALIDITY_WINDOW_MS - 1);

        assert!(verifier.verify(&issued.token).is_ok());
    }

    #[test]
    fn future_token_within_skew_is_valid() {
        let issued = service_at(T0).issue("u1", "e1", ScanDirection::Entry).unwrap();
        let verifier = service_at(T0 - DEFAULT_CLOCK_SKEW_MS);

        assert!(verifier.verify(&issued.token).is_ok());
    }

    #[test]
    fn future_token_beyond_skew_is_expired() {
        let issued = service_at(T0).issue("u1", "e1", ScanDirection::Entry).unwrap();
        let verifier = service_at(T0 - DEFAULT_CLOCK_SKEW_MS - 1);

        assert_eq!(verifier.verify(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn entry_token_is_not_an_exit_token() {
        let service = service_at(T0);
        let issued = service.issue("u1", "e1", ScanDirection::Entry).unwrap();

        assert!(service.is_valid(&issued.token));
        assert!(service.is_direction(&issued.token, ScanDirection::Entry));
        assert!(!service.is_direction(&issued.token, ScanDirection::Exit));
    }

    #[test]
    fn direction_predicate_is_false_for_invalid_tokens() {
        let service = service_at(T0);
        assert!(!service.is_direction("not-json", ScanDirection::Entry));
    }

    // The full scenario from the door-scanning flow: issue at T0, scan a
    // second later, scan again past the window, scan a forged copy, scan
    // garbage.
    #[test]
    fn scan_scenario() {
        let issued = service_at(T0).issue("u1", "e1", ScanDirection::Entry).unwrap();

        let fresh = service_at(T0 + 1_000);
        let payload = fresh.verify(&issued.token).unwrap();
        assert_eq!(payload.user_id, "u1");
        assert_eq!(payload.event_id, "e1");

        let stale = service_at(T0 + DEFAULT_VALIDITY_WINDOW_MS + 1);
        assert_eq!(stale.verify(&issued.token), Err(TokenError::Expired));

        let forged = issued
            .token
            .replace(r#""eventId":"e1""#, r#""eventId":"e2""#);
        assert_eq!(fresh.verify(&forged), Err(TokenError::Tampered));

        assert_eq!(fresh.verify("not-json"), Err(TokenError::Malformed));
    }
}
