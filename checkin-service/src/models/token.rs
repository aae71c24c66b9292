use serde::{Deserialize, Serialize};

/// Whether a token authorizes an arrival or a departure scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanDirection {
    Entry,
    Exit,
}

impl std::fmt::Display for ScanDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanDirection::Entry => write!(f, "entry"),
            ScanDirection::Exit => write!(f, "exit"),
        }
    }
}

/// The fields covered by the token's authentication tag.
///
/// Field order is part of the contract: the tag is computed over the JSON
/// serialization of this struct in declaration order, so reordering or
/// renaming a field here changes the canonical form and invalidates every
/// outstanding token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TokenPayload {
    pub user_id: String,
    pub event_id: String,
    pub direction: ScanDirection,
    pub issued_at_millis: i64,
}

impl TokenPayload {
    /// The canonical serialization the tag is computed over.
    pub fn canonical_form(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Wire form of a check-in token: the payload plus its hex-encoded
/// HMAC-SHA256 tag. Unknown or missing fields are rejected at parse time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SignedToken {
    pub user_id: String,
    pub event_id: String,
    pub direction: ScanDirection,
    pub issued_at_millis: i64,
    pub tag: String,
}

impl SignedToken {
    pub fn payload(&self) -> TokenPayload {
        TokenPayload {
            user_id: self.user_id.clone(),
            event_id: self.event_id.clone(),
            direction: self.direction,
            issued_at_millis: self.issued_at_millis,
        }
    }
}
