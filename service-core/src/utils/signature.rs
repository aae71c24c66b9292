use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Compute a hex-encoded HMAC-SHA256 tag over a canonical message.
///
/// The caller is responsible for producing the canonical form; the same
/// bytes must be fed here at issue and at verification time.
pub fn compute_tag(secret: &Secret<String>, canonical: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(canonical.as_bytes());
    let result = mac.finalize();
    hex::encode(result.into_bytes())
}

/// Verify a hex-encoded tag against a canonical message in constant time.
pub fn verify_tag(secret: &Secret<String>, canonical: &str, tag: &str) -> bool {
    let expected = compute_tag(secret, canonical);

    let expected_bytes = expected.as_bytes();
    let tag_bytes = tag.as_bytes();

    if expected_bytes.len() != tag_bytes.len() {
        return false;
    }

    expected_bytes.ct_eq(tag_bytes).into()
}
