//! Keyed digest shared by the signers.

use crate::signer::SigningError;
use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 of `message` keyed by `secret`, base64-encoded.
pub fn hmac_sha256_base64(secret: &str, message: &str) -> Result<String, SigningError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SigningError::Unsignable("invalid signing key".into()))?;
    mac.update(message.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_deterministic() {
        let a = hmac_sha256_base64("secret", "GET\n\nThu, 01 Jan 1970 00:00:00 GMT\n/").unwrap();
        let b = hmac_sha256_base64("secret", "GET\n\nThu, 01 Jan 1970 00:00:00 GMT\n/").unwrap();
        assert_eq!(a, b);

        let other = hmac_sha256_base64("other", "GET\n\nThu, 01 Jan 1970 00:00:00 GMT\n/").unwrap();
        assert_ne!(a, other);
    }
}
