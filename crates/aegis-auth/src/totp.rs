//! TOTP generation/verification, secret sealing, and backup codes.
//!
//! Backup codes are bearer credentials: they are drawn from the process
//! CSPRNG and only their SHA-256 digests are stored.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use totp_rs::{Algorithm, Secret, TOTP};

use crate::error::AuthError;

const BACKUP_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const BACKUP_CODE_LEN: usize = 8;

/// A freshly generated TOTP enrollment, held by the caller until the user
/// confirms setup. Nothing is persisted at this stage.
#[derive(Debug, Clone)]
pub struct TotpEnrollment {
    /// Base32-encoded secret for manual entry.
    pub secret: String,
    /// otpauth:// URI for QR display.
    pub otpauth_uri: String,
}

/// Encrypt a TOTP secret with AES-256-GCM.
///
/// Returns `base64(nonce || ciphertext || tag)`.
pub fn encrypt_secret(key: &[u8; 32], plaintext: &[u8]) -> Result<String, AuthError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut nonce_bytes = [0u8; 12];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| AuthError::Crypto(format!("AES-GCM encrypt: {e}")))?;

    let mut combined = nonce_bytes.to_vec();
    combined.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(combined))
}

/// Decrypt an AES-256-GCM encrypted TOTP secret.
pub fn decrypt_secret(key: &[u8; 32], encoded: &str) -> Result<Vec<u8>, AuthError> {
    let combined = STANDARD
        .decode(encoded)
        .map_err(|e| AuthError::Crypto(format!("base64 decode: {e}")))?;

    if combined.len() < 13 {
        return Err(AuthError::Crypto("ciphertext too short".into()));
    }

    let (nonce_bytes, ciphertext) = combined.split_at(12);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| AuthError::Crypto(format!("AES-GCM decrypt: {e}")))
}

/// Seal a base32 TOTP secret for storage. Without a key the secret is
/// stored as-is.
pub fn seal_secret(key: Option<&[u8; 32]>, base32_secret: &str) -> Result<String, AuthError> {
    match key {
        Some(k) => encrypt_secret(k, base32_secret.as_bytes()),
        None => Ok(base32_secret.to_string()),
    }
}

/// Recover the base32 TOTP secret from its stored form.
pub fn open_secret(key: Option<&[u8; 32]>, stored: &str) -> Result<String, AuthError> {
    match key {
        Some(k) => {
            let bytes = decrypt_secret(k, stored)?;
            String::from_utf8(bytes).map_err(|e| AuthError::Crypto(format!("secret utf8: {e}")))
        }
        None => Ok(stored.to_string()),
    }
}

fn build_totp(base32_secret: &str, issuer: &str, account: &str) -> Result<TOTP, AuthError> {
    let secret_bytes = Secret::Encoded(base32_secret.to_string())
        .to_bytes()
        .map_err(|e| AuthError::Crypto(format!("secret bytes: {e}")))?;

    TOTP::new(
        Algorithm::SHA1, // RFC 6238 default
        6,               // digits
        1,               // skew (±1 step)
        30,              // step seconds
        secret_bytes,
        Some(issuer.to_string()),
        account.to_string(),
    )
    .map_err(|e| AuthError::Crypto(format!("TOTP init: {e}")))
}

/// Generate a TOTP enrollment: fresh secret + otpauth URI.
pub fn generate_enrollment(issuer: &str, account: &str) -> Result<TotpEnrollment, AuthError> {
    let secret = Secret::generate_secret();
    let base32 = secret.to_encoded().to_string();
    let totp = build_totp(&base32, issuer, account)?;

    Ok(TotpEnrollment {
        secret: base32,
        otpauth_uri: totp.get_url(),
    })
}

/// Verify a 6-digit TOTP code against a base32 secret.
///
/// A merely-wrong code is `Ok(false)`, never an error.
pub fn verify_code(
    base32_secret: &str,
    code: &str,
    issuer: &str,
    account: &str,
) -> Result<bool, AuthError> {
    let totp = build_totp(base32_secret, issuer, account)?;
    totp.check_current(code)
        .map_err(|e| AuthError::Crypto(format!("TOTP check: {e}")))
}

/// Generate `count` unique 8-character alphanumeric backup codes from the
/// process CSPRNG.
pub fn generate_backup_codes(count: usize) -> Vec<String> {
    let mut rng = rand::rng();
    let mut codes = Vec::with_capacity(count);
    while codes.len() < count {
        let code: String = (0..BACKUP_CODE_LEN)
            .map(|_| {
                let idx = rand::Rng::random_range(&mut rng, 0..BACKUP_CODE_CHARSET.len());
                BACKUP_CODE_CHARSET[idx] as char
            })
            .collect();
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    codes
}

/// SHA-256 digest of a backup code, hex-encoded — the stored form.
///
/// Presented codes are normalized (trimmed, uppercased) before hashing.
pub fn hash_backup_code(code: &str) -> String {
    let normalized = code.trim().to_ascii_uppercase();
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = [42u8; 32];
        let plaintext = b"totp-secret-bytes";
        let encrypted = encrypt_secret(&key, plaintext).unwrap();
        let decrypted = decrypt_secret(&key, &encrypted).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn wrong_key_fails_decrypt() {
        let key1 = [42u8; 32];
        let key2 = [99u8; 32];
        let encrypted = encrypt_secret(&key1, b"secret").unwrap();
        assert!(decrypt_secret(&key2, &encrypted).is_err());
    }

    #[test]
    fn seal_open_roundtrip_with_key() {
        let key = [7u8; 32];
        let sealed = seal_secret(Some(&key), "JBSWY3DPEHPK3PXP").unwrap();
        assert_ne!(sealed, "JBSWY3DPEHPK3PXP");
        assert_eq!(open_secret(Some(&key), &sealed).unwrap(), "JBSWY3DPEHPK3PXP");
    }

    #[test]
    fn seal_without_key_is_passthrough() {
        let sealed = seal_secret(None, "JBSWY3DPEHPK3PXP").unwrap();
        assert_eq!(sealed, "JBSWY3DPEHPK3PXP");
        assert_eq!(open_secret(None, &sealed).unwrap(), "JBSWY3DPEHPK3PXP");
    }

    #[test]
    fn enrollment_produces_valid_uri() {
        let enrollment = generate_enrollment("AEGIS", "alice@example.com").unwrap();
        assert!(!enrollment.secret.is_empty());
        assert!(enrollment.otpauth_uri.starts_with("otpauth://totp/"));
        assert!(enrollment.otpauth_uri.contains("AEGIS"));
        assert!(enrollment.otpauth_uri.contains("alice"));
    }

    #[test]
    fn verify_code_with_valid_totp() {
        let enrollment = generate_enrollment("AEGIS", "test@test.com").unwrap();
        let totp = build_totp(&enrollment.secret, "AEGIS", "test@test.com").unwrap();

        let code = totp.generate_current().unwrap();
        assert!(verify_code(&enrollment.secret, &code, "AEGIS", "test@test.com").unwrap());
    }

    #[test]
    fn verify_code_wrong_code() {
        let enrollment = generate_enrollment("AEGIS", "test@test.com").unwrap();
        assert!(!verify_code(&enrollment.secret, "000000", "AEGIS", "test@test.com").unwrap());
    }

    #[test]
    fn backup_codes_are_unique_and_well_formed() {
        let codes = generate_backup_codes(10);
        assert_eq!(codes.len(), 10);
        for code in &codes {
            assert_eq!(code.len(), 8);
            assert!(
                code.chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            );
        }
        let mut deduped = codes.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), codes.len());
    }

    #[test]
    fn backup_code_hash_normalizes_input() {
        assert_eq!(hash_backup_code("AB12CD34"), hash_backup_code(" ab12cd34 "));
        assert_ne!(hash_backup_code("AB12CD34"), hash_backup_code("AB12CD35"));
    }
}
