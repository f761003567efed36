// credential.rs - argon2 credential hashing.
//
// Credentials are stored as argon2 PHC strings (algorithm, params, salt and
// digest in one string). Verification goes through `PasswordVerifier`,
// which compares digests in constant time.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::IdentityError;

/// Hash a plaintext credential into a PHC string with a fresh random salt.
pub fn hash_credential(credential: &str) -> Result<String, IdentityError> {
    if credential.is_empty() {
        return Err(IdentityError::EmptyCredential);
    }
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(credential.as_bytes(), &salt)
        .map_err(|e| IdentityError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a plaintext credential against a stored PHC string.
///
/// A malformed stored hash never matches.
pub fn verify_credential(credential: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("stored credential hash is malformed: {}", e);
            return false;
        }
    };
    Argon2::default()
        .verify_password(credential.as_bytes(), &parsed)
        .is_ok()
}

/// A well-formed hash with the default argon2 parameters that no credential
/// matches.
const UNKNOWN_USER_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$vjhcU+/3Hl/7mjuItNFadQ$EDWKxszhTMnxh0pAU5vswFkJeud0X0NzZJAoks0rOYw";

/// Run a full verification for a username that does not exist.
///
/// Always false. Costs the same as checking a real account, so a failed
/// login takes as long whether or not the username is known.
pub fn verify_unknown_user(credential: &str) -> bool {
    verify_credential(credential, UNKNOWN_USER_HASH);
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::Params;

    #[test]
    fn hash_then_verify_accepts_same_credential() {
        let hash = hash_credential("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_credential("s3cret", &hash));
    }

    #[test]
    fn wrong_credential_is_rejected() {
        let hash = hash_credential("s3cret").unwrap();
        assert!(!verify_credential("S3cret", &hash));
        assert!(!verify_credential("", &hash));
    }

    #[test]
    fn same_credential_gets_distinct_salts() {
        let a = hash_credential("repeat").unwrap();
        let b = hash_credential("repeat").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_credential_cannot_be_hashed() {
        assert!(matches!(
            hash_credential(""),
            Err(IdentityError::EmptyCredential)
        ));
    }

    #[test]
    fn plaintext_stored_value_never_matches() {
        // A row holding the raw credential must not authenticate.
        assert!(!verify_credential("hunter2", "hunter2"));
    }

    #[test]
    fn unknown_user_hash_costs_as_much_as_a_real_one() {
        let parsed = PasswordHash::new(UNKNOWN_USER_HASH).unwrap();
        let params = Params::try_from(&parsed).unwrap();
        assert_eq!(params.m_cost(), Params::DEFAULT_M_COST);
        assert_eq!(params.t_cost(), Params::DEFAULT_T_COST);
        assert_eq!(params.p_cost(), Params::DEFAULT_P_COST);

        let real = hash_credential("s3cret").unwrap();
        assert_eq!(
            PasswordHash::new(&real).unwrap().algorithm,
            parsed.algorithm
        );
    }

    #[test]
    fn unknown_user_never_verifies() {
        assert!(!verify_unknown_user("s3cret"));
        assert!(!verify_unknown_user(""));
    }
}
