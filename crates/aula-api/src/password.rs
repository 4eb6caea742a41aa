//! argon2 password hashing for staff accounts.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use rand_core::OsRng;

/// A well-formed argon2id PHC string that no password matches. Verifying
/// against it costs the same as verifying a real account's hash.
pub const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$YXVsYS1kdW1teS1zYWx0IQ$\
                              mFoAPu0wbiVGuXI0AwRuGB56kjEztbU8OI+zWLK+eDo";

/// Hash `password` into an argon2id PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Check `password` against a stored PHC string. Malformed hashes never
/// verify.
pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
    .is_ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hashes_verify_only_the_original_password() {
    let phc = hash_password("secret").unwrap();
    assert!(phc.starts_with("$argon2id$"));
    assert!(verify_password("secret", &phc));
    assert!(!verify_password("wrong", &phc));
    assert!(!verify_password("secret", "not-a-hash"));
  }

  #[test]
  fn dummy_hash_parses_and_never_verifies() {
    let parsed = PasswordHash::new(DUMMY_HASH).unwrap();
    assert_eq!(parsed.algorithm.as_str(), "argon2id");
    assert!(!verify_password("", DUMMY_HASH));
    assert!(!verify_password("secret", DUMMY_HASH));
  }
}
