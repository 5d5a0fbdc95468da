//! Account passwords
//!
//! `User::password_hash` holds a PHC string produced by argon2id with the
//! library's default cost. The salt and parameters travel inside the string.

use argon2::{
    password_hash::{
        self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Argon2,
};

use crate::types::EncvError;

fn hasher() -> Argon2<'static> {
    Argon2::default()
}

pub fn hash_password(password: &str) -> Result<String, EncvError> {
    let salt = SaltString::generate(&mut OsRng);
    let phc = hasher()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| EncvError::Auth(format!("Failed to hash password: {e}")))?;
    Ok(phc.to_string())
}

/// `Ok(false)` for a wrong password. Errors mean the stored value is unusable.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, EncvError> {
    let phc = PasswordHash::new(stored)
        .map_err(|e| EncvError::Auth(format!("Stored password is not a PHC string: {e}")))?;

    match hasher().verify_password(password.as_bytes(), &phc) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(EncvError::Auth(format!("Password check failed: {e}"))),
    }
}
