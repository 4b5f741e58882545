// Jaskier Shared Pattern — credentials
//! The single persisted operator credential: `{username, password_hash}`
//! verified with bcrypt. Username comparison is case-insensitive.

use crate::envelope::ApiError;

#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub username: String,
    pub password_hash: String,
}

impl CredentialRecord {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self { username: username.into(), password_hash: password_hash.into() }
    }

    /// Hashes `plain` with bcrypt at the library's default cost — used
    /// when seeding the record from config or `/api/user/password`.
    pub fn hash_password(plain: &str) -> Result<String, ApiError> {
        bcrypt::hash(plain, bcrypt::DEFAULT_COST)
            .map_err(|e| ApiError::internal(format!("password hashing failed: {e}")))
    }

    /// `Ok(())` on match, `AuthError` otherwise. Username comparison is
    /// case-insensitive; password comparison is bcrypt's own constant-time
    /// check.
    pub fn verify(&self, username: &str, plain: &str) -> Result<(), ApiError> {
        if !self.username.eq_ignore_ascii_case(username) {
            return Err(ApiError::auth("invalid username or password"));
        }
        match bcrypt::verify(plain, &self.password_hash) {
            Ok(true) => Ok(()),
            Ok(false) => Err(ApiError::auth("invalid username or password")),
            Err(e) => Err(ApiError::internal(format!("password verification failed: {e}"))),
        }
    }
}
