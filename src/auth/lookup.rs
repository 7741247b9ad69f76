//! Resolving usernames to stored credentials.
//!
//! The authentication layer only reads through `IdentityLookup`; user
//! management lives elsewhere.

use futures::future::{BoxFuture, FutureExt};
use sqlx::PgPool;
use std::collections::HashMap;

use super::password::PasswordVerifier;
use crate::config::SeedUser;
use crate::error::AppError;
use crate::models::Credential;

/// Read-only access to the credential store.
pub trait IdentityLookup: Send + Sync {
    /// Returns the credential stored for `username`, or `None` if there is none.
    fn find_by_username<'a>(
        &'a self,
        username: &'a str,
    ) -> BoxFuture<'a, Result<Option<Credential>, AppError>>;
}

/// A fixed set of identities held in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryIdentityLookup {
    users: HashMap<String, Credential>,
}

impl InMemoryIdentityLookup {
    pub fn new(credentials: impl IntoIterator<Item = Credential>) -> Self {
        Self {
            users: credentials
                .into_iter()
                .map(|c| (c.username.clone(), c))
                .collect(),
        }
    }

    /// Hashes each seed user's password and stores the result.
    pub fn from_seed(seed: &[SeedUser], verifier: &PasswordVerifier) -> Result<Self, AppError> {
        let credentials = seed
            .iter()
            .map(|user| {
                let hash = verifier.hash(&user.password)?;
                Ok(Credential::new(user.username.clone(), hash, user.role))
            })
            .collect::<Result<Vec<_>, AppError>>()?;
        Ok(Self::new(credentials))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl IdentityLookup for InMemoryIdentityLookup {
    fn find_by_username<'a>(
        &'a self,
        username: &'a str,
    ) -> BoxFuture<'a, Result<Option<Credential>, AppError>> {
        async move { Ok(self.users.get(username).cloned()) }.boxed()
    }
}

/// Credentials stored in the `users` table.
#[derive(Debug, Clone)]
pub struct PgIdentityLookup {
    pool: PgPool,
}

impl PgIdentityLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, username: &str) -> Result<Option<Credential>, AppError> {
        let credential = sqlx::query_as::<_, Credential>(
            "SELECT username, password_hash, role FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(credential)
    }
}

impl IdentityLookup for PgIdentityLookup {
    fn find_by_username<'a>(
        &'a self,
        username: &'a str,
    ) -> BoxFuture<'a, Result<Option<Credential>, AppError>> {
        self.fetch(username).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[actix_rt::test]
    async fn test_in_memory_lookup() {
        let lookup = InMemoryIdentityLookup::new([
            Credential::new("admin", "hash-a", Role::Admin),
            Credential::new("user", "hash-u", Role::User),
        ]);
        assert_eq!(lookup.len(), 2);

        let admin = lookup.find_by_username("admin").await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.password_hash, "hash-a");

        assert!(lookup.find_by_username("nobody").await.unwrap().is_none());
        // Usernames are matched exactly.
        assert!(lookup.find_by_username("Admin").await.unwrap().is_none());
    }

    #[actix_rt::test]
    async fn test_seeded_lookup_hashes_passwords() {
        let verifier = PasswordVerifier::new(4);
        let seed = vec![SeedUser {
            username: "admin".into(),
            password: "admin-password".into(),
            role: Role::Admin,
        }];
        let lookup = InMemoryIdentityLookup::from_seed(&seed, &verifier).unwrap();

        let stored = lookup.find_by_username("admin").await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "admin-password");
        assert!(verifier.matches("admin-password", &stored.password_hash).unwrap());
    }

    #[test]
    fn test_empty_lookup() {
        let lookup = InMemoryIdentityLookup::default();
        assert!(lookup.is_empty());
    }
}
