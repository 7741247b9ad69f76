use crate::error::AppError;
use bcrypt::{hash, verify, DEFAULT_COST};

/// One-way bcrypt hashing with a configured cost.
///
/// `matches` relies on bcrypt's constant-time digest comparison, so the time
/// it takes does not depend on where a guess first differs.
#[derive(Debug, Clone, Copy)]
pub struct PasswordVerifier {
    cost: u32,
}

impl Default for PasswordVerifier {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordVerifier {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        Ok(hash(password, self.cost)?)
    }

    /// A stored hash bcrypt cannot parse is an error, never a match.
    pub fn matches(&self, password: &str, hashed_password: &str) -> Result<bool, AppError> {
        Ok(verify(password, hashed_password)?)
    }
}
