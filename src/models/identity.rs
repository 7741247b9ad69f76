use serde::{Deserialize, Serialize};

use super::user::{Credential, Role};

/// The caller of a single request, as established by `AccessFilter`.
///
/// Lives in that request's extensions and is dropped with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

impl From<&Credential> for Identity {
    fn from(credential: &Credential) -> Self {
        Self::new(credential.username.clone(), credential.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_from_credential() {
        let credential = Credential::new("user", "hash", Role::User);
        let identity = Identity::from(&credential);
        assert_eq!(identity, Identity::new("user", Role::User));
        assert!(identity.has_role(Role::User));
        assert!(!identity.has_role(Role::Admin));
    }
}
