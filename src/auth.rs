//! Authentication capability. Only the UI asks who is signed in; the
//! conversation pipeline never does.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
}

pub trait Authenticator: Send + Sync {
    fn current_user(&self) -> Option<UserProfile>;

    fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }
}

/// Always signed in as a fixed demo user
#[derive(Debug, Clone, Default)]
pub struct DemoAuthenticator;

impl Authenticator for DemoAuthenticator {
    fn current_user(&self) -> Option<UserProfile> {
        Some(UserProfile {
            name: "Demo User".to_string(),
            email: "demo@example.com".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_mode_is_always_signed_in() {
        let auth = DemoAuthenticator;
        assert!(auth.is_authenticated());
        assert_eq!(auth.current_user().unwrap().name, "Demo User");
    }

    struct SignedOut;

    impl Authenticator for SignedOut {
        fn current_user(&self) -> Option<UserProfile> {
            None
        }
    }

    #[test]
    fn no_user_means_not_authenticated() {
        assert!(!SignedOut.is_authenticated());
    }
}
