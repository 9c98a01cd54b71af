//! Login/password pairs.

use std::fmt;

/// A login and password, compared by value.
///
/// `Debug` and `Display` never print the password.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Credentials {
    login: String,
    password: String,
}

impl Credentials {
    /// Create credentials from a login and password.
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    /// The login (user name, access key id, ...).
    pub fn login(&self) -> &str {
        &self.login
    }

    /// The password (secret key, token, ...).
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Returns `true` if both login and password are empty.
    pub fn is_empty(&self) -> bool {
        self.login.is_empty() && self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.login)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_value() {
        assert_eq!(Credentials::new("bob", "pw"), Credentials::new("bob", "pw"));
        assert_ne!(Credentials::new("bob", "pw"), Credentials::new("bob", "other"));
    }

    #[test]
    fn debug_hides_password() {
        let creds = Credentials::new("bob", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("bob"));
        assert!(!debug.contains("hunter2"));
        assert_eq!(creds.to_string(), "bob");
    }
}
