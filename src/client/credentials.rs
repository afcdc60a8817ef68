use std::fmt;

use super::ClientError;

/// Username / access key pair applied to every call as HTTP basic auth.
///
/// Both parts are required; construction is the only place they are checked.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    access_key: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        access_key: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let username = username.into();
        let access_key = access_key.into();

        if username.trim().is_empty() || access_key.trim().is_empty() {
            return Err(ClientError::InvalidCredentials);
        }

        Ok(Self {
            username,
            access_key,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }
}

// The access key never ends up in logs or panic messages.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("access_key", &"<redacted>")
            .finish()
    }
}
