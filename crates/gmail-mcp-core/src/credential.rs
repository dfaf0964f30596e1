//! Per-session bearer token storage.

use tokio::sync::RwLock;

/// Holds the single bearer token of a session.
///
/// Starts empty. The `authenticate` tool is the only writer; a second
/// successful authentication overwrites the previous token. Writes and reads
/// go through a lock so a reader never observes a half-set value.
#[derive(Default)]
pub struct CredentialCell {
    token: RwLock<Option<String>>,
}

impl CredentialCell {
    /// Create an empty cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `token`, replacing any previous value.
    pub async fn set(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    /// The stored token, if any.
    pub async fn get(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Whether a token has been stored.
    pub async fn is_set(&self) -> bool {
        self.token.read().await.is_some()
    }
}

impl std::fmt::Debug for CredentialCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the token itself.
        let state = match self.token.try_read() {
            Ok(guard) if guard.is_some() => "set",
            Ok(_) => "empty",
            Err(_) => "locked",
        };
        f.debug_struct("CredentialCell").field("token", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_starts_empty() {
        let cell = CredentialCell::new();
        assert!(cell.get().await.is_none());
        assert!(!cell.is_set().await);
    }

    #[tokio::test]
    async fn test_set_and_overwrite() {
        let cell = CredentialCell::new();
        cell.set("first").await;
        assert_eq!(cell.get().await.as_deref(), Some("first"));

        cell.set("second").await;
        assert_eq!(cell.get().await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_debug_hides_token() {
        let cell = CredentialCell::new();
        cell.set("secret-token").await;
        let debug_str = format!("{:?}", cell);
        assert!(!debug_str.contains("secret-token"));
        assert!(debug_str.contains("set"));
    }
}
