use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use shared::domain::AuthTokens;
use tracing::warn;

/// Fixed name of the durable session document. Absence of the file (or an
/// unreadable payload) means "logged out".
pub const SESSION_FILE_NAME: &str = "auth_tokens.json";

/// Durable home of the Credential Pair. The session client is the only
/// writer; everything else goes through its accessors.
///
/// `store` and `clear` are best-effort: persistence failures are logged and
/// swallowed so a broken disk never turns into a failed API call.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Option<AuthTokens>;
    fn store(&self, tokens: &AuthTokens);
    fn clear(&self);
}

/// In-memory store for tests and embedders that manage persistence
/// themselves.
#[derive(Default)]
pub struct MemorySessionStore {
    tokens: Mutex<Option<AuthTokens>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Option<AuthTokens> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, tokens: &AuthTokens) {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = Some(tokens.clone());
    }

    fn clear(&self) {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// File-backed store: one JSON document under a configured directory.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(SESSION_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<AuthTokens> {
        let raw = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&raw).ok()
    }

    fn store(&self, tokens: &AuthTokens) {
        let raw = match serde_json::to_string(tokens) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("failed to serialize session tokens: {err}");
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                warn!(
                    "failed to create session directory '{}': {err}",
                    parent.display()
                );
                return;
            }
        }
        if let Err(err) = fs::write(&self.path, raw) {
            warn!(
                "failed to persist session tokens to '{}': {err}",
                self.path.display()
            );
        }
    }

    fn clear(&self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != io::ErrorKind::NotFound {
                warn!(
                    "failed to remove session file '{}': {err}",
                    self.path.display()
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
