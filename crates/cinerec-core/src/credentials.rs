//! Cached login credentials and the Basic auth header derived from them
//!
//! Persistence is best-effort: a store that cannot be read or written never
//! blocks a login, the caller just falls back to whatever is typed in the form.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{ClientError, Result};

/// An email/password pair. An empty string means "not set".
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Both fields present
    pub fn is_complete(&self) -> bool {
        !self.email.is_empty() && !self.password.is_empty()
    }
}

// Keep passwords out of logs and panic messages
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Key-value persistence for the two credential strings
pub trait CredentialStore {
    fn set(&mut self, credentials: &Credentials) -> Result<()>;

    /// Persisted values; fields that were never stored come back empty
    fn load(&self) -> Result<Credentials>;

    fn clear(&mut self) -> Result<()>;
}

impl<S: CredentialStore + ?Sized> CredentialStore for Box<S> {
    fn set(&mut self, credentials: &Credentials) -> Result<()> {
        (**self).set(credentials)
    }

    fn load(&self) -> Result<Credentials> {
        (**self).load()
    }

    fn clear(&mut self) -> Result<()> {
        (**self).clear()
    }
}

/// Credentials kept in a JSON file, normally `<config_dir>/cinerec/credentials.json`
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_config_dir() -> anyhow::Result<Self> {
        Ok(Self::new(crate::config::Config::config_dir()?.join("credentials.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn set(&mut self, credentials: &Credentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(credentials)?;
        fs::write(&self.path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    fn load(&self) -> Result<Credentials> {
        if !self.path.exists() {
            return Ok(Credentials::default());
        }

        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(|e| ClientError::Storage(e.to_string()))
    }

    fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Session-only store, used when credentials should not touch the disk
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    stored: Credentials,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(credentials: Credentials) -> Self {
        Self { stored: credentials }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn set(&mut self, credentials: &Credentials) -> Result<()> {
        self.stored = credentials.clone();
        Ok(())
    }

    fn load(&self) -> Result<Credentials> {
        Ok(self.stored.clone())
    }

    fn clear(&mut self) -> Result<()> {
        self.stored = Credentials::default();
        Ok(())
    }
}

/// Stored values win field by field, the form fills whatever is missing.
/// If the store can't be read at all, only the form is used.
pub fn resolve_credentials<S: CredentialStore + ?Sized>(
    store: &S,
    email_field: &str,
    password_field: &str,
) -> Credentials {
    match store.load() {
        Ok(stored) => Credentials {
            email: non_empty_or(stored.email, email_field),
            password: non_empty_or(stored.password, password_field),
        },
        Err(e) => {
            warn!(error = %e, "credential store unavailable, using form fields");
            Credentials::new(email_field, password_field)
        }
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

/// `Basic base64(email:password)`, or None for an anonymous request
pub fn auth_header(credentials: &Credentials) -> Option<String> {
    if !credentials.is_complete() {
        return None;
    }

    let token = BASE64.encode(format!("{}:{}", credentials.email, credentials.password));
    Some(format!("Basic {}", token))
}
