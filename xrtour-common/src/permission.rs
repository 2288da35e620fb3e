//! Device-orientation permission state and persistence
//!
//! The permission outcome is kept in two scopes:
//! - **Persistent**: survives restarts (file-backed in the service)
//! - **Session**: lives only as long as the current browsing session; iOS
//!   requires a fresh user gesture for every page load, so a session cache
//!   suppresses re-prompting within one session.
//!
//! Only `granted` / `denied` are ever stored. `unknown` and `not_required`
//! are derived from platform capabilities at check time.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Key under which the persistent outcome is stored
pub const PERSISTENT_KEY: &str = "deviceOrientationPermission";

/// Key under which the iOS session outcome is stored
pub const SESSION_KEY: &str = "ios_orientation_permission";

/// Device-orientation permission status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrientationPermission {
    /// Not yet asked; the platform requires an explicit prompt
    Unknown,
    Granted,
    Denied,
    /// Platform either has no orientation sensor or grants access implicitly
    NotRequired,
}

impl OrientationPermission {
    /// Whether magic-window (motion-tracked) camera rotation may be enabled
    pub fn allows_motion_tracking(self) -> bool {
        matches!(self, Self::Granted | Self::NotRequired)
    }

    fn from_stored(value: &str) -> Option<Self> {
        match value {
            "granted" => Some(Self::Granted),
            "denied" => Some(Self::Denied),
            _ => None,
        }
    }

    fn stored_value(granted: bool) -> &'static str {
        if granted {
            "granted"
        } else {
            "denied"
        }
    }
}

impl std::fmt::Display for OrientationPermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Granted => write!(f, "granted"),
            Self::Denied => write!(f, "denied"),
            Self::NotRequired => write!(f, "not_required"),
        }
    }
}

/// Storage scope for a permission outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreScope {
    Persistent,
    Session,
}

impl StoreScope {
    fn key(self) -> &'static str {
        match self {
            Self::Persistent => PERSISTENT_KEY,
            Self::Session => SESSION_KEY,
        }
    }
}

/// Key/value persistence for orientation permission outcomes
pub trait PermissionStore: Send + Sync {
    /// Last stored outcome for `scope` (`Granted` or `Denied`), if any
    fn load(&self, scope: StoreScope) -> Result<Option<OrientationPermission>>;

    /// Store an outcome for `scope`
    fn save(&self, scope: StoreScope, granted: bool) -> Result<()>;

    /// Forget the outcome for `scope`
    fn clear(&self, scope: StoreScope) -> Result<()>;
}

/// In-memory store; both scopes are lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryPermissionStore {
    values: Mutex<HashMap<StoreScope, bool>>,
}

impl MemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PermissionStore for MemoryPermissionStore {
    fn load(&self, scope: StoreScope) -> Result<Option<OrientationPermission>> {
        let values = lock(&self.values)?;
        Ok(values.get(&scope).map(|&granted| {
            if granted {
                OrientationPermission::Granted
            } else {
                OrientationPermission::Denied
            }
        }))
    }

    fn save(&self, scope: StoreScope, granted: bool) -> Result<()> {
        lock(&self.values)?.insert(scope, granted);
        Ok(())
    }

    fn clear(&self, scope: StoreScope) -> Result<()> {
        lock(&self.values)?.remove(&scope);
        Ok(())
    }
}

/// File-backed store
///
/// The persistent scope is a small JSON object on disk; the session scope is
/// held in memory for the lifetime of the process.
#[derive(Debug)]
pub struct FilePermissionStore {
    path: PathBuf,
    session: Mutex<Option<bool>>,
    // Serialises read-modify-write cycles on the file
    file_lock: Mutex<()>,
}

impl FilePermissionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            session: Mutex::new(None),
            file_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<HashMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_file(&self, values: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(values)?)?;
        debug!("Wrote permission store {}", self.path.display());
        Ok(())
    }
}

impl PermissionStore for FilePermissionStore {
    fn load(&self, scope: StoreScope) -> Result<Option<OrientationPermission>> {
        match scope {
            StoreScope::Session => Ok(lock(&self.session)?.map(|granted| {
                if granted {
                    OrientationPermission::Granted
                } else {
                    OrientationPermission::Denied
                }
            })),
            StoreScope::Persistent => {
                let _guard = lock(&self.file_lock)?;
                let values = self.read_file()?;
                Ok(values
                    .get(scope.key())
                    .and_then(|v| OrientationPermission::from_stored(v)))
            }
        }
    }

    fn save(&self, scope: StoreScope, granted: bool) -> Result<()> {
        match scope {
            StoreScope::Session => {
                *lock(&self.session)? = Some(granted);
                Ok(())
            }
            StoreScope::Persistent => {
                let _guard = lock(&self.file_lock)?;
                let mut values = self.read_file()?;
                values.insert(
                    scope.key().to_string(),
                    OrientationPermission::stored_value(granted).to_string(),
                );
                self.write_file(&values)
            }
        }
    }

    fn clear(&self, scope: StoreScope) -> Result<()> {
        match scope {
            StoreScope::Session => {
                *lock(&self.session)? = None;
                Ok(())
            }
            StoreScope::Persistent => {
                let _guard = lock(&self.file_lock)?;
                let mut values = self.read_file()?;
                if values.remove(scope.key()).is_some() {
                    self.write_file(&values)?;
                }
                Ok(())
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| Error::Internal("permission store lock poisoned".to_string()))
}
