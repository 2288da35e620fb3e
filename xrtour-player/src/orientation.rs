//! Device-orientation permission service
//!
//! Decides whether motion-tracked camera rotation may be used, prompting the
//! user only on platforms that demand an explicit, gesture-initiated grant.
//! Outcomes are persisted through a [`PermissionStore`]; store failures are
//! logged and never block XR entry.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, info, warn};
use xrtour_common::config::OrientationConfig;
use xrtour_common::permission::{OrientationPermission, PermissionStore, StoreScope};

/// What the platform offers for device orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlatformCapabilities {
    /// Orientation events exist at all
    pub supports_orientation: bool,
    /// Access must be requested explicitly
    pub requires_permission: bool,
    pub is_ios: bool,
}

impl PlatformCapabilities {
    /// Explicit prompt needed before motion tracking (iOS with a request API)
    pub fn requires_prompt(&self) -> bool {
        self.supports_orientation && self.requires_permission && self.is_ios
    }
}

impl From<&OrientationConfig> for PlatformCapabilities {
    fn from(config: &OrientationConfig) -> Self {
        Self {
            supports_orientation: config.supports_orientation,
            requires_permission: config.requires_permission,
            is_ios: config.is_ios,
        }
    }
}

/// Prompt failure; treated as a denial
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PromptError {
    #[error("permission prompt dismissed")]
    Dismissed,

    #[error("permission prompt unavailable: {0}")]
    Unavailable(String),
}

/// The user-facing permission prompt
pub trait OrientationPrompt: Send + Sync {
    /// Ask the user; resolves to whether access was granted
    ///
    /// Implementations must issue the platform request when this is called,
    /// not when the returned future is first polled.
    fn request_permission(&self) -> BoxFuture<'static, Result<bool, PromptError>>;
}

/// Prompt with a fixed answer, used by the headless service
#[derive(Debug, Clone, Copy)]
pub struct StaticPrompt {
    pub grant: bool,
}

impl OrientationPrompt for StaticPrompt {
    fn request_permission(&self) -> BoxFuture<'static, Result<bool, PromptError>> {
        futures::future::ready(Ok(self.grant)).boxed()
    }
}

#[derive(Clone)]
pub struct OrientationPermissionService {
    store: Arc<dyn PermissionStore>,
    platform: PlatformCapabilities,
}

impl OrientationPermissionService {
    pub fn new(store: Arc<dyn PermissionStore>, platform: PlatformCapabilities) -> Self {
        Self { store, platform }
    }

    pub fn platform(&self) -> PlatformCapabilities {
        self.platform
    }

    /// Current status from storage and platform capabilities
    pub fn check_status(&self) -> OrientationPermission {
        let status = self.resolve_status();
        debug!("Orientation permission status: {}", status);
        status
    }

    fn resolve_status(&self) -> OrientationPermission {
        if let Some(stored) = self.load(StoreScope::Persistent) {
            return stored;
        }
        if !self.platform.supports_orientation {
            return OrientationPermission::NotRequired;
        }
        if !self.platform.requires_permission {
            self.save(StoreScope::Persistent, true);
            return OrientationPermission::NotRequired;
        }
        if !self.platform.is_ios {
            return OrientationPermission::Unknown;
        }

        // iOS: a grant from earlier in this session counts
        match self.load(StoreScope::Session) {
            Some(OrientationPermission::Granted) => {
                self.save(StoreScope::Persistent, true);
                OrientationPermission::Granted
            }
            Some(OrientationPermission::Denied) => {
                self.save(StoreScope::Persistent, false);
                OrientationPermission::Denied
            }
            _ => OrientationPermission::Unknown,
        }
    }

    /// Whether XR entry should prompt for `status`
    pub fn requires_request(&self, status: OrientationPermission) -> bool {
        status == OrientationPermission::Unknown && self.platform.requires_prompt()
    }

    /// Request access
    ///
    /// The prompt is issued before this returns; the future only awaits the
    /// user's answer and persists it.
    pub fn request(
        &self,
        prompt: &dyn OrientationPrompt,
    ) -> BoxFuture<'static, OrientationPermission> {
        if !self.platform.supports_orientation {
            debug!("Device orientation not supported");
            self.save(StoreScope::Persistent, false);
            return futures::future::ready(OrientationPermission::NotRequired).boxed();
        }
        if !self.platform.requires_prompt() {
            debug!("Orientation permission not required, marking as granted");
            self.save(StoreScope::Persistent, true);
            return futures::future::ready(OrientationPermission::NotRequired).boxed();
        }

        info!("Requesting device orientation permission");
        let answer = prompt.request_permission();
        let service = self.clone();
        async move {
            let granted = match answer.await {
                Ok(granted) => granted,
                Err(e) => {
                    warn!("Error requesting device orientation permission: {}", e);
                    false
                }
            };
            service.record(granted)
        }
        .boxed()
    }

    /// Persist an outcome; iOS also caches it for the session
    pub fn record(&self, granted: bool) -> OrientationPermission {
        self.save(StoreScope::Persistent, granted);
        if self.platform.is_ios {
            self.save(StoreScope::Session, granted);
        }

        let status = if granted {
            OrientationPermission::Granted
        } else {
            OrientationPermission::Denied
        };
        info!("Orientation permission {}", status);
        status
    }

    /// Forget stored outcomes in both scopes
    pub fn clear(&self) {
        for scope in [StoreScope::Persistent, StoreScope::Session] {
            if let Err(e) = self.store.clear(scope) {
                warn!("Could not clear permission status: {}", e);
            }
        }
        info!("Cleared orientation permission from storage");
    }

    fn load(&self, scope: StoreScope) -> Option<OrientationPermission> {
        self.store.load(scope).unwrap_or_else(|e| {
            warn!("Could not retrieve permission status: {}", e);
            None
        })
    }

    fn save(&self, scope: StoreScope, granted: bool) {
        if let Err(e) = self.store.save(scope, granted) {
            warn!("Could not store permission status: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xrtour_common::permission::MemoryPermissionStore;

    fn ios() -> PlatformCapabilities {
        PlatformCapabilities {
            supports_orientation: true,
            requires_permission: true,
            is_ios: true,
        }
    }

    #[test]
    fn test_requires_prompt_only_on_ios_with_permission_api() {
        assert!(ios().requires_prompt());
        assert!(!PlatformCapabilities {
            is_ios: false,
            ..ios()
        }
        .requires_prompt());
        assert!(!PlatformCapabilities::default().requires_prompt());
    }

    #[test]
    fn test_platform_from_default_config() {
        let platform = PlatformCapabilities::from(&OrientationConfig::default());
        assert!(platform.supports_orientation);
        assert!(!platform.requires_prompt());
    }

    #[tokio::test]
    async fn test_static_prompt_answers() {
        let service =
            OrientationPermissionService::new(Arc::new(MemoryPermissionStore::new()), ios());
        let status = service.request(&StaticPrompt { grant: false }).await;
        assert_eq!(status, OrientationPermission::Denied);
        assert_eq!(service.check_status(), OrientationPermission::Denied);
    }
}
