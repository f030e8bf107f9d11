//! Device lock guard.
//!
//! Two layers: a permanent per-device lock set when a play-through completes
//! (or on a second anti-cheat strike), and a per-session two-strike counter.
//! One guard is created per connection and owned by it.

mod device;
mod keys;
mod session;

pub use device::{DeviceFlags, DeviceRecord};
pub use keys::{KeyBuffer, KeyCombo};
pub use session::{SessionLock, SessionPhase, ViolationKind, ViolationOutcome};

use crate::auth::constant_time_eq;
use crate::store::StoreResult;
use crate::types::Identity;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_UNLOCK_KEYWORD: &str = "unlock2024";

/// Unlock secrets and deferred-transition timings
#[derive(Debug, Clone)]
pub struct LockPolicy {
    /// 4-digit admin PIN; the admin path is disabled when unset
    pub admin_pin: Option<String>,
    /// Lower-cased keyword typed on the lock screen
    pub unlock_keyword: String,
    /// Delay before asking the client to re-enter fullscreen
    pub fullscreen_retry: Duration,
    /// Delay before the forced redirect after a lock
    pub lock_redirect: Duration,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            admin_pin: None,
            unlock_keyword: DEFAULT_UNLOCK_KEYWORD.to_string(),
            fullscreen_retry: Duration::from_millis(1000),
            lock_redirect: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "code", rename_all = "snake_case")]
pub enum UnlockCode {
    Pin(String),
    Keyword(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Ignored,
    Unlocked,
    Violation(ViolationOutcome),
}

/// Short stable tag for logging a device id without writing it out
pub fn device_tag(device: &str) -> String {
    let digest = Sha256::digest(device.as_bytes());
    hex::encode(&digest[..4])
}

pub struct DeviceLockGuard {
    device: String,
    tag: String,
    flags: Arc<DeviceFlags>,
    policy: Arc<LockPolicy>,
    session: SessionLock,
    typed: KeyBuffer,
}

impl DeviceLockGuard {
    pub fn new(device: impl Into<String>, flags: Arc<DeviceFlags>, policy: Arc<LockPolicy>) -> Self {
        let device = device.into();
        Self {
            tag: device_tag(&device),
            device,
            flags,
            policy,
            session: SessionLock::default(),
            typed: KeyBuffer::default(),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn policy(&self) -> &LockPolicy {
        &self.policy
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }

    pub async fn is_locked(&self) -> bool {
        self.flags.get(&self.device).await.completed
    }

    /// Arm the anti-cheat listeners. Refused while the device is locked.
    pub async fn start_game(&mut self) -> StoreResult<bool> {
        if self.is_locked().await || !self.session.start() {
            return Ok(false);
        }
        self.flags
            .update(&self.device, |d| d.active_session = true)
            .await?;
        tracing::debug!(device = %self.tag, "Anti-cheat armed");
        Ok(true)
    }

    pub async fn record_violation(&mut self, kind: ViolationKind) -> StoreResult<ViolationOutcome> {
        let outcome = self.session.record(kind);
        match outcome {
            ViolationOutcome::Ignored => {}
            ViolationOutcome::Warn { .. } => {
                tracing::info!(device = %self.tag, ?kind, "First violation, warning issued");
            }
            ViolationOutcome::Lock => {
                tracing::warn!(device = %self.tag, ?kind, "Second violation, locking device");
                self.flags
                    .update(&self.device, |d| {
                        d.completed = true;
                        d.identity = None;
                        d.active_session = false;
                    })
                    .await?;
            }
        }
        Ok(outcome)
    }

    /// Clear the device lock if `code` matches. Progress records are untouched.
    pub async fn unlock(&mut self, code: &UnlockCode) -> StoreResult<bool> {
        let matches = match code {
            UnlockCode::Pin(pin) => self
                .policy
                .admin_pin
                .as_ref()
                .is_some_and(|expected| constant_time_eq(expected.as_bytes(), pin.trim().as_bytes())),
            UnlockCode::Keyword(word) => constant_time_eq(
                self.policy.unlock_keyword.as_bytes(),
                word.trim().to_lowercase().as_bytes(),
            ),
        };
        if !matches {
            tracing::warn!(device = %self.tag, "Unlock attempt refused");
            return Ok(false);
        }
        self.clear_lock().await?;
        Ok(true)
    }

    /// Feed one key event: builds up the unlock keyword while locked, and
    /// counts forbidden shortcuts as violations while a game runs
    pub async fn push_key(&mut self, combo: &KeyCombo) -> StoreResult<KeyOutcome> {
        if self.is_locked().await {
            self.typed.push(combo);
            if self.typed.contains(&self.policy.unlock_keyword) {
                self.clear_lock().await?;
                return Ok(KeyOutcome::Unlocked);
            }
            return Ok(KeyOutcome::Ignored);
        }

        if combo.is_forbidden() {
            match self.record_violation(ViolationKind::ForbiddenShortcut).await? {
                ViolationOutcome::Ignored => {}
                outcome => return Ok(KeyOutcome::Violation(outcome)),
            }
        }
        Ok(KeyOutcome::Ignored)
    }

    /// A play-through finished on this device
    pub async fn mark_completed(&self) -> StoreResult<()> {
        self.flags
            .update(&self.device, |d| {
                d.completed = true;
                d.active_session = false;
            })
            .await?;
        tracing::info!(device = %self.tag, "Device locked after completion");
        Ok(())
    }

    pub async fn remember_identity(&self, identity: &Identity) -> StoreResult<()> {
        self.flags
            .update(&self.device, |d| d.identity = Some(identity.clone()))
            .await?;
        Ok(())
    }

    pub async fn forget_identity(&self) -> StoreResult<()> {
        self.flags
            .update(&self.device, |d| {
                d.identity = None;
                d.active_session = false;
            })
            .await?;
        Ok(())
    }

    pub async fn remembered_identity(&self) -> Option<Identity> {
        self.flags.get(&self.device).await.identity
    }

    async fn clear_lock(&mut self) -> StoreResult<()> {
        self.flags
            .update(&self.device, |d| d.completed = false)
            .await?;
        self.typed.clear();
        tracing::info!(device = %self.tag, "Device unlocked");
        Ok(())
    }
}
