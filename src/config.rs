//! Runtime configuration from environment variables

use crate::lock::{LockPolicy, DEFAULT_UNLOCK_KEYWORD};
use crate::types::CompletionPolicy;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub bind_addr: SocketAddr,
    /// Where snapshots are written (None = in-memory only)
    pub snapshot_dir: Option<PathBuf>,
    /// Extra attempts for a failed leaderboard write
    pub leaderboard_retries: u32,
    pub completion_policy: CompletionPolicy,
    /// JSON case file replacing the built-in answer key
    pub answer_key_path: Option<PathBuf>,
    pub lock: LockPolicy,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            snapshot_dir: None,
            leaderboard_retries: 2,
            completion_policy: CompletionPolicy::default(),
            answer_key_path: None,
            lock: LockPolicy::default(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn millis_var(name: &str, default: u64) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(default))
}

/// The admin PIN must be exactly four digits, anything else disables it
fn admin_pin(raw: Option<String>) -> Option<String> {
    let pin = raw?;
    if pin.len() == 4 && pin.chars().all(|c| c.is_ascii_digit()) {
        Some(pin)
    } else {
        tracing::warn!("ADMIN_PIN must be exactly 4 digits, admin unlock disabled");
        None
    }
}

impl GameConfig {
    pub fn from_env() -> Self {
        let bind_addr = non_empty_var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr.parse().unwrap_or_else(|_| {
            tracing::warn!(bind_addr = %bind_addr, "Invalid BIND_ADDR, using {}", DEFAULT_BIND_ADDR);
            SocketAddr::from(([0, 0, 0, 0], 3000))
        });

        let completion_policy = match non_empty_var("COMPLETION_POLICY") {
            Some(raw) => raw.parse().unwrap_or_else(|e: String| {
                tracing::warn!("{}, using checkpoint", e);
                CompletionPolicy::Checkpoint
            }),
            None => CompletionPolicy::default(),
        };
        if completion_policy == CompletionPolicy::Checkpoint {
            tracing::warn!(
                "Completion policy is checkpoint: puzzle 3 stamps a completion time that puzzle 9 overwrites; \
                 set COMPLETION_POLICY=final_only to stamp only on completion"
            );
        }

        let lock = LockPolicy {
            admin_pin: admin_pin(non_empty_var("ADMIN_PIN")),
            unlock_keyword: non_empty_var("UNLOCK_KEYWORD")
                .map(|k| k.to_lowercase())
                .unwrap_or_else(|| DEFAULT_UNLOCK_KEYWORD.to_string()),
            fullscreen_retry: millis_var("FULLSCREEN_RETRY_MS", 1000),
            lock_redirect: millis_var("LOCK_REDIRECT_MS", 3000),
        };

        let config = Self {
            bind_addr,
            snapshot_dir: non_empty_var("SNAPSHOT_DIR").map(PathBuf::from),
            leaderboard_retries: std::env::var("LEADERBOARD_RETRIES")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(2),
            completion_policy,
            answer_key_path: non_empty_var("ANSWER_KEY_PATH").map(PathBuf::from),
            lock,
        };

        tracing::info!(
            bind_addr = %config.bind_addr,
            snapshot_dir = ?config.snapshot_dir,
            leaderboard_retries = config.leaderboard_retries,
            completion_policy = ?config.completion_policy,
            answer_key = ?config.answer_key_path,
            admin_pin = config.lock.admin_pin.is_some(),
            fullscreen_retry_ms = config.lock.fullscreen_retry.as_millis() as u64,
            lock_redirect_ms = config.lock.lock_redirect.as_millis() as u64,
            "Game config loaded"
        );
        config
    }
}
