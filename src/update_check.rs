//! Background release check.
//!
//! The fetch runs on a spawned task so the tick loop never waits on the
//! network; the result comes back over a one-slot channel that the
//! orchestrator polls without blocking. A release is delivered at most once,
//! and only when it is newer than the running version and not the one the
//! user chose to ignore.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// A published release, as reported by an [`UpdateSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub version: String,
    pub url: String,
}

/// Boundary to wherever releases are published.
#[async_trait]
pub trait UpdateSource: Send + Sync + 'static {
    async fn latest_release(&self) -> Result<ReleaseInfo>;
}

/// Handle to one in-flight update check.
pub struct UpdateChecker {
    rx: mpsc::Receiver<ReleaseInfo>,
    cancel: CancellationToken,
}

impl UpdateChecker {
    /// Kick off the check in the background.
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn(
        source: impl UpdateSource,
        current_version: impl Into<String>,
        ignored_version: impl Into<String>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let current = current_version.into();
        let ignored = ignored_version.into();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = source.latest_release() => match result {
                    Ok(release) => {
                        if !is_newer(&release.version, &current) {
                            tracing::debug!(version = %release.version, "Running latest release");
                        } else if release.version == ignored {
                            tracing::debug!(version = %release.version, "Release ignored by user");
                        } else {
                            tracing::info!(version = %release.version, "Update available");
                            let _ = tx.send(release).await;
                        }
                    }
                    Err(err) => tracing::warn!("Update check failed: {err}"),
                }
            }
        });
        Self { rx, cancel }
    }

    /// Non-blocking poll; yields the release at most once.
    pub fn poll(&mut self) -> Option<ReleaseInfo> {
        self.rx.try_recv().ok()
    }
}

impl Drop for UpdateChecker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn parse_version(version: &str) -> Option<(u32, u32, u32)> {
    let mut parts = version.trim().trim_start_matches('v').splitn(3, '.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().unwrap_or("0").parse().ok()?;
    let patch = parts.next().unwrap_or("0").parse().ok()?;
    Some((major, minor, patch))
}

/// Numeric comparison when both versions parse, plain inequality otherwise.
fn is_newer(remote: &str, current: &str) -> bool {
    match (parse_version(remote), parse_version(current)) {
        (Some(r), Some(c)) => r > c,
        _ => remote != current,
    }
}
