// ABOUTME: Remote host preparation: retrying SSH connectivity, then the setup sequence.
// ABOUTME: The Bootstrap trait is the seam that lets the orchestrator run without a real host.

mod error;
mod shell;
mod steps;

pub use error::BootstrapError;
pub use shell::RemoteShell;
pub use steps::{build_env_flags, run_steps};

use std::future::Future;
use std::time::Instant;

use async_trait::async_trait;

use crate::config::{Credentials, Preset};
use crate::retry::RetryPolicy;
use crate::ssh::{Session, SessionConfig};

/// Retry an async connection attempt under a policy. Each failed attempt is
/// reported as a string; the last one is surfaced when the policy runs out.
pub async fn connect_with_retry<S, F, Fut>(
    policy: &RetryPolicy,
    mut attempt: F,
) -> Result<S, BootstrapError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S, String>>,
{
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match attempt().await {
            Ok(session) => return Ok(session),
            Err(last_error) => {
                match policy.max_attempts() {
                    Some(max) => tracing::warn!(
                        "connectivity attempt {attempts}/{max} failed ({last_error})"
                    ),
                    None => tracing::warn!(
                        "connectivity attempt {attempts} failed ({last_error})"
                    ),
                }
                if policy.exhausted(attempts, started.elapsed()) {
                    return Err(BootstrapError::ConnectivityExhausted {
                        attempts,
                        last_error,
                    });
                }
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

/// Prepares a freshly provisioned host and launches the workload container.
#[async_trait]
pub trait Bootstrap: Send + Sync {
    async fn run(
        &self,
        preset: &Preset,
        credentials: &Credentials,
        address: &str,
    ) -> Result<(), BootstrapError>;
}

/// The real implementation: connects over SSH and runs the setup sequence.
pub struct SshBootstrap;

#[async_trait]
impl Bootstrap for SshBootstrap {
    async fn run(
        &self,
        preset: &Preset,
        credentials: &Credentials,
        address: &str,
    ) -> Result<(), BootstrapError> {
        // Resolve container environment first so a missing variable fails
        // before we touch the network.
        let env_flags = build_env_flags(&preset.env)?;

        let policy = preset.connect_policy();
        let session = connect_with_retry(&policy, || {
            let config = SessionConfig::new(
                address,
                &preset.ssh_username,
                &credentials.ssh_private_key_path,
            );
            async move {
                let session = Session::connect(config)
                    .await
                    .map_err(|e| e.to_string())?;
                let probe = session.exec("true").await.map_err(|e| e.to_string())?;
                if probe.success() {
                    Ok(session)
                } else {
                    Err(probe.diagnostic().to_string())
                }
            }
        })
        .await?;

        let result = run_steps(&session, preset, &env_flags).await;

        if let Err(e) = session.disconnect().await {
            tracing::warn!("failed to close SSH session cleanly: {e}");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn retry_returns_first_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::attempts(5, Duration::ZERO);

        let value: u32 = connect_with_retry(&policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(format!("attempt {n} refused"))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_stops_at_the_attempt_limit() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::attempts(4, Duration::ZERO);

        let err = connect_with_retry::<(), _, _>(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("connection refused".to_string()) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match err {
            BootstrapError::ConnectivityExhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 4);
                assert_eq!(last_error, "connection refused");
            }
            other => panic!("expected ConnectivityExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn retry_makes_no_further_attempts_after_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::attempts(10, Duration::ZERO);

        connect_with_retry(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
