// ABOUTME: Remote shell seam for bootstrap steps.
// ABOUTME: Lets tests script command results without a live SSH session.

use async_trait::async_trait;

use crate::ssh::{CommandOutput, Session};

/// Executes shell command strings on the remote instance.
#[async_trait]
pub trait RemoteShell: Send + Sync {
    async fn exec(&self, command: &str) -> crate::ssh::Result<CommandOutput>;
}

#[async_trait]
impl RemoteShell for Session {
    async fn exec(&self, command: &str) -> crate::ssh::Result<CommandOutput> {
        Session::exec(self, command).await
    }
}
