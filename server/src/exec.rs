//! Runs a job's command through the host shell with a per-execution
//! timeout, the suspension point in spec §5 that the stop signal does
//! *not* preempt — a worker lets an already-running subprocess finish (or
//! time out on its own) rather than killing it mid-stop.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    Success,
    Failure(String),
}

pub async fn run_command(command: &str, timeout_secs: u64) -> ExecOutcome {
    let mut child = match Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return ExecOutcome::Failure(format!("failed to spawn shell: {e}")),
    };

    match timeout(Duration::from_secs(timeout_secs), child.wait()).await {
        Ok(Ok(status)) if status.success() => ExecOutcome::Success,
        Ok(Ok(status)) => ExecOutcome::Failure(format!("exited with {status}")),
        Ok(Err(e)) => ExecOutcome::Failure(format!("wait failed: {e}")),
        Err(_) => {
            let _ = child.kill().await;
            ExecOutcome::Failure(format!("timed out after {timeout_secs}s"))
        }
    }
}
