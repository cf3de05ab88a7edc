// Timeout Watchdog - timer-driven forced termination
// State machine: armed -> { disarmed | fired }

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Kills a process by pid once the exec timeout elapses, unless disarmed
/// first. The two transitions race on a oneshot channel, so exactly one of
/// them wins; the loser is a no-op.
pub struct Watchdog {
    disarm_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl Watchdog {
    /// Arm a timer that force-kills `pid` after `timeout`.
    ///
    /// The kill is unconditional (SIGKILL, no grace period). A kill
    /// failure is logged and absorbed: the invocation proceeds to report
    /// whatever exit status results.
    pub fn arm(timeout: Duration, pid: i32) -> Self {
        let (disarm_tx, disarm_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    info!(
                        pid,
                        timeout_ms = timeout.as_millis() as u64,
                        "Function was killed by exec timeout"
                    );
                    if let Err(e) = kill_process(pid) {
                        warn!(pid, error = %e, "Error killing function on exec timeout");
                    }
                }
                _ = disarm_rx => {
                    // Normal completion beat the timer.
                }
            }
        });

        Self {
            disarm_tx: Some(disarm_tx),
            handle,
        }
    }

    /// Cancel the timer. Idempotent: a second call, or a call after the
    /// timer already fired, is a no-op.
    pub fn disarm(&mut self) {
        if let Some(tx) = self.disarm_tx.take() {
            // The send fails if the timer task already fired and dropped
            // its receiver; the kill has happened and cannot be undone.
            let _ = tx.send(());
        }
    }

    /// Wait for the timer task to settle (fired or disarmed).
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

/// Unconditional kill, no grace period.
#[cfg(unix)]
fn kill_process(pid: i32) -> std::io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid), Signal::SIGKILL)?;
    Ok(())
}

#[cfg(windows)]
fn kill_process(pid: i32) -> std::io::Result<()> {
    use std::process::Command;

    let output = Command::new("taskkill")
        .args(["/F", "/PID", &pid.to_string()])
        .output()?;

    if !output.status.success() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!(
                "taskkill failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ),
        ));
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio::process::Command;

    fn spawn_sleep(secs: &str) -> tokio::process::Child {
        Command::new("sleep")
            .arg(secs)
            .spawn()
            .expect("spawn sleep")
    }

    #[tokio::test]
    async fn fires_and_kills_the_process() {
        let mut child = spawn_sleep("10");
        let pid = child.id().expect("pid") as i32;

        let watchdog = Watchdog::arm(Duration::from_millis(50), pid);

        let status = child.wait().await.expect("wait");
        assert!(!status.success());
        // Killed by signal, so there is no exit code on unix.
        assert_eq!(status.code(), None);

        watchdog.join().await;
    }

    #[tokio::test]
    async fn disarm_prevents_the_kill() {
        let mut child = spawn_sleep("10");
        let pid = child.id().expect("pid") as i32;

        let mut watchdog = Watchdog::arm(Duration::from_millis(50), pid);
        watchdog.disarm();
        watchdog.join().await;

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(child.try_wait().expect("try_wait").is_none(), "still running");

        child.kill().await.expect("cleanup kill");
        let _ = child.wait().await;
    }

    #[tokio::test]
    async fn disarm_twice_is_a_no_op() {
        let mut child = spawn_sleep("10");
        let pid = child.id().expect("pid") as i32;

        let mut watchdog = Watchdog::arm(Duration::from_secs(30), pid);
        watchdog.disarm();
        watchdog.disarm();
        watchdog.join().await;

        child.kill().await.expect("cleanup kill");
        let _ = child.wait().await;
    }

    #[tokio::test]
    async fn disarm_after_fire_is_a_no_op() {
        let mut child = spawn_sleep("10");
        let pid = child.id().expect("pid") as i32;

        let mut watchdog = Watchdog::arm(Duration::from_millis(20), pid);
        let status = child.wait().await.expect("wait");
        assert!(!status.success());

        watchdog.disarm();
        watchdog.join().await;
    }
}
