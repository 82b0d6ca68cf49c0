//! 命令执行器
//!
//! 提供统一的命令执行接口，支持：
//! - 超时控制
//! - 取消支持（取消或超时都会终止子进程所在的进程组）
//! - stdout/stderr 合并输出

use std::path::Path;
use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// 命令执行器
pub struct CommandRunner;

/// 命令执行错误
#[derive(Debug)]
pub enum CommandError {
    /// 命令启动失败
    SpawnFailed(std::io::Error),
    /// 命令超时
    Timeout(Duration),
    /// 命令被取消
    Cancelled,
    /// 等待命令完成失败
    WaitFailed(std::io::Error),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::SpawnFailed(e) => write!(f, "Failed to spawn command: {}", e),
            CommandError::Timeout(d) => write!(f, "Command timed out after {:?}", d),
            CommandError::Cancelled => write!(f, "Command was cancelled"),
            CommandError::WaitFailed(e) => write!(f, "Failed to wait for command: {}", e),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::SpawnFailed(e) | CommandError::WaitFailed(e) => Some(e),
            _ => None,
        }
    }
}

/// 合并输出的执行结果
#[derive(Debug)]
pub struct CombinedOutput {
    /// 退出状态
    pub status: ExitStatus,
    /// stdout 与 stderr 按到达顺序合并
    pub output: String,
}

/// 输出读取任务在子进程结束后的最长等待时间
const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// 子进程所在进程组
///
/// 子进程以自身 pid 为进程组 id 启动，docker compose 插件等孙进程也在组内。
/// drop 时（调用方 future 被丢弃）若未解除，向整个进程组发送 SIGKILL。
struct ProcessGroup {
    pgid: Option<i32>,
}

impl ProcessGroup {
    fn new(pid: Option<u32>) -> Self {
        Self {
            pgid: pid.and_then(|p| i32::try_from(p).ok()),
        }
    }

    /// 终止整个进程组
    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }

    /// 子进程已正常退出，不再需要清理
    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: i32) {
    let result = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if result < 0 {
        warn!(pgid, error = %std::io::Error::last_os_error(), "Failed to kill process group");
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: i32) {}

/// 逐行读取原始字节，非 UTF-8 内容按 lossy 解码
async fn forward_lines<R>(reader: Option<R>, tx: mpsc::UnboundedSender<String>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                let _ = tx.send(String::from_utf8_lossy(line).into_owned());
            }
            Err(e) => {
                warn!(error = %e, "Failed to read command output");
                break;
            }
        }
    }
}

/// 等待读取任务结束，超时则放弃
async fn drain(mut task: tokio::task::JoinHandle<()>) {
    if tokio::time::timeout(READER_DRAIN_TIMEOUT, &mut task)
        .await
        .is_err()
    {
        task.abort();
    }
}

impl CommandRunner {
    /// 执行命令并收集合并输出
    ///
    /// 子进程在独立进程组中运行。取消令牌触发、超时或调用方的 future 被 drop 时，
    /// 整个进程组都会被 kill，孙进程不会成为孤儿。
    pub async fn run_combined(
        program: &str,
        args: &[&str],
        work_dir: &Path,
        cancel: &CancellationToken,
        timeout: Duration,
    ) -> Result<CombinedOutput, CommandError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(CommandError::SpawnFailed)?;
        let mut group = ProcessGroup::new(child.id());

        let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
        let stdout_task = tokio::spawn(forward_lines(child.stdout.take(), line_tx.clone()));
        let stderr_task = tokio::spawn(forward_lines(child.stderr.take(), line_tx));

        // 等待命令完成，支持超时和取消
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                warn!(program, "Command cancelled, killing process group");
                group.kill();
                let _ = child.kill().await;
                Err(CommandError::Cancelled)
            }
            _ = tokio::time::sleep(timeout) => {
                error!(program, "Command timed out after {:?}", timeout);
                group.kill();
                let _ = child.kill().await;
                Err(CommandError::Timeout(timeout))
            }
            status = child.wait() => {
                group.disarm();
                status.map_err(CommandError::WaitFailed)
            }
        };

        drain(stdout_task).await;
        drain(stderr_task).await;

        let status = result?;
        let mut lines = Vec::new();
        while let Ok(line) = line_rx.try_recv() {
            lines.push(line);
        }

        Ok(CombinedOutput {
            status,
            output: lines.join("\n"),
        })
    }

    /// 执行简单命令（stdout/stderr 分离）
    ///
    /// 用于 docker ps / inspect 等短命令
    pub async fn run_simple(
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output, CommandError> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        tokio::select! {
            result = child => {
                result.map_err(CommandError::SpawnFailed)
            }
            _ = tokio::time::sleep(timeout) => {
                Err(CommandError::Timeout(timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_run_simple_success() {
        let result = CommandRunner::run_simple("echo", &["hello"], Duration::from_secs(5)).await;

        assert!(result.is_ok());
        let output = result.unwrap();
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("hello"));
    }

    #[tokio::test]
    async fn test_run_simple_not_found() {
        let result =
            CommandRunner::run_simple("nonexistent_command_12345", &[], Duration::from_secs(5))
                .await;

        assert!(matches!(result, Err(CommandError::SpawnFailed(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_combined_merges_streams() {
        let cancel = CancellationToken::new();
        let result = CommandRunner::run_combined(
            "sh",
            &["-c", "echo out; echo err 1>&2; exit 3"],
            &PathBuf::from("/tmp"),
            &cancel,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(result.status.code(), Some(3));
        assert!(result.output.contains("out"));
        assert!(result.output.contains("err"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_combined_timeout() {
        let cancel = CancellationToken::new();
        let result = CommandRunner::run_combined(
            "sleep",
            &["5"],
            &PathBuf::from("/tmp"),
            &cancel,
            Duration::from_millis(100),
        )
        .await;

        assert!(matches!(result, Err(CommandError::Timeout(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_combined_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = CommandRunner::run_combined(
            "sleep",
            &["5"],
            &PathBuf::from("/tmp"),
            &cancel,
            Duration::from_secs(5),
        )
        .await;

        assert!(matches!(result, Err(CommandError::Cancelled)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_forked_children() {
        let cancel = CancellationToken::new();
        let started = std::time::Instant::now();
        // sh forks `sleep`, which inherits the output pipes
        let result = CommandRunner::run_combined(
            "sh",
            &["-c", "sleep 4; echo done"],
            &PathBuf::from("/tmp"),
            &cancel,
            Duration::from_millis(200),
        )
        .await;

        assert!(matches!(result, Err(CommandError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dropped_run_kills_process_group() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let script = format!("sleep 1; touch {}", marker.display());
        let work_dir = dir.path().to_path_buf();

        let task = tokio::spawn(async move {
            let cancel = CancellationToken::new();
            CommandRunner::run_combined(
                "sh",
                &["-c", script.as_str()],
                &work_dir,
                &cancel,
                Duration::from_secs(30),
            )
            .await
        });
        tokio::time::sleep(Duration::from_millis(200)).await;
        task.abort();
        let _ = task.await;

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_combined_keeps_output_after_invalid_utf8() {
        let cancel = CancellationToken::new();
        let result = CommandRunner::run_combined(
            "sh",
            &["-c", "printf 'pulling\\n\\377\\nError: manifest unknown\\n'; exit 1"],
            &PathBuf::from("/tmp"),
            &cancel,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(result.status.code(), Some(1));
        assert!(result.output.contains("pulling"));
        assert!(result.output.contains('\u{FFFD}'));
        assert!(result.output.contains("Error: manifest unknown"));
    }
}
