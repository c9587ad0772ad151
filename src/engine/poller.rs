//! 广播状态轮询：固定间隔、失败只记日志、同一时间最多一个请求

use super::core::EngineInput;
use crate::api::RadioClient;
use crate::domain::StatusSnapshot;
use crate::error::ApiError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

pub trait StatusSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<StatusSnapshot, ApiError>> + Send;
}

impl StatusSource for RadioClient {
    fn fetch(&self) -> impl Future<Output = Result<StatusSnapshot, ApiError>> + Send {
        self.status()
    }
}

/// 让轮询提前进行；actor 退出时随之丢弃，轮询任务跟着结束
#[derive(Debug, Clone)]
pub struct PollerHandle {
    tx: mpsc::UnboundedSender<Duration>,
}

impl PollerHandle {
    /// 最迟在 `after` 之后发起下一次请求
    pub fn poll_soon(&self, after: Duration) {
        let _ = self.tx.send(after);
    }
}

pub fn spawn_poller<S: StatusSource>(
    source: S,
    interval: Duration,
    tx_input: mpsc::UnboundedSender<EngineInput>,
) -> PollerHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_poller(source, interval, tx_input, rx));
    PollerHandle { tx }
}

async fn run_poller<S: StatusSource>(
    source: S,
    interval: Duration,
    tx_input: mpsc::UnboundedSender<EngineInput>,
    mut rx_nudge: mpsc::UnboundedReceiver<Duration>,
) {
    tracing::info!(interval_ms = interval.as_millis() as u64, "状态轮询已启动");
    let mut deadline = Instant::now();
    let mut failures: u32 = 0;

    loop {
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => break,
                nudge = rx_nudge.recv() => match nudge {
                    Some(after) => deadline = deadline.min(Instant::now() + after),
                    None => {
                        tracing::debug!("状态轮询退出");
                        return;
                    }
                },
            }
        }

        let input = match source.fetch().await {
            Ok(snap) => {
                if failures > 0 {
                    tracing::info!(failures, "状态轮询恢复");
                }
                failures = 0;
                EngineInput::Status(snap)
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                // 连续失败时只在开头和每 30 次记一次 warn
                if failures == 1 || failures % 30 == 0 {
                    tracing::warn!(failures, transient = e.is_transient(), err = %e, "获取广播状态失败");
                } else {
                    tracing::debug!(failures, err = %e, "获取广播状态失败");
                }
                EngineInput::StatusFailed(e.to_string())
            }
        };
        if tx_input.send(input).is_err() {
            return;
        }
        deadline = Instant::now() + interval;
    }
}
