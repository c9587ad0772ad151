//! deck 背后的平台音频输出

use super::eq::FilterGraph;
use crate::error::AudioError;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// 输出端异步回报的加载结果，`load_id` 用来丢弃过期回报
#[derive(Debug, Clone, PartialEq)]
pub enum OutputSignal {
    Ready {
        slot: usize,
        load_id: u64,
    },
    Failed {
        slot: usize,
        load_id: u64,
        message: String,
    },
}

impl OutputSignal {
    pub fn slot(&self) -> usize {
        match self {
            OutputSignal::Ready { slot, .. } | OutputSignal::Failed { slot, .. } => *slot,
        }
    }

    pub fn load_id(&self) -> u64 {
        match self {
            OutputSignal::Ready { load_id, .. } | OutputSignal::Failed { load_id, .. } => *load_id,
        }
    }
}

pub type SignalSender = mpsc::UnboundedSender<OutputSignal>;
pub type SignalReceiver = mpsc::UnboundedReceiver<OutputSignal>;

/// 一个能发声的播放单元。
///
/// `load` 之后异步就绪，结果经 `OutputSignal` 送回引擎；其余操作都是同步、幂等的：
/// 对已暂停的输出再 `pause`、对空输出 `unload` 都是 no-op。
pub trait DeckOutput {
    fn load(&mut self, url: &str, load_id: u64);
    /// 释放音源和缓冲
    fn unload(&mut self);
    /// 尽力立即 seek；音源还没就绪时返回 false
    fn try_seek(&mut self, position: Duration) -> bool;
    fn play(&mut self) -> Result<(), AudioError>;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn position(&self) -> Duration;
    /// 已就绪的音源播放到了结尾
    fn is_drained(&self) -> bool;
    /// 输出端原生音量
    fn set_volume(&mut self, volume: f32);
    /// 只有能安全接入处理链的输出才有 filter graph
    fn filter_graph(&self) -> Option<&FilterGraph>;
}

/// 无声输出：`--no-audio` 或打不开声卡时使用，按墙钟模拟播放进度
pub struct NullOutput {
    slot: usize,
    tx_signal: SignalSender,
    loaded: bool,
    paused: bool,
    base: Duration,
    resumed_at: Option<Instant>,
}

impl NullOutput {
    pub fn new(slot: usize, tx_signal: SignalSender) -> Self {
        Self {
            slot,
            tx_signal,
            loaded: false,
            paused: true,
            base: Duration::ZERO,
            resumed_at: None,
        }
    }
}

impl DeckOutput for NullOutput {
    fn load(&mut self, url: &str, load_id: u64) {
        tracing::debug!(slot = self.slot, load_id, url, "NullOutput 加载");
        self.loaded = true;
        self.paused = true;
        self.base = Duration::ZERO;
        self.resumed_at = None;
        let _ = self.tx_signal.send(OutputSignal::Ready {
            slot: self.slot,
            load_id,
        });
    }

    fn unload(&mut self) {
        self.loaded = false;
        self.paused = true;
        self.base = Duration::ZERO;
        self.resumed_at = None;
    }

    fn try_seek(&mut self, position: Duration) -> bool {
        if !self.loaded {
            return false;
        }
        self.base = position;
        if self.resumed_at.is_some() {
            self.resumed_at = Some(Instant::now());
        }
        true
    }

    fn play(&mut self) -> Result<(), AudioError> {
        if !self.loaded {
            return Err(AudioError::NoSource(self.slot));
        }
        if self.paused {
            self.paused = false;
            self.resumed_at = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(at) = self.resumed_at.take() {
            self.base += at.elapsed();
        }
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn position(&self) -> Duration {
        self.base + self.resumed_at.map(|at| at.elapsed()).unwrap_or_default()
    }

    fn is_drained(&self) -> bool {
        false
    }

    fn set_volume(&mut self, _volume: f32) {}

    fn filter_graph(&self) -> Option<&FilterGraph> {
        None
    }
}
