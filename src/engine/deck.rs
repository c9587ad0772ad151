//! 单个播放 deck：包一层 `DeckOutput`，加上 trim、增益包络和加载代数

use super::fade::GainRamp;
use super::output::{DeckOutput, OutputSignal};
use crate::domain::{EqBands, TrackId};
use crate::error::AudioError;
use std::time::{Duration, Instant};

/// deck 上装的是什么
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckSource {
    Track(TrackId),
    /// 乐观快速起播时挂上的“当前广播”地址
    Stream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckStatus {
    Empty,
    Loading,
    Ready,
    Ended,
    Failed,
}

/// 主音量与静音，两个 deck 共用
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasterGain {
    pub volume: f32,
    pub muted: bool,
}

impl Default for MasterGain {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
        }
    }
}

impl MasterGain {
    pub fn effective(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume.clamp(0.0, 1.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeckEvent {
    Ready,
    Ended,
    Error(String),
    /// 当前播放位置（秒）
    Progress(f64),
}

pub struct Deck {
    slot: usize,
    output: Box<dyn DeckOutput>,
    load_id: u64,
    source: Option<DeckSource>,
    status: DeckStatus,
    pending_seek: Option<Duration>,
    trim_start: f64,
    trim_end: f64,
    track_volume: f32,
    fade: GainRamp,
}

impl Deck {
    pub fn new(slot: usize, output: Box<dyn DeckOutput>, now: Instant) -> Self {
        Self {
            slot,
            output,
            load_id: 0,
            source: None,
            status: DeckStatus::Empty,
            pending_seek: None,
            trim_start: 0.0,
            trim_end: 0.0,
            track_volume: 1.0,
            fade: GainRamp::hold(0.0, now),
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn load_id(&self) -> u64 {
        self.load_id
    }

    pub fn source(&self) -> Option<&DeckSource> {
        self.source.as_ref()
    }

    pub fn track_id(&self) -> Option<&TrackId> {
        match &self.source {
            Some(DeckSource::Track(id)) => Some(id),
            _ => None,
        }
    }

    pub fn status(&self) -> DeckStatus {
        self.status
    }

    pub fn has_filter_graph(&self) -> bool {
        self.output.filter_graph().is_some()
    }

    /// 换源并清空解码缓冲。旧的 seek 请求一并作废
    pub fn load(&mut self, url: &str, source: DeckSource, load_id: u64) {
        self.load_id = load_id;
        self.source = Some(source);
        self.status = DeckStatus::Loading;
        self.pending_seek = None;
        self.output.load(url, load_id);
    }

    /// 不换源，只改记录的来源（乐观起播确认之后）
    pub fn relabel(&mut self, source: DeckSource) {
        if self.source.is_some() {
            self.source = Some(source);
        }
    }

    /// 释放音源；对空 deck 是 no-op
    pub fn unload(&mut self) {
        if self.status == DeckStatus::Empty {
            return;
        }
        self.output.pause();
        self.output.unload();
        self.source = None;
        self.status = DeckStatus::Empty;
        self.pending_seek = None;
    }

    /// 立即尝试 seek；没就绪时记下来，等 Ready 再补一次
    pub fn seek_to(&mut self, secs: f64) {
        let pos = Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::ZERO);
        if self.output.try_seek(pos) {
            self.pending_seek = None;
        } else {
            self.pending_seek = Some(pos);
        }
    }

    pub fn play(&mut self) -> Result<(), AudioError> {
        self.output.play()
    }

    pub fn pause(&mut self) {
        self.output.pause();
    }

    pub fn is_paused(&self) -> bool {
        self.output.is_paused()
    }

    /// 正在出声（或等待缓冲后出声）
    pub fn is_playing(&self) -> bool {
        matches!(self.status, DeckStatus::Loading | DeckStatus::Ready) && !self.output.is_paused()
    }

    pub fn position_secs(&self) -> f64 {
        self.pending_seek
            .unwrap_or_else(|| self.output.position())
            .as_secs_f64()
    }

    pub fn set_fade(&mut self, ramp: GainRamp) {
        self.fade = ramp;
    }

    pub fn fade_value(&self, now: Instant) -> f32 {
        self.fade.value_at(now)
    }

    pub fn fade(&self) -> &GainRamp {
        &self.fade
    }

    /// 有 filter graph 时包络走 pre-gain，主音量走原生音量；否则全部乘进原生音量
    pub fn apply_gain(&mut self, now: Instant, master: MasterGain) {
        let fade = self.fade.value_at(now) * self.track_volume;
        match self.output.filter_graph() {
            Some(graph) => {
                graph.set_pre_gain(fade);
                self.output.set_volume(master.effective());
            }
            None => self.output.set_volume(fade * master.effective()),
        }
    }

    /// 没有 filter graph 时 EQ 静默忽略
    pub fn set_eq(&mut self, eq: EqBands) {
        if let Some(graph) = self.output.filter_graph() {
            graph.set_eq(eq);
        }
    }

    pub fn eq(&self) -> Option<EqBands> {
        self.output.filter_graph().map(|g| g.eq())
    }

    pub fn set_track_props(&mut self, trim_start: f64, trim_end: f64, volume: f32, eq: EqBands) {
        self.trim_start = trim_start.max(0.0);
        self.trim_end = trim_end.max(0.0);
        self.track_volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.set_eq(eq);
    }

    /// 处理输出端的加载回报；旧加载代数的回报直接丢弃
    pub fn handle_signal(&mut self, signal: &OutputSignal) -> Option<DeckEvent> {
        if signal.slot() != self.slot || signal.load_id() != self.load_id {
            tracing::debug!(slot = self.slot, load_id = signal.load_id(), current = self.load_id, "丢弃过期的 deck 回报");
            return None;
        }
        if self.status != DeckStatus::Loading {
            return None;
        }
        match signal {
            OutputSignal::Ready { .. } => {
                self.status = DeckStatus::Ready;
                if let Some(pos) = self.pending_seek.take()
                    && !self.output.try_seek(pos)
                {
                    tracing::warn!(slot = self.slot, pos_ms = pos.as_millis() as u64, "就绪后 seek 仍未生效");
                }
                Some(DeckEvent::Ready)
            }
            OutputSignal::Failed { message, .. } => {
                self.status = DeckStatus::Failed;
                self.output.pause();
                Some(DeckEvent::Error(message.clone()))
            }
        }
    }

    /// 每个 tick 调用：检测播放结束、trim 结尾，并报告进度
    pub fn poll_progress(&mut self) -> Option<DeckEvent> {
        if self.status != DeckStatus::Ready {
            return None;
        }
        if self.output.is_drained() {
            self.status = DeckStatus::Ended;
            return Some(DeckEvent::Ended);
        }
        if self.output.is_paused() {
            return None;
        }
        let pos = self.output.position().as_secs_f64();
        if self.trim_end > 0.0 && self.trim_end > self.trim_start && pos >= self.trim_end {
            tracing::debug!(slot = self.slot, pos, trim_end = self.trim_end, "到达 trim 结尾");
            self.output.pause();
            self.status = DeckStatus::Ended;
            return Some(DeckEvent::Ended);
        }
        Some(DeckEvent::Progress(pos))
    }
}
