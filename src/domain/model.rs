use super::ids::TrackId;
use super::lyrics::Lyrics;
use serde::{Deserialize, Serialize};

/// 三段 EQ 增益（dB），每段限制在 [-10, 10]。
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqBands {
    #[serde(default)]
    pub low: f32,
    #[serde(default)]
    pub mid: f32,
    #[serde(default)]
    pub high: f32,
}

impl EqBands {
    pub const MIN_DB: f32 = -10.0;
    pub const MAX_DB: f32 = 10.0;

    pub fn clamped(self) -> Self {
        let clamp = |v: f32| {
            if v.is_finite() {
                v.clamp(Self::MIN_DB, Self::MAX_DB)
            } else {
                0.0
            }
        };
        Self {
            low: clamp(self.low),
            mid: clamp(self.mid),
            high: clamp(self.high),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.low == 0.0 && self.mid == 0.0 && self.high == 0.0
    }

    pub fn band(&self, band: EqBand) -> f32 {
        match band {
            EqBand::Low => self.low,
            EqBand::Mid => self.mid,
            EqBand::High => self.high,
        }
    }

    pub fn with_band(mut self, band: EqBand, db: f32) -> Self {
        match band {
            EqBand::Low => self.low = db,
            EqBand::Mid => self.mid = db,
            EqBand::High => self.high = db,
        }
        self.clamped()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqBand {
    Low,
    Mid,
    High,
}

impl EqBand {
    pub fn next(self) -> Self {
        match self {
            EqBand::Low => EqBand::Mid,
            EqBand::Mid => EqBand::High,
            EqBand::High => EqBand::Low,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            EqBand::Low => EqBand::High,
            EqBand::Mid => EqBand::Low,
            EqBand::High => EqBand::Mid,
        }
    }
}

/// 每次轮询拿到的广播状态。每次都整体替换上一次的值，不做合并。
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastState {
    pub track_id: TrackId,
    pub title: String,
    pub category: String,
    pub filename: String,
    /// 秒
    pub duration: f64,
    /// 服务端时间轴上已播放的秒数（相对 trim_start）
    pub elapsed: f64,
    pub trim_start: f64,
    /// 0 表示不裁剪结尾
    pub trim_end: f64,
    /// 单曲音量 0..=1
    pub volume: f32,
    pub eq: EqBands,
    pub lyrics: Lyrics,
    pub playing: bool,
}

impl BroadcastState {
    /// 本地文件中应处的位置
    pub fn target_position(&self) -> f64 {
        self.trim_start.max(0.0) + self.elapsed.max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: TrackId,
    pub title: String,
    pub category: String,
}

/// 一次 `/api/status` 的完整结果。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
    pub current: Option<BroadcastState>,
    pub queue: Vec<QueueEntry>,
    pub queue_len: usize,
    pub listeners: u32,
    pub user_vote: Option<u8>,
}
