use super::sync::SyncPhase;
use crate::domain::{BroadcastState, EqBand, EqBands, QueueEntry};

/// UI 直接发给引擎的用户操作，不经过轮询
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Play,
    Stop,
    TogglePlay,
    ToggleMute,
    SetVolume(f32),
    AdjustVolume(f32),
    AdjustCrossfade(f32),
    Vote(u8),
    AdjustEq { band: EqBand, delta_db: f32 },
    ResetEq,
    /// 把当前曲目的 EQ/音量写回曲库
    SaveTrackSettings,
}

#[derive(Debug, Clone)]
pub enum EngineEvent {
    State(Box<PlayerSnapshot>),
    /// 需要用户再操作一次才能出声
    NeedsInteraction(String),
    Toast(String),
    Error(String),
}

/// 给 UI 渲染用的完整状态
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub broadcast: Option<BroadcastState>,
    pub queue: Vec<QueueEntry>,
    pub queue_len: usize,
    pub listeners: u32,
    pub user_vote: Option<u8>,
    pub phase: SyncPhase,
    pub armed: bool,
    /// 播放按钮显示的状态
    pub playing: bool,
    /// 相对 trim_start 的已播放秒数
    pub elapsed: f64,
    /// 文件内的位置，歌词按它对齐
    pub file_position: f64,
    pub volume: f32,
    pub muted: bool,
    pub crossfade_secs: f32,
    pub eq: EqBands,
    pub eq_modified: bool,
    pub has_filter_graph: bool,
    pub active_deck: usize,
    pub crossfading: bool,
    pub online: bool,
    pub last_error: Option<String>,
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self {
            broadcast: None,
            queue: Vec::new(),
            queue_len: 0,
            listeners: 0,
            user_vote: None,
            phase: SyncPhase::NoTrack,
            armed: false,
            playing: false,
            elapsed: 0.0,
            file_position: 0.0,
            volume: 1.0,
            muted: false,
            crossfade_secs: 3.0,
            eq: EqBands::default(),
            eq_modified: false,
            has_filter_graph: false,
            active_deck: 0,
            crossfading: false,
            online: false,
            last_error: None,
        }
    }
}
