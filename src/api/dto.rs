use crate::domain::TrackId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct StatusResp {
    /// 旧版服务端叫 `current`
    #[serde(default, alias = "current")]
    pub current_track: Option<TrackDto>,
    #[serde(default)]
    pub playing: Option<bool>,
    #[serde(default)]
    pub queue: Option<Vec<QueueItemDto>>,
    #[serde(default)]
    pub queue_len: Option<usize>,
    #[serde(default)]
    pub listeners: Option<u32>,
    #[serde(default)]
    pub user_vote: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct TrackDto {
    pub id: TrackId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub elapsed: Option<f64>,
    #[serde(default)]
    pub trim_start: Option<f64>,
    #[serde(default)]
    pub trim_end: Option<f64>,
    #[serde(default)]
    pub volume: Option<f32>,
    #[serde(default)]
    pub eq: Option<EqDto>,
    #[serde(default)]
    pub lyrics: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct EqDto {
    #[serde(default)]
    pub low: Option<f32>,
    #[serde(default)]
    pub mid: Option<f32>,
    #[serde(default)]
    pub high: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct QueueItemDto {
    pub id: TrackId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IdReq<'a> {
    pub id: &'a TrackId,
}

#[derive(Debug, Serialize)]
pub struct VoteReq<'a> {
    pub id: &'a TrackId,
    pub rating: u8,
}
