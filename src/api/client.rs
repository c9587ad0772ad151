use super::config::{self, RadioClientConfig};
use super::convert;
use super::dto::{IdReq, StatusResp, VoteReq};
use super::util;
use crate::domain::{EqBands, StatusSnapshot, TrackId};
use crate::error::ApiError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use std::path::PathBuf;

pub const CLIENT_ID_HEADER: &str = "x-client-id";

const MEDIA_PREFIX: &str = "/static/media/";
const STREAM_PATH: &str = "/api/stream/current";

/// 媒体地址构造：按文件名取静态文件，以及“当前广播”常驻地址
#[derive(Debug, Clone)]
pub struct MediaUrls {
    server: String,
}

impl MediaUrls {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into().trim_end_matches('/').to_owned(),
        }
    }

    pub fn media_url(&self, filename: &str) -> String {
        util::cache_bust(&format!(
            "{}{MEDIA_PREFIX}{}",
            self.server,
            urlencoding::encode(filename)
        ))
    }

    pub fn stream_url(&self) -> String {
        util::cache_bust(&format!("{}{STREAM_PATH}", self.server))
    }
}

/// `POST /api/library/update` 的内容；带封面时走 multipart
#[derive(Debug, Clone, Default, Serialize)]
pub struct LibraryUpdate {
    pub id: TrackId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eq: Option<EqBands>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim_start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim_end: Option<f64>,
    #[serde(skip)]
    pub artwork: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RadioClient {
    http: reqwest::Client,
    cfg: RadioClientConfig,
    client_id: String,
}

impl RadioClient {
    pub fn new(cfg: RadioClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent("radio-ratui")
            .timeout(cfg.timeout)
            .build()?;

        let mut state = config::load_state(&cfg.data_dir)?;
        let client_id = match state.client_id.clone() {
            Some(id) if !id.trim().is_empty() => id,
            _ => {
                let id = util::generate_client_id();
                state.client_id = Some(id.clone());
                config::save_state(&cfg.data_dir, &state)?;
                tracing::info!("已生成新的客户端 ID");
                id
            }
        };

        Ok(Self {
            http,
            cfg,
            client_id,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn config(&self) -> &RadioClientConfig {
        &self.cfg
    }

    pub fn media_urls(&self) -> MediaUrls {
        MediaUrls::new(self.cfg.server.clone())
    }

    pub async fn status(&self) -> Result<StatusSnapshot, ApiError> {
        let path = "/api/status";
        let url = util::cache_bust(&self.cfg.endpoint(path));
        let resp = self.http.get(url).headers(self.headers()?).send().await?;
        let resp = ensure_success(path, resp)?;
        let bytes = resp.bytes().await?;
        let dto: StatusResp = serde_json::from_slice(&bytes)?;
        Ok(convert::to_snapshot(dto))
    }

    pub async fn queue_add(&self, id: &TrackId) -> Result<(), ApiError> {
        self.post_json("/api/queue/add", &IdReq { id }).await
    }

    pub async fn queue_remove(&self, id: &TrackId) -> Result<(), ApiError> {
        self.post_json("/api/queue/remove", &IdReq { id }).await
    }

    pub async fn vote(&self, id: &TrackId, rating: u8) -> Result<(), ApiError> {
        if !(1..=5).contains(&rating) {
            return Err(ApiError::BadInput("评分必须在 1-5 之间"));
        }
        self.post_json("/api/vote", &VoteReq { id, rating }).await
    }

    /// 让服务端时间轴越过当前曲目
    pub async fn skip(&self) -> Result<(), ApiError> {
        let path = "/api/skip";
        let resp = self
            .http
            .post(self.cfg.endpoint(path))
            .headers(self.headers()?)
            .send()
            .await?;
        ensure_success(path, resp)?;
        Ok(())
    }

    pub async fn update_library(&self, update: &LibraryUpdate) -> Result<(), ApiError> {
        let path = "/api/library/update";
        let Some(artwork) = update.artwork.as_ref() else {
            return self.post_json(path, update).await;
        };

        let bytes = tokio::fs::read(artwork).await?;
        let file_name = artwork
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artwork".to_owned());
        let form = Form::new()
            .text("metadata", serde_json::to_string(update)?)
            .text("id", update.id.to_string())
            .part("artwork", Part::bytes(bytes).file_name(file_name));

        let resp = self
            .http
            .post(self.cfg.endpoint(path))
            .headers(self.headers()?)
            .multipart(form)
            .send()
            .await?;
        ensure_success(path, resp)?;
        Ok(())
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(self.cfg.endpoint(path))
            .headers(self.headers()?)
            .json(body)
            .send()
            .await?;
        ensure_success(path, resp)?;
        Ok(())
    }

    fn headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(CLIENT_ID_HEADER),
            HeaderValue::from_str(&self.client_id)
                .map_err(|e| ApiError::BadHeader(format!("client id: {e}")))?,
        );
        Ok(headers)
    }
}

fn ensure_success(path: &str, resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(ApiError::Status {
            path: path.to_owned(),
            status,
        })
    }
}
