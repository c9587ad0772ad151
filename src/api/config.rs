use crate::error::ApiError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";

#[derive(Debug, Clone)]
pub struct RadioClientConfig {
    pub server: String,
    pub data_dir: PathBuf,
    pub timeout: Duration,
}

impl Default for RadioClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_owned(),
            data_dir: default_data_dir(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl RadioClientConfig {
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.server.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

pub fn default_data_dir() -> PathBuf {
    ProjectDirs::from("dev", "radio", "radio-ratui")
        .map(|p| p.data_local_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("radio-ratui"))
}

/// 本地持久化的客户端身份
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ClientState {
    pub client_id: Option<String>,
}

pub fn state_path(data_dir: &Path) -> PathBuf {
    data_dir.join("client_state.json")
}

pub fn load_state(data_dir: &Path) -> Result<ClientState, ApiError> {
    let p = state_path(data_dir);
    if !p.exists() {
        return Ok(ClientState::default());
    }
    let bytes = fs::read(p)?;
    match serde_json::from_slice(&bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            tracing::warn!(err = %e, "client_state.json 损坏，重新生成客户端 ID");
            Ok(ClientState::default())
        }
    }
}

pub fn save_state(data_dir: &Path, state: &ClientState) -> Result<(), ApiError> {
    fs::create_dir_all(data_dir)?;
    let bytes = serde_json::to_vec_pretty(state)?;
    fs::write(state_path(data_dir), bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_slashes() {
        let cfg = RadioClientConfig {
            server: "http://radio.test/".to_owned(),
            ..RadioClientConfig::default()
        };
        assert_eq!(cfg.endpoint("/api/status"), "http://radio.test/api/status");
        assert_eq!(cfg.endpoint("api/skip"), "http://radio.test/api/skip");
    }

    #[test]
    fn test_state_roundtrip_and_corrupt_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = ClientState {
            client_id: Some("ABC".to_owned()),
        };
        save_state(dir.path(), &state).expect("save");
        let loaded = load_state(dir.path()).expect("load");
        assert_eq!(loaded.client_id.as_deref(), Some("ABC"));

        fs::write(state_path(dir.path()), b"{oops").expect("write");
        let loaded = load_state(dir.path()).expect("load corrupt");
        assert!(loaded.client_id.is_none());
    }
}
