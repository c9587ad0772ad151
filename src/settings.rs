use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    // 播放
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub muted: bool,
    #[serde(default = "default_crossfade_secs")]
    pub crossfade_secs: f32,
    /// 按下播放时先挂上“当前广播”地址，不等下一次轮询
    #[serde(default = "default_true")]
    pub optimistic_stream: bool,
    /// 关闭后不构建 EQ/前级增益，只用输出端原生音量
    #[serde(default = "default_true")]
    pub eq_enabled: bool,

    // 网络
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            muted: false,
            crossfade_secs: default_crossfade_secs(),
            optimistic_stream: true,
            eq_enabled: true,
            poll_interval_ms: default_poll_interval_ms(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl AppSettings {
    pub const MAX_CROSSFADE_SECS: f32 = 12.0;

    pub fn crossfade(&self) -> Duration {
        Duration::from_secs_f32(clamp_crossfade(self.crossfade_secs))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(100))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }
}

pub fn clamp_crossfade(secs: f32) -> f32 {
    if secs.is_finite() {
        secs.clamp(0.0, AppSettings::MAX_CROSSFADE_SECS)
    } else {
        default_crossfade_secs()
    }
}

fn default_volume() -> f32 {
    1.0
}
fn default_crossfade_secs() -> f32 {
    3.0
}
fn default_true() -> bool {
    true
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_http_timeout_secs() -> u64 {
    10
}

pub fn load_settings(data_dir: &Path) -> AppSettings {
    let p = settings_path(data_dir);
    let Ok(bytes) = fs::read(&p) else {
        return AppSettings::default();
    };
    match serde_json::from_slice(&bytes) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(path = %p.display(), err = %e, "设置文件损坏，使用默认设置");
            AppSettings::default()
        }
    }
}

pub fn save_settings(data_dir: &Path, s: &AppSettings) -> std::io::Result<()> {
    fs::create_dir_all(data_dir)?;
    let p = settings_path(data_dir);
    let tmp = p.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(s).unwrap_or_else(|_| b"{}".to_vec());
    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, &p) {
        let _ = fs::remove_file(&p);
        fs::rename(&tmp, &p).map_err(|_| e)?;
    }
    Ok(())
}

fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_field_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("settings.json"), br#"{"volume": 0.3}"#).expect("write");
        let s = load_settings(dir.path());
        assert!((s.volume - 0.3).abs() < f32::EPSILON);
        assert!((s.crossfade_secs - 3.0).abs() < f32::EPSILON);
        assert!(s.optimistic_stream);
        assert_eq!(s.poll_interval_ms, 1000);
    }

    #[test]
    fn test_clamps() {
        let s = AppSettings {
            crossfade_secs: 99.0,
            poll_interval_ms: 1,
            ..AppSettings::default()
        };
        assert_eq!(s.crossfade(), Duration::from_secs(12));
        assert_eq!(s.poll_interval(), Duration::from_millis(100));
        assert_eq!(clamp_crossfade(f32::NAN), 3.0);
        assert_eq!(clamp_crossfade(-1.0), 0.0);
    }
}
