mod cli;
mod ui;

use clap::Parser;
use cli::{Cli, Command};
use radio_ratui::api::{LibraryUpdate, RadioClient, RadioClientConfig};
use radio_ratui::domain::{EqBands, StatusSnapshot, TrackId};
use radio_ratui::engine::{AudioBackend, EngineConfig, spawn_engine};
use radio_ratui::error::AppError;
use radio_ratui::{logging, settings};
use std::env;
use ui::run_tui;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    let mut cfg = RadioClientConfig::default();
    if let Some(v) = cli.data_dir.clone() {
        cfg.data_dir = v;
    }
    if let Some(v) = cli.server.clone() {
        cfg.server = v;
    }

    let no_audio_env = env::var("RADIO_NO_AUDIO")
        .ok()
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false);
    let backend = if cli.no_audio || no_audio_env {
        AudioBackend::Null
    } else {
        AudioBackend::Rodio
    };

    let is_tui = matches!(cli.command, None | Some(Command::Tui));
    let _log_guard = logging::init(
        &cfg.data_dir,
        logging::LogConfig {
            dir: cli.log_dir.clone(),
            filter: cli.log_filter.clone(),
            stderr: !is_tui,
        },
    );
    tracing::info!(data_dir = %cfg.data_dir.display(), server = %cfg.server, "radio-ratui 启动");

    let mut app_settings = settings::load_settings(&cfg.data_dir);
    if let Some(secs) = cli.crossfade {
        app_settings.crossfade_secs = settings::clamp_crossfade(secs);
    }
    if cli.no_eq {
        app_settings.eq_enabled = false;
    }
    cfg.timeout = app_settings.http_timeout();

    let data_dir = cfg.data_dir.clone();
    let client = RadioClient::new(cfg)?;

    match cli.command.unwrap_or(Command::Tui) {
        Command::Tui => {
            let (handle, rx) = spawn_engine(EngineConfig {
                client,
                settings: app_settings,
                data_dir,
                backend,
            })?;
            run_tui(handle, rx).await?;
            Ok(())
        }
        Command::Status => {
            let snap = client.status().await?;
            println!("{}", serde_json::to_string_pretty(&status_json(&snap))?);
            Ok(())
        }
        Command::QueueAdd { id } => {
            client.queue_add(&TrackId::new(id)).await?;
            println!("已加入队列");
            Ok(())
        }
        Command::QueueRemove { id } => {
            client.queue_remove(&TrackId::new(id)).await?;
            println!("已移出队列");
            Ok(())
        }
        Command::Vote { rating } => {
            let snap = client.status().await?;
            let current = snap
                .current
                .ok_or_else(|| AppError::Other("当前没有正在广播的曲目".to_owned()))?;
            client.vote(&current.track_id, rating).await?;
            println!("已为《{}》评 {rating} 分", current.title);
            Ok(())
        }
        Command::Skip => {
            client.skip().await?;
            println!("已请求切歌");
            Ok(())
        }
        Command::LibraryUpdate {
            id,
            title,
            category,
            volume,
            low,
            mid,
            high,
            trim_start,
            trim_end,
            artwork,
        } => {
            let eq = (low.is_some() || mid.is_some() || high.is_some()).then(|| {
                EqBands {
                    low: low.unwrap_or(0.0),
                    mid: mid.unwrap_or(0.0),
                    high: high.unwrap_or(0.0),
                }
                .clamped()
            });
            let update = LibraryUpdate {
                id: TrackId::new(id),
                title,
                category,
                volume: volume.map(|v| v.clamp(0.0, 1.0)),
                eq,
                trim_start,
                trim_end,
                artwork,
            };
            client.update_library(&update).await?;
            println!("曲库已更新");
            Ok(())
        }
    }
}

fn status_json(snap: &StatusSnapshot) -> serde_json::Value {
    let current = snap.current.as_ref().map(|b| {
        serde_json::json!({
            "id": b.track_id,
            "title": b.title,
            "category": b.category,
            "filename": b.filename,
            "duration": b.duration,
            "elapsed": b.elapsed,
            "trim_start": b.trim_start,
            "trim_end": b.trim_end,
            "volume": b.volume,
            "eq": b.eq,
            "has_lyrics": !b.lyrics.is_empty(),
            "playing": b.playing,
        })
    });
    serde_json::json!({
        "current": current,
        "queue": snap.queue.iter().map(|q| serde_json::json!({
            "id": q.id,
            "title": q.title,
            "category": q.category,
        })).collect::<Vec<_>>(),
        "queue_len": snap.queue_len,
        "listeners": snap.listeners,
        "user_vote": snap.user_vote,
    })
}
