// TUI 子模块
mod event_loop;
mod guard;
mod keyboard;
mod lyrics_view;
mod panels;
mod state;
mod toast;
mod utils;
mod views;

use radio_ratui::engine::{EngineEvent, EngineHandle};
use std::io;
use tokio::sync::mpsc;

/// 主 TUI 入口点 - 从 main.rs 调用
pub async fn run_tui(handle: EngineHandle, rx: mpsc::Receiver<EngineEvent>) -> io::Result<()> {
    event_loop::run_tui_internal(handle, rx).await
}
