use super::guard::TuiGuard;
use super::keyboard::handle_key;
use super::state::{Toast, UiState};
use super::views::draw_ui;
use crossterm::event::{self, Event};
use radio_ratui::engine::{EngineEvent, EngineHandle};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;

/// 进度条和歌词靠重绘推进，不必等事件
const REDRAW_EVERY: Duration = Duration::from_millis(100);

pub(super) async fn run_tui_internal(
    handle: EngineHandle,
    mut rx: mpsc::Receiver<EngineEvent>,
) -> io::Result<()> {
    let _guard = TuiGuard::enter()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let mut ui = UiState::default();

    loop {
        while let Ok(evt) = rx.try_recv() {
            apply_event(&mut ui, evt);
        }
        ui.expire_toast();

        terminal.draw(|f| draw_ui(f, &ui))?;
        tokio::task::yield_now().await;

        if event::poll(REDRAW_EVERY)?
            && let Event::Key(key) = event::read()?
            && handle_key(&mut ui, key, &handle)
        {
            break;
        }
    }

    Ok(())
}

fn apply_event(ui: &mut UiState, evt: EngineEvent) {
    match evt {
        EngineEvent::State(s) => {
            if s.playing {
                ui.prompt = None;
            }
            ui.player = *s;
        }
        EngineEvent::NeedsInteraction(msg) => {
            ui.prompt = Some(msg.clone());
            ui.toast = Some(Toast::warning(format!("需要按空格键开始播放: {msg}")));
        }
        EngineEvent::Toast(msg) => ui.toast = Some(Toast::info(msg)),
        EngineEvent::Error(e) => ui.toast = Some(Toast::error(format!("错误: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::state::ToastLevel;
    use radio_ratui::engine::PlayerSnapshot;

    #[test]
    fn test_events_update_ui_state() {
        let mut ui = UiState::default();
        apply_event(&mut ui, EngineEvent::NeedsInteraction("blocked".to_owned()));
        assert_eq!(ui.prompt.as_deref(), Some("blocked"));
        assert_eq!(ui.toast.as_ref().map(|t| t.level), Some(ToastLevel::Warning));

        let snap = PlayerSnapshot {
            playing: true,
            listeners: 7,
            ..PlayerSnapshot::default()
        };
        apply_event(&mut ui, EngineEvent::State(Box::new(snap)));
        assert!(ui.prompt.is_none());
        assert_eq!(ui.player.listeners, 7);

        apply_event(&mut ui, EngineEvent::Error("boom".to_owned()));
        assert_eq!(ui.toast.as_ref().map(|t| t.level), Some(ToastLevel::Error));
    }
}
