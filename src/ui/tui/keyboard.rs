use super::state::UiState;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use radio_ratui::engine::{EngineHandle, PlayerCommand};

const VOLUME_STEP: f32 = 0.05;
const CROSSFADE_STEP: f32 = 0.5;
const EQ_STEP_DB: f32 = 1.0;

/// 返回 true 表示退出
pub(super) fn handle_key(ui: &mut UiState, key: KeyEvent, handle: &EngineHandle) -> bool {
    // Some terminals/platforms may report both press and release events; we only act on press/repeat.
    if matches!(key.kind, KeyEventKind::Release) {
        return false;
    }

    if ui.help_visible {
        if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc) {
            ui.help_visible = false;
        }
        return false;
    }

    let Some(action) = map_key(key) else {
        return false;
    };
    match action {
        KeyAction::Quit => return true,
        KeyAction::ToggleHelp => ui.help_visible = true,
        KeyAction::Dismiss => ui.toast = None,
        KeyAction::NextBand => ui.eq_band = ui.eq_band.next(),
        KeyAction::PrevBand => ui.eq_band = ui.eq_band.prev(),
        KeyAction::EqUp => handle.send(PlayerCommand::AdjustEq {
            band: ui.eq_band,
            delta_db: EQ_STEP_DB,
        }),
        KeyAction::EqDown => handle.send(PlayerCommand::AdjustEq {
            band: ui.eq_band,
            delta_db: -EQ_STEP_DB,
        }),
        KeyAction::Command(cmd) => {
            if cmd == PlayerCommand::TogglePlay {
                ui.prompt = None;
            }
            handle.send(cmd);
        }
    }
    false
}

#[derive(Debug, Clone, PartialEq)]
enum KeyAction {
    Quit,
    ToggleHelp,
    Dismiss,
    NextBand,
    PrevBand,
    EqUp,
    EqDown,
    Command(PlayerCommand),
}

fn map_key(key: KeyEvent) -> Option<KeyAction> {
    let action = match (key.code, key.modifiers) {
        (KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => KeyAction::Quit,
        (KeyCode::Char('q'), _) => KeyAction::Quit,
        (KeyCode::Char('?'), _) => KeyAction::ToggleHelp,
        (KeyCode::Esc, _) => KeyAction::Dismiss,
        (KeyCode::Char(' '), _) => KeyAction::Command(PlayerCommand::TogglePlay),
        (KeyCode::Char('m'), _) => KeyAction::Command(PlayerCommand::ToggleMute),
        (KeyCode::Char('+') | KeyCode::Char('='), _) => {
            KeyAction::Command(PlayerCommand::AdjustVolume(VOLUME_STEP))
        }
        (KeyCode::Char('-'), _) => KeyAction::Command(PlayerCommand::AdjustVolume(-VOLUME_STEP)),
        (KeyCode::Char(']'), _) => {
            KeyAction::Command(PlayerCommand::AdjustCrossfade(CROSSFADE_STEP))
        }
        (KeyCode::Char('['), _) => {
            KeyAction::Command(PlayerCommand::AdjustCrossfade(-CROSSFADE_STEP))
        }
        (KeyCode::Char(c @ '1'..='5'), _) => {
            KeyAction::Command(PlayerCommand::Vote(c as u8 - b'0'))
        }
        (KeyCode::Tab | KeyCode::Right, _) => KeyAction::NextBand,
        (KeyCode::BackTab | KeyCode::Left, _) => KeyAction::PrevBand,
        (KeyCode::Up, _) => KeyAction::EqUp,
        (KeyCode::Down, _) => KeyAction::EqDown,
        (KeyCode::Char('0'), _) => KeyAction::Command(PlayerCommand::ResetEq),
        (KeyCode::Char('s'), _) => KeyAction::Command(PlayerCommand::SaveTrackSettings),
        _ => return None,
    };
    Some(action)
}
