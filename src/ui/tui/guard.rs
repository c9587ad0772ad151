use crossterm::{
    cursor, execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use std::io::{self, Write};
use std::sync::Once;

static PANIC_HOOK: Once = Once::new();

/// 终端现场：raw mode + 备用屏幕 + 隐藏光标。
///
/// drop 时恢复；引擎线程或 UI panic 时由 panic hook 先恢复终端，否则 panic 信息会被备用屏幕吞掉。
pub struct TuiGuard;

impl TuiGuard {
    pub fn enter() -> io::Result<Self> {
        PANIC_HOOK.call_once(|| {
            let prev = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                restore_terminal();
                prev(info);
            }));
        });

        enable_raw_mode()?;
        let mut out = io::stdout();
        if let Err(e) = execute!(out, EnterAlternateScreen, cursor::Hide) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        out.flush()?;
        tracing::debug!("终端已切换到 TUI 模式");
        Ok(Self)
    }
}

impl Drop for TuiGuard {
    fn drop(&mut self) {
        restore_terminal();
        tracing::debug!("终端已恢复");
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let mut out = io::stdout();
    let _ = execute!(out, cursor::Show, LeaveAlternateScreen);
    let _ = out.flush();
}
