use super::state::{Toast, ToastLevel};
use ratatui::{
    Frame,
    prelude::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

/// 底部通知条。会自动消失的通知在标题里显示剩余秒数
pub(super) fn draw_toast(f: &mut Frame, area: Rect, toast: &Toast) {
    let (label, color) = match toast.level {
        ToastLevel::Error => ("错误", Color::Red),
        ToastLevel::Warning => ("注意", Color::Yellow),
        ToastLevel::Info => ("提示", Color::Cyan),
    };

    let title = match toast.level.duration_ms() {
        Some(ms) => {
            let left = ms.saturating_sub(toast.created_at.elapsed().as_millis() as u64);
            format!("{label} {}s", left.div_ceil(1000))
        }
        None => format!("{label} [Esc 关闭]"),
    };

    let line = Line::from(vec![
        Span::styled("● ", Style::default().fg(color)),
        Span::styled(
            toast.message.as_str(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title);
    f.render_widget(
        Paragraph::new(line).block(block).wrap(Wrap { trim: true }),
        area,
    );
}
