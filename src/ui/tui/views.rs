use super::lyrics_view::draw_lyrics;
use super::panels::{draw_eq, draw_now_playing, draw_queue};
use super::state::UiState;
use super::toast::draw_toast;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Text},
    widgets::{Block, Borders, Clear, Paragraph},
};

const HELP: &[&str] = &[
    "空格    播放 / 停止",
    "m       静音",
    "+ / -   音量",
    "[ / ]   交叉淡化时长",
    "1-5     给当前曲目评分",
    "Tab / ← →  选择 EQ 频段",
    "↑ / ↓   调整 EQ",
    "0       EQ 归零",
    "s       保存当前曲目的 EQ",
    "Esc     关闭提示",
    "q       退出",
];

pub(super) fn draw_ui(f: &mut Frame, ui: &UiState) {
    let player = &ui.player;
    let toast_height = if ui.toast.is_some() { 3 } else { 0 };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(toast_height),
            Constraint::Length(1),
        ])
        .split(f.area());

    let link = if player.online { "在线" } else { "离线" };
    let mut status = format!(
        "{link} | 听众 {} | 音量 {:.0}%{} | 交叉淡化 {:.1}s | Deck {}",
        player.listeners,
        player.volume * 100.0,
        if player.muted { "（静音）" } else { "" },
        player.crossfade_secs,
        if player.active_deck == 0 { "A" } else { "B" },
    );
    if player.crossfading {
        status.push_str(" | 淡化中");
    }
    if let Some(e) = player.last_error.as_deref() {
        status.push_str(&format!(" | {e}"));
    }
    let header = Paragraph::new(status).block(
        Block::default()
            .borders(Borders::ALL)
            .title("radio-ratui")
            .border_style(Style::default().fg(if player.online {
                Color::Gray
            } else {
                Color::Red
            })),
    );
    f.render_widget(header, rows[0]);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7),
            Constraint::Length(5),
            Constraint::Min(0),
        ])
        .split(cols[0]);

    draw_now_playing(f, left[0], player, ui.prompt.as_deref());
    draw_eq(f, left[1], player, ui.eq_band);
    draw_queue(f, left[2], player);
    draw_lyrics(f, cols[1], player);

    if let Some(toast) = ui.toast.as_ref() {
        draw_toast(f, rows[2], toast);
    }

    f.render_widget(
        Paragraph::new("空格 播放/停止 | m 静音 | +/- 音量 | 1-5 评分 | ? 帮助 | q 退出")
            .style(Style::default().fg(Color::DarkGray)),
        rows[3],
    );

    if ui.help_visible {
        let area = centered(f.area(), 44, HELP.len() as u16 + 2);
        let text = Text::from(HELP.iter().map(|l| Line::from(*l)).collect::<Vec<_>>());
        f.render_widget(Clear, area);
        f.render_widget(
            Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("帮助")),
            area,
        );
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
