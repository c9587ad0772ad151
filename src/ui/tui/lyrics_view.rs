use radio_ratui::domain::{Lyrics, current_line_index};
use radio_ratui::engine::PlayerSnapshot;
use ratatui::{
    Frame,
    prelude::Rect,
    style::{Color, Style},
    text::Text,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

pub(super) fn draw_lyrics(f: &mut Frame, area: Rect, player: &PlayerSnapshot) {
    let block = Block::default().borders(Borders::ALL).title("歌词");
    let lyrics = player.broadcast.as_ref().map(|b| &b.lyrics);

    let lines = match lyrics {
        Some(Lyrics::Synced(lines)) => lines,
        Some(Lyrics::Unsynced(raw)) => {
            let p = Paragraph::new(raw.as_str())
                .block(block.title("歌词（无时间轴）"))
                .wrap(Wrap { trim: false });
            f.render_widget(p, area);
            return;
        }
        _ => {
            f.render_widget(Paragraph::new("暂无歌词").block(block), area);
            return;
        }
    };

    let position_ms = (player.file_position.max(0.0) * 1000.0) as u64;
    let selected = current_line_index(lines, position_ms);

    let items = lines
        .iter()
        .map(|l| ListItem::new(Text::from(l.text.as_str()).centered()))
        .collect::<Vec<_>>();

    // Keep about 5 lines of context around the highlighted lyric line.
    let scroll_padding = 5.min(area.height.saturating_sub(2) as usize / 2);

    let list = List::new(items)
        .block(block.title("歌词（自动滚动）"))
        .scroll_padding(scroll_padding)
        .highlight_style(Style::default().fg(Color::Yellow));
    let mut state = ListState::default();
    state.select(Some(selected.unwrap_or(0)));
    f.render_stateful_widget(list, area, &mut state);
}
