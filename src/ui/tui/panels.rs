use super::utils::{eq_bar, fmt_mmss, progress_bar_text, truncate_to_width, vote_stars};
use radio_ratui::domain::EqBand;
use radio_ratui::engine::{PlayerSnapshot, SyncPhase};
use ratatui::{
    Frame,
    prelude::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

pub(super) fn draw_now_playing(f: &mut Frame, area: Rect, player: &PlayerSnapshot, prompt: Option<&str>) {
    let block = Block::default().borders(Borders::ALL).title("正在广播");

    let Some(b) = player.broadcast.as_ref() else {
        let text = if player.online {
            "等待广播开始..."
        } else {
            "连接服务器中..."
        };
        f.render_widget(Paragraph::new(text).block(block), area);
        return;
    };

    let total = if b.trim_end > b.trim_start {
        b.trim_end - b.trim_start
    } else {
        b.duration
    };
    let state_label = match (player.armed, player.phase, player.playing) {
        (false, _, _) => "按空格键收听",
        (_, SyncPhase::UserStopped, _) => "已停止",
        (_, SyncPhase::Loading, _) => "缓冲中",
        (_, _, true) => "播放中",
        _ => "已暂停",
    };

    let mut lines = vec![
        Line::from(Span::styled(
            truncate_to_width(&b.title, area.width.saturating_sub(2) as usize),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("分类: {}", b.category)),
        Line::from(format!(
            "{} / {}  {}",
            fmt_mmss(player.elapsed),
            fmt_mmss(total),
            progress_bar_text(player.elapsed, total, 28)
        )),
        Line::from(format!("状态: {state_label}  评分: {}", vote_stars(player.user_vote))),
    ];
    if let Some(p) = prompt {
        lines.push(Line::from(Span::styled(
            format!("需要操作: {p}"),
            Style::default().fg(Color::Yellow),
        )));
    }

    f.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
}

pub(super) fn draw_eq(f: &mut Frame, area: Rect, player: &PlayerSnapshot, selected: EqBand) {
    let title = if player.eq_modified {
        "EQ（已修改，s 保存）"
    } else {
        "EQ"
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    if !player.has_filter_graph {
        f.render_widget(
            Paragraph::new("当前输出不支持 EQ（--no-eq 或无音频设备）").block(block),
            area,
        );
        return;
    }

    let lines = [(EqBand::Low, "低"), (EqBand::Mid, "中"), (EqBand::High, "高")]
        .into_iter()
        .map(|(band, label)| {
            let db = player.eq.band(band);
            let text = format!("{label} {} {db:+5.1} dB", eq_bar(db, 10));
            if band == selected {
                Line::from(Span::styled(text, Style::default().fg(Color::Yellow)))
            } else {
                Line::from(text)
            }
        })
        .collect::<Vec<_>>();

    f.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
}

pub(super) fn draw_queue(f: &mut Frame, area: Rect, player: &PlayerSnapshot) {
    let title = format!("队列（{}）", player.queue_len);
    let block = Block::default().borders(Borders::ALL).title(title);

    if player.queue.is_empty() {
        let text = if player.queue_len > 0 {
            format!("优先队列中有 {} 首", player.queue_len)
        } else {
            "队列为空，随机播放曲库".to_owned()
        };
        f.render_widget(Paragraph::new(text).block(block), area);
        return;
    }

    let title_width = (area.width as usize).saturating_sub(20).max(8);
    let items = player
        .queue
        .iter()
        .enumerate()
        .map(|(i, q)| {
            ListItem::new(format!(
                "{:>2}. {}  [{}]",
                i + 1,
                truncate_to_width(&q.title, title_width),
                q.category
            ))
        })
        .collect::<Vec<_>>();
    f.render_widget(List::new(items).block(block), area);
}
