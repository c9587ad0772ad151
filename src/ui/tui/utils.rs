use radio_ratui::domain::EqBands;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub(super) fn fmt_mmss(secs: f64) -> String {
    let total = if secs.is_finite() { secs.max(0.0) as u64 } else { 0 };
    format!("{:02}:{:02}", total / 60, total % 60)
}

pub(super) fn progress_bar_text(elapsed: f64, total: f64, width: usize) -> String {
    if total.is_nan() || total <= 0.0 {
        return format!("[{}]", "-".repeat(width));
    }
    let ratio = (elapsed / total).clamp(0.0, 1.0);
    let filled = ((ratio * width as f64).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

pub(super) fn vote_stars(vote: Option<u8>) -> String {
    let n = vote.unwrap_or(0).min(5) as usize;
    format!("{}{}", "★".repeat(n), "☆".repeat(5 - n))
}

/// -10..=10 dB 映射成居中的横条
pub(super) fn eq_bar(db: f32, half_width: usize) -> String {
    let span = (db.abs() / EqBands::MAX_DB * half_width as f32).round() as usize;
    let span = span.min(half_width);
    let (left, right) = if db < 0.0 {
        (
            format!("{}{}", " ".repeat(half_width - span), "=".repeat(span)),
            " ".repeat(half_width),
        )
    } else {
        (
            " ".repeat(half_width),
            format!("{}{}", "=".repeat(span), " ".repeat(half_width - span)),
        )
    };
    format!("{left}|{right}")
}

/// 按显示宽度截断（中日文字符占两格），超出时以 `…` 结尾
pub(super) fn truncate_to_width(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_owned();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}
