//! 带时间戳歌词（`[mm:ss.xx]text`）

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LyricLine {
    pub time_ms: u64,
    pub text: String,
}

impl LyricLine {
    pub fn time_secs(&self) -> f64 {
        self.time_ms as f64 / 1000.0
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum Lyrics {
    #[default]
    None,
    Synced(Vec<LyricLine>),
    /// 没有任何可解析的时间戳时，按原文展示
    Unsynced(String),
}

impl Lyrics {
    pub fn from_raw(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Lyrics::None;
        };
        let lines = parse_lrc(raw);
        if lines.is_empty() {
            tracing::debug!(len = raw.len(), "歌词没有可用时间戳，按纯文本展示");
            Lyrics::Unsynced(raw.to_owned())
        } else {
            Lyrics::Synced(lines)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Lyrics::None)
    }
}

/// 解析 LRC 文本，按时间升序返回。
///
/// 没有合法时间戳的行（包括 `[ar:xxx]` 这类元信息）直接丢弃；
/// 一行多个时间戳时每个时间点各生成一条。
pub fn parse_lrc(text: &str) -> Vec<LyricLine> {
    let mut out = Vec::new();

    for line in text.lines() {
        let mut rest = line.trim();
        if rest.is_empty() {
            continue;
        }

        let mut times = Vec::new();
        while let Some(stripped) = rest.strip_prefix('[') {
            let Some(end) = stripped.find(']') else {
                break;
            };
            let tag = &stripped[..end];
            rest = &stripped[end + 1..];
            if let Some(t) = parse_timestamp_ms(tag) {
                times.push(t);
            }
        }

        let content = rest.trim();
        for time_ms in times {
            out.push(LyricLine {
                time_ms,
                text: content.to_owned(),
            });
        }
    }

    // stable: 同一时间点保持原始顺序
    out.sort_by_key(|l| l.time_ms);
    out
}

/// 当前应高亮的行
pub fn current_line_index(lines: &[LyricLine], position_ms: u64) -> Option<usize> {
    if lines.is_empty() {
        return None;
    }
    match lines.binary_search_by_key(&position_ms, |l| l.time_ms) {
        Ok(mut i) => {
            // 同一时间点有多行时取最后一行
            while i + 1 < lines.len() && lines[i + 1].time_ms == position_ms {
                i += 1;
            }
            Some(i)
        }
        Err(0) => None,
        Err(i) => Some(i - 1),
    }
}

fn parse_timestamp_ms(tag: &str) -> Option<u64> {
    // mm:ss, mm:ss.x, mm:ss.xx, mm:ss.xxx
    let (mm, rest) = tag.split_once(':')?;
    let mm: u64 = mm.trim().parse().ok()?;
    let (ss, frac) = rest.split_once('.').unwrap_or((rest, ""));
    let ss: u64 = ss.trim().parse().ok()?;
    if ss >= 60 {
        return None;
    }
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let digits = &frac[..frac.len().min(3)];
    let frac_ms = match digits.len() {
        0 => 0,
        1 => digits.parse::<u64>().ok()? * 100,
        2 => digits.parse::<u64>().ok()? * 10,
        _ => digits.parse::<u64>().ok()?,
    };
    Some(mm * 60_000 + ss * 1_000 + frac_ms)
}
