use rand::RngCore;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn generate_client_id() -> String {
    const HEX: &[u8] = b"0123456789ABCDEF";
    let mut rng = rand::thread_rng();
    let mut out = String::with_capacity(52);
    for _ in 0..52 {
        let idx = (rng.next_u32() as usize) % HEX.len();
        out.push(HEX[idx] as char);
    }
    out
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// 追加 `t=<ms>`，避免客户端/代理缓存同一 URL 背后已经换掉的内容
pub fn cache_bust(url: &str) -> String {
    cache_bust_with(url, now_ms())
}

fn cache_bust_with(url: &str, stamp: u64) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}t={stamp}")
}
