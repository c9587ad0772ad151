use super::dto::{QueueItemDto, StatusResp, TrackDto};
use crate::domain::{BroadcastState, EqBands, Lyrics, QueueEntry, StatusSnapshot};

pub fn to_snapshot(resp: StatusResp) -> StatusSnapshot {
    let playing = resp.playing.unwrap_or(resp.current_track.is_some());
    let queue = resp
        .queue
        .unwrap_or_default()
        .into_iter()
        .map(to_queue_entry)
        .collect::<Vec<_>>();
    let queue_len = resp.queue_len.unwrap_or(queue.len()).max(queue.len());

    StatusSnapshot {
        current: resp.current_track.map(|t| to_broadcast_state(t, playing)),
        queue,
        queue_len,
        listeners: resp.listeners.unwrap_or(0),
        user_vote: resp.user_vote.filter(|v| (1..=5).contains(v)),
    }
}

fn to_broadcast_state(t: TrackDto, playing: bool) -> BroadcastState {
    let eq = t
        .eq
        .map(|e| EqBands {
            low: e.low.unwrap_or(0.0),
            mid: e.mid.unwrap_or(0.0),
            high: e.high.unwrap_or(0.0),
        })
        .unwrap_or_default()
        .clamped();

    BroadcastState {
        title: t.title.unwrap_or_else(|| t.id.to_string()),
        category: t.category.unwrap_or_default(),
        filename: t.filename.unwrap_or_default(),
        duration: non_negative(t.duration),
        elapsed: non_negative(t.elapsed),
        trim_start: non_negative(t.trim_start),
        trim_end: non_negative(t.trim_end),
        volume: t
            .volume
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 1.0))
            .unwrap_or(1.0),
        eq,
        lyrics: Lyrics::from_raw(t.lyrics.as_deref()),
        playing,
        track_id: t.id,
    }
}

fn to_queue_entry(q: QueueItemDto) -> QueueEntry {
    QueueEntry {
        title: q.title.unwrap_or_else(|| q.id.to_string()),
        category: q.category.unwrap_or_default(),
        id: q.id,
    }
}

fn non_negative(v: Option<f64>) -> f64 {
    v.filter(|x| x.is_finite()).unwrap_or(0.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TrackId;

    fn parse(json: &str) -> StatusSnapshot {
        to_snapshot(serde_json::from_str(json).expect("status json"))
    }

    #[test]
    fn test_full_status() {
        let s = parse(
            r#"{
                "current_track": {
                    "id": "t1", "title": "Morning", "category": "Music",
                    "filename": "morning.mp3", "duration": 200.5, "elapsed": 12.25,
                    "trim_start": 3, "trim_end": 190, "volume": 0.8,
                    "eq": {"low": 2, "mid": -1, "high": 30},
                    "lyrics": "[00:01.00]hi"
                },
                "playing": true,
                "queue": [{"id": "t2", "title": "Next", "category": "Sermon"}],
                "listeners": 7,
                "user_vote": 4
            }"#,
        );
        let cur = s.current.expect("current");
        assert_eq!(cur.track_id, TrackId::from("t1"));
        assert_eq!(cur.filename, "morning.mp3");
        assert!((cur.target_position() - 15.25).abs() < 1e-9);
        assert_eq!(cur.eq.high, 10.0);
        assert!(matches!(cur.lyrics, Lyrics::Synced(_)));
        assert!(cur.playing);
        assert_eq!(s.queue.len(), 1);
        assert_eq!(s.queue_len, 1);
        assert_eq!(s.listeners, 7);
        assert_eq!(s.user_vote, Some(4));
    }

    #[test]
    fn test_legacy_status_shape() {
        let s = parse(
            r#"{"current": {"id": "abc", "title": "Old", "filename": "o.mp3",
                "duration": 60, "elapsed": 5, "start_time": 1700000000.0},
                "queue_len": 3, "schedule_len": 0, "server_time": 1700000005.0}"#,
        );
        let cur = s.current.expect("current");
        assert!(cur.playing);
        assert_eq!(cur.trim_start, 0.0);
        assert_eq!(cur.volume, 1.0);
        assert!(cur.eq.is_flat());
        assert_eq!(s.queue_len, 3);
        assert!(s.queue.is_empty());
    }

    #[test]
    fn test_null_track_and_bad_values() {
        let s = parse(r#"{"current_track": null, "playing": false, "user_vote": 9}"#);
        assert!(s.current.is_none());
        assert_eq!(s.user_vote, None);

        let s = parse(r#"{"current_track": {"id": 5, "elapsed": -3, "duration": null}}"#);
        let cur = s.current.expect("current");
        assert_eq!(cur.elapsed, 0.0);
        assert_eq!(cur.duration, 0.0);
        assert_eq!(cur.title, "5");
    }
}
