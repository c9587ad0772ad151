pub mod ids;
pub mod lyrics;
pub mod model;

pub use ids::TrackId;
pub use lyrics::{LyricLine, Lyrics, current_line_index, parse_lrc};
pub use model::{BroadcastState, EqBand, EqBands, QueueEntry, StatusSnapshot};
