mod client;
mod config;
mod convert;
mod dto;
mod util;

pub use client::{CLIENT_ID_HEADER, LibraryUpdate, MediaUrls, RadioClient};
pub use config::{DEFAULT_SERVER, RadioClientConfig, default_data_dir};
pub use util::now_ms;
