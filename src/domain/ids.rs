use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// 服务端媒体库里的曲目 ID。
///
/// 服务端目前下发字符串 id，旧数据里也出现过纯数字 id，两种都接受，统一按字符串比较。
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(v: &str) -> Self {
        Self(v.to_owned())
    }
}

impl<'de> Deserialize<'de> for TrackId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Int(i64),
            Float(f64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => TrackId(s),
            RawId::Int(n) => TrackId(n.to_string()),
            RawId::Float(n) => TrackId(n.to_string()),
        })
    }
}
