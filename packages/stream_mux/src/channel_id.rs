use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one logical stream instance on a shared connection.
///
/// The id only has to be unique among concurrently live streams, but the
/// connection may fan out across processes through a clustering adapter, so
/// generation uses a v4 UUID: collision-resistant globally, not just within
/// one process.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wire name for this channel's chunk events: `stream:<id>:data`.
    pub fn data_event(&self) -> String {
        format!("stream:{}:data", self.0)
    }

    /// Wire name for this channel's completion event: `stream:<id>:end`.
    pub fn end_event(&self) -> String {
        format!("stream:{}:end", self.0)
    }
}

impl From<String> for ChannelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_do_not_collide() {
        let ids: HashSet<_> = (0..1000).map(|_| ChannelId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn derived_event_names_scope_by_id() {
        let id = ChannelId::from("abc123".to_string());
        assert_eq!(id.data_event(), "stream:abc123:data");
        assert_eq!(id.end_event(), "stream:abc123:end");
    }
}
