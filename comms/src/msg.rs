use std::fmt;

use serde_json::Value;

/// The ingestion pipeline a submission is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    Training,
    Inference,
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKind::Training => write!(f, "training"),
            FeedKind::Inference => write!(f, "inference"),
        }
    }
}

/// The application layer request for the entire system.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Request {
    /// One sensor record addressed to a feed. `data` carries the record as
    /// parsed JSON; a submission without it is answered with a nack.
    Submit {
        feed: FeedKind,
        #[serde(default)]
        data: Option<Value>,
    },
}

/// Boundary acknowledgement, `{"status-code": 0}` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Response {
    #[serde(rename = "status-code")]
    pub status_code: i32,
}

impl Response {
    /// The submission was queued. Queued, not yet validated or persisted.
    pub const ACK: Self = Self { status_code: 0 };

    /// The submission could not be queued.
    pub const NACK: Self = Self { status_code: -1 };

    pub fn is_ack(&self) -> bool {
        self.status_code == 0
    }
}
