//! Upload session metadata.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::totals::ReportTotals;

/// Opaque key/value bag attached to a session by callers, e.g. the parent
/// commit a carryforward was derived from.
pub type SessionExtras = BTreeMap<String, serde_json::Value>;

/// Lifecycle state of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Uploaded,
    Processed,
    Carriedforward,
}

/// Metadata for one coverage upload (one CI job, typically).
///
/// The session id is not stored here; ids are assigned by the owning
/// report's registry when the session is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub name: Option<String>,
    pub flags: BTreeSet<String>,
    pub state: SessionState,
    pub provider: Option<String>,
    pub build: Option<String>,
    pub job: Option<String>,
    pub url: Option<String>,
    /// Upload time, epoch seconds.
    pub time: Option<i64>,
    /// Totals as computed when the upload was processed, if recorded.
    pub totals: Option<ReportTotals>,
    pub extras: SessionExtras,
}

impl Session {
    /// A freshly uploaded session carrying the given flags, stamped now.
    #[must_use]
    pub fn new<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Session {
            name: None,
            flags: flags.into_iter().map(Into::into).collect(),
            state: SessionState::Uploaded,
            provider: None,
            build: None,
            job: None,
            url: None,
            time: Some(Utc::now().timestamp()),
            totals: None,
            extras: SessionExtras::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_defaults() {
        let session = Session::new(["unit"]);
        assert_eq!(session.state, SessionState::Uploaded);
        assert!(session.flags.contains("unit"));
        assert!(session.time.is_some());
        assert!(session.extras.is_empty());
    }

    #[test]
    fn test_state_wire_names() {
        assert_eq!(
            serde_json::to_value(SessionState::Carriedforward).unwrap(),
            serde_json::json!("carriedforward")
        );
        assert_eq!(
            serde_json::to_value(SessionState::Uploaded).unwrap(),
            serde_json::json!("uploaded")
        );
    }
}
