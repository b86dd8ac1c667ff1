//! Per-request context handed to the deterministic layer.

use serde::{Deserialize, Serialize};

use crate::command::View;

/// Caller-supplied request context. The router only forwards it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteContext {
    /// Chat session the message belongs to.
    #[serde(default)]
    pub session_id: Option<String>,
    /// BCP 47 language tag reported by the client, if any.
    #[serde(default)]
    pub locale: Option<String>,
    /// View the user is looking at when the message was sent.
    #[serde(default)]
    pub active_view: Option<View>,
}

impl RouteContext {
    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Self::default()
        }
    }
}
