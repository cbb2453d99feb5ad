//! Wire protocol structures.
//!
//! JSON request/response bodies exchanged with the server message
//! endpoint. Field names are part of the interop contract with the
//! server-side renderer and must not drift.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::queue::Action;

/// Request body for one queue flush.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    pub id: String,
    pub data: Value,
    pub checksum: String,
    #[serde(rename = "actionQueue")]
    pub action_queue: Vec<Action>,
    /// Monotonically increasing per component; lets both sides detect
    /// and reject out-of-order responses.
    pub epoch: u64,
    pub hash: String,
}

/// Redirect instruction. `url` without `refresh` is a full navigation;
/// `url` with `refresh` is a history push; `hash` alone updates the
/// fragment only.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Redirect {
    pub url: Option<String>,
    #[serde(default)]
    pub refresh: bool,
    pub title: Option<String>,
    pub hash: Option<String>,
}

/// A scoped DOM update: one named subtree and its new markup. A bare
/// `target` matches either spelling (key attribute or element id).
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PartialFrame {
    pub id: Option<String>,
    pub key: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    pub dom: String,
}

/// Parent-component state piggybacked on a child response. Recursive:
/// a parent may itself have a parent.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ParentFrame {
    pub id: String,
    pub data: Option<Map<String, Value>>,
    pub dom: Option<String>,
    pub checksum: Option<String>,
    pub parent: Option<Box<ParentFrame>>,
}

/// Host-environment function invocation requested by the server.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HostCall {
    #[serde(rename = "fn")]
    pub function: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Updated polling configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PollUpdate {
    pub timing: Option<u64>,
    pub method: Option<String>,
    pub disable: Option<bool>,
}

/// Return value of the last server-side method call.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ReturnFrame {
    pub method: Option<String>,
    #[serde(default)]
    pub value: Value,
}

/// Response body from the message endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    pub data: Option<Map<String, Value>>,
    pub errors: Option<Map<String, Value>>,
    #[serde(rename = "return")]
    pub return_frame: Option<ReturnFrame>,
    pub redirect: Option<Redirect>,
    /// Full rerendered root markup.
    pub dom: Option<String>,
    #[serde(default)]
    pub partials: Vec<PartialFrame>,
    pub parent: Option<ParentFrame>,
    #[serde(default)]
    pub calls: Vec<HostCall>,
    pub poll: Option<PollUpdate>,
    pub checksum: Option<String>,
    pub hash: Option<String>,
    pub epoch: Option<u64>,
    /// Server-reported error; present means the response carries no
    /// applicable state.
    pub error: Option<String>,
    /// Server deferred processing - apply nothing.
    #[serde(default)]
    pub queued: bool,
}
