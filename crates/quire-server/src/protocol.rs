//! Messages the server sends to connected clients.

use quire_core::{Operation, Selection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier for a connected client.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the server remembers about a participant.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
}

/// The full document state handed to a joining client, or pushed to a client
/// whose edit could not be accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocSnapshot {
    #[serde(rename = "str")]
    pub text: String,
    pub revision: usize,
    pub clients: BTreeMap<ClientId, UserRecord>,
    /// Set when the client must discard its local state and reload.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub force: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Doc(DocSnapshot),
    /// The recipient's outstanding edit was accepted as `revision`.
    Ack { revision: usize },
    /// Another client's edit, accepted as `revision`.
    Operation {
        client_id: ClientId,
        revision: usize,
        operation: Operation,
        selection: Option<Selection>,
    },
    /// Missed history requested after a stale acknowledgement.
    Operations {
        head: usize,
        operations: Vec<Operation>,
    },
    Selection {
        client_id: ClientId,
        selection: Option<Selection>,
    },
    SetName { client_id: ClientId, name: String },
    SetColor { client_id: ClientId, color: String },
    ClientLeft { client_id: ClientId },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_message_wire_shape() {
        let message = ServerMessage::Operation {
            client_id: ClientId::new("c1"),
            revision: 4,
            operation: Operation::new().retain(2).insert("x").delete(1),
            selection: Some(Selection::create_cursor(3)),
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "type": "operation",
                "client_id": "c1",
                "revision": 4,
                "operation": [2, "x", -1],
                "selection": { "ranges": [{ "anchor": 3, "head": 3 }] }
            })
        );
    }

    #[test]
    fn test_doc_snapshot_round_trip() {
        let mut clients = BTreeMap::new();
        clients.insert(
            ClientId::new("c1"),
            UserRecord {
                name: Some("Ann".into()),
                ..Default::default()
            },
        );
        let message = ServerMessage::Doc(DocSnapshot {
            text: "lorem".into(),
            revision: 2,
            clients,
            force: false,
        });
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["str"], json!("lorem"));
        assert!(value.get("force").is_none());
        let decoded: ServerMessage = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, message);
    }
}
