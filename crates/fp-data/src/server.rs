//! Server-mode data exchange
//!
//! When the host grid's data lives server-side, option summaries arrive
//! with each response instead of being scanned locally, and the engine
//! contributes its selections to each outgoing request.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// One option summary returned by the server for a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerOption {
    /// Filter value as the server keys it
    pub value: String,

    /// Label to display
    pub label: String,

    /// Rows matching under the current server-side filters
    pub count: usize,

    /// Rows matching across the whole dataset
    pub total: usize,
}

/// Per-column option summaries carried on one server response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerData {
    /// Summaries keyed by column source name
    pub options: AHashMap<String, Vec<ServerOption>>,

    /// Total record count reported by the server
    pub table_length: usize,
}

/// Selected display values per column source, merged into the next
/// outgoing request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerPayload(pub AHashMap<String, Vec<String>>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_data_decodes_from_response_json() {
        let json = serde_json::json!({
            "options": {
                "office": [
                    { "value": "EDI", "label": "Edinburgh", "count": 4, "total": 9 }
                ]
            },
            "table_length": 57
        });
        let data: ServerData = serde_json::from_value(json).unwrap();
        assert_eq!(data.table_length, 57);
        assert_eq!(data.options["office"][0].label, "Edinburgh");
    }

    #[test]
    fn test_payload_serializes_as_bare_map() {
        let mut payload = ServerPayload::default();
        payload
            .0
            .insert("office".to_string(), vec!["Edinburgh".to_string()]);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["office"][0], "Edinburgh");
    }
}
