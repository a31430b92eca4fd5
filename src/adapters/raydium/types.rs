//! Transaction Subscription Wire Types
//!
//! JSON-RPC request builder and notification payloads for the RPC
//! websocket `transactionSubscribe` method with `jsonParsed` encoding.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::ports::chain_events::{ParsedInstruction, ParsedTxEvent};

/// Build the `transactionSubscribe` request for one program id.
pub fn subscribe_request(id: u64, program_id: &str, commitment: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "transactionSubscribe",
        "params": [
            {
                "failed": false,
                "accountInclude": [program_id]
            },
            {
                "commitment": commitment,
                "encoding": "jsonParsed",
                "transactionDetails": "full",
                "showRewards": false,
                "maxSupportedTransactionVersion": 0
            }
        ]
    })
}

/// JSON-RPC error object
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Reply to the subscription request
#[derive(Debug, Deserialize)]
pub struct SubscribeReply {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<RpcError>,
}

/// `transactionNotification` payload
#[derive(Debug, Deserialize)]
pub struct TransactionNotification {
    pub params: NotificationParams,
}

#[derive(Debug, Deserialize)]
pub struct NotificationParams {
    pub result: TransactionResult,
}

#[derive(Debug, Deserialize)]
pub struct TransactionResult {
    pub signature: String,
    pub transaction: TransactionEnvelope,
}

#[derive(Debug, Deserialize)]
pub struct TransactionEnvelope {
    pub meta: Option<TxMeta>,
    pub transaction: TxPayload,
}

#[derive(Debug, Deserialize)]
pub struct TxMeta {
    /// Non-null when the transaction failed on-chain
    pub err: Option<Value>,
    #[serde(rename = "logMessages", default)]
    pub log_messages: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TxPayload {
    pub message: TxMessage,
}

#[derive(Debug, Deserialize)]
pub struct TxMessage {
    #[serde(default)]
    pub instructions: Vec<RawInstruction>,
}

/// One instruction as delivered by `jsonParsed` encoding. Programs the
/// node cannot decode arrive "partially decoded": a program id plus the
/// ordered account list, which is all the pool decoder needs. Fully
/// parsed instructions (spl-token etc.) carry no `accounts` array and
/// deserialize with an empty one.
#[derive(Debug, Deserialize)]
pub struct RawInstruction {
    #[serde(rename = "programId")]
    pub program_id: Option<String>,
    #[serde(default)]
    pub accounts: Vec<String>,
}

impl TransactionResult {
    /// Flatten the notification into the event the detector consumes.
    pub fn into_event(self) -> ParsedTxEvent {
        let (failed, logs) = match self.transaction.meta {
            Some(meta) => (meta.err.is_some(), meta.log_messages),
            None => (false, Vec::new()),
        };

        let instructions = self
            .transaction
            .transaction
            .message
            .instructions
            .into_iter()
            .filter_map(|ix| {
                ix.program_id.map(|program_id| ParsedInstruction {
                    program_id,
                    accounts: ix.accounts,
                })
            })
            .collect();

        ParsedTxEvent {
            signature: self.signature,
            failed,
            instructions,
            logs,
        }
    }
}

/// Parse one websocket text frame. Non-notification frames (subscription
/// confirmations, pings encoded as text) yield `None`.
pub fn parse_notification(text: &str) -> Result<Option<ParsedTxEvent>, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    if value.get("method").and_then(Value::as_str) != Some("transactionNotification") {
        return Ok(None);
    }

    let notification: TransactionNotification = serde_json::from_value(value)?;
    Ok(Some(notification.params.result.into_event()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_request_shape() {
        let req = subscribe_request(1, "Prog111", "confirmed");
        assert_eq!(req["method"], "transactionSubscribe");
        assert_eq!(req["params"][0]["accountInclude"][0], "Prog111");
        assert_eq!(req["params"][1]["encoding"], "jsonParsed");
        assert_eq!(req["params"][1]["commitment"], "confirmed");
    }

    #[test]
    fn test_parse_notification() {
        let text = r#"{
            "jsonrpc": "2.0",
            "method": "transactionNotification",
            "params": {
                "subscription": 42,
                "result": {
                    "signature": "sig123",
                    "transaction": {
                        "meta": {
                            "err": null,
                            "logMessages": ["Program log: initialize2: InitializeInstruction2"]
                        },
                        "transaction": {
                            "message": {
                                "instructions": [
                                    {
                                        "programId": "Prog111",
                                        "accounts": ["a", "b", "c"],
                                        "data": "3Bxs4h24hBtQy9rw"
                                    },
                                    {
                                        "program": "spl-token",
                                        "programId": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
                                        "parsed": {"type": "transfer"}
                                    }
                                ]
                            }
                        }
                    }
                }
            }
        }"#;

        let event = parse_notification(text).unwrap().unwrap();
        assert_eq!(event.signature, "sig123");
        assert!(!event.failed);
        assert_eq!(event.instructions.len(), 2);
        assert_eq!(event.instructions[0].program_id, "Prog111");
        assert_eq!(event.instructions[0].accounts, vec!["a", "b", "c"]);
        assert!(event.instructions[1].accounts.is_empty());
        assert_eq!(event.logs.len(), 1);
    }

    #[test]
    fn test_failed_transaction_flagged() {
        let text = r#"{
            "jsonrpc": "2.0",
            "method": "transactionNotification",
            "params": {
                "subscription": 42,
                "result": {
                    "signature": "sig456",
                    "transaction": {
                        "meta": {"err": {"InstructionError": [2, "Custom"]}, "logMessages": []},
                        "transaction": {"message": {"instructions": []}}
                    }
                }
            }
        }"#;

        let event = parse_notification(text).unwrap().unwrap();
        assert!(event.failed);
    }

    #[test]
    fn test_non_notification_skipped() {
        let text = r#"{"jsonrpc": "2.0", "id": 1, "result": 42}"#;
        assert!(parse_notification(text).unwrap().is_none());
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(parse_notification("not json at all").is_err());
    }
}
