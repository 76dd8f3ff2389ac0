//! JSON-RPC 2.0 wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC request ID: string, number or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    Number(u64),
    String(String),
    Null,
}

impl std::fmt::Display for RpcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
    pub id: RpcId,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id: RpcId::Number(id),
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RpcId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// The result value (`null` when absent) or the node's error object.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Payload of an `eth_subscription` notification.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionParams {
    pub subscription: String,
    pub result: Value,
}

/// An `eth_subscription` push message from the node.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionNotification {
    pub method: String,
    pub params: SubscriptionParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialization() {
        let req = JsonRpcRequest::new(7, "eth_getBlockByHash", vec![Value::String("0xab".into()), Value::Bool(true)]);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 7);
        assert_eq!(json["params"][1], true);
    }

    #[test]
    fn response_error_wins() {
        let resp: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"header not found"}}"#,
        )
        .unwrap();
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.code, -32000);
        assert_eq!(err.to_string(), "JSON-RPC error -32000: header not found");
    }

    #[test]
    fn null_result_is_null() {
        let resp: JsonRpcResponse = serde_json::from_str(r#"{"jsonrpc":"2.0","id":"a","result":null}"#).unwrap();
        assert_eq!(resp.id, RpcId::String("a".into()));
        assert!(resp.into_result().unwrap().is_null());
    }

    #[test]
    fn subscription_notification() {
        let n: SubscriptionNotification = serde_json::from_str(
            r#"{"jsonrpc":"2.0","method":"eth_subscription","params":{"subscription":"0x9c","result":{"number":"0x1b4"}}}"#,
        )
        .unwrap();
        assert_eq!(n.method, "eth_subscription");
        assert_eq!(n.params.subscription, "0x9c");
        assert_eq!(n.params.result["number"], "0x1b4");
    }
}
