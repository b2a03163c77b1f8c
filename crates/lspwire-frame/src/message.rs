//! JSON-RPC 2.0 message model.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version carried in every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// Caller-chosen request identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(i64),
    String(String),
    /// Only valid on error responses to requests whose id was unreadable.
    Null,
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Id {
    fn from(value: i32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Null => f.write_str("null"),
        }
    }
}

/// Structured fault carried by an error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A call that expects a response.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: Id,
    pub method: String,
    pub params: Option<Value>,
}

/// A call that expects no response.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub method: String,
    pub params: Option<Value>,
}

/// The answer to exactly one request: a result or a fault, never both.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: Id,
    pub outcome: std::result::Result<Value, ErrorObject>,
}

/// One decoded JSON-RPC 2.0 message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Notification(Notification),
    Response(Response),
}

impl Message {
    pub fn request(id: impl Into<Id>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self::Request(Request {
            id: id.into(),
            method: method.into(),
            params,
        })
    }

    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self::Notification(Notification {
            method: method.into(),
            params,
        })
    }

    pub fn result(id: impl Into<Id>, result: Value) -> Self {
        Self::Response(Response {
            id: id.into(),
            outcome: Ok(result),
        })
    }

    pub fn error(id: impl Into<Id>, error: ErrorObject) -> Self {
        Self::Response(Response {
            id: id.into(),
            outcome: Err(error),
        })
    }

    /// Method name for requests and notifications.
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(req) => Some(&req.method),
            Self::Notification(note) => Some(&note.method),
            Self::Response(_) => None,
        }
    }

    /// Request or response id.
    pub fn id(&self) -> Option<&Id> {
        match self {
            Self::Request(req) => Some(&req.id),
            Self::Response(resp) => Some(&resp.id),
            Self::Notification(_) => None,
        }
    }

    /// Short label used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Notification(_) => "notification",
            Self::Response(Response { outcome: Ok(_), .. }) => "result",
            Self::Response(Response {
                outcome: Err(_), ..
            }) => "error",
        }
    }
}

#[derive(Serialize)]
struct WireOut<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a ErrorObject>,
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut wire = WireOut {
            jsonrpc: JSONRPC_VERSION,
            id: None,
            method: None,
            params: None,
            result: None,
            error: None,
        };
        match self {
            Self::Request(req) => {
                wire.id = Some(&req.id);
                wire.method = Some(&req.method);
                wire.params = req.params.as_ref();
            }
            Self::Notification(note) => {
                wire.method = Some(&note.method);
                wire.params = note.params.as_ref();
            }
            Self::Response(resp) => {
                wire.id = Some(&resp.id);
                match &resp.outcome {
                    Ok(result) => wire.result = Some(result),
                    Err(error) => wire.error = Some(error),
                }
            }
        }
        wire.serialize(serializer)
    }
}

/// Distinguishes an explicit `null` member from an absent one.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
struct WireIn {
    jsonrpc: String,
    #[serde(default, deserialize_with = "present")]
    id: Option<Id>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ErrorObject>,
}

impl TryFrom<WireIn> for Message {
    type Error = String;

    fn try_from(wire: WireIn) -> std::result::Result<Self, Self::Error> {
        if wire.jsonrpc != JSONRPC_VERSION {
            return Err(format!("unsupported jsonrpc version {:?}", wire.jsonrpc));
        }

        if let Some(method) = wire.method {
            if wire.result.is_some() || wire.error.is_some() {
                return Err(format!("call to {method:?} carries a result or error"));
            }
            return Ok(match wire.id {
                Some(id) => Self::Request(Request {
                    id,
                    method,
                    params: wire.params,
                }),
                None => Self::Notification(Notification {
                    method,
                    params: wire.params,
                }),
            });
        }

        let id = wire
            .id
            .ok_or_else(|| "response without id".to_string())?;
        let outcome = match (wire.result, wire.error) {
            (Some(result), None) => Ok(result),
            (None, Some(error)) => Err(error),
            (Some(_), Some(_)) => return Err(format!("response {id} has both result and error")),
            (None, None) => return Err(format!("response {id} has neither result nor error")),
        };
        Ok(Self::Response(Response { id, outcome }))
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let wire = WireIn::deserialize(deserializer)?;
        Message::try_from(wire).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_member_order() {
        let msg = Message::request(1, "add", Some(json!([2, 3])));
        let text = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            text,
            r#"{"jsonrpc":"2.0","id":1,"method":"add","params":[2,3]}"#
        );
    }

    #[test]
    fn notification_omits_id_and_absent_params() {
        let msg = Message::notification("initialized", None);
        let text = serde_json::to_string(&msg).unwrap();
        assert_eq!(text, r#"{"jsonrpc":"2.0","method":"initialized"}"#);
    }

    #[test]
    fn result_response_member_order() {
        let text = serde_json::to_string(&Message::result(1, json!(5))).unwrap();
        assert_eq!(text, r#"{"jsonrpc":"2.0","id":1,"result":5}"#);

        let text = serde_json::to_string(&Message::result("a", Value::Null)).unwrap();
        assert_eq!(text, r#"{"jsonrpc":"2.0","id":"a","result":null}"#);
    }

    #[test]
    fn error_response_serialization() {
        let msg = Message::error(Id::Null, ErrorObject::new(-32700, "Parse error"));
        let text = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            text,
            r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32700,"message":"Parse error"}}"#
        );
    }

    #[test]
    fn decodes_each_variant() {
        let req: Message =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"x","method":"m","params":{"a":1}}"#)
                .unwrap();
        assert_eq!(req, Message::request("x", "m", Some(json!({"a": 1}))));

        let note: Message = serde_json::from_str(r#"{"jsonrpc":"2.0","method":"n"}"#).unwrap();
        assert_eq!(note, Message::notification("n", None));

        let resp: Message =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":7,"result":null}"#).unwrap();
        assert_eq!(resp, Message::result(7, Value::Null));

        let err: Message = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":7,"error":{"code":1,"message":"m","data":[1]}}"#,
        )
        .unwrap();
        assert_eq!(
            err,
            Message::error(7, ErrorObject::new(1, "m").with_data(json!([1])))
        );
    }

    #[test]
    fn rejects_result_and_error_together() {
        let err = serde_json::from_str::<Message>(
            r#"{"jsonrpc":"2.0","id":1,"result":1,"error":{"code":1,"message":"m"}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("both result and error"));
    }

    #[test]
    fn rejects_wrong_version_and_empty_response() {
        assert!(serde_json::from_str::<Message>(r#"{"jsonrpc":"1.0","method":"m"}"#).is_err());
        assert!(serde_json::from_str::<Message>(r#"{"jsonrpc":"2.0","id":1}"#).is_err());
        assert!(serde_json::from_str::<Message>(r#"{"jsonrpc":"2.0","result":1}"#).is_err());
    }

    #[test]
    fn accessors() {
        let msg = Message::request(3, "m", None);
        assert_eq!(msg.method(), Some("m"));
        assert_eq!(msg.id(), Some(&Id::Number(3)));
        assert_eq!(msg.kind(), "request");
        assert_eq!(Message::notification("n", None).id(), None);
        assert_eq!(Id::from("abc").to_string(), "\"abc\"");
    }
}
