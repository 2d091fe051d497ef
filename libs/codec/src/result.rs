//! Result payload carried in the reply envelope's `result` field
//!
//! ```json
//! { "resultCode": true,  "result": 1 }
//! { "resultCode": true,  "result": "V", "resultType": "string" }
//! { "resultCode": false, "result": -1, "error": { "kind": "operationNotFound", "message": "…" } }
//! ```
//!
//! `resultType` and `error` are optional extensions; peers that only read
//! `resultCode`/`result` keep working.

use crate::constants::{FAILURE_SENTINEL, SUCCESS_SENTINEL};
use crate::error::{CoercionError, DecodeError, EncodeError};
use crate::value::ArgValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a failed invocation, as reported by the stub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FaultKind {
    Decode,
    UnsupportedRequest,
    OperationNotFound,
    ArgumentCoercion,
    Handler,
    Timeout,
    /// Reported by peers that send no fault detail
    #[serde(other)]
    Unknown,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FaultKind::Decode => "decode",
            FaultKind::UnsupportedRequest => "unsupported request",
            FaultKind::OperationNotFound => "operation not found",
            FaultKind::ArgumentCoercion => "argument coercion",
            FaultKind::Handler => "handler",
            FaultKind::Timeout => "timeout",
            FaultKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Structured detail for a failed call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFault {
    pub kind: FaultKind,
    pub message: String,
}

/// JSON object stored in `Envelope::result`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResult {
    #[serde(rename = "resultCode")]
    pub result_code: bool,
    pub result: serde_json::Value,
    #[serde(rename = "resultType", default, skip_serializing_if = "Option::is_none")]
    pub result_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteFault>,
}

impl CallResult {
    /// Success without a return value
    pub fn success() -> Self {
        Self {
            result_code: true,
            result: SUCCESS_SENTINEL.into(),
            result_type: None,
            error: None,
        }
    }

    /// Success carrying a value in its textual wire form
    pub fn with_value(value: &ArgValue) -> Self {
        let (tag, text) = value.to_wire();
        Self {
            result_code: true,
            result: serde_json::Value::String(text),
            result_type: Some(tag),
            error: None,
        }
    }

    pub fn completed(value: Option<&ArgValue>) -> Self {
        value.map_or_else(Self::success, Self::with_value)
    }

    pub fn failure(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            result_code: false,
            result: FAILURE_SENTINEL.into(),
            result_type: None,
            error: Some(RemoteFault {
                kind,
                message: message.into(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result_code
    }

    /// Fault detail; peers without structured errors report `Unknown`
    pub fn fault(&self) -> Option<RemoteFault> {
        if self.result_code {
            return None;
        }
        Some(self.error.clone().unwrap_or_else(|| RemoteFault {
            kind: FaultKind::Unknown,
            message: format!("remote reported failure sentinel {}", self.result),
        }))
    }

    /// Typed return value of a successful call
    ///
    /// `Ok(None)` means the call succeeded with the bare success sentinel.
    pub fn value(&self) -> Result<Option<ArgValue>, CoercionError> {
        match &self.result_type {
            None => Ok(None),
            Some(tag) => {
                let text = match &self.result {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                ArgValue::from_wire(tag, &text).map(Some)
            }
        }
    }

    pub fn to_json(&self) -> Result<String, EncodeError> {
        serde_json::to_string(self).map_err(|e| EncodeError::ResultSerialization {
            reason: e.to_string(),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(json).map_err(|e| DecodeError::malformed_result(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_wire_shape() {
        let json = CallResult::success().to_json().unwrap();
        assert_eq!(json, r#"{"resultCode":true,"result":1}"#);
    }

    #[test]
    fn test_failure_wire_shape() {
        let json = CallResult::failure(FaultKind::OperationNotFound, "no such operation: x")
            .to_json()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["resultCode"], false);
        assert_eq!(value["result"], -1);
        assert_eq!(value["error"]["kind"], "operationNotFound");
    }

    #[test]
    fn test_legacy_failure_without_detail() {
        let result = CallResult::from_json(r#"{"resultCode":false,"result":-1}"#).unwrap();
        let fault = result.fault().unwrap();
        assert_eq!(fault.kind, FaultKind::Unknown);
        assert!(fault.message.contains("-1"));
    }

    #[test]
    fn test_unknown_fault_kind_from_newer_peer() {
        let result = CallResult::from_json(
            r#"{"resultCode":false,"result":-1,"error":{"kind":"quotaExceeded","message":"m"}}"#,
        )
        .unwrap();
        assert_eq!(result.fault().unwrap().kind, FaultKind::Unknown);
    }

    #[test]
    fn test_value_keeps_non_finite_numbers() {
        let result = CallResult::with_value(&ArgValue::Float(f64::NAN));
        let back = CallResult::from_json(&result.to_json().unwrap()).unwrap();
        assert!(back.value().unwrap().unwrap().as_f64().unwrap().is_nan());
    }

    #[test]
    fn test_sentinel_success_has_no_value() {
        assert_eq!(CallResult::success().value().unwrap(), None);
        assert!(CallResult::success().fault().is_none());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            CallResult::from_json("{not json"),
            Err(DecodeError::MalformedResult { .. })
        ));
        assert!(CallResult::from_json(r#"{"result":1}"#).is_err());
    }
}
