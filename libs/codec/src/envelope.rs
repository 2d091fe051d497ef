//! Invocation Envelope
//!
//! The only structure that crosses the bridge. A request envelope names the
//! operation and carries its arguments as parallel `argTypes`/`args` text
//! arrays; the reply is the same envelope with `result` filled in.
//!
//! ## Wire layout
//!
//! Fields are written in a fixed order, all integers little-endian:
//!
//! ```text
//! originName      u32 len + utf8
//! targetComponent u32 len + utf8
//! operation       u32 len + utf8
//! session         u32 len + utf8
//! argTypes        u32 count + N strings
//! args            u32 count + N strings
//! result          u32 count (0 = request, 1 = reply) + strings
//! ```
//!
//! `result` reuses the string-array primitive so that "absent" and "empty"
//! stay distinguishable.

use crate::constants::{MAX_ARRAY_LENGTH, MAX_STRING_LENGTH};
use crate::error::{CoercionError, DecodeError, EncodeError};
use crate::result::CallResult;
use crate::value::ArgValue;
use crate::wire::{write_string, write_string_array, WireReader};

/// Request/reply message exchanged between call proxy and stub
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    /// Logical name of the calling peer, informational only
    pub origin_name: String,
    /// Namespace of the remote operation set
    pub target_component: String,
    /// Registry name of the operation to invoke
    pub operation: String,
    /// Opaque correlation tag
    pub session: String,
    /// One type tag per argument
    pub arg_types: Vec<String>,
    /// Arguments in textual form
    pub args: Vec<String>,
    /// JSON-encoded [`CallResult`], reply leg only
    pub result: Option<String>,
}

impl Envelope {
    /// Build a request envelope from typed arguments
    pub fn request(
        origin_name: impl Into<String>,
        target_component: impl Into<String>,
        operation: impl Into<String>,
        session: impl Into<String>,
        args: &[ArgValue],
    ) -> Self {
        let (arg_types, args): (Vec<String>, Vec<String>) =
            args.iter().map(ArgValue::to_wire).unzip();
        Self {
            origin_name: origin_name.into(),
            target_component: target_component.into(),
            operation: operation.into(),
            session: session.into(),
            arg_types,
            args,
            result: None,
        }
    }

    pub fn is_reply(&self) -> bool {
        self.result.is_some()
    }

    /// Turn this request into its reply by attaching a result
    pub fn into_reply(mut self, result: &CallResult) -> Result<Self, EncodeError> {
        self.result = Some(result.to_json()?);
        Ok(self)
    }

    /// Decode the attached result, if any
    pub fn call_result(&self) -> Option<Result<CallResult, DecodeError>> {
        self.result.as_deref().map(CallResult::from_json)
    }

    /// Coerce every argument according to its paired type tag
    ///
    /// Fails on the first argument that cannot be coerced, reporting its
    /// position alongside the coercion error.
    pub fn typed_args(&self) -> Result<Vec<ArgValue>, (usize, CoercionError)> {
        self.arg_types
            .iter()
            .zip(&self.args)
            .enumerate()
            .map(|(i, (tag, text))| ArgValue::from_wire(tag, text).map_err(|e| (i, e)))
            .collect()
    }

    /// Check structural invariants before encoding
    pub fn validate(&self) -> Result<(), EncodeError> {
        if self.arg_types.len() != self.args.len() {
            return Err(EncodeError::ArityMismatch {
                types: self.arg_types.len(),
                values: self.args.len(),
            });
        }
        if self.args.len() > MAX_ARRAY_LENGTH {
            return Err(EncodeError::TooManyElements {
                field: "args",
                count: self.args.len(),
                limit: MAX_ARRAY_LENGTH,
            });
        }

        let scalars = [
            ("originName", &self.origin_name),
            ("targetComponent", &self.target_component),
            ("operation", &self.operation),
            ("session", &self.session),
        ];
        let arrays = self
            .arg_types
            .iter()
            .map(|s| ("argTypes", s))
            .chain(self.args.iter().map(|s| ("args", s)))
            .chain(self.result.iter().map(|s| ("result", s)));

        for (field, value) in scalars.into_iter().chain(arrays) {
            if value.len() > MAX_STRING_LENGTH {
                return Err(EncodeError::FieldTooLong {
                    field,
                    len: value.len(),
                    limit: MAX_STRING_LENGTH,
                });
            }
        }
        Ok(())
    }

    /// Serialize to the envelope wire layout
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        self.validate()?;

        let mut buffer = Vec::with_capacity(self.encoded_len_hint());
        // Writes into a Vec cannot fail
        let write = |buffer: &mut Vec<u8>| -> std::io::Result<()> {
            write_string(buffer, &self.origin_name)?;
            write_string(buffer, &self.target_component)?;
            write_string(buffer, &self.operation)?;
            write_string(buffer, &self.session)?;
            write_string_array(buffer, &self.arg_types)?;
            write_string_array(buffer, &self.args)?;
            match &self.result {
                Some(result) => write_string_array(buffer, &[result]),
                None => write_string_array::<&str>(buffer, &[]),
            }
        };
        write(&mut buffer).map_err(|e| EncodeError::ResultSerialization {
            reason: format!("envelope write failed: {}", e),
        })?;
        Ok(buffer)
    }

    /// Parse the envelope wire layout
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = WireReader::new(data);

        let origin_name = reader.read_string("originName")?;
        let target_component = reader.read_string("targetComponent")?;
        let operation = reader.read_string("operation")?;
        let session = reader.read_string("session")?;
        let arg_types = reader.read_string_array("argTypes")?;
        let args = reader.read_string_array("args")?;
        let mut result = reader.read_string_array("result")?;
        reader.finish("envelope")?;

        if arg_types.len() != args.len() {
            return Err(DecodeError::ArityMismatch {
                types: arg_types.len(),
                values: args.len(),
            });
        }
        if result.len() > 1 {
            return Err(DecodeError::length_out_of_range("result", result.len(), 1));
        }

        Ok(Self {
            origin_name,
            target_component,
            operation,
            session,
            arg_types,
            args,
            result: result.pop(),
        })
    }

    fn encoded_len_hint(&self) -> usize {
        let strings = [
            &self.origin_name,
            &self.target_component,
            &self.operation,
            &self.session,
        ]
        .into_iter()
        .chain(&self.arg_types)
        .chain(&self.args)
        .chain(&self.result);
        strings.map(|s| s.len() + 4).sum::<usize>() + 12
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Envelope {
        Envelope::request(
            "device-a",
            "kvStoreService",
            "kvPut",
            "session-1",
            &[
                ArgValue::from("key"),
                ArgValue::Float(f64::NEG_INFINITY),
                ArgValue::from("Float"),
            ],
        )
    }

    #[test]
    fn test_request_roundtrip() {
        let envelope = sample();
        let bytes = envelope.encode().unwrap();
        assert_eq!(Envelope::decode(&bytes).unwrap(), envelope);
        assert!(!envelope.is_reply());
    }

    #[test]
    fn test_empty_result_differs_from_absent() {
        let mut reply = sample();
        reply.result = Some(String::new());
        let decoded = Envelope::decode(&reply.encode().unwrap()).unwrap();
        assert_eq!(decoded.result, Some(String::new()));
        assert!(decoded.is_reply());
    }

    #[test]
    fn test_every_truncation_fails() {
        let mut reply = sample();
        reply.result = Some(r#"{"resultCode":true,"result":1}"#.to_string());
        let bytes = reply.encode().unwrap();
        for len in 0..bytes.len() {
            assert!(
                Envelope::decode(&bytes[..len]).is_err(),
                "prefix of {} bytes decoded",
                len
            );
        }
    }

    #[test]
    fn test_arity_mismatch_rejected_both_ways() {
        let mut envelope = sample();
        envelope.args.pop();
        assert!(matches!(
            envelope.encode(),
            Err(EncodeError::ArityMismatch { types: 3, values: 2 })
        ));

        // Hand-build a stream with mismatched arrays
        let mut bytes = Vec::new();
        for s in ["o", "c", "op", "s"] {
            write_string(&mut bytes, s).unwrap();
        }
        write_string_array(&mut bytes, &["string"]).unwrap();
        write_string_array::<&str>(&mut bytes, &[]).unwrap();
        write_string_array::<&str>(&mut bytes, &[]).unwrap();
        assert!(matches!(
            Envelope::decode(&bytes),
            Err(DecodeError::ArityMismatch { types: 1, values: 0 })
        ));
    }

    #[test]
    fn test_multiple_results_rejected() {
        let mut bytes = Vec::new();
        for s in ["o", "c", "op", "s"] {
            write_string(&mut bytes, s).unwrap();
        }
        write_string_array::<&str>(&mut bytes, &[]).unwrap();
        write_string_array::<&str>(&mut bytes, &[]).unwrap();
        write_string_array(&mut bytes, &["a", "b"]).unwrap();
        assert!(matches!(
            Envelope::decode(&bytes),
            Err(DecodeError::LengthOutOfRange { field: "result", .. })
        ));
    }

    #[test]
    fn test_typed_args_reports_position() {
        let mut envelope = sample();
        envelope.arg_types[1] = "Boolean".to_string();
        let (index, err) = envelope.typed_args().unwrap_err();
        assert_eq!(index, 1);
        assert_eq!(err.tag, "Boolean");
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(
            origin in ".{0,24}",
            component in ".{0,24}",
            operation in "[a-zA-Z]{0,16}",
            session in ".{0,24}",
            pairs in proptest::collection::vec((".{0,8}", ".{0,32}"), 0..8),
            result in proptest::option::of(".{0,64}"),
        ) {
            let (arg_types, args): (Vec<String>, Vec<String>) = pairs.into_iter().unzip();
            let envelope = Envelope {
                origin_name: origin,
                target_component: component,
                operation,
                session,
                arg_types,
                args,
                result,
            };
            let bytes = envelope.encode().unwrap();
            prop_assert_eq!(Envelope::decode(&bytes).unwrap(), envelope);
        }
    }
}
