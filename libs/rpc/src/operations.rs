//! Key-value remote operations
//!
//! Operation names and argument vocabularies shared by the test service that
//! registers them and the [`KvRemote`] client that calls them.

use crate::{BridgeError, CallProxy, Result};
use bridge_codec::{ArgValue, DecodeError, MIN_NUMBER};
use std::fmt;
use std::str::FromStr;

/// Component name the key-value operations are served under
pub const KV_STORE_COMPONENT: &str = "kvStoreService";

pub const CREATE_KV_MANAGER: &str = "createKvManager";
pub const GET_KV_STORE: &str = "getKvStore";
pub const CLOSE_KV_STORE: &str = "closeKvStore";
pub const DELETE_KV_STORE: &str = "deleteKvStore";
pub const KV_PUT: &str = "kvPut";
pub const KV_GET: &str = "kvGet";
pub const KV_DELETE: &str = "kvDelete";
pub const KV_SYNC: &str = "kvSync";

/// Every key-value operation name
pub const KV_OPERATIONS: [&str; 8] = [
    CREATE_KV_MANAGER,
    GET_KV_STORE,
    CLOSE_KV_STORE,
    DELETE_KV_STORE,
    KV_PUT,
    KV_GET,
    KV_DELETE,
    KV_SYNC,
];

/// Parse failure for one of the vocabularies below
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownVariant { kind: $kind, value: s.to_string() }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(
    /// Store security level
    SecurityLevel, "security level", {
        NoLevel => "NO_LEVEL",
        S0 => "S0",
        S1 => "S1",
        S2 => "S2",
        S3 => "S3",
        S4 => "S4",
    }
);

string_enum!(
    /// Declared type of a stored value
    KvValueType, "value type", {
        String => "String",
        Int => "Int",
        Float => "Float",
        ByteArray => "ByteArray",
        Boolean => "Boolean",
        Number => "Number",
        NumberMin => "Number_Min",
    }
);

string_enum!(
    /// Direction of a sync request
    SyncMode, "sync mode", {
        PullOnly => "PULL_ONLY",
        PushOnly => "PUSH_ONLY",
        PushPull => "PUSH_PULL",
    }
);

impl KvValueType {
    /// Exact value type of an argument's variant; never `Number` or `NumberMin`
    pub fn of(value: &ArgValue) -> Self {
        match value {
            ArgValue::Str(_) => KvValueType::String,
            ArgValue::Int(_) => KvValueType::Int,
            ArgValue::Float(_) => KvValueType::Float,
            ArgValue::Bytes(_) => KvValueType::ByteArray,
            ArgValue::Bool(_) => KvValueType::Boolean,
        }
    }

    /// `Number` accepts any integer or number; `NumberMin` only `MIN_NUMBER`
    pub fn matches(self, value: &ArgValue) -> bool {
        match (self, value) {
            (KvValueType::Number, ArgValue::Int(_) | ArgValue::Float(_)) => true,
            (KvValueType::NumberMin, ArgValue::Float(v)) => v.to_bits() == MIN_NUMBER.to_bits(),
            _ => Self::of(value) == self,
        }
    }
}

/// Typed client for the key-value operations
#[derive(Debug, Clone)]
pub struct KvRemote {
    proxy: CallProxy,
}

impl KvRemote {
    pub fn new(proxy: CallProxy) -> Self {
        Self { proxy }
    }

    pub fn proxy(&self) -> &CallProxy {
        &self.proxy
    }

    pub async fn create_kv_manager(&self, bundle_name: &str) -> Result<()> {
        self.done(CREATE_KV_MANAGER, &[bundle_name.into()]).await
    }

    /// Create the manager under the service's default bundle name
    pub async fn create_default_kv_manager(&self) -> Result<()> {
        self.done(CREATE_KV_MANAGER, &[]).await
    }

    pub async fn get_kv_store(
        &self,
        store_id: &str,
        security_level: SecurityLevel,
        encrypt: bool,
    ) -> Result<()> {
        self.done(
            GET_KV_STORE,
            &[
                store_id.into(),
                security_level.as_str().into(),
                encrypt.into(),
            ],
        )
        .await
    }

    pub async fn close_kv_store(&self, store_id: &str) -> Result<()> {
        self.done(CLOSE_KV_STORE, &[store_id.into()]).await
    }

    pub async fn delete_kv_store(&self, store_id: &str) -> Result<()> {
        self.done(DELETE_KV_STORE, &[store_id.into()]).await
    }

    /// Store `value` under `key`; the value type is derived from the variant
    pub async fn put(&self, key: &str, value: impl Into<ArgValue>) -> Result<()> {
        let value = value.into();
        let value_type = KvValueType::of(&value);
        self.put_as(key, value, value_type).await
    }

    /// Store `value` under `key` with an explicit declared type
    pub async fn put_as(
        &self,
        key: &str,
        value: impl Into<ArgValue>,
        value_type: KvValueType,
    ) -> Result<()> {
        self.done(KV_PUT, &[key.into(), value.into(), value_type.as_str().into()])
            .await
    }

    /// Fetch the value stored under `key`
    pub async fn get(&self, key: &str) -> Result<ArgValue> {
        self.proxy
            .call(KV_GET, &[key.into()])
            .await?
            .ok_or_else(|| {
                BridgeError::Decode(DecodeError::malformed_result(format!(
                    "{} returned no value",
                    KV_GET
                )))
            })
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        self.done(KV_DELETE, &[key.into()]).await
    }

    /// Request a sync with `device_ids`
    pub async fn sync(&self, device_ids: &[&str], mode: SyncMode) -> Result<()> {
        self.done(
            KV_SYNC,
            &[device_ids.join(",").into(), mode.as_str().into()],
        )
        .await
    }

    async fn done(&self, operation: &str, args: &[ArgValue]) -> Result<()> {
        self.proxy.call(operation, args).await.map(|_| ())
    }
}
