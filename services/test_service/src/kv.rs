//! In-memory key-value context
//!
//! Stands in for the platform key-value store on the service side. The
//! context owns the manager, the open store handle and every store's data;
//! handlers reach it only through the `Arc<KvContext>` the invoker passes in.

use anyhow::{bail, ensure, Context, Result};
use bridge_codec::ArgValue;
use bridge_rpc::operations::{
    CLOSE_KV_STORE, CREATE_KV_MANAGER, DELETE_KV_STORE, GET_KV_STORE, KV_DELETE, KV_GET, KV_PUT,
    KV_SYNC,
};
use bridge_rpc::{Args, KvValueType, Registry, RegistryBuilder, SecurityLevel, SyncMode};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Bundle the manager is created for when `createKvManager` gets no name
pub const DEFAULT_BUNDLE_NAME: &str = "com.example.kvstore";

/// Longest accepted store id, in bytes
pub const MAX_STORE_ID_LENGTH: usize = 128;

/// Longest accepted key, in bytes
pub const MAX_KEY_LENGTH: usize = 896;

/// Handle of the currently open store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenStore {
    pub store_id: String,
    pub security_level: SecurityLevel,
    pub encrypt: bool,
}

/// One recorded `kvSync` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub store_id: String,
    pub device_ids: Vec<String>,
    pub mode: SyncMode,
}

#[derive(Debug, Default)]
struct KvState {
    bundle_name: Option<String>,
    stores: HashMap<String, HashMap<String, ArgValue>>,
    open: Option<OpenStore>,
    syncs: Vec<SyncRequest>,
}

impl KvState {
    fn require_manager(&self) -> Result<()> {
        ensure!(
            self.bundle_name.is_some(),
            "no KV manager; call {} first",
            CREATE_KV_MANAGER
        );
        Ok(())
    }

    fn open_store_id(&self) -> Result<String> {
        self.open
            .as_ref()
            .map(|open| open.store_id.clone())
            .with_context(|| format!("no KV store is open; call {} first", GET_KV_STORE))
    }

    fn open_data(&mut self) -> Result<&mut HashMap<String, ArgValue>> {
        let store_id = self.open_store_id()?;
        Ok(self.stores.entry(store_id).or_default())
    }
}

/// Server-side state shared by all key-value handlers
#[derive(Debug, Default)]
pub struct KvContext {
    state: Mutex<KvState>,
}

impl KvContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_manager(&self, bundle_name: &str) -> Result<()> {
        ensure!(!bundle_name.is_empty(), "bundle name must not be empty");
        self.state.lock().bundle_name = Some(bundle_name.to_string());
        info!("KV manager created for bundle {}", bundle_name);
        Ok(())
    }

    /// Open (creating if needed) a store; it replaces any open handle
    pub fn get_store(&self, store_id: &str, security_level: &str, encrypt: bool) -> Result<()> {
        validate_store_id(store_id)?;
        let security_level: SecurityLevel = security_level.parse()?;

        let mut state = self.state.lock();
        state.require_manager()?;
        state.stores.entry(store_id.to_string()).or_default();
        state.open = Some(OpenStore {
            store_id: store_id.to_string(),
            security_level,
            encrypt,
        });
        info!(
            "KV store {} open (level {}, encrypt {})",
            store_id, security_level, encrypt
        );
        Ok(())
    }

    pub fn close_store(&self, store_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.require_manager()?;
        let is_open = state
            .open
            .as_ref()
            .is_some_and(|open| open.store_id == store_id);
        ensure!(is_open, "KV store {} is not open", store_id);
        state.open = None;
        debug!("KV store {} closed", store_id);
        Ok(())
    }

    /// Delete a closed store and its data
    pub fn delete_store(&self, store_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.require_manager()?;
        if state.open.as_ref().is_some_and(|open| open.store_id == store_id) {
            bail!("KV store {} is still open", store_id);
        }
        ensure!(
            state.stores.remove(store_id).is_some(),
            "KV store {} does not exist",
            store_id
        );
        info!("KV store {} deleted", store_id);
        Ok(())
    }

    pub fn put(&self, key: &str, value: ArgValue, value_type: &str) -> Result<()> {
        validate_key(key)?;
        let value_type: KvValueType = value_type.parse()?;
        ensure!(
            value_type.matches(&value),
            "value {} does not match declared type {}",
            value,
            value_type
        );

        self.state.lock().open_data()?.insert(key.to_string(), value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<ArgValue> {
        validate_key(key)?;
        let mut state = self.state.lock();
        state
            .open_data()?
            .get(key)
            .cloned()
            .with_context(|| format!("key {:?} not found", key))
    }

    /// Remove `key`; removing an absent key succeeds
    pub fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.state.lock().open_data()?.remove(key);
        Ok(())
    }

    /// Record a sync request for the open store
    pub fn sync(&self, device_ids: &str, mode: &str) -> Result<()> {
        let mode: SyncMode = mode.parse()?;
        let device_ids: Vec<String> = device_ids
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        ensure!(!device_ids.is_empty(), "sync needs at least one device id");

        let mut state = self.state.lock();
        let store_id = state.open_store_id()?;
        info!(
            "KV sync of {} with {} device(s), mode {}",
            store_id,
            device_ids.len(),
            mode
        );
        state.syncs.push(SyncRequest {
            store_id,
            device_ids,
            mode,
        });
        Ok(())
    }

    pub fn open_store(&self) -> Option<OpenStore> {
        self.state.lock().open.clone()
    }

    pub fn sync_requests(&self) -> Vec<SyncRequest> {
        self.state.lock().syncs.clone()
    }

    /// Stored value, regardless of which store is open
    pub fn peek(&self, store_id: &str, key: &str) -> Option<ArgValue> {
        self.state
            .lock()
            .stores
            .get(store_id)
            .and_then(|data| data.get(key))
            .cloned()
    }
}

fn validate_store_id(store_id: &str) -> Result<()> {
    ensure!(!store_id.is_empty(), "store id must not be empty");
    ensure!(
        store_id.len() <= MAX_STORE_ID_LENGTH,
        "store id is {} bytes, limit {}",
        store_id.len(),
        MAX_STORE_ID_LENGTH
    );
    Ok(())
}

fn validate_key(key: &str) -> Result<()> {
    ensure!(!key.is_empty(), "key must not be empty");
    ensure!(
        key.len() <= MAX_KEY_LENGTH,
        "key is {} bytes, limit {}",
        key.len(),
        MAX_KEY_LENGTH
    );
    Ok(())
}

/// Add the key-value operations to `builder`
pub fn register_kv_operations(
    builder: RegistryBuilder<KvContext>,
) -> bridge_rpc::Result<RegistryBuilder<KvContext>> {
    builder
        .register_sync(CREATE_KV_MANAGER, |kv, args| {
            let bundle_name = match args.get(0) {
                Some(_) => args.str(0)?,
                None => DEFAULT_BUNDLE_NAME,
            };
            kv.create_manager(bundle_name)?;
            Ok(None)
        })?
        .register_sync(GET_KV_STORE, |kv, args| {
            kv.get_store(args.str(0)?, args.str(1)?, args.bool(2)?)?;
            Ok(None)
        })?
        .register_sync(CLOSE_KV_STORE, |kv, args| {
            kv.close_store(args.str(0)?)?;
            Ok(None)
        })?
        .register_sync(DELETE_KV_STORE, |kv, args| {
            kv.delete_store(args.str(0)?)?;
            Ok(None)
        })?
        .register_sync(KV_PUT, |kv, args: Args| {
            let value = args.value(1)?.clone();
            kv.put(args.str(0)?, value, args.str(2)?)?;
            Ok(None)
        })?
        .register_sync(KV_GET, |kv, args| Ok(Some(kv.get(args.str(0)?)?)))?
        .register_sync(KV_DELETE, |kv, args| {
            kv.delete(args.str(0)?)?;
            Ok(None)
        })?
        .register(KV_SYNC, |kv: Arc<KvContext>, args: Args| async move {
            // Sync completion is reported asynchronously by the platform
            tokio::task::yield_now().await;
            kv.sync(args.str(0)?, args.str(1)?)?;
            Ok::<_, anyhow::Error>(None)
        })
}

/// Registry holding exactly the key-value operations
pub fn kv_registry() -> bridge_rpc::Result<Arc<Registry<KvContext>>> {
    Ok(register_kv_operations(RegistryBuilder::new())?.build())
}
