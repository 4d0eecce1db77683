//! Recording fake of the domain connectivity admin.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use tessera_core::{DomainAlias, EngineError, EngineResult};
use tessera_triggers::{DomainConnectionConfig, DomainConnectivityAdmin};

/// One mutating admin RPC, in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ConnectivityCall {
    Register(DomainAlias),
    Connect(DomainAlias),
    Disconnect(DomainAlias),
    Reconnect(DomainAlias),
    ModifyConfig(DomainAlias),
}

#[derive(Default)]
struct Inner {
    configs: HashMap<DomainAlias, DomainConnectionConfig>,
    connected: BTreeSet<DomainAlias>,
    calls: Vec<ConnectivityCall>,
    connect_refusals: u32,
}

/// In-memory domain registry tracking registration and connection state.
///
/// Every mutating RPC is logged; reads are not. `refuse_connects` makes the
/// next n `connect` calls fail with `FailedPrecondition`, simulating a domain
/// that is not yet running.
#[derive(Default)]
pub struct RecordingConnectivityAdmin {
    inner: Mutex<Inner>,
}

impl RecordingConnectivityAdmin {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a registered domain, optionally already connected.
    pub fn seed(&self, config: DomainConnectionConfig, connected: bool) {
        let mut inner = self.inner.lock();
        let alias = config.alias.clone();
        inner.configs.insert(alias.clone(), config);
        if connected {
            inner.connected.insert(alias);
        }
    }

    /// Make the next `n` connect calls fail with `FailedPrecondition`.
    pub fn refuse_connects(&self, n: u32) {
        self.inner.lock().connect_refusals = n;
    }

    /// All mutating RPCs issued so far.
    pub fn calls(&self) -> Vec<ConnectivityCall> {
        self.inner.lock().calls.clone()
    }

    /// Number of mutating RPCs issued so far.
    pub fn mutating_call_count(&self) -> usize {
        self.inner.lock().calls.len()
    }

    /// The stored config for `alias`, if registered.
    pub fn config_of(&self, alias: &DomainAlias) -> Option<DomainConnectionConfig> {
        self.inner.lock().configs.get(alias).cloned()
    }
}

#[async_trait]
impl DomainConnectivityAdmin for RecordingConnectivityAdmin {
    async fn register(&self, config: DomainConnectionConfig) -> EngineResult<()> {
        let mut inner = self.inner.lock();
        let alias = config.alias.clone();
        inner.calls.push(ConnectivityCall::Register(alias.clone()));
        if inner.configs.contains_key(&alias) {
            return Err(EngineError::failed_precondition(format!(
                "{alias}: domain already registered"
            )));
        }
        inner.configs.insert(alias, config);
        Ok(())
    }

    async fn connect(&self, alias: &DomainAlias) -> EngineResult<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(ConnectivityCall::Connect(alias.clone()));
        if !inner.configs.contains_key(alias) {
            return Err(EngineError::not_found(format!(
                "{alias}: domain is not registered"
            )));
        }
        if inner.connect_refusals > 0 {
            inner.connect_refusals -= 1;
            return Err(EngineError::failed_precondition(format!(
                "{alias}: domain is not ready"
            )));
        }
        inner.connected.insert(alias.clone());
        Ok(())
    }

    async fn disconnect(&self, alias: &DomainAlias) -> EngineResult<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(ConnectivityCall::Disconnect(alias.clone()));
        inner.connected.remove(alias);
        Ok(())
    }

    async fn reconnect(&self, alias: &DomainAlias) -> EngineResult<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(ConnectivityCall::Reconnect(alias.clone()));
        if !inner.configs.contains_key(alias) {
            return Err(EngineError::not_found(format!(
                "{alias}: domain is not registered"
            )));
        }
        inner.connected.insert(alias.clone());
        Ok(())
    }

    async fn list_connected(&self) -> EngineResult<Vec<DomainAlias>> {
        Ok(self.inner.lock().connected.iter().cloned().collect())
    }

    async fn list_configured(&self) -> EngineResult<Vec<DomainConnectionConfig>> {
        Ok(self.inner.lock().configs.values().cloned().collect())
    }

    async fn modify_config(&self, config: DomainConnectionConfig) -> EngineResult<()> {
        let mut inner = self.inner.lock();
        let alias = config.alias.clone();
        inner
            .calls
            .push(ConnectivityCall::ModifyConfig(alias.clone()));
        if !inner.configs.contains_key(&alias) {
            return Err(EngineError::not_found(format!(
                "{alias}: domain is not registered"
            )));
        }
        inner.configs.insert(alias, config);
        Ok(())
    }
}
