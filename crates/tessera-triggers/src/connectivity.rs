//! Domain connection configuration and the connectivity manager.
//!
//! Per domain alias the lifecycle is `Unregistered -> Registered ->
//! Connected`. Registration and config changes are single admin RPCs; the
//! connect step is confirmed explicitly because the lower layer auto-connects
//! opportunistically and may race a domain that is not yet running.
//!
//! Sequencer connection sets are compared by endpoint identity, never by
//! connection object identity, so an equal set in a different order issues no
//! modify or reconnect RPC.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tessera_core::{DomainAlias, EngineError, EngineResult};
use tessera_retry::{RetryPolicy, RetryProvider};
use tessera_topology::thresholds;
use tracing::{debug, info};

/// One sequencer endpoint of a domain connection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequencerConnection {
    /// Alias of the sequencer within the domain connection.
    pub alias: String,
    /// Endpoint URL; the identity used for set comparison.
    pub endpoint: String,
}

impl SequencerConnection {
    /// Convenience constructor.
    pub fn new(alias: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// How strictly sequencer responses are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SequencerValidationMode {
    /// Validate every response against the trust threshold.
    #[default]
    Strict,
    /// Accept the first response, validate asynchronously.
    Optimistic,
}

/// Target state for a participant's connection to one domain.
///
/// The sequencer connection set is nonempty by construction; the submission
/// amplification factor and the trust threshold are computed jointly from
/// the cluster size so every node derives the same pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DomainConnectionConfigWire")]
pub struct DomainConnectionConfig {
    /// Human-readable alias of the domain.
    pub alias: DomainAlias,
    /// Whether connecting requires an explicit operator action.
    pub manual_connect: bool,
    /// How strictly sequencer responses are validated.
    pub validation_mode: SequencerValidationMode,
    /// Number of sequencers each submission is sent to.
    pub submission_amplification: u32,
    /// Number of agreeing sequencers required to trust a read.
    pub trust_threshold: u32,
    connections: Vec<SequencerConnection>,
}

/// Wire shape of [`DomainConnectionConfig`]. Deserialization goes through
/// [`DomainConnectionConfig::new`], so a payload can neither smuggle in an
/// empty connection set nor override the derived thresholds.
#[derive(Deserialize)]
struct DomainConnectionConfigWire {
    alias: DomainAlias,
    manual_connect: bool,
    #[serde(default)]
    validation_mode: SequencerValidationMode,
    connections: Vec<SequencerConnection>,
}

impl TryFrom<DomainConnectionConfigWire> for DomainConnectionConfig {
    type Error = EngineError;

    fn try_from(wire: DomainConnectionConfigWire) -> EngineResult<Self> {
        Self::new(
            wire.alias,
            wire.manual_connect,
            wire.connections,
            wire.validation_mode,
        )
    }
}

impl DomainConnectionConfig {
    /// Build a config, deriving amplification and trust threshold from the
    /// connection count. Fails when the connection set is empty.
    pub fn new(
        alias: DomainAlias,
        manual_connect: bool,
        connections: Vec<SequencerConnection>,
        validation_mode: SequencerValidationMode,
    ) -> EngineResult<Self> {
        if connections.is_empty() {
            return Err(EngineError::failed_precondition(format!(
                "{alias}: sequencer connection set must not be empty"
            )));
        }
        let n = connections.len();
        Ok(Self {
            alias,
            manual_connect,
            validation_mode,
            submission_amplification: thresholds::submission_amplification(n),
            trust_threshold: thresholds::sequencer_trust_threshold(n),
            connections,
        })
    }

    /// The sequencer connections.
    pub fn connections(&self) -> &[SequencerConnection] {
        &self.connections
    }

    /// The endpoint identity set.
    pub fn endpoint_set(&self) -> BTreeSet<&str> {
        self.connections.iter().map(|c| c.endpoint.as_str()).collect()
    }

    /// Whether `other` reaches the same endpoints, in any order.
    pub fn has_same_endpoints(&self, other: &DomainConnectionConfig) -> bool {
        self.endpoint_set() == other.endpoint_set()
    }

    /// This config with a replaced connection set and re-derived
    /// amplification and trust threshold.
    pub fn with_connections(
        &self,
        connections: Vec<SequencerConnection>,
    ) -> EngineResult<Self> {
        Self::new(
            self.alias.clone(),
            self.manual_connect,
            connections,
            self.validation_mode,
        )
    }
}

/// Admin API surface for domain connectivity, one RPC per operation.
///
/// Operations fail with `NotFound` for unknown aliases and
/// `FailedPrecondition` when the domain rejects the transition (e.g. connect
/// while the domain is not yet running). Callers treat a failed connect as
/// retryable under their own policy.
#[async_trait]
pub trait DomainConnectivityAdmin: Send + Sync {
    /// Register a domain connection (handshake only, no connect).
    async fn register(&self, config: DomainConnectionConfig) -> EngineResult<()>;
    /// Connect to a registered domain.
    async fn connect(&self, alias: &DomainAlias) -> EngineResult<()>;
    /// Disconnect from a domain.
    async fn disconnect(&self, alias: &DomainAlias) -> EngineResult<()>;
    /// Disconnect and connect again, picking up config changes.
    async fn reconnect(&self, alias: &DomainAlias) -> EngineResult<()>;
    /// Aliases of currently connected domains.
    async fn list_connected(&self) -> EngineResult<Vec<DomainAlias>>;
    /// All configured domain connections.
    async fn list_configured(&self) -> EngineResult<Vec<DomainConnectionConfig>>;
    /// Replace the stored config for an already-registered alias.
    async fn modify_config(&self, config: DomainConnectionConfig) -> EngineResult<()>;
}

/// Reconciles live domain connectivity against target configs.
#[derive(Clone)]
pub struct ConnectivityService {
    admin: Arc<dyn DomainConnectivityAdmin>,
    retry: RetryProvider,
}

impl ConnectivityService {
    /// Create a service over the given admin surface.
    pub fn new(admin: Arc<dyn DomainConnectivityAdmin>, retry: RetryProvider) -> Self {
        Self { admin, retry }
    }

    /// The stored config for `alias`, if registered.
    pub async fn configured(
        &self,
        alias: &DomainAlias,
    ) -> EngineResult<Option<DomainConnectionConfig>> {
        Ok(self
            .admin
            .list_configured()
            .await?
            .into_iter()
            .find(|c| c.alias == *alias))
    }

    /// Whether `alias` is currently connected.
    pub async fn is_connected(&self, alias: &DomainAlias) -> EngineResult<bool> {
        Ok(self.admin.list_connected().await?.contains(alias))
    }

    /// Ensure the domain is registered, without connecting.
    ///
    /// Registration is handshake-only and relies on the lower layer's
    /// opportunistic auto-connect, so a manual-connect config is rejected
    /// locally before any RPC. Already-registered aliases are left alone.
    pub async fn ensure_domain_registered(
        &self,
        config: DomainConnectionConfig,
    ) -> EngineResult<()> {
        if config.manual_connect {
            return Err(EngineError::failed_precondition(format!(
                "{}: handshake-only registration requires manual_connect = false",
                config.alias
            )));
        }
        if self.configured(&config.alias).await?.is_some() {
            debug!(alias = %config.alias, "domain already registered");
            return Ok(());
        }
        info!(alias = %config.alias, "registering domain");
        self.admin.register(config).await
    }

    /// Ensure the domain is registered with the given config and connected.
    ///
    /// Registers when absent; when present with a different endpoint set,
    /// modifies the config in place and reconnects. Connect is not assumed
    /// to follow from registration: the auto-connect may race a domain that
    /// is not yet running, so the connection is confirmed explicitly,
    /// retrying the connect until confirmed or the policy is exhausted.
    pub async fn ensure_registered_and_connected(
        &self,
        config: DomainConnectionConfig,
        policy: &RetryPolicy,
    ) -> EngineResult<()> {
        let alias = config.alias.clone();
        match self.configured(&alias).await? {
            None => {
                info!(alias = %alias, "registering domain");
                self.admin.register(config.clone()).await?;
            }
            Some(existing) if !existing.has_same_endpoints(&config) => {
                info!(alias = %alias, "sequencer endpoints changed, modifying and reconnecting");
                self.admin.modify_config(config.clone()).await?;
                self.admin.reconnect(&alias).await?;
            }
            Some(_) => {
                debug!(alias = %alias, "domain config up to date");
            }
        }

        // Accepted abuse of wait_until: the condition attempts the connect
        // itself, which is idempotent once the domain is up.
        let op_id = format!("connectivity/{alias}");
        let alias_ref = &alias;
        self.retry
            .wait_until(policy, &op_id, "domain connection confirmed", move || {
                let alias = alias_ref;
                async move {
                    if self.is_connected(alias).await? {
                        return Ok(true);
                    }
                    match self.admin.connect(alias).await {
                        Ok(()) => Ok(false),
                        Err(EngineError::FailedPrecondition { message }) => {
                            debug!(alias = %alias, reason = %message, "connect refused, domain not ready");
                            Ok(false)
                        }
                        Err(err) => Err(err),
                    }
                }
            })
            .await
    }

    /// Reconcile the stored sequencer connections of `alias` against a
    /// target set, comparing by endpoint identity. Issues a modify and a
    /// reconnect only when the sets differ; returns whether anything changed.
    pub async fn reconcile_sequencer_connections(
        &self,
        alias: &DomainAlias,
        target: Vec<SequencerConnection>,
    ) -> EngineResult<bool> {
        let existing = self.configured(alias).await?.ok_or_else(|| {
            EngineError::not_found(format!("{alias}: domain is not registered"))
        })?;
        let desired = existing.with_connections(target)?;
        if existing.has_same_endpoints(&desired) {
            debug!(alias = %alias, "sequencer endpoints already match target");
            return Ok(false);
        }
        info!(
            alias = %alias,
            endpoints = ?desired.endpoint_set(),
            "updating sequencer connections"
        );
        self.admin.modify_config(desired).await?;
        self.admin.reconnect(alias).await?;
        Ok(true)
    }
}
