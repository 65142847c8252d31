//! Wallet session manager.
//!
//! A [`WalletSession`] owns the connection to exactly one wallet provider,
//! keeps the public [`WalletState`] consistent, and fans every change out to
//! registered listeners.
//!
//! The session is constructed explicitly by the application and shared by
//! cloning the handle; there is no process-wide instance.

use crate::config::WalletConfig;
use crate::error::{Error, Result};
use crate::events::WalletEvent;
use crate::listeners::{Listener, ListenerHandle, ListenerRegistry, lock};
use crate::network::{NetworkDescriptor, Networks};
use crate::provider::{
    ConnectorFactory, ConnectorParams, ConnectorRegistry, EventHandler, SharedProvider,
};
use crate::types::{
    Connection, ConnectionStatus, ConnectorKind, NetworkSwitch, PendingTransaction,
    TransactionReceipt, TransactionRequest, WalletState,
};
use std::sync::{Arc, Mutex, MutexGuard};

/// Handle to a wallet session. Clones share the same session.
#[derive(Clone)]
pub struct WalletSession {
    shared: Arc<Shared>,
}

struct Shared {
    config: WalletConfig,
    registry: ConnectorRegistry,
    state: Mutex<SessionState>,
    listeners: ListenerRegistry,
}

#[derive(Default)]
struct SessionState {
    phase: Phase,
    /// Bumped on every connect attempt and disconnect; events and handshakes
    /// tagged with an older value are stale.
    generation: u64,
}

#[derive(Default)]
enum Phase {
    #[default]
    Disconnected,
    Connecting {
        connector: ConnectorKind,
        generation: u64,
    },
    Connected(ActiveConnection),
}

/// Everything that exists only while connected, set and cleared together.
struct ActiveConnection {
    connector: ConnectorKind,
    address: String,
    chain_id: u64,
    provider: SharedProvider,
    generation: u64,
}

impl WalletSession {
    /// Create a disconnected session.
    pub fn new(config: WalletConfig, registry: ConnectorRegistry) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                registry,
                state: Mutex::new(SessionState::default()),
                listeners: ListenerRegistry::new(),
            }),
        }
    }

    pub fn config(&self) -> &WalletConfig {
        &self.shared.config
    }

    pub fn networks(&self) -> &Networks {
        &self.shared.config.networks
    }

    /// Connect through `kind`.
    ///
    /// Fails with [`Error::ConnectInProgress`] while another handshake runs.
    /// An existing connection is torn down before the new handshake starts.
    /// On failure the session is left disconnected.
    pub async fn connect(&self, kind: ConnectorKind) -> Result<Connection> {
        let params = self.shared.config.connector_params(kind)?;
        let factory = self.shared.registry.get(kind).ok_or_else(|| {
            Error::ProviderUnavailable(format!("No connector registered for {}", kind))
        })?;

        let (attempt, previous) = {
            let mut state = self.shared.lock_state();
            if matches!(state.phase, Phase::Connecting { .. }) {
                return Err(Error::ConnectInProgress);
            }
            state.generation += 1;
            let attempt = state.generation;
            let previous = std::mem::replace(
                &mut state.phase,
                Phase::Connecting {
                    connector: kind,
                    generation: attempt,
                },
            );
            (attempt, previous)
        };

        let mut guard = HandshakeGuard {
            shared: &self.shared,
            attempt,
            announced: false,
            armed: true,
        };

        if let Phase::Connected(old) = previous {
            log::info!(
                "Tearing down {} connection before connecting with {}",
                old.connector,
                kind
            );
            old.provider.unsubscribe();
            guard.announced = true;
            self.shared.broadcast();
        }

        log::debug!("Connecting wallet via {}", kind);
        let (provider, address, chain_id) = self.handshake(factory, &params, attempt).await?;

        {
            let mut state = self.shared.lock_state();
            let current = matches!(
                state.phase,
                Phase::Connecting { generation, .. } if generation == attempt
            );
            if !current {
                drop(state);
                provider.unsubscribe();
                guard.armed = false;
                log::debug!("Connection attempt {} was cancelled", attempt);
                return Err(Error::Cancelled);
            }
            state.phase = Phase::Connected(ActiveConnection {
                connector: kind,
                address: address.clone(),
                chain_id,
                provider,
                generation: attempt,
            });
        }
        guard.armed = false;

        log::info!("Wallet connected via {}: {} on chain {}", kind, address, chain_id);
        self.shared.broadcast();

        Ok(Connection { address, chain_id })
    }

    async fn handshake(
        &self,
        factory: &dyn ConnectorFactory,
        params: &ConnectorParams,
        attempt: u64,
    ) -> Result<(SharedProvider, String, u64)> {
        let provider = factory.open(params).await?;

        let accounts = provider.request_accounts().await?;
        let address = accounts
            .into_iter()
            .find(|a| !a.is_empty())
            .ok_or(Error::NoAccounts)?;

        let chain_id = provider.chain_id().await?;

        provider.subscribe(self.event_handler(attempt))?;

        Ok((provider, address, chain_id))
    }

    fn event_handler(&self, generation: u64) -> EventHandler {
        let shared = Arc::downgrade(&self.shared);
        Arc::new(move |event: WalletEvent| {
            if let Some(shared) = shared.upgrade() {
                WalletSession { shared }.handle_event(generation, event);
            }
        })
    }

    fn handle_event(&self, generation: u64, event: WalletEvent) {
        let disconnect = {
            let mut state = self.shared.lock_state();
            match &mut state.phase {
                Phase::Connected(active) if active.generation == generation => match event {
                    WalletEvent::AccountsChanged(address) => {
                        log::debug!("Account changed to {}", address);
                        active.address = address;
                        false
                    }
                    WalletEvent::ChainChanged(chain_id) => {
                        log::debug!("Chain changed to {}", chain_id);
                        active.chain_id = chain_id;
                        false
                    }
                    WalletEvent::Disconnected => true,
                },
                _ => {
                    log::debug!("Ignoring stale wallet event {:?}", event);
                    return;
                }
            }
        };

        if disconnect {
            self.disconnect();
        } else {
            self.shared.broadcast();
        }
    }

    /// Drop the connection and notify listeners. Safe to call repeatedly.
    ///
    /// A handshake in flight will finish with [`Error::Cancelled`].
    pub fn disconnect(&self) {
        let previous = {
            let mut state = self.shared.lock_state();
            state.generation += 1;
            std::mem::take(&mut state.phase)
        };

        match previous {
            Phase::Connected(active) => {
                active.provider.unsubscribe();
                log::info!("Wallet disconnected ({})", active.connector);
            }
            Phase::Connecting { connector, .. } => {
                log::debug!("Cancelling {} connection attempt", connector);
            }
            Phase::Disconnected => {}
        }

        self.shared.broadcast();
    }

    /// Switch the wallet to `chain_id`.
    ///
    /// If the wallet has never seen the chain, it is added once through
    /// [`WalletSession::add_network`]. Any other failure is returned as-is.
    pub async fn switch_network(&self, chain_id: u64) -> Result<NetworkSwitch> {
        let (provider, generation) = self.active_provider()?;
        let network = self.shared.config.networks.require(chain_id)?;

        match provider.switch_chain(chain_id).await {
            Ok(()) => {
                self.commit_chain(generation, chain_id);
                Ok(NetworkSwitch::Switched { chain_id })
            }
            Err(Error::ChainUnknownToProvider(_)) => {
                log::info!("Chain {} unknown to wallet, adding {}", chain_id, network.name);
                add_chain(&provider, network).await?;

                let active = match provider.chain_id().await {
                    Ok(current) if current == chain_id => {
                        self.commit_chain(generation, chain_id);
                        true
                    }
                    Ok(_) => false,
                    Err(e) => {
                        log::warn!("Could not read chain after adding {}: {}", chain_id, e);
                        false
                    }
                };
                Ok(NetworkSwitch::Added { chain_id, active })
            }
            Err(e) => Err(e),
        }
    }

    /// Register `chain_id` with the wallet.
    ///
    /// Does not change the session's chain; the wallet's own `chainChanged`
    /// event will if it switches.
    pub async fn add_network(&self, chain_id: u64) -> Result<()> {
        let (provider, _) = self.active_provider()?;
        let network = self.shared.config.networks.require(chain_id)?;
        add_chain(&provider, network).await
    }

    /// Submit a transaction from the connected account.
    pub async fn send_transaction(&self, tx: TransactionRequest) -> Result<PendingTransaction> {
        let (provider, from, chain_id) = {
            let state = self.shared.lock_state();
            match &state.phase {
                Phase::Connected(active) => (
                    active.provider.clone(),
                    active.address.clone(),
                    active.chain_id,
                ),
                _ => return Err(Error::NotConnected),
            }
        };

        let mut request = tx;
        if request.from.is_none() {
            request.from = Some(from.clone());
        }

        let hash = provider.send_transaction(&request).await?;
        log::info!("Transaction {} submitted on chain {}", hash, chain_id);

        Ok(PendingTransaction {
            hash,
            from,
            chain_id,
            request,
        })
    }

    /// Wait until `hash` reaches `confirmations` (default from config, normally 1).
    pub async fn wait_for_transaction(
        &self,
        hash: &str,
        confirmations: Option<u32>,
    ) -> Result<TransactionReceipt> {
        let (provider, _) = self.active_provider()?;
        let confirmations = confirmations.unwrap_or(self.shared.config.default_confirmations);
        provider.wait_for_transaction(hash, confirmations).await
    }

    /// Register a listener for every state change.
    pub fn add_listener(&self, listener: Listener) -> ListenerHandle {
        self.shared.listeners.add(listener)
    }

    /// Current public state.
    pub fn state(&self) -> WalletState {
        self.shared.snapshot()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.lock_state().phase.status()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    pub fn address(&self) -> Option<String> {
        match &self.shared.lock_state().phase {
            Phase::Connected(active) => Some(active.address.clone()),
            _ => None,
        }
    }

    pub fn chain_id(&self) -> Option<u64> {
        match &self.shared.lock_state().phase {
            Phase::Connected(active) => Some(active.chain_id),
            _ => None,
        }
    }

    pub fn connector(&self) -> Option<ConnectorKind> {
        self.shared.lock_state().phase.connector()
    }

    /// Descriptor of the connected chain, if it is in the table.
    pub fn network(&self) -> Option<NetworkDescriptor> {
        self.chain_id()
            .and_then(|id| self.shared.config.networks.get(id).cloned())
    }

    /// The live provider, for calls the session does not wrap.
    pub fn provider(&self) -> Option<SharedProvider> {
        self.active_provider().ok().map(|(provider, _)| provider)
    }

    pub fn is_network_supported(&self, chain_id: u64) -> bool {
        self.shared.config.networks.is_supported(chain_id)
    }

    pub fn network_name(&self, chain_id: u64) -> &str {
        self.shared.config.networks.name(chain_id)
    }

    fn active_provider(&self) -> Result<(SharedProvider, u64)> {
        match &self.shared.lock_state().phase {
            Phase::Connected(active) => Ok((active.provider.clone(), active.generation)),
            _ => Err(Error::NotConnected),
        }
    }

    fn commit_chain(&self, generation: u64, chain_id: u64) {
        {
            let mut state = self.shared.lock_state();
            match &mut state.phase {
                Phase::Connected(active) if active.generation == generation => {
                    active.chain_id = chain_id;
                }
                _ => {
                    log::debug!("Session changed before chain {} was committed", chain_id);
                    return;
                }
            }
        }
        self.shared.broadcast();
    }
}

async fn add_chain(provider: &SharedProvider, network: &NetworkDescriptor) -> Result<()> {
    provider.add_chain(&network.add_chain_params()).await?;
    log::info!("Added {} ({}) to wallet", network.name, network.chain_id);
    Ok(())
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }

    fn snapshot(&self) -> WalletState {
        let state = self.lock_state();
        let (address, chain_id) = match &state.phase {
            Phase::Connected(active) => (Some(active.address.clone()), Some(active.chain_id)),
            _ => (None, None),
        };
        WalletState {
            status: state.phase.status(),
            is_connected: address.is_some() && chain_id.is_some(),
            network: chain_id.and_then(|id| self.config.networks.get(id).cloned()),
            connector: state.phase.connector(),
            address,
            chain_id,
        }
    }

    /// Notify listeners with a fresh snapshot. Never called with the state locked.
    fn broadcast(&self) {
        let snapshot = self.snapshot();
        self.listeners.notify(&snapshot);
    }
}

impl Phase {
    fn status(&self) -> ConnectionStatus {
        match self {
            Phase::Disconnected => ConnectionStatus::Disconnected,
            Phase::Connecting { .. } => ConnectionStatus::Connecting,
            Phase::Connected(_) => ConnectionStatus::Connected,
        }
    }

    fn connector(&self) -> Option<ConnectorKind> {
        match self {
            Phase::Disconnected => None,
            Phase::Connecting { connector, .. } => Some(*connector),
            Phase::Connected(active) => Some(active.connector),
        }
    }
}

/// Resets a handshake that failed or whose future was dropped.
struct HandshakeGuard<'a> {
    shared: &'a Shared,
    attempt: u64,
    /// Listeners already saw the session leave `Connected` for this attempt.
    announced: bool,
    armed: bool,
}

impl Drop for HandshakeGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let reset = {
            let mut state = self.shared.lock_state();
            let pending = matches!(
                state.phase,
                Phase::Connecting { generation, .. } if generation == self.attempt
            );
            if pending {
                state.phase = Phase::Disconnected;
            }
            pending
        };
        if reset && self.announced {
            self.shared.broadcast();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::{MockConnector, MockProvider};
    use crate::provider::ProviderFuture;
    use futures::channel::oneshot;
    use serde_json::json;

    const ALICE: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const BOB: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    fn session_with(provider: &Arc<MockProvider>) -> WalletSession {
        let registry = ConnectorRegistry::new()
            .with(ConnectorKind::Injected, MockConnector::new(provider.clone()));
        WalletSession::new(WalletConfig::default(), registry)
    }

    fn record_states(session: &WalletSession) -> Arc<Mutex<Vec<WalletState>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        session.add_listener(Arc::new(move |state: &WalletState| {
            sink.lock().unwrap().push(state.clone());
        }));
        seen
    }

    fn assert_consistent(state: &WalletState) {
        assert_eq!(
            state.is_connected,
            state.address.is_some() && state.chain_id.is_some()
        );
        assert_eq!(state.address.is_some(), state.chain_id.is_some());
        assert_eq!(
            state.is_connected,
            state.status == ConnectionStatus::Connected
        );
    }

    #[tokio::test]
    async fn test_connect_then_switch_directly() {
        let provider = Arc::new(MockProvider::new(&[ALICE], 1).knows_chains(&[137]));
        let session = session_with(&provider);
        let seen = record_states(&session);

        let connection = session.connect(ConnectorKind::Injected).await.unwrap();
        assert_eq!(connection.address, ALICE);
        assert_eq!(connection.chain_id, 1);

        let state = session.state();
        assert!(state.is_connected);
        assert_eq!(state.address.as_deref(), Some(ALICE));
        assert_eq!(state.chain_id, Some(1));
        assert_eq!(state.connector, Some(ConnectorKind::Injected));
        assert_eq!(state.network.unwrap().name, "Ethereum Mainnet");

        let outcome = session.switch_network(137).await.unwrap();
        assert_eq!(outcome, NetworkSwitch::Switched { chain_id: 137 });
        assert_eq!(session.chain_id(), Some(137));
        assert_eq!(provider.count("add_chain"), 0);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].chain_id, Some(137));
        seen.iter().for_each(assert_consistent);
    }

    #[tokio::test]
    async fn test_unknown_chain_is_added_exactly_once() {
        let provider = Arc::new(MockProvider::new(&[ALICE], 1));
        let session = session_with(&provider);
        session.connect(ConnectorKind::Injected).await.unwrap();

        let outcome = session.switch_network(80001).await.unwrap();

        assert_eq!(
            outcome,
            NetworkSwitch::Added {
                chain_id: 80001,
                active: true
            }
        );
        assert_eq!(provider.count("switch_chain:80001"), 1);
        assert_eq!(provider.count("add_chain:80001"), 1);
        assert_eq!(session.chain_id(), Some(80001));
    }

    #[tokio::test]
    async fn test_other_switch_errors_do_not_add_network() {
        let provider = Arc::new(MockProvider::new(&[ALICE], 1).knows_chains(&[137]));
        let session = session_with(&provider);
        session.connect(ConnectorKind::Injected).await.unwrap();

        provider.fail("switch_chain", 4001, "User rejected the request.");
        let err = session.switch_network(137).await.unwrap_err();

        assert!(matches!(err, Error::UserRejected(_)));
        assert_eq!(provider.count("add_chain"), 0);
        assert_eq!(session.chain_id(), Some(1));
    }

    #[tokio::test]
    async fn test_failed_add_propagates() {
        let provider = Arc::new(MockProvider::new(&[ALICE], 1));
        let session = session_with(&provider);
        session.connect(ConnectorKind::Injected).await.unwrap();

        provider.fail("add_chain", -32602, "Invalid rpcUrls");
        let err = session.switch_network(137).await.unwrap_err();

        assert_eq!(err.to_string(), "Invalid rpcUrls");
        assert_eq!(provider.count("add_chain"), 1);
        assert_eq!(session.chain_id(), Some(1));
    }

    #[tokio::test]
    async fn test_unsupported_network_makes_no_provider_call() {
        let provider = Arc::new(MockProvider::new(&[ALICE], 1));
        let session = session_with(&provider);
        session.connect(ConnectorKind::Injected).await.unwrap();
        let calls_before = provider.calls().len();

        let err = session.switch_network(999999).await.unwrap_err();

        assert!(matches!(err, Error::UnsupportedNetwork(999999)));
        assert_eq!(provider.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let provider = Arc::new(MockProvider::new(&[ALICE], 1));
        let session = session_with(&provider);

        let tx = TransactionRequest::new().to(BOB).value(1);
        assert!(matches!(
            session.send_transaction(tx).await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            session.switch_network(137).await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            session.add_network(137).await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            session.wait_for_transaction("0x01", None).await,
            Err(Error::NotConnected)
        ));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_add_network_keeps_local_chain() {
        let provider = Arc::new(MockProvider::new(&[ALICE], 1));
        let session = session_with(&provider);
        session.connect(ConnectorKind::Injected).await.unwrap();

        session.add_network(137).await.unwrap();

        assert_eq!(provider.count("add_chain:137"), 1);
        assert_eq!(session.chain_id(), Some(1));
    }

    #[tokio::test]
    async fn test_send_and_wait_for_transaction() {
        let provider = Arc::new(MockProvider::new(&[ALICE], 137));
        let session = session_with(&provider);
        session.connect(ConnectorKind::Injected).await.unwrap();

        let pending = session
            .send_transaction(TransactionRequest::new().to(BOB).value(1_000))
            .await
            .unwrap();
        assert_eq!(pending.from, ALICE);
        assert_eq!(pending.chain_id, 137);
        assert_eq!(pending.request.from.as_deref(), Some(ALICE));

        let receipt = session.wait_for_transaction(&pending.hash, None).await.unwrap();
        assert_eq!(receipt.transaction_hash, pending.hash);
        assert_eq!(receipt.confirmations, 1);

        let receipt = session
            .wait_for_transaction(&pending.hash, Some(3))
            .await
            .unwrap();
        assert_eq!(receipt.confirmations, 3);
    }

    #[tokio::test]
    async fn test_send_transaction_surfaces_provider_message() {
        let provider = Arc::new(MockProvider::new(&[ALICE], 1));
        let session = session_with(&provider);
        session.connect(ConnectorKind::Injected).await.unwrap();

        provider.fail("send_transaction", -32000, "insufficient funds for gas * price + value");
        let err = session
            .send_transaction(TransactionRequest::new().to(BOB).value(1))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "insufficient funds for gas * price + value");
    }

    #[tokio::test]
    async fn test_connect_failures_leave_session_disconnected() {
        let provider = Arc::new(MockProvider::new(&[], 1));
        let session = session_with(&provider);
        assert!(matches!(
            session.connect(ConnectorKind::Injected).await,
            Err(Error::NoAccounts)
        ));
        assert_eq!(session.state(), WalletState::default());

        let provider = Arc::new(MockProvider::new(&[ALICE], 1));
        provider.fail("request_accounts", 4001, "User rejected the request.");
        let session = session_with(&provider);
        assert!(matches!(
            session.connect(ConnectorKind::Injected).await,
            Err(Error::UserRejected(_))
        ));
        assert!(!session.is_connected());
        assert!(!provider.is_subscribed());

        let registry =
            ConnectorRegistry::new().with(ConnectorKind::Injected, MockConnector::unavailable());
        let session = WalletSession::new(WalletConfig::default(), registry);
        assert!(matches!(
            session.connect(ConnectorKind::Injected).await,
            Err(Error::ProviderUnavailable(_))
        ));
        assert!(matches!(
            session.connect(ConnectorKind::Coinbase).await,
            Err(Error::ProviderUnavailable(_))
        ));
        assert!(matches!(
            session.connect(ConnectorKind::WalletConnect).await,
            Err(Error::Config(_))
        ));
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let provider = Arc::new(MockProvider::new(&[ALICE], 1));
        let session = session_with(&provider);
        let seen = record_states(&session);
        session.connect(ConnectorKind::Injected).await.unwrap();

        session.disconnect();
        let once = session.state();
        session.disconnect();
        let twice = session.state();

        assert_eq!(once, twice);
        assert_eq!(once, WalletState::default());
        assert!(!provider.is_subscribed());
        assert_eq!(provider.count("unsubscribe"), 1);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[1], seen[2]);
        assert!(!seen[2].is_connected);
    }

    #[tokio::test]
    async fn test_events_update_state() {
        let provider = Arc::new(MockProvider::new(&[ALICE], 1));
        let session = session_with(&provider);
        let seen = record_states(&session);
        session.connect(ConnectorKind::Injected).await.unwrap();

        provider.emit(WalletEvent::AccountsChanged(BOB.to_string()));
        assert_eq!(session.address().as_deref(), Some(BOB));

        provider.emit(WalletEvent::from_eip1193("chainChanged", &json!("0x89")).unwrap());
        assert_eq!(session.chain_id(), Some(137));
        assert_eq!(session.network().unwrap().short_name, "Polygon");

        provider.emit(WalletEvent::Disconnected);
        assert!(!session.is_connected());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        seen.iter().for_each(assert_consistent);
    }

    #[tokio::test]
    async fn test_empty_accounts_disconnect_every_connector_kind() {
        for kind in ConnectorKind::ALL {
            let provider = Arc::new(MockProvider::new(&[ALICE], 1));
            let mut registry = ConnectorRegistry::new();
            for k in ConnectorKind::ALL {
                registry.register(k, MockConnector::new(provider.clone()));
            }
            let config = WalletConfig {
                walletconnect_project_id: Some("test-project".to_string()),
                ..WalletConfig::default()
            };
            let session = WalletSession::new(config, registry);

            session.connect(kind).await.unwrap();
            assert_eq!(session.connector(), Some(kind));

            let event = WalletEvent::from_eip1193("accountsChanged", &json!([])).unwrap();
            provider.emit(event);

            assert_eq!(session.state(), WalletState::default(), "connector {}", kind);
        }
    }

    #[tokio::test]
    async fn test_listeners_see_identical_snapshot_in_order() {
        let provider = Arc::new(MockProvider::new(&[ALICE], 1));
        let session = session_with(&provider);
        let seen: Arc<Mutex<Vec<(&'static str, WalletState)>>> = Arc::new(Mutex::new(Vec::new()));
        for name in ["l1", "l2", "l3"] {
            let sink = seen.clone();
            session.add_listener(Arc::new(move |state: &WalletState| {
                sink.lock().unwrap().push((name, state.clone()));
            }));
        }

        session.connect(ConnectorKind::Injected).await.unwrap();

        let seen = seen.lock().unwrap();
        let names: Vec<_> = seen.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["l1", "l2", "l3"]);
        assert_eq!(seen[0].1, seen[1].1);
        assert_eq!(seen[1].1, seen[2].1);
    }

    #[tokio::test]
    async fn test_panicking_listener_is_isolated() {
        let provider = Arc::new(MockProvider::new(&[ALICE], 1));
        let session = session_with(&provider);
        session.add_listener(Arc::new(|state: &WalletState| {
            assert_eq!(state.status, ConnectionStatus::Disconnected, "broken widget");
        }));
        let seen = record_states(&session);

        session.connect(ConnectorKind::Injected).await.unwrap();

        assert!(session.is_connected());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reconnect_tears_down_previous_subscription() {
        let first = Arc::new(MockProvider::new(&[ALICE], 1));
        let second = Arc::new(MockProvider::new(&[BOB], 137));
        let registry = ConnectorRegistry::new()
            .with(ConnectorKind::Injected, MockConnector::new(first.clone()))
            .with(ConnectorKind::Coinbase, MockConnector::new(second.clone()));
        let session = WalletSession::new(WalletConfig::default(), registry);

        session.connect(ConnectorKind::Injected).await.unwrap();
        session.connect(ConnectorKind::Coinbase).await.unwrap();

        assert!(!first.is_subscribed());
        assert!(second.is_subscribed());
        assert_eq!(session.address().as_deref(), Some(BOB));
        assert_eq!(session.connector(), Some(ConnectorKind::Coinbase));
    }

    #[tokio::test]
    async fn test_failed_reconnect_announces_disconnect() {
        let first = Arc::new(MockProvider::new(&[ALICE], 1));
        let second = Arc::new(MockProvider::new(&[], 137));
        let registry = ConnectorRegistry::new()
            .with(ConnectorKind::Injected, MockConnector::new(first.clone()))
            .with(ConnectorKind::Coinbase, MockConnector::new(second.clone()));
        let session = WalletSession::new(WalletConfig::default(), registry);
        let seen = record_states(&session);

        session.connect(ConnectorKind::Injected).await.unwrap();
        assert!(matches!(
            session.connect(ConnectorKind::Coinbase).await,
            Err(Error::NoAccounts)
        ));

        let statuses: Vec<ConnectionStatus> =
            seen.lock().unwrap().iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![
                ConnectionStatus::Connected,
                ConnectionStatus::Connecting,
                ConnectionStatus::Disconnected
            ]
        );
        seen.lock().unwrap().iter().for_each(assert_consistent);
        assert!(!first.is_subscribed());
        assert!(!second.is_subscribed());
        assert_eq!(session.state(), WalletState::default());
    }

    #[tokio::test]
    async fn test_stale_events_are_ignored() {
        let provider = Arc::new(MockProvider::new(&[ALICE], 1));
        let session = session_with(&provider);
        session.connect(ConnectorKind::Injected).await.unwrap();

        // Keep a handler from the first connection alive past a reconnect.
        let stale = session.event_handler(session.shared.lock_state().generation);
        session.connect(ConnectorKind::Injected).await.unwrap();

        stale(WalletEvent::ChainChanged(137));
        stale(WalletEvent::Disconnected);

        assert!(session.is_connected());
        assert_eq!(session.chain_id(), Some(1));
    }

    /// Connector whose bootstrap waits until the test opens the gate.
    struct GatedConnector {
        gate: Mutex<Option<oneshot::Receiver<()>>>,
        provider: Arc<MockProvider>,
    }

    impl ConnectorFactory for GatedConnector {
        fn open<'a>(&'a self, _params: &'a ConnectorParams) -> ProviderFuture<'a, SharedProvider> {
            let gate = self.gate.lock().unwrap().take();
            Box::pin(async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                Ok(self.provider.clone() as SharedProvider)
            })
        }
    }

    fn gated_session(provider: &Arc<MockProvider>) -> (WalletSession, oneshot::Sender<()>) {
        let (open, gate) = oneshot::channel();
        let registry = ConnectorRegistry::new().with(
            ConnectorKind::Injected,
            GatedConnector {
                gate: Mutex::new(Some(gate)),
                provider: provider.clone(),
            },
        );
        (WalletSession::new(WalletConfig::default(), registry), open)
    }

    #[tokio::test]
    async fn test_second_connect_rejected_while_connecting() {
        let provider = Arc::new(MockProvider::new(&[ALICE], 1));
        let (session, open) = gated_session(&provider);

        let first = session.connect(ConnectorKind::Injected);
        futures::pin_mut!(first);
        assert!(futures::poll!(first.as_mut()).is_pending());
        assert_eq!(session.status(), ConnectionStatus::Connecting);

        assert!(matches!(
            session.connect(ConnectorKind::Injected).await,
            Err(Error::ConnectInProgress)
        ));

        open.send(()).unwrap();
        let connection = first.await.unwrap();
        assert_eq!(connection.address, ALICE);
        assert_eq!(provider.count("request_accounts"), 1);
    }

    #[tokio::test]
    async fn test_dropped_handshake_resets_to_disconnected() {
        let provider = Arc::new(MockProvider::new(&[ALICE], 1));
        let (session, _open) = gated_session(&provider);

        {
            let first = session.connect(ConnectorKind::Injected);
            futures::pin_mut!(first);
            assert!(futures::poll!(first.as_mut()).is_pending());
            assert_eq!(session.status(), ConnectionStatus::Connecting);
        }

        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert_eq!(session.connector(), None);
    }

    #[tokio::test]
    async fn test_disconnect_cancels_handshake() {
        let provider = Arc::new(MockProvider::new(&[ALICE], 1));
        let (session, open) = gated_session(&provider);

        let first = session.connect(ConnectorKind::Injected);
        futures::pin_mut!(first);
        assert!(futures::poll!(first.as_mut()).is_pending());

        session.disconnect();
        open.send(()).unwrap();

        assert!(matches!(first.await, Err(Error::Cancelled)));
        assert!(!session.is_connected());
        assert!(!provider.is_subscribed());
    }
}
