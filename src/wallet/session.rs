use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, RwLock};

use super::extension::WalletExtension;
use crate::config::ClientConfig;
use crate::devnet::{self, DevnetAccount};
use crate::error::{CounterError, Result};
use crate::notify::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletMode {
    Devnet,
    Extension,
}

/// Observable session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub connected: bool,
    pub connecting: bool,
    pub address: Option<String>,
    pub mode: WalletMode,
}

impl SessionSnapshot {
    fn disconnected(mode: WalletMode) -> Self {
        Self {
            connected: false,
            connecting: false,
            address: None,
            mode,
        }
    }
}

/// Who signs a write
#[derive(Clone)]
pub enum Signer {
    /// Devnet account; signs locally
    Simulated(DevnetAccount),
    /// External wallet; signs and broadcasts on its own
    External(Arc<dyn WalletExtension>),
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signer::Simulated(account) => f.debug_tuple("Simulated").field(&account.name).finish(),
            Signer::External(_) => f.write_str("External"),
        }
    }
}

pub struct WalletSession {
    mode: WalletMode,
    extension: Option<Arc<dyn WalletExtension>>,
    selected: RwLock<Option<DevnetAccount>>,
    state: watch::Sender<SessionSnapshot>,
    connect_timeout: Duration,
    notifier: Notifier,
}

impl WalletSession {
    /// Session in the mode the configured network calls for. In extension
    /// mode an existing extension connection is picked up.
    pub async fn new(
        config: &ClientConfig,
        extension: Option<Arc<dyn WalletExtension>>,
        notifier: Notifier,
    ) -> Self {
        if config.network.is_devnet() {
            return Self::devnet(notifier);
        }
        let session = Self::build(WalletMode::Extension, extension, config.connect_timeout, notifier);
        session.restore().await;
        session
    }

    /// Devnet session with no account selected
    pub fn devnet(notifier: Notifier) -> Self {
        Self::build(
            WalletMode::Devnet,
            None,
            crate::config::DEFAULT_CONNECT_TIMEOUT,
            notifier,
        )
    }

    pub async fn extension(
        extension: Arc<dyn WalletExtension>,
        connect_timeout: Duration,
        notifier: Notifier,
    ) -> Self {
        let session = Self::build(WalletMode::Extension, Some(extension), connect_timeout, notifier);
        session.restore().await;
        session
    }

    fn build(
        mode: WalletMode,
        extension: Option<Arc<dyn WalletExtension>>,
        connect_timeout: Duration,
        notifier: Notifier,
    ) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::disconnected(mode));
        Self {
            mode,
            extension,
            selected: RwLock::new(None),
            state,
            connect_timeout,
            notifier,
        }
    }

    async fn restore(&self) {
        let Some(ref ext) = self.extension else {
            return;
        };
        if !ext.is_connected().await {
            return;
        }
        match ext.stx_addresses().await {
            Ok(addresses) => {
                if let Some(first) = addresses.into_iter().next() {
                    log::info!("🔑 Restored wallet connection: {}", first.address);
                    self.set_connected(first.address);
                }
            }
            Err(e) => log::warn!("Wallet reports a connection but no address: {}", e),
        }
    }

    pub fn mode(&self) -> WalletMode {
        self.mode
    }

    /// Run the extension handshake. Does nothing on devnet.
    pub async fn connect(&self) -> Result<()> {
        let ext = match (self.mode, &self.extension) {
            (WalletMode::Devnet, _) => {
                log::warn!("connect() called on devnet; select a devnet account instead");
                return Ok(());
            }
            (WalletMode::Extension, Some(ext)) => ext.clone(),
            (WalletMode::Extension, None) => {
                let err = CounterError::ConnectionRejected("no wallet extension available".into());
                log::error!("Wallet connection failed: {}", err);
                self.notifier.failure("Wallet connection", &err);
                return Err(err);
            }
        };

        self.state.send_modify(|s| s.connecting = true);

        let handshake = async {
            ext.connect().await?;
            ext.stx_addresses().await
        };
        let outcome = match tokio::time::timeout(self.connect_timeout, handshake).await {
            Ok(Ok(addresses)) => addresses
                .into_iter()
                .next()
                .map(|entry| entry.address)
                .ok_or_else(|| CounterError::ConnectionRejected("wallet returned no address".into())),
            Ok(Err(e)) => Err(match e {
                CounterError::ConnectionRejected(_) => e,
                other => CounterError::ConnectionRejected(other.to_string()),
            }),
            Err(_) => Err(CounterError::ConnectionRejected(format!(
                "no answer within {:?}",
                self.connect_timeout
            ))),
        };

        match outcome {
            Ok(address) => {
                log::info!("🔑 Wallet connected: {}", address);
                self.set_connected(address);
                Ok(())
            }
            Err(err) => {
                log::error!("Wallet connection failed: {}", err);
                self.notifier.failure("Wallet connection", &err);
                self.state.send_modify(|s| s.connecting = false);
                Err(err)
            }
        }
    }

    /// Devnet "connection": pick one of the simulated accounts
    pub async fn select_devnet_account(&self, name_or_address: &str) -> Result<DevnetAccount> {
        if self.mode != WalletMode::Devnet {
            return Err(CounterError::Config(
                "devnet accounts are only available on devnet".to_string(),
            ));
        }
        let account = devnet::find_account(name_or_address)?;
        *self.selected.write().await = Some(account.clone());
        log::info!("👛 Selected devnet account {} ({})", account.label, account.stx_address);
        self.set_connected(account.stx_address.clone());
        Ok(account)
    }

    pub async fn disconnect(&self) {
        match self.mode {
            WalletMode::Devnet => {
                self.selected.write().await.take();
            }
            WalletMode::Extension => {
                if let Some(ref ext) = self.extension {
                    if let Err(e) = ext.disconnect().await {
                        log::warn!("Wallet disconnect reported an error: {}", e);
                    }
                }
            }
        }
        self.state
            .send_replace(SessionSnapshot::disconnected(self.mode));
        log::info!("Wallet disconnected");
    }

    pub fn current_address(&self) -> Option<String> {
        self.state.borrow().address.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Signer for the active connection
    pub async fn signer(&self) -> Result<Signer> {
        if !self.is_connected() {
            return Err(CounterError::NotConnected);
        }
        match self.mode {
            WalletMode::Devnet => self
                .selected
                .read()
                .await
                .clone()
                .map(Signer::Simulated)
                .ok_or(CounterError::NotConnected),
            WalletMode::Extension => self
                .extension
                .clone()
                .map(Signer::External)
                .ok_or(CounterError::NotConnected),
        }
    }

    fn set_connected(&self, address: String) {
        self.state.send_modify(|s| {
            s.connected = true;
            s.connecting = false;
            s.address = Some(address);
        });
    }
}
