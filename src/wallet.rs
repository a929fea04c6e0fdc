// Wallet sign-in: the only identity the session knows about

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("No wallet provider available; install a browser wallet")]
    NoWallet,

    #[error("Wallet request rejected: {0}")]
    Rejected(String),

    #[error("Wallet returned no accounts")]
    NoAccounts,

    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),
}

/// A checked `0x`-prefixed, 20-byte hex account address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn parse(text: &str) -> Result<Self, WalletError> {
        let text = text.trim();
        let hex = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .ok_or_else(|| WalletError::InvalidAddress(text.to_string()))?;
        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(WalletError::InvalidAddress(text.to_string()));
        }
        Ok(Self(format!("0x{}", hex)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // 0x1234...abcd, as shown in the header
    pub fn short(&self) -> String {
        format!("{}...{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl FromStr for WalletAddress {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = WalletError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(address: WalletAddress) -> Self {
        address.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait WalletProvider: Send + Sync + 'static {
    /// Asks the wallet for account access; the first account is the active one.
    async fn request_addresses(&self) -> Result<Vec<String>, WalletError>;
}

pub struct WalletAuth {
    provider: Option<Arc<dyn WalletProvider>>,
    connected: RwLock<Option<WalletAddress>>,
}

impl WalletAuth {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        Self {
            provider,
            connected: RwLock::new(None),
        }
    }

    pub async fn connect(&self) -> Result<WalletAddress, WalletError> {
        let provider = self.provider.as_ref().ok_or(WalletError::NoWallet)?;
        let addresses = provider.request_addresses().await?;
        let first = addresses.first().ok_or(WalletError::NoAccounts)?;
        let address = WalletAddress::parse(first)?;

        info!(address = %address.short(), "wallet connected");
        *self.connected.write() = Some(address.clone());
        Ok(address)
    }

    pub fn disconnect(&self) {
        if self.connected.write().take().is_some() {
            info!("wallet disconnected");
        }
    }

    pub fn address(&self) -> Option<WalletAddress> {
        self.connected.read().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.read().is_some()
    }
}
