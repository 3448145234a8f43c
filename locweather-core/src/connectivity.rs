//! Network connectivity probe.
//!
//! The weather fetcher only needs to know whether some usable transport
//! (Wi-Fi, cellular or ethernet) is active before it touches the network.

use async_trait::async_trait;
use std::{
    fmt::Debug,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Wifi,
    Cellular,
    Ethernet,
}

#[async_trait]
pub trait ConnectivityProbe: Send + Sync + Debug {
    /// Transports currently carrying traffic.
    async fn active_transports(&self) -> Vec<Transport>;

    async fn is_network_available(&self) -> bool {
        !self.active_transports().await.is_empty()
    }
}

/// Reads interface state from Linux sysfs.
#[derive(Debug, Clone)]
pub struct SysfsProbe {
    root: PathBuf,
}

const SYSFS_NET: &str = "/sys/class/net";

/// ARPHRD_ETHER, also reported by most Wi-Fi drivers.
const ARPHRD_ETHER: &str = "1";

impl SysfsProbe {
    pub fn new() -> Self {
        Self::with_root(SYSFS_NET)
    }

    /// Probe an alternative tree laid out like `/sys/class/net`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn classify(iface: &Path, name: &str) -> Option<Transport> {
        if name == "lo" {
            return None;
        }

        let operstate = read_trimmed(&iface.join("operstate")).await?;
        if operstate != "up" {
            return None;
        }

        if exists(&iface.join("wireless")).await || exists(&iface.join("phy80211")).await {
            return Some(Transport::Wifi);
        }

        if ["wwan", "rmnet", "ppp"].iter().any(|prefix| name.starts_with(prefix)) {
            return Some(Transport::Cellular);
        }

        match read_trimmed(&iface.join("type")).await.as_deref() {
            Some(ARPHRD_ETHER) => Some(Transport::Ethernet),
            _ => None,
        }
    }
}

impl Default for SysfsProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectivityProbe for SysfsProbe {
    async fn active_transports(&self) -> Vec<Transport> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(root = %self.root.display(), error = %e, "Cannot read network interfaces");
                return Vec::new();
            }
        };

        let mut transports = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(transport) = Self::classify(&entry.path(), &name).await {
                tracing::debug!(interface = %name, ?transport, "Active interface");
                if !transports.contains(&transport) {
                    transports.push(transport);
                }
            }
        }

        transports
    }
}

/// For platforms where there is nothing to probe.
#[derive(Debug, Clone, Default)]
pub struct AssumeOnline;

#[async_trait]
impl ConnectivityProbe for AssumeOnline {
    async fn active_transports(&self) -> Vec<Transport> {
        vec![Transport::Ethernet]
    }
}

async fn read_trimmed(path: &Path) -> Option<String> {
    tokio::fs::read_to_string(path).await.ok().map(|s| s.trim().to_string())
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
