//! Access point identity and the fixed network layout.

use std::net::Ipv4Addr;

/// AP 模式的固定 IP 地址
pub const AP_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);
pub const AP_GATEWAY: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);
pub const AP_NETMASK_BITS: u8 = 24;
pub const HTTP_PORT: u16 = 80;

const SSID_MAX_LEN: usize = 32;
const PASS_MIN_LEN: usize = 8;
const PASS_MAX_LEN: usize = 64;
const MAX_CHANNEL: u8 = 13;

const DEFAULT_SSID: &str = "ESP32-Dashboard";
const DEFAULT_PASS: &str = "12345678";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApConfig {
    pub ssid: String,
    pub pass: String,
    pub channel: u8,
    pub max_connections: u16,
}

impl ApConfig {
    pub fn new(ssid: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            pass: pass.into(),
            channel: 1,
            max_connections: 4,
        }
    }

    /// Credentials baked in at build time, e.g.
    /// `DASHBOARD_SSID=greenhouse DASHBOARD_PASS=hunter22 cargo build`.
    pub fn from_env() -> Self {
        static SSID: Option<&str> = std::option_env!("DASHBOARD_SSID");
        static PASS: Option<&str> = std::option_env!("DASHBOARD_PASS");

        Self::new(SSID.unwrap_or(DEFAULT_SSID), PASS.unwrap_or(DEFAULT_PASS))
    }

    /// An empty passphrase brings the AP up without authentication.
    pub fn is_open(&self) -> bool {
        self.pass.is_empty()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.ssid.is_empty() && self.ssid.len() <= SSID_MAX_LEN,
            "ssid must be 1..={} bytes, got {}",
            SSID_MAX_LEN,
            self.ssid.len()
        );
        anyhow::ensure!(
            self.is_open() || (PASS_MIN_LEN..=PASS_MAX_LEN).contains(&self.pass.len()),
            "passphrase must be empty or {}..={} bytes, got {}",
            PASS_MIN_LEN,
            PASS_MAX_LEN,
            self.pass.len()
        );
        anyhow::ensure!(
            (1..=MAX_CHANNEL).contains(&self.channel),
            "channel {} out of range 1..={}",
            self.channel,
            MAX_CHANNEL
        );
        anyhow::ensure!(self.max_connections > 0, "max_connections must be positive");
        Ok(())
    }
}

impl Default for ApConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SSID, DEFAULT_PASS)
    }
}
