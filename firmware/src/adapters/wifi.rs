//! WiFi station-mode adapter.
//!
//! Implements [`ConnectivityPort`], the link the broker adapter needs before
//! it can open a session.  Credentials come from [`FeederConfig`]; when none
//! are compiled in, the station configuration the WiFi stack saved in flash
//! (NVS) on an earlier boot is used instead.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Reconnection policy
//!
//! One attempt per [`connect`](ConnectivityPort::connect) call.  The caller
//! retries with its own fixed delay.

use core::fmt;
use log::{error, info, warn};

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use crate::config::FeederConfig;

// ───────────────────────────────────────────────────────────────
// Port trait
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

pub trait ConnectivityPort {
    /// Try once to join the configured network.  Succeeds immediately when
    /// the link is already up.
    fn connect(&mut self) -> Result<(), ConnectivityError>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError>;
}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connecting,
    Connected,
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    provisioning_ap: heapless::String<32>,
    #[cfg(target_os = "espidf")]
    driver: BlockingWifi<EspWifi<'static>>,
    /// Simulation: number of upcoming connect attempts that fail.
    #[cfg(not(target_os = "espidf"))]
    sim_failures_pending: u32,
    /// Simulation: station configuration "saved in flash".
    #[cfg(not(target_os = "espidf"))]
    sim_stored: Option<(heapless::String<32>, heapless::String<64>)>,
}

impl WifiAdapter {
    pub fn new(
        provisioning_ap: &str,
        #[cfg(target_os = "espidf")] driver: BlockingWifi<EspWifi<'static>>,
    ) -> Self {
        let mut ap = heapless::String::new();
        let _ = ap.push_str(provisioning_ap);
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            provisioning_ap: ap,
            #[cfg(target_os = "espidf")]
            driver,
            #[cfg(not(target_os = "espidf"))]
            sim_failures_pending: 0,
            #[cfg(not(target_os = "espidf"))]
            sim_stored: None,
        }
    }

    /// Load credentials from the configuration, falling back to the ones
    /// stored in flash.  Missing or invalid credentials leave the adapter
    /// unconfigured.
    pub fn configure(&mut self, config: &FeederConfig) {
        if !config.wifi_ssid.is_empty() {
            if let Err(e) = self.set_credentials(&config.wifi_ssid, &config.wifi_password) {
                error!("WiFi: configured credentials rejected ({})", e);
            }
            return;
        }

        match self.stored_credentials() {
            Some((ssid, password)) => {
                info!("WiFi: using station config stored in flash");
                if let Err(e) = self.set_credentials(&ssid, &password) {
                    error!("WiFi: stored credentials rejected ({})", e);
                }
            }
            None => warn!(
                "WiFi: no credentials in config or flash; provisioning via AP '{}' is not started, \
                 set WIFI_SSID/WIFI_PASS at build time",
                self.provisioning_ap
            ),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.ssid.is_empty()
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn provisioning_ap(&self) -> &str {
        &self.provisioning_ap
    }

    /// Simulation: make the next `n` connect attempts fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next(&mut self, n: u32) {
        self.sim_failures_pending = n;
    }

    /// Simulation: pretend a station config was saved by an earlier boot.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_store_credentials(&mut self, ssid: &str, password: &str) {
        let mut s = heapless::String::new();
        let mut p = heapless::String::new();
        if s.push_str(ssid).is_ok() && p.push_str(password).is_ok() {
            self.sim_stored = Some((s, p));
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    /// Station SSID/password the driver loaded from NVS, if any.
    #[cfg(target_os = "espidf")]
    fn stored_credentials(&self) -> Option<(heapless::String<32>, heapless::String<64>)> {
        let client = match self.driver.get_configuration().ok()? {
            Configuration::Client(c) | Configuration::Mixed(c, _) => c,
            _ => return None,
        };
        if client.ssid.is_empty() {
            return None;
        }
        let mut ssid = heapless::String::new();
        let mut password = heapless::String::new();
        ssid.push_str(client.ssid.as_str()).ok()?;
        password.push_str(client.password.as_str()).ok()?;
        Some((ssid, password))
    }

    #[cfg(not(target_os = "espidf"))]
    fn stored_credentials(&self) -> Option<(heapless::String<32>, heapless::String<64>)> {
        self.sim_stored.clone()
    }

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        let cfg = Configuration::Client(ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method: if self.password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        });
        self.driver
            .set_configuration(&cfg)
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        if !self.driver.is_started().unwrap_or(false) {
            self.driver
                .start()
                .map_err(|_| ConnectivityError::ConnectionFailed)?;
        }
        self.driver
            .connect()
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        self.driver
            .wait_netif_up()
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        if self.sim_failures_pending > 0 {
            self.sim_failures_pending -= 1;
            warn!("WiFi(sim): simulated association failure");
            return Err(ConnectivityError::ConnectionFailed);
        }
        info!("WiFi(sim): connected to '{}'", self.ssid);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) {
        let _ = self.driver.disconnect();
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) {
        info!("WiFi(sim): disconnected");
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.state == WifiState::Connected && self.driver.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }
}

// ───────────────────────────────────────────────────────────────
// ConnectivityPort
// ───────────────────────────────────────────────────────────────

impl ConnectivityPort for WifiAdapter {
    fn connect(&mut self) -> Result<(), ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        if self.platform_is_connected() {
            return Ok(());
        }

        info!("WiFi: connecting to '{}'", self.ssid);
        self.state = WifiState::Connecting;

        match self.platform_connect() {
            Ok(()) => {
                self.state = WifiState::Connected;
                info!("WiFi: connected");
                Ok(())
            }
            Err(e) => {
                error!("WiFi: connection failed: {}", e);
                self.state = WifiState::Disconnected;
                Err(e)
            }
        }
    }

    fn disconnect(&mut self) {
        self.platform_disconnect();
        self.state = WifiState::Disconnected;
        info!("WiFi: disconnected");
    }

    fn is_connected(&self) -> bool {
        self.platform_is_connected()
    }

    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials updated (SSID='{}')", self.ssid);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    fn adapter() -> WifiAdapter {
        WifiAdapter::new("SAF_AP")
    }

    #[test]
    fn rejects_empty_or_unprintable_ssid() {
        let mut a = adapter();
        assert_eq!(a.set_credentials("", "password123"), Err(ConnectivityError::InvalidSsid));
        assert_eq!(a.set_credentials("bad\tnet", ""), Err(ConnectivityError::InvalidSsid));
        assert_eq!(a.set_credentials("caf\u{e9}", ""), Err(ConnectivityError::InvalidSsid));
    }

    #[test]
    fn rejects_short_password() {
        let mut a = adapter();
        assert_eq!(a.set_credentials("MyNet", "short"), Err(ConnectivityError::InvalidPassword));
    }

    #[test]
    fn accepts_open_and_wpa2_networks() {
        let mut a = adapter();
        assert!(a.set_credentials("OpenCafe", "").is_ok());
        assert!(a.set_credentials("HomeWiFi", "mysecret8").is_ok());
    }

    #[test]
    fn unconfigured_adapter_cannot_connect() {
        let mut a = adapter();
        a.configure(&FeederConfig::default());
        assert_eq!(a.connect(), Err(ConnectivityError::NoCredentials));
        assert_eq!(a.provisioning_ap(), "SAF_AP");
        assert!(!a.has_credentials());
    }

    #[test]
    fn falls_back_to_credentials_stored_in_flash() {
        let mut a = adapter();
        a.sim_store_credentials("Kitchen", "kibble123");
        a.configure(&FeederConfig::default());
        assert!(a.has_credentials());
        assert!(a.connect().is_ok());
    }

    #[test]
    fn configured_credentials_win_over_stored() {
        let mut config = FeederConfig::default();
        let _ = config.wifi_ssid.push_str("Garage");

        let mut a = adapter();
        a.sim_store_credentials("Kitchen", "kibble123");
        a.configure(&config);
        a.connect().unwrap();
        assert_eq!(a.ssid.as_str(), "Garage");
    }

    #[test]
    fn configure_then_connect() {
        let mut config = FeederConfig::default();
        let _ = config.wifi_ssid.push_str("Kitchen");
        let _ = config.wifi_password.push_str("kibble123");

        let mut a = adapter();
        a.configure(&config);
        assert!(a.connect().is_ok());
        assert!(a.is_connected());
        // Already up: still Ok.
        assert!(a.connect().is_ok());
        a.disconnect();
        assert!(!a.is_connected());
    }

    #[test]
    fn failed_attempt_leaves_link_down() {
        let mut a = adapter();
        a.set_credentials("Kitchen", "kibble123").unwrap();
        a.sim_fail_next(1);
        assert_eq!(a.connect(), Err(ConnectivityError::ConnectionFailed));
        assert_eq!(a.state(), WifiState::Disconnected);
        assert!(a.connect().is_ok());
    }
}
