//! PetFeeder Firmware: Main Entry Point
//!
//! Hexagonal architecture around a single blocking control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter      MqttBroker       WallClock   LogEventSink│
//! │  (Actuator+Ranger)    (Broker+WiFi)    (Clock)     (EventSink) │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              FeederCore (pure logic)                   │    │
//! │  │  Inbox · Schedule · EdgeDetector · PortionPolicy       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

use petfeeder::adapters::broker::MqttBroker;
use petfeeder::adapters::device_id;
use petfeeder::adapters::hardware::HardwareAdapter;
use petfeeder::adapters::log_sink::LogEventSink;
use petfeeder::adapters::time::WallClock;
use petfeeder::adapters::wifi::{ConnectivityPort, WifiAdapter};
use petfeeder::app::service::{FeederCore, FeederPorts};
use petfeeder::config::FeederConfig;
use petfeeder::drivers::hw_init::{self, SysDelay};

/// Build-time configuration: optional JSON overrides plus WiFi credentials.
fn load_config() -> FeederConfig {
    let mut config = match option_env!("PETFEEDER_CONFIG") {
        Some(json) => match FeederConfig::from_json(json) {
            Ok(c) => {
                info!("Config: build-time overrides applied");
                c
            }
            Err(e) => {
                warn!("Config: overrides rejected ({}), using defaults", e);
                FeederConfig::default()
            }
        },
        None => FeederConfig::default(),
    };

    if let Some(ssid) = option_env!("PETFEEDER_WIFI_SSID") {
        config.wifi_ssid.clear();
        let _ = config.wifi_ssid.push_str(ssid);
    }
    if let Some(pass) = option_env!("PETFEEDER_WIFI_PASS") {
        config.wifi_password.clear();
        let _ = config.wifi_password.push_str(pass);
    }
    config
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PetFeeder v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = load_config();
    config.validate()?;

    // ── 3. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        error!("HAL init failed: {}", e);
        return Err(anyhow::anyhow!("HAL init failed: {}", e));
    }
    let hw = HardwareAdapter::from_config(&config);

    // ── 4. Network ────────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let driver = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?,
        sysloop,
    )?;

    let mut wifi = WifiAdapter::new(&config.provisioning_ap, driver);
    wifi.configure(&config);

    // SNTP needs the link, so bring it up before the clock.
    let mut delay = SysDelay;
    if !wifi.has_credentials() {
        error!("WiFi: cannot join a network without credentials");
        return Err(anyhow::anyhow!("no WiFi credentials"));
    }
    while let Err(e) = wifi.connect() {
        warn!(
            "WiFi: {}, retrying in {} s",
            e,
            config.reconnect_delay_ms / 1_000
        );
        delay.delay_ms(config.reconnect_delay_ms);
    }

    let clock = WallClock::new(&config)?;

    let dev_id = device_id::device_id(&device_id::read_mac());
    info!("DeviceID: {}", dev_id);
    let broker = MqttBroker::new(&config, dev_id, wifi);

    // ── 5. Core ───────────────────────────────────────────────
    let mut sink = LogEventSink::new();
    let mut feeder = FeederCore::new(
        &config,
        FeederPorts {
            hw,
            clock,
            broker,
            delay,
        },
    );
    feeder.start(&mut sink);

    info!("System ready. Entering control loop.");
    feeder.run(&mut sink)
}
