//! MQTT broker adapter.
//!
//! Implements [`BrokerPort`] for the feeder's pub/sub link.
//!
//! ## Device
//!
//! `EspMqttClient` runs its own connection task.  A small forwarding thread
//! drains the connection events: connect/disconnect flip shared flags, and
//! received messages go into a bounded channel.  [`BrokerPort::poll`] empties
//! that channel into the caller's callback, so inbound traffic is only ever
//! seen from the control loop.
//!
//! The ESP client reconnects by itself after a drop, but a clean session
//! loses the subscriptions.  Every fresh session therefore reads as "not
//! connected" until [`BrokerPort::connect`] has acknowledged it, which makes
//! the core resubscribe.
//!
//! ## Host
//!
//! An in-memory broker with the same contract and the same [`SessionGate`]:
//! injected messages are delivered on `poll`, published messages are
//! recorded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use log::{info, warn};

use crate::adapters::device_id::DeviceIdString;
use crate::adapters::wifi::{ConnectivityPort, WifiAdapter};
use crate::app::ports::BrokerPort;
use crate::config::FeederConfig;
use crate::error::CommsError;

/// Longest topic forwarded to the core.
pub const MAX_TOPIC_LEN: usize = 64;
/// Longest payload forwarded to the core.
pub const MAX_PAYLOAD_LEN: usize = 64;
/// Messages buffered between two polls.
pub const INBOUND_QUEUE_DEPTH: usize = 8;

/// One inbound message, copied out of the client's buffers.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: heapless::String<MAX_TOPIC_LEN>,
    pub payload: heapless::Vec<u8, MAX_PAYLOAD_LEN>,
}

impl InboundMessage {
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        let mut t = heapless::String::new();
        t.push_str(topic).ok()?;
        let p = heapless::Vec::from_slice(payload).ok()?;
        Some(Self { topic: t, payload: p })
    }
}

// ═══════════════════════════════════════════════════════════════
// Session tracking
// ═══════════════════════════════════════════════════════════════

/// Connection state written by the client's event context.
#[derive(Debug, Default)]
pub struct Link {
    connected: AtomicBool,
    /// Incremented on every CONNACK.
    sessions: AtomicU32,
}

impl Link {
    pub fn on_connack(&self) {
        self.sessions.fetch_add(1, Ordering::AcqRel);
        self.connected.store(true, Ordering::Release);
    }

    pub fn on_disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }

    pub fn is_up(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn session(&self) -> u32 {
        self.sessions.load(Ordering::Acquire)
    }
}

/// Which session the control loop last subscribed on.
///
/// A session opened behind the loop's back (client auto-reconnect) reads as
/// not current until [`acknowledge`](Self::acknowledge) is called.
#[derive(Debug, Default)]
pub struct SessionGate {
    link: Arc<Link>,
    acked: u32,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for the event context.
    pub fn link(&self) -> Arc<Link> {
        self.link.clone()
    }

    /// Some session is up, current or not.
    pub fn is_up(&self) -> bool {
        self.link.is_up()
    }

    pub fn is_current(&self) -> bool {
        self.link.is_up() && self.link.session() == self.acked
    }

    /// Mark the live session as the one subscriptions were made on.
    /// Returns `false` when no session is up.
    pub fn acknowledge(&mut self) -> bool {
        if !self.link.is_up() {
            return false;
        }
        self.acked = self.link.session();
        true
    }
}

// ═══════════════════════════════════════════════════════════════
// ESP-IDF implementation
// ═══════════════════════════════════════════════════════════════

#[cfg(target_os = "espidf")]
mod esp {
    use super::*;

    use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

    use esp_idf_svc::mqtt::client::{
        EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
    };

    /// How long `connect` waits for the first CONNACK of a new client.
    const CONNECT_WAIT_MS: u32 = 3_000;
    const CONNECT_POLL_MS: u32 = 100;

    pub struct MqttBroker {
        url: heapless::String<96>,
        device_id: DeviceIdString,
        wifi: WifiAdapter,
        client: Option<EspMqttClient<'static>>,
        session: SessionGate,
        inbound: Option<Receiver<InboundMessage>>,
    }

    impl MqttBroker {
        pub fn new(config: &FeederConfig, device_id: DeviceIdString, wifi: WifiAdapter) -> Self {
            use core::fmt::Write;
            let mut url = heapless::String::new();
            let _ = write!(url, "mqtt://{}:{}", config.broker_host, config.broker_port);
            Self {
                url,
                device_id,
                wifi,
                client: None,
                session: SessionGate::new(),
                inbound: None,
            }
        }

        fn start_client(&mut self) -> Result<(), CommsError> {
            let conf = MqttClientConfiguration {
                client_id: Some(self.device_id.as_str()),
                ..Default::default()
            };
            let (client, connection) = EspMqttClient::new(self.url.as_str(), &conf)
                .map_err(|_| CommsError::BrokerUnavailable)?;

            let (tx, rx) = mpsc::sync_channel(INBOUND_QUEUE_DEPTH);
            let link = self.session.link();
            std::thread::Builder::new()
                .name("mqtt-events".into())
                .stack_size(6 * 1024)
                .spawn(move || forward_events(connection, link, tx))
                .map_err(|_| CommsError::BrokerUnavailable)?;

            info!("Broker: client started for {}", self.url);
            self.client = Some(client);
            self.inbound = Some(rx);
            Ok(())
        }

        fn wait_for_session(&self) -> bool {
            let mut waited = 0;
            while !self.session.is_up() && waited < CONNECT_WAIT_MS {
                esp_idf_hal::delay::FreeRtos::delay_ms(CONNECT_POLL_MS);
                waited += CONNECT_POLL_MS;
            }
            self.session.is_up()
        }
    }

    fn forward_events(
        mut connection: EspMqttConnection,
        link: Arc<Link>,
        tx: SyncSender<InboundMessage>,
    ) {
        while let Ok(event) = connection.next() {
            match event.payload() {
                EventPayload::Connected(_) => link.on_connack(),
                EventPayload::Disconnected => link.on_disconnect(),
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    ..
                } => match InboundMessage::new(topic, data) {
                    Some(msg) => match tx.try_send(msg) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            warn!("Broker: inbound queue full, message on {} dropped", topic)
                        }
                        Err(TrySendError::Disconnected(_)) => break,
                    },
                    None => warn!("Broker: oversized message on {} dropped", topic),
                },
                _ => {}
            }
        }
        link.on_disconnect();
        info!("Broker: connection event loop ended");
    }

    impl BrokerPort for MqttBroker {
        fn is_connected(&self) -> bool {
            self.session.is_current()
        }

        fn connect(&mut self) -> Result<(), CommsError> {
            self.wifi
                .connect()
                .map_err(|_| CommsError::WifiConnectFailed)?;

            if self.client.is_none() {
                self.start_client()?;
            }
            if !self.wait_for_session() || !self.session.acknowledge() {
                return Err(CommsError::BrokerUnavailable);
            }

            info!("DeviceID: {}", self.device_id);
            Ok(())
        }

        fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
            let client = self.client.as_mut().ok_or(CommsError::BrokerUnavailable)?;
            client
                .subscribe(topic, QoS::AtMostOnce)
                .map_err(|_| CommsError::SubscribeFailed)?;
            info!("Broker: subscribed to {}", topic);
            Ok(())
        }

        fn publish(&mut self, topic: &str, payload: &str) {
            if !self.session.is_up() {
                return;
            }
            let Some(client) = self.client.as_mut() else {
                return;
            };
            if client
                .publish(topic, QoS::AtMostOnce, false, payload.as_bytes())
                .is_err()
            {
                log::debug!("Broker: {} on {}", CommsError::PublishFailed, topic);
            }
        }

        fn poll(&mut self, on_message: &mut dyn FnMut(&str, &[u8])) {
            let Some(rx) = self.inbound.as_ref() else {
                return;
            };
            while let Ok(msg) = rx.try_recv() {
                on_message(&msg.topic, &msg.payload);
            }
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::MqttBroker;

// ═══════════════════════════════════════════════════════════════
// Host simulation
// ═══════════════════════════════════════════════════════════════

#[cfg(not(target_os = "espidf"))]
mod sim {
    use super::*;

    use std::collections::VecDeque;

    pub struct MqttBroker {
        device_id: DeviceIdString,
        wifi: WifiAdapter,
        session: SessionGate,
        subscriptions: Vec<String>,
        published: Vec<(String, String)>,
        inbound: VecDeque<InboundMessage>,
    }

    impl MqttBroker {
        pub fn new(config: &FeederConfig, device_id: DeviceIdString, wifi: WifiAdapter) -> Self {
            info!(
                "Broker(sim): mqtt://{}:{} (in-memory)",
                config.broker_host, config.broker_port
            );
            Self {
                device_id,
                wifi,
                session: SessionGate::new(),
                subscriptions: Vec::new(),
                published: Vec::new(),
                inbound: VecDeque::with_capacity(INBOUND_QUEUE_DEPTH),
            }
        }

        /// Queue a message as if a remote client had published it.
        pub fn inject(&mut self, topic: &str, payload: &[u8]) {
            if self.inbound.len() >= INBOUND_QUEUE_DEPTH {
                warn!("Broker(sim): inbound queue full, message on {} dropped", topic);
                return;
            }
            match InboundMessage::new(topic, payload) {
                Some(msg) => self.inbound.push_back(msg),
                None => warn!("Broker(sim): oversized message on {} dropped", topic),
            }
        }

        /// Drop the session; subscriptions are lost.
        pub fn drop_session(&mut self) {
            self.session.link().on_disconnect();
            self.subscriptions.clear();
        }

        /// Drop and re-open the session without going through `connect`,
        /// the way the device client reconnects by itself.
        pub fn auto_reconnect(&mut self) {
            self.drop_session();
            self.session.link().on_connack();
        }

        pub fn subscriptions(&self) -> &[String] {
            &self.subscriptions
        }

        pub fn published(&self) -> &[(String, String)] {
            &self.published
        }

        pub fn wifi_mut(&mut self) -> &mut WifiAdapter {
            &mut self.wifi
        }
    }

    impl BrokerPort for MqttBroker {
        fn is_connected(&self) -> bool {
            self.session.is_current()
        }

        fn connect(&mut self) -> Result<(), CommsError> {
            self.wifi
                .connect()
                .map_err(|_| CommsError::WifiConnectFailed)?;
            if !self.session.is_up() {
                self.session.link().on_connack();
            }
            self.session.acknowledge();
            info!("DeviceID: {}", self.device_id);
            Ok(())
        }

        fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
            if !self.session.is_up() {
                return Err(CommsError::SubscribeFailed);
            }
            if !self.subscriptions.iter().any(|t| t == topic) {
                self.subscriptions.push(topic.to_string());
            }
            Ok(())
        }

        fn publish(&mut self, topic: &str, payload: &str) {
            if self.session.is_up() {
                self.published.push((topic.to_string(), payload.to_string()));
            }
        }

        fn poll(&mut self, on_message: &mut dyn FnMut(&str, &[u8])) {
            if !self.session.is_up() {
                return;
            }
            while let Some(msg) = self.inbound.pop_front() {
                // Delivered only for subscribed topics, like a real broker.
                if self.subscriptions.iter().any(|t| t == msg.topic.as_str()) {
                    on_message(&msg.topic, &msg.payload);
                }
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub use sim::MqttBroker;

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::adapters::device_id::{device_id, read_mac};

    fn broker(with_credentials: bool) -> MqttBroker {
        let mut config = FeederConfig::default();
        if with_credentials {
            let _ = config.wifi_ssid.push_str("Kitchen");
            let _ = config.wifi_password.push_str("kibble123");
        }
        let mut wifi = WifiAdapter::new(&config.provisioning_ap);
        wifi.configure(&config);
        MqttBroker::new(&config, device_id(&read_mac()), wifi)
    }

    #[test]
    fn connect_needs_wifi() {
        let mut b = broker(false);
        assert_eq!(b.connect(), Err(CommsError::WifiConnectFailed));
        assert!(!b.is_connected());
    }

    #[test]
    fn wifi_failure_then_recovery() {
        let mut b = broker(true);
        b.wifi_mut().sim_fail_next(1);
        assert_eq!(b.connect(), Err(CommsError::WifiConnectFailed));
        assert_eq!(b.connect(), Ok(()));
        assert!(b.is_connected());
    }

    #[test]
    fn delivers_only_subscribed_topics_on_poll() {
        let mut b = broker(true);
        b.connect().unwrap();
        b.subscribe("pet-feeder/manual-feed").unwrap();
        b.inject("pet-feeder/manual-feed", b"2");
        b.inject("pet-feeder/other", b"x");

        let mut seen = Vec::new();
        b.poll(&mut |t, p| seen.push((t.to_string(), p.to_vec())));
        assert_eq!(seen, vec![("pet-feeder/manual-feed".to_string(), b"2".to_vec())]);

        let mut again = 0;
        b.poll(&mut |_, _| again += 1);
        assert_eq!(again, 0);
    }

    #[test]
    fn publish_dropped_while_disconnected() {
        let mut b = broker(true);
        b.publish("pet-feeder/distance", "12");
        assert!(b.published().is_empty());
        b.connect().unwrap();
        b.publish("pet-feeder/distance", "12");
        assert_eq!(b.published().len(), 1);
    }

    #[test]
    fn dropped_session_loses_subscriptions() {
        let mut b = broker(true);
        b.connect().unwrap();
        b.subscribe("pet-feeder/feeding-time").unwrap();
        b.drop_session();
        assert!(!b.is_connected());
        assert!(b.subscriptions().is_empty());
    }

    #[test]
    fn new_session_is_not_current_until_acknowledged() {
        let mut gate = SessionGate::new();
        let link = gate.link();
        assert!(!gate.is_current());
        assert!(!gate.acknowledge());

        link.on_connack();
        assert!(!gate.is_current());
        assert!(gate.acknowledge());
        assert!(gate.is_current());

        // Client reconnects on its own: up again, but a different session.
        link.on_disconnect();
        link.on_connack();
        assert!(link.is_up());
        assert!(!gate.is_current());
        assert!(gate.acknowledge());
        assert!(gate.is_current());
    }

    #[test]
    fn auto_reconnect_requires_connect_before_reporting_connected() {
        let mut b = broker(true);
        b.connect().unwrap();
        b.subscribe("pet-feeder/manual-feed").unwrap();
        assert!(b.is_connected());

        b.auto_reconnect();
        assert!(!b.is_connected());
        assert!(b.subscriptions().is_empty());

        b.connect().unwrap();
        b.subscribe("pet-feeder/manual-feed").unwrap();
        assert!(b.is_connected());
        assert_eq!(b.subscriptions(), ["pet-feeder/manual-feed".to_string()]);
    }

    #[test]
    fn oversized_message_is_dropped() {
        assert!(InboundMessage::new("t", &[b'1'; MAX_PAYLOAD_LEN + 1]).is_none());
        assert!(InboundMessage::new("t", b"08:30").is_some());
    }
}
