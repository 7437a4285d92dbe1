//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements         | Connects to                  |
//! |-------------|--------------------|------------------------------|
//! | `hardware`  | ActuatorPort       | Stepper coils (GPIO)         |
//! |             | RangerPort         | Ultrasonic ranger (GPIO)     |
//! | `broker`    | BrokerPort         | MQTT broker over WiFi        |
//! | `time`      | ClockPort          | System clock + SNTP          |
//! | `wifi`      | ConnectivityPort   | ESP-IDF WiFi STA             |
//! | `log_sink`  | EventSink          | Serial log output            |
//! | `device_id` | —                  | Factory MAC (eFuse)          |

pub mod broker;
pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod time;
pub mod wifi;
