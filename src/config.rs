//! JSON device configuration and its mapping onto NVS entries.
//!
//! Every top-level field is optional. The resulting entries always appear in
//! the same order so that identical configurations produce identical images:
//!
//! | key             | type   | source                                  |
//! |-----------------|--------|-----------------------------------------|
//! | `deviceName`    | string | `device_name`                           |
//! | `wifiCount`     | u8     | `min(len(wifi_networks), 5)`            |
//! | `wifi{i}ssid`   | string | `wifi_networks[i].ssid`                 |
//! | `wifi{i}pass`   | string | `wifi_networks[i].password`             |
//! | `mqttServer`    | string | `mqtt_server`                           |
//! | `mqttPort`      | u16    | `mqtt_port`, 1883 when absent           |
//! | `mqttCmdTopic`  | string | `mqtt_topics.command`                   |
//! | `mqttStatTopic` | string | `mqtt_topics.status`                    |
//! | `apiInflux`     | string | `api_endpoints.influxdb`                |
//! | `apiFwUpdate`   | string | `api_endpoints.firmware`                |
//! | `initialized`   | u8     | always 1                                |

use std::fs;
use std::path::Path;

use serde::{
    Deserialize,
    Serialize,
};
use tracing::warn;

use crate::error::Error;
use crate::partition::DataValue;
use crate::NvsPartition;

/// The firmware only reads this many Wi-Fi slots.
pub const MAX_WIFI_NETWORKS: usize = 5;

pub const DEFAULT_MQTT_PORT: u16 = 1883;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(default)]
    pub wifi_networks: Vec<WifiNetwork>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt_server: Option<String>,
    /// Kept wide so that out-of-range ports are reported instead of wrapped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt_port: Option<i64>,
    #[serde(default)]
    pub mqtt_topics: MqttTopics,
    #[serde(default)]
    pub api_endpoints: ApiEndpoints,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiNetwork {
    pub ssid: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttTopics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub influxdb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware: Option<String>,
}

impl DeviceConfig {
    /// Parse a configuration from JSON text.
    ///
    /// Malformed JSON and missing required sub-fields (a Wi-Fi network without
    /// `ssid` or `password`) are reported as [`Error::InvalidConfiguration`].
    pub fn from_json(content: &str) -> Result<Self, Error> {
        serde_json::from_str(content).map_err(|e| Error::InvalidConfiguration(e.to_string()))
    }

    /// Read and parse a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// The broker port to store, falling back to [`DEFAULT_MQTT_PORT`].
    pub fn mqtt_port(&self) -> Result<u16, Error> {
        match self.mqtt_port {
            None => Ok(DEFAULT_MQTT_PORT),
            Some(port) => u16::try_from(port).map_err(|_| {
                Error::InvalidConfiguration(format!("mqtt_port {port} is out of range"))
            }),
        }
    }

    /// Map this configuration onto the entries of the `device_cfg` namespace.
    pub fn to_partition(&self) -> Result<NvsPartition, Error> {
        let mut partition = NvsPartition::new();

        if let Some(name) = &self.device_name {
            partition.push("deviceName", DataValue::String(name.clone()))?;
        }

        if self.wifi_networks.len() > MAX_WIFI_NETWORKS {
            warn!(
                configured = self.wifi_networks.len(),
                kept = MAX_WIFI_NETWORKS,
                "ignoring surplus Wi-Fi networks"
            );
        }
        let networks = &self.wifi_networks[..self.wifi_networks.len().min(MAX_WIFI_NETWORKS)];
        // at most MAX_WIFI_NETWORKS, always fits
        partition.push("wifiCount", DataValue::U8(networks.len() as u8))?;
        for (idx, net) in networks.iter().enumerate() {
            partition.push(format!("wifi{idx}ssid"), DataValue::String(net.ssid.clone()))?;
            partition.push(
                format!("wifi{idx}pass"),
                DataValue::String(net.password.clone()),
            )?;
        }

        if let Some(server) = &self.mqtt_server {
            partition.push("mqttServer", DataValue::String(server.clone()))?;
        }
        partition.push("mqttPort", DataValue::U16(self.mqtt_port()?))?;

        if let Some(command) = &self.mqtt_topics.command {
            partition.push("mqttCmdTopic", DataValue::String(command.clone()))?;
        }
        if let Some(status) = &self.mqtt_topics.status {
            partition.push("mqttStatTopic", DataValue::String(status.clone()))?;
        }

        if let Some(influxdb) = &self.api_endpoints.influxdb {
            partition.push("apiInflux", DataValue::String(influxdb.clone()))?;
        }
        if let Some(firmware) = &self.api_endpoints.firmware {
            partition.push("apiFwUpdate", DataValue::String(firmware.clone()))?;
        }

        partition.push("initialized", DataValue::U8(1))?;

        Ok(partition)
    }
}
