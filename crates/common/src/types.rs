//! Wire models of the signage platform API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::error::{Error, Result};

/// Playback state reported by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Offline,
    Playback,
    Pause,
    Empty,
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceStatus::Offline => write!(f, "offline"),
            DeviceStatus::Playback => write!(f, "playback"),
            DeviceStatus::Pause => write!(f, "pause"),
            DeviceStatus::Empty => write!(f, "empty"),
        }
    }
}

/// Remote-control command understood by the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActionCommand {
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "escape")]
    Escape,
    #[serde(rename = "continue")]
    Continue,
    #[serde(rename = "restart")]
    Restart,
    #[serde(rename = "reboot")]
    Reboot,
    #[serde(rename = "shutdown")]
    Shutdown,
    #[serde(rename = "rotateMainScreen")]
    RotateScreen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActionEvent {
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "command")]
    Command,
    #[serde(rename = "update")]
    Update,
}

/// Screen rotation, serialized as a plain number of degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum Degree {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl From<Degree> for u16 {
    fn from(degree: Degree) -> Self {
        match degree {
            Degree::Deg0 => 0,
            Degree::Deg90 => 90,
            Degree::Deg180 => 180,
            Degree::Deg270 => 270,
        }
    }
}

impl TryFrom<u16> for Degree {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0 => Ok(Degree::Deg0),
            90 => Ok(Degree::Deg90),
            180 => Ok(Degree::Deg180),
            270 => Ok(Degree::Deg270),
            other => Err(Error::InvalidValue {
                field: "degree".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeatUnit {
    #[serde(rename = "ss")]
    Second,
    #[serde(rename = "mm")]
    Minute,
    #[serde(rename = "hh")]
    Hour,
    #[serde(rename = "dd")]
    Day,
    #[serde(rename = "ww")]
    Week,
    #[serde(rename = "MM")]
    Month,
    #[serde(rename = "yy")]
    Year,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repeat {
    pub every: u32,
    pub unit: RepeatUnit,
}

/// Action payload of a device command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub command: ActionCommand,
    #[serde(default)]
    pub event: ActionEvent,
    #[serde(default)]
    pub params: Vec<serde_json::Value>,
    #[serde(rename = "type", default = "system_action")]
    pub kind: String,
}

fn system_action() -> String {
    "system".to_string()
}

impl Action {
    pub fn new(command: ActionCommand, event: ActionEvent) -> Self {
        Self {
            command,
            event,
            params: Vec::new(),
            kind: system_action(),
        }
    }

    pub fn with_params(mut self, params: Vec<serde_json::Value>) -> Self {
        self.params = params;
        self
    }
}

/// A queued device command; only `action` is required
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<Repeat>,
}

impl Command {
    pub fn immediate(action: Action) -> Self {
        Self {
            id: None,
            action,
            execute_at: None,
            repeat: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdsZoneResolution {
    pub height: u32,
    pub width: u32,
}

/// Partial device update; unset fields are left out of the request body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ads_zone_resolution: Option<AdsZoneResolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<Command>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p2p_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_control: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_bulk_update: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<i64>>,
}

impl DeviceUpdate {
    /// Update carrying a single command to execute right away
    pub fn command(action: Action) -> Self {
        Self {
            commands: Some(vec![Command::immediate(action)]),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMetrics {
    pub status: DeviceStatus,
    #[serde(default)]
    pub project_id: i64,
    #[serde(default)]
    pub campaign_id: i64,
    #[serde(default)]
    pub need_to_download: i64,
    #[serde(default)]
    pub downloaded: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    pub private_ip: String,
    pub hardware_address: String,
    pub net_mask: String,
    pub is_active: bool,
}

impl Interface {
    pub fn validate(&self) -> Result<()> {
        check_ip("private_ip", &self.private_ip)?;
        check_mac("hardware_address", &self.hardware_address)?;
        check_ip("net_mask", &self.net_mask)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub public_ip: String,
    #[serde(default)]
    pub interfaces: Vec<Interface>,
}

/// Device record as returned by the device endpoint.
///
/// Only the fields the suite reads are modelled; everything else in the
/// response is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub player_metrics: PlayerMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networks: Option<Network>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<Command>>,
}

impl DeviceInfo {
    pub fn status(&self) -> DeviceStatus {
        self.player_metrics.status
    }

    /// Check address fields the platform reports as free-form strings
    pub fn validate(&self) -> Result<()> {
        if let Some(network) = &self.networks {
            for iface in &network.interfaces {
                iface.validate()?;
            }
        }
        Ok(())
    }
}

/// Descriptor of the latest screenshot captured by a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotInfo {
    #[serde(default)]
    pub file: String,
    /// Absent until the device has produced its first screenshot
    #[serde(default)]
    pub ts: i64,
}

impl ScreenshotInfo {
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.ts, 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Playing,
    Paused,
    Stopped,
}

/// Partial campaign update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CampaignStatus>,
}

fn check_ip(field: &str, value: &str) -> Result<()> {
    value.parse::<IpAddr>().map(|_| ()).map_err(|_| Error::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}

fn check_mac(field: &str, value: &str) -> Result<()> {
    let octets: Vec<&str> = value.split(|c| c == ':' || c == '-').collect();
    let valid = octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}
