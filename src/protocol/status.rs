use serde::{Deserialize, Serialize};

use crate::service::MotdConfig;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default = "MotdConfig::default_version")]
pub struct Version {
    pub name: String,
    pub protocol: i32,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplePlayer {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default = "MotdConfig::default_players")]
pub struct Players {
    pub max: i32,
    pub online: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sample: Vec<SamplePlayer>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default = "MotdConfig::default_description")]
pub struct Description {
    pub text: String,
}

/// The document sent back for a status request.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: Version,
    pub players: Players,
    pub description: Description,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub favicon: String,
}

impl StatusResponse {
    /// `motd.favicon_path` has already been replaced by a data URI when the
    /// server starts, so it is copied as is.
    pub fn from_motd(motd: &MotdConfig) -> Self {
        StatusResponse {
            version: motd.version.clone(),
            players: motd.players.clone(),
            description: motd.description.clone(),
            favicon: motd.favicon_path.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
