use std::{collections::BTreeMap, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::EnumString;
use ts_rs::TS;

/// Widget kind carried by a fidget instance.
///
/// Unknown tags are kept verbatim in `Other` so documents written by newer
/// clients survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString)]
pub enum FidgetType {
    #[strum(serialize = "feed")]
    Feed,
    #[strum(serialize = "profile")]
    Profile,
    #[strum(serialize = "text")]
    Text,
    #[strum(serialize = "gallery")]
    Gallery,
    #[strum(serialize = "links")]
    Links,
    #[strum(serialize = "iframe")]
    Iframe,
    #[strum(serialize = "Rss")]
    Rss,
    #[strum(serialize = "Video")]
    Video,
    #[strum(serialize = "frame")]
    Frame,
    #[strum(serialize = "cast")]
    Cast,
    #[strum(serialize = "Chat")]
    Chat,
    #[strum(serialize = "Swap")]
    Swap,
    #[strum(serialize = "Market")]
    Market,
    #[strum(serialize = "governance")]
    Governance,
    #[strum(default)]
    Other(String),
}

impl FidgetType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Feed => "feed",
            Self::Profile => "profile",
            Self::Text => "text",
            Self::Gallery => "gallery",
            Self::Links => "links",
            Self::Iframe => "iframe",
            Self::Rss => "Rss",
            Self::Video => "Video",
            Self::Frame => "frame",
            Self::Cast => "cast",
            Self::Chat => "Chat",
            Self::Swap => "Swap",
            Self::Market => "Market",
            Self::Governance => "governance",
            Self::Other(tag) => tag.as_str(),
        }
    }
}

impl From<String> for FidgetType {
    fn from(tag: String) -> Self {
        FidgetType::from_str(&tag).unwrap_or(FidgetType::Other(tag))
    }
}

impl From<FidgetType> for String {
    fn from(kind: FidgetType) -> Self {
        kind.as_str().to_string()
    }
}

impl Serialize for FidgetType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FidgetType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(FidgetType::from)
    }
}

impl std::fmt::Display for FidgetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_editable() -> bool {
    true
}

/// Per-instance configuration. `settings` and `data` are opaque to the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct FidgetConfig {
    #[serde(default = "default_editable")]
    pub editable: bool,
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
}

impl Default for FidgetConfig {
    fn default() -> Self {
        Self {
            editable: true,
            settings: BTreeMap::new(),
            data: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct FidgetInstanceDatum {
    pub id: String,
    #[ts(type = "string")]
    pub fidget_type: FidgetType,
    #[serde(default)]
    pub config: FidgetConfig,
}

impl FidgetInstanceDatum {
    pub fn new(id: impl Into<String>, fidget_type: FidgetType) -> Self {
        Self {
            id: id.into(),
            fidget_type,
            config: FidgetConfig::default(),
        }
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.settings.insert(key.into(), value);
        self
    }
}
