use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use super::{
    fidget::{FidgetInstanceDatum, FidgetType},
    grid_layout::GridItem,
};

fn default_layout_fidget() -> String {
    "grid".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridLayoutConfig {
    #[serde(default)]
    pub layout: Vec<GridItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDetails {
    #[serde(default = "default_layout_fidget")]
    pub layout_fidget: String,
    #[serde(default)]
    pub layout_config: GridLayoutConfig,
}

impl Default for LayoutDetails {
    fn default() -> Self {
        Self {
            layout_fidget: default_layout_fidget(),
            layout_config: GridLayoutConfig::default(),
        }
    }
}

/// Everything a single tab renders: the grid placements plus the fidget
/// instances they reference.
///
/// Top-level keys this type does not know are kept in `extra` and written
/// back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabConfiguration {
    #[serde(rename = "layoutID", default, skip_serializing_if = "Option::is_none")]
    pub layout_id: Option<String>,
    #[serde(default)]
    pub layout_details: LayoutDetails,
    #[serde(default)]
    pub fidget_instance_datums: BTreeMap<String, FidgetInstanceDatum>,
    #[serde(default)]
    pub fidget_tray_contents: Vec<FidgetInstanceDatum>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Value>,
    #[serde(default = "default_true")]
    pub is_editable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for TabConfiguration {
    fn default() -> Self {
        Self {
            layout_id: None,
            layout_details: LayoutDetails::default(),
            fidget_instance_datums: BTreeMap::new(),
            fidget_tray_contents: Vec::new(),
            theme: None,
            is_editable: true,
            timestamp: None,
            extra: BTreeMap::new(),
        }
    }
}

impl TabConfiguration {
    pub fn layout(&self) -> &[GridItem] {
        &self.layout_details.layout_config.layout
    }

    pub fn layout_mut(&mut self) -> &mut Vec<GridItem> {
        &mut self.layout_details.layout_config.layout
    }

    fn has_fidget_type(&self, kind: &FidgetType) -> bool {
        self.fidget_instance_datums
            .values()
            .any(|datum| &datum.fidget_type == kind)
    }

    /// Whether a feed fidget is present, which narrows the grid to 6 columns.
    pub fn has_feed(&self) -> bool {
        self.has_fidget_type(&FidgetType::Feed)
    }

    /// Whether a profile fidget is present, which shortens the grid to 8 rows.
    pub fn has_profile(&self) -> bool {
        self.has_fidget_type(&FidgetType::Profile)
    }
}

/// Ordered tab names of a space, stored at `{spaceId}/tabOrder`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct TabOrder {
    pub tab_order: Vec<String>,
}
