//! Overlay configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all) is a valid config.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::item::{ItemKind, ItemStack, MarkerTag, NamespacedKey};

/// Registry id of `minecraft:item_display` in protocol 765.
pub const ITEM_DISPLAY_KIND: i32 = 56;

/// Registry id of `minecraft:iron_nugget`; override when the host's item registry differs.
pub const IRON_NUGGET: i32 = 880;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HudConfig {
    pub marker: MarkerConfig,
    pub grant: GrantConfig,
    pub display: DisplayConfig,
}

impl HudConfig {
    /// Parse a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    #[must_use]
    pub fn marker_tag(&self) -> MarkerTag {
        MarkerTag::new(self.marker.key.clone(), self.marker.value.clone())
    }

    /// The single item the grant command hands out.
    #[must_use]
    pub fn marker_item(&self) -> ItemStack {
        let marker = self.marker_tag();
        ItemStack::new(ItemKind(self.grant.item_id), 1).with_meta(|meta| {
            meta.custom_model_data = Some(self.grant.custom_model_data);
            marker.apply(meta);
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub key: NamespacedKey,
    pub value: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            key: NamespacedKey::from_static("hud", "type"),
            value: "(´･ω･`)".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrantConfig {
    /// Name the grant command is registered under.
    pub command: String,
    pub item_id: i32,
    /// Selects the resource-pack model that carries the first-person transform.
    pub custom_model_data: i32,
}

impl Default for GrantConfig {
    fn default() -> Self {
        Self {
            command: "hud".to_string(),
            item_id: IRON_NUGGET,
            custom_model_data: 10,
        }
    }
}

/// Fixed presentation of the overlay entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub entity_kind: i32,
    /// Uniform scale applied to the rendered item.
    pub scale: f32,
    pub billboard: i8,
    pub display_context: i8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            entity_kind: ITEM_DISPLAY_KIND,
            scale: 100.0,
            billboard: 3,
            display_context: 4,
        }
    }
}
