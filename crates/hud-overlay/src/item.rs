//! Item stacks, their persisted string tags, and the marker that triggers the overlay.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use mc_protocol::nbt::{NbtCompound, NbtValue};
use mc_protocol::{Slot, SlotItem, VarInt};
use serde::{Deserialize, Serialize};

use crate::error::HudError;

/// NBT key under which the host persists plugin string tags.
const PERSISTENT_VALUES: &str = "PublicBukkitValues";
const CUSTOM_MODEL_DATA: &str = "CustomModelData";

/// `namespace:key`, lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NamespacedKey {
    namespace: String,
    key: String,
}

impl NamespacedKey {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Result<Self, HudError> {
        let namespace = namespace.into();
        let key = key.into();
        let valid_ns = |c: char| matches!(c, 'a'..='z' | '0'..='9' | '.' | '_' | '-');
        if namespace.is_empty()
            || key.is_empty()
            || !namespace.chars().all(valid_ns)
            || !key.chars().all(|c| valid_ns(c) || c == '/')
        {
            return Err(HudError::InvalidKey(format!("{namespace}:{key}")));
        }
        Ok(Self { namespace, key })
    }

    /// For compile-time literals already known to be valid.
    pub(crate) fn from_static(namespace: &'static str, key: &'static str) -> Self {
        Self {
            namespace: namespace.to_string(),
            key: key.to_string(),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for NamespacedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.key)
    }
}

impl FromStr for NamespacedKey {
    type Err = HudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, key) = s
            .split_once(':')
            .ok_or_else(|| HudError::InvalidKey(s.to_string()))?;
        Self::new(namespace, key)
    }
}

impl TryFrom<String> for NamespacedKey {
    type Error = HudError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NamespacedKey> for String {
    fn from(key: NamespacedKey) -> Self {
        key.to_string()
    }
}

/// Item registry id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKind(pub i32);

/// Host-side item metadata: custom model data plus persisted string tags.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_model_data: Option<i32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    tags: BTreeMap<NamespacedKey, String>,
}

impl ItemMeta {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get_string(&self, key: &NamespacedKey) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn set_string(&mut self, key: NamespacedKey, value: impl Into<String>) {
        self.tags.insert(key, value.into());
    }

    pub fn remove(&mut self, key: &NamespacedKey) -> Option<String> {
        self.tags.remove(key)
    }

    #[must_use]
    pub fn has(&self, key: &NamespacedKey) -> bool {
        self.tags.contains_key(key)
    }

    fn is_empty(&self) -> bool {
        self.custom_model_data.is_none() && self.tags.is_empty()
    }

    fn to_nbt(&self) -> NbtCompound {
        let mut root = NbtCompound::new();
        if let Some(cmd) = self.custom_model_data {
            root.insert(CUSTOM_MODEL_DATA, cmd);
        }
        if !self.tags.is_empty() {
            let mut values = NbtCompound::new();
            for (key, value) in &self.tags {
                values.insert(key.to_string(), value.as_str());
            }
            root.insert(PERSISTENT_VALUES, values);
        }
        root
    }

    /// Inverse of `to_nbt`. Tags that are not strings or not `ns:key` are skipped.
    fn from_nbt(nbt: &NbtCompound) -> Self {
        let mut meta = Self {
            custom_model_data: nbt.get_int(CUSTOM_MODEL_DATA),
            tags: BTreeMap::new(),
        };
        if let Some(values) = nbt.get_compound(PERSISTENT_VALUES) {
            for (key, value) in values.iter() {
                if let (Ok(key), NbtValue::String(value)) = (key.parse::<NamespacedKey>(), value) {
                    meta.tags.insert(key, value.clone());
                }
            }
        }
        meta
    }
}

/// An item stack as the host stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub kind: ItemKind,
    pub count: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ItemMeta>,
}

impl ItemStack {
    #[must_use]
    pub fn new(kind: ItemKind, count: u8) -> Self {
        Self {
            kind,
            count,
            meta: None,
        }
    }

    /// Edit the metadata in place, creating it if the item has none yet.
    #[must_use]
    pub fn with_meta(mut self, edit: impl FnOnce(&mut ItemMeta)) -> Self {
        edit(self.meta.get_or_insert_with(ItemMeta::new));
        self
    }

    /// Whether `other` would merge into this stack.
    #[must_use]
    pub fn is_similar(&self, other: &Self) -> bool {
        self.kind == other.kind && self.meta == other.meta
    }

    /// Wire representation for slot-typed fields.
    #[must_use]
    pub fn to_slot(&self) -> Slot {
        let nbt = self
            .meta
            .as_ref()
            .filter(|meta| !meta.is_empty())
            .map(ItemMeta::to_nbt);
        Slot::from(SlotItem {
            item_id: VarInt(self.kind.0),
            count: self.count.min(i8::MAX as u8) as i8,
            nbt,
        })
    }

    /// Read an item back from its wire representation. `None` for the empty slot.
    #[must_use]
    pub fn from_slot(slot: &Slot) -> Option<Self> {
        let item = slot.item()?;
        Some(Self {
            kind: ItemKind(item.item_id.0),
            count: item.count.max(0) as u8,
            meta: item.nbt.as_ref().map(ItemMeta::from_nbt),
        })
    }
}

/// The persisted string tag whose presence mirrors an item onto the overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerTag {
    key: NamespacedKey,
    value: String,
}

impl MarkerTag {
    #[must_use]
    pub fn new(key: NamespacedKey, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &NamespacedKey {
        &self.key
    }

    /// Presence of the key is what counts; the stored value is not compared.
    #[must_use]
    pub fn is_present(&self, item: &ItemStack) -> bool {
        item.meta.as_ref().is_some_and(|meta| meta.has(&self.key))
    }

    pub fn apply(&self, meta: &mut ItemMeta) {
        meta.set_string(self.key.clone(), self.value.clone());
    }
}
