//! The slice of the host server the overlay talks to: outbound packets and inventory reads.

use std::collections::VecDeque;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{HudError, Result};
use crate::item::ItemStack;

/// Number of hotbar slots; the held slot is always one of these.
pub const HOTBAR_SLOTS: usize = 9;
/// Hotbar plus main storage.
pub const INVENTORY_SLOTS: usize = 36;
pub const MAX_STACK: u8 = 64;

/// World position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Outbound half of one client connection. Frames are delivered in order.
pub trait PacketSink {
    fn send(&mut self, packet: Bytes);
}

/// Buffer for outgoing packets per connection
#[derive(Debug, Default, Clone)]
pub struct PacketBuffer {
    pub outgoing: VecDeque<Bytes>,
}

impl PacketBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_outgoing(&mut self, data: Bytes) {
        self.outgoing.push_back(data);
    }

    pub fn pop_outgoing(&mut self) -> Option<Bytes> {
        self.outgoing.pop_front()
    }

    /// Take everything queued so far.
    pub fn drain(&mut self) -> Vec<Bytes> {
        self.outgoing.drain(..).collect()
    }
}

impl PacketSink for PacketBuffer {
    fn send(&mut self, packet: Bytes) {
        self.push_outgoing(packet);
    }
}

impl PacketSink for Vec<Bytes> {
    fn send(&mut self, packet: Bytes) {
        self.push(packet);
    }
}

/// Read access to a player's items plus the one write the grant command needs.
pub trait Inventory {
    fn item(&self, slot: usize) -> Option<&ItemStack>;

    /// Currently held hotbar slot.
    fn selected_slot(&self) -> usize;

    fn item_in_main_hand(&self) -> Option<&ItemStack> {
        self.item(self.selected_slot())
    }

    /// Add `item`, merging into a similar stack first. Returns the slot it landed in, or `None`
    /// when there is no room.
    fn add_item(&mut self, item: ItemStack) -> Option<usize>;
}

/// In-memory player inventory: 9 hotbar slots followed by 27 storage slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInventory {
    slots: Vec<Option<ItemStack>>,
    selected: usize,
}

impl Default for PlayerInventory {
    fn default() -> Self {
        Self {
            slots: vec![None; INVENTORY_SLOTS],
            selected: 0,
        }
    }
}

impl PlayerInventory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `item` into `slot`, returning what was there.
    pub fn set(&mut self, slot: usize, item: Option<ItemStack>) -> Result<Option<ItemStack>> {
        let entry = self.slots.get_mut(slot).ok_or(HudError::InvalidSlot(slot))?;
        Ok(std::mem::replace(entry, item))
    }

    /// Change the held hotbar slot.
    pub fn select(&mut self, slot: usize) -> Result<()> {
        if slot >= HOTBAR_SLOTS {
            return Err(HudError::InvalidSlot(slot));
        }
        self.selected = slot;
        Ok(())
    }
}

impl Inventory for PlayerInventory {
    fn item(&self, slot: usize) -> Option<&ItemStack> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    fn selected_slot(&self) -> usize {
        self.selected
    }

    fn add_item(&mut self, item: ItemStack) -> Option<usize> {
        let merge = self.slots.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|s| s.is_similar(&item) && s.count.saturating_add(item.count) <= MAX_STACK)
        });
        if let Some(index) = merge {
            if let Some(stack) = self.slots[index].as_mut() {
                stack.count += item.count;
            }
            return Some(index);
        }

        let empty = self.slots.iter().position(Option::is_none)?;
        self.slots[empty] = Some(item);
        Some(empty)
    }
}
