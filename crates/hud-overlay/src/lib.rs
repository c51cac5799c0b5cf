//! First-person item overlay built from client-only display entities.
//!
//! Each connected player gets one phantom `item_display` entity that exists only on their own
//! client. It is spawned at the player's eyes, mounted on the player, and shows a copy of the
//! held item whenever that item carries the marker tag. The server's world model never learns
//! about it; everything here is packet choreography.
//!
//! The host drives an [`OverlayController`] with join, held-slot and disconnect events and hands
//! it a [`PacketSink`] for the player's connection.

pub mod builder;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod host;
pub mod identity;
pub mod item;
pub mod packets;

pub use builder::{DisplayField, MessageBuilder};
pub use command::{
    CommandHandler, CommandOutcome, CommandRegistry, CommandSender, ConsoleSender,
    GrantMarkerItem, PlayerSender,
};
pub use config::HudConfig;
pub use controller::{
    Effect, JoinContext, OverlayController, OverlayEvent, OverlaySession, OverlayState,
    Visibility, transition,
};
pub use error::{HudError, Result};
pub use host::{Inventory, PacketBuffer, PacketSink, PlayerInventory, Position};
pub use identity::{EntityId, OverlayId};
pub use item::{ItemKind, ItemMeta, ItemStack, MarkerTag, NamespacedKey};
