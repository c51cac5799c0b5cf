//! Chat commands: a small registry plus the marker-granting command.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::HudConfig;
use crate::error::{HudError, Result};
use crate::host::{Inventory, PlayerInventory};
use crate::item::ItemStack;

/// Whoever issued a command.
pub trait CommandSender {
    fn name(&self) -> &str;

    /// The sender's inventory, or `None` for senders that are not players.
    fn inventory_mut(&mut self) -> Option<&mut dyn Inventory>;
}

/// The server console. Has no inventory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSender;

impl CommandSender for ConsoleSender {
    fn name(&self) -> &str {
        "CONSOLE"
    }

    fn inventory_mut(&mut self) -> Option<&mut dyn Inventory> {
        None
    }
}

#[derive(Debug)]
pub struct PlayerSender<'a> {
    pub name: &'a str,
    pub inventory: &'a mut PlayerInventory,
}

impl CommandSender for PlayerSender<'_> {
    fn name(&self) -> &str {
        self.name
    }

    fn inventory_mut(&mut self) -> Option<&mut dyn Inventory> {
        Some(&mut *self.inventory)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// The item landed in `slot`.
    Granted { slot: usize },
    NotAPlayer,
    InventoryFull,
}

pub trait CommandHandler {
    fn execute(&self, sender: &mut dyn CommandSender, args: &[&str]) -> Result<CommandOutcome>;
}

/// Gives the sender one overlay-marked item.
#[derive(Debug, Clone)]
pub struct GrantMarkerItem {
    item: ItemStack,
}

impl GrantMarkerItem {
    #[must_use]
    pub fn new(item: ItemStack) -> Self {
        Self { item }
    }

    #[must_use]
    pub fn from_config(config: &HudConfig) -> Self {
        Self::new(config.marker_item())
    }

    #[must_use]
    pub fn item(&self) -> &ItemStack {
        &self.item
    }
}

impl CommandHandler for GrantMarkerItem {
    fn execute(&self, sender: &mut dyn CommandSender, _args: &[&str]) -> Result<CommandOutcome> {
        let name = sender.name().to_string();
        let Some(inventory) = sender.inventory_mut() else {
            info!("{} tried to take an overlay item but is not a player", name);
            return Ok(CommandOutcome::NotAPlayer);
        };
        match inventory.add_item(self.item.clone()) {
            Some(slot) => {
                info!("Granted overlay item to {} in slot {}", name, slot);
                Ok(CommandOutcome::Granted { slot })
            }
            None => {
                info!("No room for overlay item in {}'s inventory", name);
                Ok(CommandOutcome::InventoryFull)
            }
        }
    }
}

/// Commands by name, without the leading slash.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Box<dyn CommandHandler>>,
}

impl CommandRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the grant command under its configured name.
    #[must_use]
    pub fn with_defaults(config: &HudConfig) -> Self {
        let mut registry = Self::new();
        registry.register(
            config.grant.command.clone(),
            GrantMarkerItem::from_config(config),
        );
        registry
    }

    /// Register `handler` under `name`, replacing any previous handler.
    pub fn register(&mut self, name: impl Into<String>, handler: impl CommandHandler + 'static) {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    /// Parse a command line (leading `/` optional) and run it for `sender`.
    pub fn dispatch(&self, line: &str, sender: &mut dyn CommandSender) -> Result<CommandOutcome> {
        let (name, args) =
            parse_command(line).ok_or_else(|| HudError::UnknownCommand(String::new()))?;
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| HudError::UnknownCommand(name.to_string()))?;

        info!("{} executed command: /{}", sender.name(), line.trim().trim_start_matches('/'));
        handler.execute(sender, &args)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn parse_command(input: &str) -> Option<(&str, Vec<&str>)> {
    let trimmed = input.trim().trim_start_matches('/');
    let mut parts = trimmed.split_whitespace();
    let name = parts.next()?;
    Some((name, parts.collect()))
}
