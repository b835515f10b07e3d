use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlockMode {
    /// Show a warning but allow access
    #[default]
    Warn,
    /// Completely block access
    Block,
}

impl FromStr for BlockMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "warn" => Ok(BlockMode::Warn),
            "block" => Ok(BlockMode::Block),
            other => Err(ValidationError::InvalidValue {
                field: "blockMode".into(),
                message: format!("expected 'warn' or 'block', got '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlockItemType {
    #[default]
    Website,
    Application,
}

impl FromStr for BlockItemType {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "website" => Ok(BlockItemType::Website),
            "application" | "app" => Ok(BlockItemType::Application),
            other => Err(ValidationError::InvalidValue {
                field: "itemType".into(),
                message: format!("expected 'website' or 'application', got '{other}'"),
            }),
        }
    }
}

impl fmt::Display for BlockItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockItemType::Website => f.write_str("website"),
            BlockItemType::Application => f.write_str("application"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedItem {
    pub id: String,
    pub name: String,
    pub url_pattern: String,
    pub item_type: BlockItemType,
    pub is_active: bool,
}

impl BlockedItem {
    pub fn new(name: &str, url_pattern: &str, item_type: BlockItemType) -> Result<Self> {
        ValidationError::check_not_empty("name", name)?;
        ValidationError::check_not_empty("urlPattern", url_pattern)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            url_pattern: url_pattern.trim().to_string(),
            item_type,
            is_active: true,
        })
    }
}

/// Blocker configuration. `blocked_items` keeps insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockerSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub block_mode: BlockMode,
    #[serde(default)]
    pub blocked_items: Vec<BlockedItem>,
    #[serde(default = "default_true")]
    pub allow_override: bool,
    /// Ceiling for a single override window, in seconds.
    #[serde(default = "default_override_timeout")]
    pub override_timeout: u32,
}

fn default_true() -> bool {
    true
}
fn default_override_timeout() -> u32 {
    300
}

impl Default for BlockerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            block_mode: BlockMode::Warn,
            blocked_items: Vec::new(),
            allow_override: true,
            override_timeout: default_override_timeout(),
        }
    }
}

impl BlockerSettings {
    pub fn item(&self, id: &str) -> Option<&BlockedItem> {
        self.blocked_items.iter().find(|i| i.id == id)
    }

    pub(crate) fn item_mut(&mut self, id: &str) -> Result<&mut BlockedItem> {
        self.blocked_items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| CoreError::NotFound {
                kind: "blocked item",
                id: id.to_string(),
            })
    }

    /// Hard-delete an item. Returns the removed item.
    pub(crate) fn remove_item(&mut self, id: &str) -> Result<BlockedItem> {
        let index = self
            .blocked_items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| CoreError::NotFound {
                kind: "blocked item",
                id: id.to_string(),
            })?;
        Ok(self.blocked_items.remove(index))
    }

    /// Patterns the enforcement gate should engage. Empty when disabled.
    pub fn active_patterns(&self) -> Vec<String> {
        if !self.enabled {
            return Vec::new();
        }
        self.blocked_items
            .iter()
            .filter(|i| i.is_active)
            .map(|i| i.url_pattern.clone())
            .collect()
    }

    /// First active item whose pattern occurs in `url`, ignoring overrides.
    pub fn matching_item(&self, url: &str) -> Option<&BlockedItem> {
        if !self.enabled {
            return None;
        }
        self.blocked_items
            .iter()
            .find(|item| item.is_active && url.contains(&item.url_pattern))
    }
}

/// Commonly blocked sites offered as one-click additions.
pub fn popular_distractions() -> Vec<&'static str> {
    vec![
        "youtube.com",
        "facebook.com",
        "twitter.com",
        "x.com",
        "instagram.com",
        "reddit.com",
        "tiktok.com",
        "netflix.com",
        "twitch.tv",
        "discord.com",
    ]
}

/// "youtube.com" -> "Youtube"
pub fn display_name_for(pattern: &str) -> String {
    let base = pattern.replace(".com", "").replace(".tv", "");
    let mut chars = base.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
