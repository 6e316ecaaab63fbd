//! Runtime configuration for opening a [`HymnalState`](crate::hymnal_state::HymnalState).
//!
//! The configuration can be built in Rust or decoded from the JSON the host
//! application passes to `open_hymnal_with_config`. Every field has a default,
//! so `{"name":"himnario"}` is a complete configuration.

use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;
use crate::models::{FONT_SIZE_MAX, FONT_SIZE_MIN};

pub const DEFAULT_FONT_SIZE: u32 = 16;
pub const DEFAULT_MAP_SIZE: usize = 10 * 1024 * 1024;
pub const DEFAULT_VISITED_LIMIT: usize = 20;
pub const FAVORITES_KEY: &str = "favoritos";
pub const SETTINGS_KEY: &str = "userSettings";
pub const VISITED_KEY: &str = "visitedItems";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Storage name; the LMDB environment lives in `<name>.lmdb`.
    pub name: String,
    /// Maximum size of the LMDB memory map in bytes.
    pub map_size: usize,
    /// Font size reported before any value was saved. List screens use 16,
    /// the hymn detail screen 24.
    pub default_font_size: u32,
    pub favorites_key: String,
    /// Maximum number of recently viewed entries kept.
    pub visited_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "himnario".to_string(),
            map_size: DEFAULT_MAP_SIZE,
            default_font_size: DEFAULT_FONT_SIZE,
            favorites_key: FAVORITES_KEY.to_string(),
            visited_limit: DEFAULT_VISITED_LIMIT,
        }
    }
}

impl StoreConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, AppResponse> {
        let config: StoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppResponse> {
        if self.name.trim().is_empty() {
            return Err(AppResponse::ValidationError(
                "Store name cannot be empty".to_string(),
            ));
        }
        if !(FONT_SIZE_MIN..=FONT_SIZE_MAX).contains(&self.default_font_size) {
            return Err(AppResponse::ValidationError(format!(
                "default_font_size must be within [{FONT_SIZE_MIN}, {FONT_SIZE_MAX}]"
            )));
        }
        if self.favorites_key.is_empty() {
            return Err(AppResponse::ValidationError(
                "favorites_key cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn lmdb_dir(&self) -> String {
        format!("{}.lmdb", self.name)
    }
}
