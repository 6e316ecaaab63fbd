//! Owner of the single `userSettings` record.
//!
//! The record is read once with [`SettingsStore::load`]. Until then every read
//! answers with defaults. Writes always persist the whole record built from
//! the in-memory copy, and the in-memory copy only changes once the write
//! succeeded.

use std::sync::Arc;

use log::{info, warn};
use serde_json::Value as JsonValue;

use crate::app_response::AppResponse;
use crate::config::SETTINGS_KEY;
use crate::kv_store::{KeyValueStore, KeyValueStoreExt};
use crate::models::{
    clamp_font_size, SettingKey, SettingsRecord, SortOrder, UserList, FONT_SIZE_STEP,
};
use crate::user_lists::validate_lists;

pub struct SettingsStore {
    backend: Arc<dyn KeyValueStore>,
    default_font_size: u32,
    record: SettingsRecord,
    loaded: bool,
}

impl SettingsStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, default_font_size: u32) -> Self {
        Self {
            backend,
            default_font_size,
            record: SettingsRecord::with_font_size(default_font_size),
            loaded: false,
        }
    }

    /// Reads the persisted record, falling back to defaults field by field.
    /// Read failures are logged and leave the defaults in place; the store
    /// then stays unloaded so the next write reads again first.
    pub fn load(&mut self) -> &SettingsRecord {
        if let Err(e) = self.read_record() {
            warn!("Error loading settings, using defaults: {e}");
        }
        &self.record
    }

    fn read_record(&mut self) -> Result<(), AppResponse> {
        match self.backend.get_json::<JsonValue>(SETTINGS_KEY)? {
            Some(value) => {
                self.record = SettingsRecord::from_value(&value, self.default_font_size);
                info!(
                    "Settings loaded: fontSize={}, order={}, {} user lists",
                    self.record.font_size,
                    self.record.order.as_str(),
                    self.record.user_lists.len()
                );
            }
            None => info!("No stored settings; using defaults"),
        }
        self.loaded = true;
        Ok(())
    }

    /// Writes never start from a record that failed to load.
    pub(crate) fn ensure_loaded(&mut self) -> Result<(), AppResponse> {
        if !self.loaded {
            self.read_record()?;
        }
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn record(&self) -> &SettingsRecord {
        &self.record
    }

    /// Value of one settings field as JSON. Unknown keys yield `null`.
    pub fn get_value(&self, key: &str) -> JsonValue {
        let Some(key) = SettingKey::parse(key) else {
            warn!("Unknown settings key requested: {key}");
            return JsonValue::Null;
        };

        let value = match key {
            SettingKey::FontSize => serde_json::to_value(self.record.font_size),
            SettingKey::Order => serde_json::to_value(self.record.order),
            SettingKey::UserLists => serde_json::to_value(&self.record.user_lists),
        };

        value.unwrap_or_else(|e| {
            warn!("Error encoding setting '{}': {e}", key.as_str());
            JsonValue::Null
        })
    }

    /// Merges one field into the record and writes the whole record back.
    pub fn update_value(&mut self, key: &str, value: JsonValue) -> Result<(), AppResponse> {
        let setting = SettingKey::parse(key)
            .ok_or_else(|| AppResponse::ValidationError(format!("Unknown setting: {key}")))?;

        match setting {
            SettingKey::FontSize => {
                let size = value.as_f64().ok_or_else(|| {
                    AppResponse::ValidationError("fontSize must be a number".to_string())
                })?;
                self.set_font_size(size.round() as i64)
            }
            SettingKey::Order => {
                let order = value.as_str().and_then(SortOrder::parse).ok_or_else(|| {
                    AppResponse::ValidationError(format!("Unknown sort order: {value}"))
                })?;
                self.set_sort_order(order)
            }
            SettingKey::UserLists => {
                let lists: Vec<UserList> = serde_json::from_value(value).map_err(|e| {
                    AppResponse::ValidationError(format!("Invalid userLists: {e}"))
                })?;
                let lists = validate_lists(lists)?;
                self.commit(|record| record.user_lists = lists)
            }
        }
    }

    pub fn font_size(&self) -> u32 {
        self.record.font_size
    }

    /// Stores the size clamped to `[FONT_SIZE_MIN, FONT_SIZE_MAX]`.
    pub fn set_font_size(&mut self, size: i64) -> Result<(), AppResponse> {
        let size = clamp_font_size(size);
        self.commit(|record| record.font_size = size)
    }

    pub fn increase_font_size(&mut self) -> Result<u32, AppResponse> {
        self.ensure_loaded()?;
        let next = i64::from(self.font_size()) + i64::from(FONT_SIZE_STEP);
        self.set_font_size(next)?;
        Ok(self.font_size())
    }

    pub fn decrease_font_size(&mut self) -> Result<u32, AppResponse> {
        self.ensure_loaded()?;
        let next = i64::from(self.font_size()) - i64::from(FONT_SIZE_STEP);
        self.set_font_size(next)?;
        Ok(self.font_size())
    }

    pub fn sort_order(&self) -> SortOrder {
        self.record.order
    }

    pub fn set_sort_order(&mut self, order: SortOrder) -> Result<(), AppResponse> {
        self.commit(|record| record.order = order)
    }

    pub fn user_lists(&self) -> &[UserList] {
        &self.record.user_lists
    }

    /// Applies `mutate` to a copy of the record, persists the copy and only
    /// then swaps it in.
    pub(crate) fn commit<F>(&mut self, mutate: F) -> Result<(), AppResponse>
    where
        F: FnOnce(&mut SettingsRecord),
    {
        self.ensure_loaded()?;

        let mut next = self.record.clone();
        mutate(&mut next);

        if let Err(e) = self.backend.set_json(SETTINGS_KEY, &next) {
            warn!("Error saving settings: {e}");
            return Err(e);
        }

        self.record = next;
        Ok(())
    }
}
