//! Recently viewed hymns, most recent first.
//!
//! Viewing a hymn again moves it to the front instead of adding a second
//! entry, and the history is capped at `limit` entries.

use std::sync::Arc;

use log::warn;

use crate::app_response::AppResponse;
use crate::config::VISITED_KEY;
use crate::kv_store::{KeyValueStore, KeyValueStoreExt};
use crate::models::VisitedItem;

pub struct VisitedStore {
    backend: Arc<dyn KeyValueStore>,
    limit: usize,
    items: Vec<VisitedItem>,
    loaded: bool,
}

impl VisitedStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, limit: usize) -> Self {
        Self {
            backend,
            limit: limit.max(1),
            items: Vec::new(),
            loaded: false,
        }
    }

    /// On a failed read the current items are kept and the store stays
    /// unloaded, so the next write reads again first.
    pub fn load(&mut self) -> &[VisitedItem] {
        if let Err(e) = self.read_items() {
            warn!("Error loading visited items: {e}");
        }
        &self.items
    }

    fn read_items(&mut self) -> Result<(), AppResponse> {
        let mut stored = self
            .backend
            .get_json::<Vec<VisitedItem>>(VISITED_KEY)?
            .unwrap_or_default();
        stored.truncate(self.limit);
        self.items = stored;
        self.loaded = true;
        Ok(())
    }

    pub fn items(&self) -> &[VisitedItem] {
        &self.items
    }

    pub fn record(&mut self, item: VisitedItem) -> Result<(), AppResponse> {
        if !self.loaded {
            self.read_items()?;
        }

        let number = item.number;
        let mut next = Vec::with_capacity(self.limit);
        next.push(item);
        next.extend(
            self.items
                .iter()
                .filter(|seen| seen.number != number)
                .take(self.limit - 1)
                .cloned(),
        );

        if let Err(e) = self.backend.set_json(VISITED_KEY, &next) {
            warn!("Error saving visited items: {e}");
            return Err(e);
        }
        self.items = next;
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), AppResponse> {
        if let Err(e) = self.backend.remove(VISITED_KEY) {
            warn!("Error clearing visited items: {e}");
            return Err(e);
        }
        self.items.clear();
        self.loaded = true;
        Ok(())
    }
}
