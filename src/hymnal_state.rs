//! Single state holder for the app: one backend, every store, the active list
//! draft and the change listeners.
//!
//! All mutations go through `&mut self`, so each persisted record is produced
//! from the one in-memory copy and two updates can never overwrite each
//! other's changes.

use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::app_response::AppResponse;
use crate::config::StoreConfig;
use crate::favorites_store::FavoritesStore;
use crate::kv_store::{KeyValueStore, LmdbStore, MemoryStore};
use crate::list_draft::{LeaveChoice, LeaveDecision, ListDraft};
use crate::models::{Favorite, Hymn, SortOrder, UserList, VisitedItem};
use crate::settings_store::SettingsStore;
use crate::visited_store::VisitedStore;

/// Sent to listeners after a successful mutation so the UI can re-render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StoreEvent {
    SettingsChanged,
    FavoritesChanged,
    ListsChanged,
    VisitedChanged,
}

type Listener = Box<dyn Fn(StoreEvent) + Send>;

pub struct HymnalState {
    config: StoreConfig,
    backend: Arc<dyn KeyValueStore>,
    settings: SettingsStore,
    favorites: FavoritesStore,
    visited: VisitedStore,
    draft: Option<ListDraft>,
    listeners: Vec<Listener>,
}

impl HymnalState {
    /// Opens the LMDB storage named by `config` and loads every record.
    pub fn open(config: StoreConfig) -> Result<Self, AppResponse> {
        config.validate()?;
        let backend = LmdbStore::open(&config)?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    /// Volatile state, nothing survives the process.
    pub fn in_memory(config: StoreConfig) -> Self {
        Self::with_backend(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_backend(config: StoreConfig, backend: Arc<dyn KeyValueStore>) -> Self {
        let mut settings = SettingsStore::new(backend.clone(), config.default_font_size);
        let mut favorites = FavoritesStore::new(backend.clone(), config.favorites_key.clone());
        let mut visited = VisitedStore::new(backend.clone(), config.visited_limit);

        settings.load();
        favorites.refresh(settings.sort_order());
        visited.load();

        info!("Hymnal state '{}' ready", config.name);
        Self {
            config,
            backend,
            settings,
            favorites,
            visited,
            draft: None,
            listeners: Vec::new(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: Fn(StoreEvent) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&self, event: StoreEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    // Settings

    pub fn get_setting(&self, key: &str) -> JsonValue {
        self.settings.get_value(key)
    }

    pub fn update_setting(&mut self, key: &str, value: JsonValue) -> Result<(), AppResponse> {
        self.settings.update_value(key, value)?;
        if key == "userLists" {
            self.sync_draft();
            self.notify(StoreEvent::ListsChanged);
        } else {
            self.notify(StoreEvent::SettingsChanged);
        }
        Ok(())
    }

    pub fn font_size(&self) -> u32 {
        self.settings.font_size()
    }

    pub fn set_font_size(&mut self, size: i64) -> Result<u32, AppResponse> {
        self.settings.set_font_size(size)?;
        self.notify(StoreEvent::SettingsChanged);
        Ok(self.settings.font_size())
    }

    pub fn increase_font_size(&mut self) -> Result<u32, AppResponse> {
        let size = self.settings.increase_font_size()?;
        self.notify(StoreEvent::SettingsChanged);
        Ok(size)
    }

    pub fn decrease_font_size(&mut self) -> Result<u32, AppResponse> {
        let size = self.settings.decrease_font_size()?;
        self.notify(StoreEvent::SettingsChanged);
        Ok(size)
    }

    pub fn sort_order(&self) -> SortOrder {
        self.settings.sort_order()
    }

    /// Persists the order. Favorites pick it up on the next `favorites_list`.
    pub fn set_sort_order(&mut self, order: SortOrder) -> Result<(), AppResponse> {
        self.settings.set_sort_order(order)?;
        self.notify(StoreEvent::SettingsChanged);
        Ok(())
    }

    // Favorites

    pub fn favorites(&self) -> &[Favorite] {
        self.favorites.favorites()
    }

    /// Re-reads favorites from storage, sorted by the saved sort order.
    pub fn favorites_list(&mut self) -> Vec<Favorite> {
        let order = self.settings.sort_order();
        self.favorites.refresh(order).to_vec()
    }

    pub fn is_favorite(&self, number: u32) -> bool {
        self.favorites.contains(number)
    }

    pub fn add_favorite(&mut self, hymn: Hymn) -> Result<bool, AppResponse> {
        let added = self.favorites.add(hymn)?;
        if added {
            self.notify(StoreEvent::FavoritesChanged);
        }
        Ok(added)
    }

    pub fn remove_favorite(&mut self, number: u32) -> Result<bool, AppResponse> {
        let removed = self.favorites.remove(number)?;
        if removed {
            self.notify(StoreEvent::FavoritesChanged);
        }
        Ok(removed)
    }

    /// Adds or removes the hymn; returns whether it is a favorite afterwards.
    pub fn toggle_favorite(&mut self, hymn: Hymn) -> Result<bool, AppResponse> {
        if self.favorites.contains(hymn.number) {
            self.remove_favorite(hymn.number)?;
            Ok(false)
        } else {
            self.add_favorite(hymn)?;
            Ok(true)
        }
    }

    pub fn sort_favorites(&mut self, order: SortOrder) -> Vec<Favorite> {
        let sorted = self.favorites.sort(order).to_vec();
        self.notify(StoreEvent::FavoritesChanged);
        sorted
    }

    pub fn clear_favorites(&mut self) -> Result<(), AppResponse> {
        self.favorites.clear()?;
        self.notify(StoreEvent::FavoritesChanged);
        Ok(())
    }

    // User lists

    pub fn user_lists(&self) -> &[UserList] {
        self.settings.user_lists()
    }

    pub fn get_list(&self, id: i64) -> Option<&UserList> {
        self.settings.get_list(id)
    }

    pub fn create_list(&mut self, name: &str) -> Result<UserList, AppResponse> {
        let list = self.settings.create_list(name)?;
        self.notify(StoreEvent::ListsChanged);
        Ok(list)
    }

    pub fn rename_list(&mut self, id: i64, name: &str) -> Result<UserList, AppResponse> {
        let list = self.settings.rename_list(id, name)?;
        self.sync_draft();
        self.notify(StoreEvent::ListsChanged);
        Ok(list)
    }

    pub fn delete_list(&mut self, id: i64) -> Result<bool, AppResponse> {
        let deleted = self.settings.delete_list(id)?;
        if deleted {
            if self.draft.as_ref().is_some_and(|d| d.list_id() == id) {
                self.draft = None;
            }
            self.notify(StoreEvent::ListsChanged);
        }
        Ok(deleted)
    }

    pub fn add_hymn_to_list(&mut self, id: i64, number: &str) -> Result<bool, AppResponse> {
        let added = self.settings.add_hymn_to_list(id, number)?;
        if added {
            self.sync_draft();
            self.notify(StoreEvent::ListsChanged);
        }
        Ok(added)
    }

    pub fn remove_hymn_from_list(&mut self, id: i64, number: &str) -> Result<bool, AppResponse> {
        let removed = self.settings.remove_hymn_from_list(id, number)?;
        if removed {
            self.sync_draft();
            self.notify(StoreEvent::ListsChanged);
        }
        Ok(removed)
    }

    // List draft (edit mode of the list screen)

    /// Opens the list screen for `id`, replacing any previous draft.
    pub fn begin_draft(&mut self, id: i64) -> Result<&ListDraft, AppResponse> {
        let list = self
            .settings
            .get_list(id)
            .cloned()
            .ok_or_else(|| AppResponse::NotFound(format!("No list found with id: {id}")))?;
        Ok(self.draft.insert(ListDraft::new(list)))
    }

    pub fn draft(&self) -> Option<&ListDraft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Result<&mut ListDraft, AppResponse> {
        self.draft
            .as_mut()
            .ok_or_else(|| AppResponse::BadRequest("No list is open".to_string()))
    }

    pub fn confirm_draft(&mut self) -> Result<bool, AppResponse> {
        let draft = self
            .draft
            .as_mut()
            .ok_or_else(|| AppResponse::BadRequest("No list is open".to_string()))?;
        let result = draft.confirm(&mut self.settings);
        self.sync_draft();

        let wrote = result?;
        if wrote {
            self.notify(StoreEvent::ListsChanged);
        }
        Ok(wrote)
    }

    pub fn discard_draft(&mut self) -> Result<(), AppResponse> {
        self.draft_mut()?.discard();
        self.sync_draft();
        Ok(())
    }

    pub fn request_leave(&self) -> LeaveDecision {
        self.draft
            .as_ref()
            .map_or(LeaveDecision::Proceed, ListDraft::request_leave)
    }

    /// Applies the leave dialog answer. When navigation proceeds the draft
    /// is closed.
    pub fn resolve_leave(&mut self, choice: LeaveChoice) -> Result<bool, AppResponse> {
        let Some(draft) = self.draft.as_mut() else {
            return Ok(true);
        };

        let was_dirty = draft.has_pending_changes();
        let proceed = match draft.resolve_leave(choice, &mut self.settings) {
            Ok(proceed) => proceed,
            Err(e) => {
                self.sync_draft();
                return Err(e);
            }
        };
        if proceed {
            self.draft = None;
            if was_dirty && choice == LeaveChoice::Save {
                self.notify(StoreEvent::ListsChanged);
            }
        }
        Ok(proceed)
    }

    fn sync_draft(&mut self) {
        let Some(draft) = self.draft.as_mut() else {
            return;
        };
        match self.settings.get_list(draft.list_id()) {
            Some(list) => draft.sync(list),
            None => {
                warn!("Open list {} no longer exists; closing it", draft.list_id());
                self.draft = None;
            }
        }
    }

    // Recently viewed

    pub fn visited(&self) -> &[VisitedItem] {
        self.visited.items()
    }

    pub fn record_visit(&mut self, item: VisitedItem) -> Result<(), AppResponse> {
        self.visited.record(item)?;
        self.notify(StoreEvent::VisitedChanged);
        Ok(())
    }

    pub fn clear_visited(&mut self) -> Result<(), AppResponse> {
        self.visited.clear()?;
        self.notify(StoreEvent::VisitedChanged);
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), AppResponse> {
        self.draft = None;
        self.backend.close()
    }
}
