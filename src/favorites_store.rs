//! Persisted favorites, stored as a JSON array of hymn references.
//!
//! The store is parameterized by storage key; the app uses `"favoritos"`.
//! Order in memory is transient: it is whatever the last [`FavoritesStore::refresh`]
//! or [`FavoritesStore::sort`] produced.

use std::sync::Arc;

use log::{info, warn};

use crate::app_response::AppResponse;
use crate::kv_store::{KeyValueStore, KeyValueStoreExt};
use crate::models::{Favorite, Hymn, SortOrder};
use crate::ordering::sort_hymns;

pub struct FavoritesStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
    favorites: Vec<Favorite>,
    loaded: bool,
}

impl FavoritesStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            favorites: Vec::new(),
            loaded: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Re-reads storage without changing the stored order. On failure the
    /// in-memory list is kept and the store stays unloaded, so the next
    /// write reads again first.
    pub fn load(&mut self) -> &[Favorite] {
        if let Err(e) = self.read_favorites() {
            warn!("Error loading favorites: {e}");
        }
        &self.favorites
    }

    fn read_favorites(&mut self) -> Result<(), AppResponse> {
        self.favorites = match self.backend.get_json::<Vec<Favorite>>(&self.key)? {
            Some(stored) => dedupe(stored),
            None => Vec::new(),
        };
        self.loaded = true;
        Ok(())
    }

    /// Re-reads storage and applies `order`. Call again after the sort order
    /// setting changes.
    pub fn refresh(&mut self, order: SortOrder) -> &[Favorite] {
        self.load();
        sort_hymns(&mut self.favorites, order);
        &self.favorites
    }

    pub fn favorites(&self) -> &[Favorite] {
        &self.favorites
    }

    pub fn contains(&self, number: u32) -> bool {
        self.favorites.iter().any(|fav| fav.number == number)
    }

    /// Adds a hymn unless one with the same number is already a favorite.
    /// Returns whether the list changed.
    pub fn add(&mut self, hymn: Hymn) -> Result<bool, AppResponse> {
        self.ensure_loaded()?;
        if self.contains(hymn.number) {
            return Ok(false);
        }

        let number = hymn.number;
        let mut next = self.favorites.clone();
        next.push(hymn);
        self.persist(next)?;

        info!("Hymn {number} added to favorites");
        Ok(true)
    }

    /// Returns whether a favorite with that number existed.
    pub fn remove(&mut self, number: u32) -> Result<bool, AppResponse> {
        self.ensure_loaded()?;
        if !self.contains(number) {
            return Ok(false);
        }

        let next: Vec<Favorite> = self
            .favorites
            .iter()
            .filter(|fav| fav.number != number)
            .cloned()
            .collect();
        self.persist(next)?;

        info!("Hymn {number} removed from favorites");
        Ok(true)
    }

    /// In-memory only; nothing is written.
    pub fn sort(&mut self, order: SortOrder) -> &[Favorite] {
        sort_hymns(&mut self.favorites, order);
        &self.favorites
    }

    pub fn clear(&mut self) -> Result<(), AppResponse> {
        if let Err(e) = self.backend.remove(&self.key) {
            warn!("Error clearing favorites under '{}': {e}", self.key());
            return Err(e);
        }
        self.favorites.clear();
        self.loaded = true;
        Ok(())
    }

    fn ensure_loaded(&mut self) -> Result<(), AppResponse> {
        if !self.loaded {
            self.read_favorites()?;
        }
        Ok(())
    }

    fn persist(&mut self, next: Vec<Favorite>) -> Result<(), AppResponse> {
        if let Err(e) = self.backend.set_json(&self.key, &next) {
            warn!("Error saving favorites under '{}': {e}", self.key());
            return Err(e);
        }
        self.favorites = next;
        Ok(())
    }
}

/// Older app versions did not guard against duplicate adds; keep the first.
fn dedupe(stored: Vec<Favorite>) -> Vec<Favorite> {
    let mut unique: Vec<Favorite> = Vec::with_capacity(stored.len());
    for fav in stored {
        if !unique.iter().any(|kept| kept.number == fav.number) {
            unique.push(fav);
        }
    }
    unique
}
