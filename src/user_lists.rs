//! CRUD over the user lists kept inside the settings record.
//!
//! Lists live in `SettingsRecord::user_lists`, so every operation here goes
//! through [`SettingsStore::commit`] and persists the whole record.

use std::collections::HashSet;

use chrono::Utc;
use log::{info, warn};

use crate::app_response::AppResponse;
use crate::models::UserList;
use crate::settings_store::SettingsStore;

fn validate_name(name: &str) -> Result<String, AppResponse> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppResponse::ValidationError(
            "List name cannot be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn validate_hymn_number(number: &str) -> Result<String, AppResponse> {
    let trimmed = number.trim();
    match trimmed.parse::<u32>() {
        Ok(_) => Ok(trimmed.to_string()),
        Err(_) => Err(AppResponse::ValidationError(format!(
            "Invalid hymn number: '{number}'"
        ))),
    }
}

/// Brings a whole replacement `userLists` value in line with the rules the
/// single-list operations enforce: trimmed non-empty names, unique ids and
/// numeric, duplicate-free memberships. Duplicate hymns are dropped, keeping
/// the first occurrence.
pub(crate) fn validate_lists(lists: Vec<UserList>) -> Result<Vec<UserList>, AppResponse> {
    let mut ids = HashSet::with_capacity(lists.len());

    lists
        .into_iter()
        .map(|mut list| {
            if !ids.insert(list.id) {
                return Err(AppResponse::ValidationError(format!(
                    "Duplicate list id: {}",
                    list.id
                )));
            }
            list.name = validate_name(&list.name)?;

            let mut seen = HashSet::with_capacity(list.himnos.len());
            let mut himnos = Vec::with_capacity(list.himnos.len());
            for number in &list.himnos {
                let number = validate_hymn_number(number)?;
                if seen.insert(number.clone()) {
                    himnos.push(number);
                } else {
                    warn!("Dropping repeated hymn {number} from list {}", list.id);
                }
            }
            list.himnos = himnos;
            Ok(list)
        })
        .collect()
}

fn list_not_found(id: i64) -> AppResponse {
    AppResponse::NotFound(format!("No list found with id: {id}"))
}

impl SettingsStore {
    pub fn get_list(&self, id: i64) -> Option<&UserList> {
        self.user_lists().iter().find(|list| list.id == id)
    }

    /// Creates an empty list. The id is the creation time in milliseconds,
    /// bumped when another list already holds it.
    pub fn create_list(&mut self, name: &str) -> Result<UserList, AppResponse> {
        let name = validate_name(name)?;
        self.ensure_loaded()?;
        let now = Utc::now();

        let mut id = now.timestamp_millis();
        while self.get_list(id).is_some() {
            id += 1;
        }

        let list = UserList::new(id, name, now);
        let created = list.clone();
        self.commit(|record| record.user_lists.push(list))?;

        info!("Created list {} ('{}')", created.id, created.name);
        Ok(created)
    }

    pub fn rename_list(&mut self, id: i64, name: &str) -> Result<UserList, AppResponse> {
        let name = validate_name(name)?;
        self.update_list(id, |list| {
            list.name = name;
        })
    }

    /// Returns `false` when no list had that id.
    pub fn delete_list(&mut self, id: i64) -> Result<bool, AppResponse> {
        self.ensure_loaded()?;
        if self.get_list(id).is_none() {
            return Ok(false);
        }

        self.commit(|record| record.user_lists.retain(|list| list.id != id))?;
        info!("Deleted list {id}");
        Ok(true)
    }

    /// Appends the hymn unless the list already holds it. Returns whether
    /// the list changed.
    pub fn add_hymn_to_list(&mut self, id: i64, number: &str) -> Result<bool, AppResponse> {
        let number = validate_hymn_number(number)?;
        self.ensure_loaded()?;
        let list = self.get_list(id).ok_or_else(|| list_not_found(id))?;
        if list.contains(&number) {
            return Ok(false);
        }

        self.update_list(id, |list| {
            list.himnos.push(number);
        })?;
        Ok(true)
    }

    /// Returns whether the hymn was part of the list.
    pub fn remove_hymn_from_list(&mut self, id: i64, number: &str) -> Result<bool, AppResponse> {
        let number = validate_hymn_number(number)?;
        self.ensure_loaded()?;
        let list = self.get_list(id).ok_or_else(|| list_not_found(id))?;
        if !list.contains(&number) {
            return Ok(false);
        }

        self.update_list(id, |list| {
            list.himnos.retain(|h| h != &number);
        })?;
        Ok(true)
    }

    /// Replaces the membership order. `order` must hold exactly the current
    /// members.
    pub fn set_list_order(&mut self, id: i64, order: Vec<String>) -> Result<UserList, AppResponse> {
        self.ensure_loaded()?;
        let list = self.get_list(id).ok_or_else(|| list_not_found(id))?;
        if !is_permutation(&list.himnos, &order) {
            return Err(AppResponse::ValidationError(
                "New order must contain exactly the hymns of the list".to_string(),
            ));
        }

        self.update_list(id, |list| {
            list.himnos = order;
        })
    }

    fn update_list<F>(&mut self, id: i64, mutate: F) -> Result<UserList, AppResponse>
    where
        F: FnOnce(&mut UserList),
    {
        self.ensure_loaded()?;
        if self.get_list(id).is_none() {
            return Err(list_not_found(id));
        }

        let mut updated = None;
        self.commit(|record| {
            if let Some(list) = record.user_lists.iter_mut().find(|list| list.id == id) {
                mutate(list);
                list.updated_at = Utc::now();
                updated = Some(list.clone());
            }
        })?;

        updated.ok_or_else(|| list_not_found(id))
    }
}

pub(crate) fn is_permutation(current: &[String], candidate: &[String]) -> bool {
    if current.len() != candidate.len() {
        return false;
    }
    let mut left: Vec<&String> = current.iter().collect();
    let mut right: Vec<&String> = candidate.iter().collect();
    left.sort();
    right.sort();
    left == right
}
