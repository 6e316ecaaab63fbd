//! Staged reordering of a user list.
//!
//! A [`ListDraft`] keeps the last committed list next to a candidate order.
//! Drag operations only touch the candidate; storage is written when the user
//! confirms. States:
//!
//! ```text
//! Viewing --enter_edit--> EditingClean --move/reorder--> EditingDirty
//! EditingClean | EditingDirty --confirm | discard--> Viewing
//! ```

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;
use crate::models::UserList;
use crate::settings_store::SettingsStore;
use crate::user_lists::is_permutation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditState {
    Viewing,
    EditingClean,
    EditingDirty,
}

/// What the UI must do when the user tries to leave the list screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveDecision {
    Proceed,
    /// Unsaved order: show the discard / save / cancel dialog.
    NeedsConfirmation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveChoice {
    Discard,
    Save,
    Cancel,
}

impl LeaveChoice {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "discard" => Some(LeaveChoice::Discard),
            "save" => Some(LeaveChoice::Save),
            "cancel" => Some(LeaveChoice::Cancel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftSnapshot {
    pub list_id: i64,
    pub name: String,
    pub state: EditState,
    pub has_pending_changes: bool,
    pub committed: Vec<String>,
    pub pending: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ListDraft {
    committed: UserList,
    pending: Vec<String>,
    editing: bool,
    dirty: bool,
}

impl ListDraft {
    pub fn new(list: UserList) -> Self {
        let pending = list.himnos.clone();
        Self {
            committed: list,
            pending,
            editing: false,
            dirty: false,
        }
    }

    pub fn list_id(&self) -> i64 {
        self.committed.id
    }

    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    pub fn has_pending_changes(&self) -> bool {
        self.dirty
    }

    pub fn state(&self) -> EditState {
        match (self.editing, self.dirty) {
            (false, _) => EditState::Viewing,
            (true, false) => EditState::EditingClean,
            (true, true) => EditState::EditingDirty,
        }
    }

    pub fn snapshot(&self) -> DraftSnapshot {
        DraftSnapshot {
            list_id: self.committed.id,
            name: self.committed.name.clone(),
            state: self.state(),
            has_pending_changes: self.dirty,
            committed: self.committed.himnos.clone(),
            pending: self.pending.clone(),
        }
    }

    pub fn enter_edit(&mut self) {
        if !self.editing {
            debug!("List {} enters edit mode", self.committed.id);
            self.editing = true;
        }
    }

    /// Moves the hymn at `from` to position `to` of the candidate order.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<(), AppResponse> {
        self.require_editing()?;
        let len = self.pending.len();
        if from >= len || to >= len {
            return Err(AppResponse::BadRequest(format!(
                "Move {from} -> {to} is out of bounds for {len} hymns"
            )));
        }

        let item = self.pending.remove(from);
        self.pending.insert(to, item);
        self.dirty = true;
        Ok(())
    }

    /// Replaces the candidate order. The new order must be a permutation of
    /// the committed members.
    pub fn reorder(&mut self, order: Vec<String>) -> Result<(), AppResponse> {
        self.require_editing()?;
        if !is_permutation(&self.committed.himnos, &order) {
            return Err(AppResponse::ValidationError(
                "New order must contain exactly the hymns of the list".to_string(),
            ));
        }

        self.pending = order;
        self.dirty = true;
        Ok(())
    }

    /// Leaves edit mode, persisting the candidate order when it is dirty.
    /// Returns whether anything was written. On a failed write the draft
    /// stays dirty.
    pub fn confirm(&mut self, store: &mut SettingsStore) -> Result<bool, AppResponse> {
        if !self.editing {
            return Ok(false);
        }

        let wrote = if self.dirty {
            let updated = store.set_list_order(self.committed.id, self.pending.clone())?;
            info!("Committed new order for list {}", updated.id);
            self.committed = updated;
            true
        } else {
            false
        };

        self.pending = self.committed.himnos.clone();
        self.editing = false;
        self.dirty = false;
        Ok(wrote)
    }

    /// Leaves edit mode, restoring the last committed order.
    pub fn discard(&mut self) {
        if self.dirty {
            debug!("Discarding pending order for list {}", self.committed.id);
        }
        self.pending = self.committed.himnos.clone();
        self.editing = false;
        self.dirty = false;
    }

    pub fn request_leave(&self) -> LeaveDecision {
        match self.state() {
            EditState::EditingDirty => LeaveDecision::NeedsConfirmation,
            _ => LeaveDecision::Proceed,
        }
    }

    /// Applies the user's answer to the leave dialog. Returns whether the
    /// navigation may go on.
    pub fn resolve_leave(
        &mut self,
        choice: LeaveChoice,
        store: &mut SettingsStore,
    ) -> Result<bool, AppResponse> {
        match choice {
            LeaveChoice::Cancel => Ok(false),
            LeaveChoice::Discard => {
                self.discard();
                Ok(true)
            }
            LeaveChoice::Save => {
                self.confirm(store)?;
                Ok(true)
            }
        }
    }

    /// Replaces the committed list after a change made outside the draft.
    ///
    /// A clean draft takes the new order as is. A dirty draft keeps its
    /// candidate arrangement for the hymns still in the list and appends the
    /// newly added ones, so the candidate stays a permutation of the members.
    pub fn sync(&mut self, list: &UserList) {
        if list.id != self.committed.id {
            return;
        }

        if self.dirty {
            let mut pending: Vec<String> = self
                .pending
                .iter()
                .filter(|number| list.contains(number))
                .cloned()
                .collect();
            let added: Vec<String> = list
                .himnos
                .iter()
                .filter(|number| !pending.contains(number))
                .cloned()
                .collect();
            pending.extend(added);
            debug!("List {} changed while editing; candidate order merged", list.id);
            self.pending = pending;
        } else {
            self.pending = list.himnos.clone();
        }
        self.committed = list.clone();
    }

    fn require_editing(&self) -> Result<(), AppResponse> {
        if self.editing {
            Ok(())
        } else {
            Err(AppResponse::BadRequest(
                "List is not in edit mode".to_string(),
            ))
        }
    }
}
