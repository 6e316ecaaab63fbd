//! Data model definitions for the persisted hymnal state.
//!
//! These types mirror the JSON stored under the `favoritos`, `userSettings`
//! and `visitedItems` keys, field names included, so data written by earlier
//! versions of the app keeps loading.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

pub const FONT_SIZE_MIN: u32 = 12;
pub const FONT_SIZE_MAX: u32 = 48;
pub const FONT_SIZE_STEP: u32 = 2;

/// Entry of the static hymn catalogue, and the shape stored for a favorite.
///
/// `group` is a single category label. Older catalogue files declare it as a
/// list of tags; when decoding, a list is accepted and its first element kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hymn {
    pub number: u32,
    pub title: String,
    #[serde(default, deserialize_with = "group_from_string_or_list")]
    pub group: String,
}

/// A favorite is a stored copy of the hymn reference, not just its number.
pub type Favorite = Hymn;

impl Hymn {
    pub fn new(number: u32, title: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            group: group.into(),
        }
    }
}

fn group_from_string_or_list<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum GroupRepr {
        One(String),
        Many(Vec<String>),
        Missing(()),
    }

    Ok(match GroupRepr::deserialize(deserializer)? {
        GroupRepr::One(group) => group,
        GroupRepr::Many(groups) => groups.into_iter().next().unwrap_or_default(),
        GroupRepr::Missing(_) => String::new(),
    })
}

/// One of the four total orders offered by the sort menu.
///
/// The serialized names are the ones the app has always written to storage:
/// `"asc"`/`"desc"` sort by title, `"numAsc"`/`"numDesc"` by number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "numAsc")]
    NumAsc,
    #[serde(rename = "numDesc")]
    NumDesc,
    #[serde(rename = "asc", alias = "titleAsc")]
    TitleAsc,
    #[serde(rename = "desc", alias = "titleDesc")]
    TitleDesc,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "numAsc" => Some(SortOrder::NumAsc),
            "numDesc" => Some(SortOrder::NumDesc),
            "asc" | "titleAsc" => Some(SortOrder::TitleAsc),
            "desc" | "titleDesc" => Some(SortOrder::TitleDesc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::NumAsc => "numAsc",
            SortOrder::NumDesc => "numDesc",
            SortOrder::TitleAsc => "asc",
            SortOrder::TitleDesc => "desc",
        }
    }
}

/// A user-created, named and ordered collection of hymn numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserList {
    pub id: i64,
    pub name: String,
    /// Hymn numbers as strings; order is the presentation order.
    pub himnos: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserList {
    pub fn new(id: i64, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            himnos: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn contains(&self, number: &str) -> bool {
        self.himnos.iter().any(|h| h == number)
    }
}

/// The single persisted settings record stored under `userSettings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRecord {
    pub font_size: u32,
    pub order: SortOrder,
    pub user_lists: Vec<UserList>,
}

impl SettingsRecord {
    pub fn with_font_size(font_size: u32) -> Self {
        Self {
            font_size: clamp_font_size(i64::from(font_size)),
            order: SortOrder::default(),
            user_lists: Vec::new(),
        }
    }

    /// Decode a stored record, replacing each missing or malformed field by
    /// its default. A malformed list entry drops that entry only.
    pub fn from_value(value: &JsonValue, default_font_size: u32) -> Self {
        let mut record = Self::with_font_size(default_font_size);

        let Some(fields) = value.as_object() else {
            warn!("Stored settings are not a JSON object; using defaults");
            return record;
        };

        if let Some(raw) = fields.get("fontSize") {
            match raw.as_f64() {
                Some(size) => record.font_size = clamp_font_size(size.round() as i64),
                None => warn!("Ignoring malformed fontSize in settings: {raw}"),
            }
        }

        if let Some(raw) = fields.get("order") {
            match raw.as_str().and_then(SortOrder::parse) {
                Some(order) => record.order = order,
                None => warn!("Ignoring unknown sort order in settings: {raw}"),
            }
        }

        if let Some(raw) = fields.get("userLists") {
            match raw.as_array() {
                Some(entries) => {
                    record.user_lists = entries
                        .iter()
                        .filter_map(|entry| match serde_json::from_value::<UserList>(entry.clone()) {
                            Ok(list) => Some(list),
                            Err(e) => {
                                warn!("Dropping malformed user list: {e}");
                                None
                            }
                        })
                        .collect();
                }
                None => warn!("Ignoring malformed userLists in settings"),
            }
        }

        record
    }
}

pub fn clamp_font_size(size: i64) -> u32 {
    size.clamp(i64::from(FONT_SIZE_MIN), i64::from(FONT_SIZE_MAX)) as u32
}

/// Individually addressable fields of [`SettingsRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    FontSize,
    Order,
    UserLists,
}

impl SettingKey {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "fontSize" => Some(SettingKey::FontSize),
            "order" | "sortOrder" => Some(SettingKey::Order),
            "userLists" => Some(SettingKey::UserLists),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::FontSize => "fontSize",
            SettingKey::Order => "order",
            SettingKey::UserLists => "userLists",
        }
    }
}

/// Entry of the recently viewed history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitedItem {
    pub number: u32,
    pub title: String,
}

impl From<&Hymn> for VisitedItem {
    fn from(hymn: &Hymn) -> Self {
        Self {
            number: hymn.number,
            title: hymn.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub verse: u32,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<u32>,
}

/// Full lyrics of a hymn as found in the catalogue text file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HymnText {
    pub number: u32,
    pub title: String,
    #[serde(default)]
    pub lyrics: Vec<Verse>,
}
