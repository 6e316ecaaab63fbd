//! Read-only hymn catalogue.
//!
//! Built once at startup from the index file (`{"lista": [{number, title,
//! group}]}`) and optionally the lyrics file (`{"<number>": {number, title,
//! lyrics}}`). Nothing here is ever mutated or persisted.

use std::collections::HashMap;

use log::{info, warn};
use serde::Deserialize;

use crate::app_response::AppResponse;
use crate::models::{Hymn, HymnText, SortOrder, UserList};
use crate::ordering::{filter_hymns, group_by_category, sort_hymns, CategorySummary, Section};

#[derive(Deserialize)]
#[serde(untagged)]
enum IndexFile {
    Wrapped { lista: Vec<Hymn> },
    Bare(Vec<Hymn>),
}

#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    hymns: Vec<Hymn>,
    texts: HashMap<String, HymnText>,
}

impl Catalogue {
    /// Hymns are kept sorted by number. Duplicate numbers keep the first entry.
    pub fn new(mut hymns: Vec<Hymn>, texts: HashMap<String, HymnText>) -> Self {
        sort_hymns(&mut hymns, SortOrder::NumAsc);
        hymns.dedup_by(|later, earlier| {
            if later.number == earlier.number {
                warn!("Duplicate catalogue entry for hymn {}", later.number);
                true
            } else {
                false
            }
        });
        Self { hymns, texts }
    }

    pub fn from_json(index_json: &str, texts_json: Option<&str>) -> Result<Self, AppResponse> {
        let hymns = match serde_json::from_str::<IndexFile>(index_json)? {
            IndexFile::Wrapped { lista } => lista,
            IndexFile::Bare(hymns) => hymns,
        };

        let texts = match texts_json {
            Some(json) => serde_json::from_str::<HashMap<String, HymnText>>(json)?,
            None => HashMap::new(),
        };

        info!(
            "Catalogue loaded: {} hymns, {} with lyrics",
            hymns.len(),
            texts.len()
        );
        Ok(Self::new(hymns, texts))
    }

    pub fn len(&self) -> usize {
        self.hymns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hymns.is_empty()
    }

    /// All hymns in ascending number order.
    pub fn hymns(&self) -> &[Hymn] {
        &self.hymns
    }

    pub fn find(&self, number: u32) -> Option<&Hymn> {
        self.hymns
            .binary_search_by_key(&number, |hymn| hymn.number)
            .ok()
            .map(|idx| &self.hymns[idx])
    }

    /// Looks a hymn up by the string form stored in lists.
    pub fn find_str(&self, number: &str) -> Option<&Hymn> {
        number.trim().parse().ok().and_then(|n| self.find(n))
    }

    pub fn text(&self, number: u32) -> Option<&HymnText> {
        self.texts.get(&number.to_string())
    }

    pub fn search(&self, query: &str) -> Vec<Hymn> {
        filter_hymns(&self.hymns, query)
    }

    pub fn sorted(&self, order: SortOrder) -> Vec<Hymn> {
        let mut hymns = self.hymns.clone();
        sort_hymns(&mut hymns, order);
        hymns
    }

    /// Category names with their hymn counts, in order of first appearance.
    pub fn categories(&self) -> Vec<CategorySummary> {
        self.sections().iter().map(Section::summary).collect()
    }

    pub fn sections(&self) -> Vec<Section> {
        group_by_category(&self.hymns)
    }

    pub fn in_category(&self, name: &str) -> Vec<Hymn> {
        let name = name.to_lowercase();
        self.hymns
            .iter()
            .filter(|hymn| hymn.group.to_lowercase() == name)
            .cloned()
            .collect()
    }

    /// Catalogue entries of a list, in list order. Unknown numbers are skipped.
    pub fn hymns_in_list(&self, list: &UserList) -> Vec<&Hymn> {
        list.himnos.iter().filter_map(|n| self.find_str(n)).collect()
    }

    /// Full lyrics of a list in presentation order. Numbers without lyrics
    /// are skipped.
    pub fn resolve_list(&self, list: &UserList) -> Vec<&HymnText> {
        list.himnos
            .iter()
            .filter_map(|n| self.texts.get(n.trim()))
            .collect()
    }
}
