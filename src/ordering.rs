//! Sorting, filtering and category grouping over hymn references.
//!
//! Shared by the catalogue views and the favorites store.

use std::cmp::Ordering;

use serde::Serialize;

use crate::models::{Hymn, SortOrder};

/// Sorts in place by one of the four total orders. The sort is stable and
/// every order is total, so sorting twice yields the same sequence.
pub fn sort_hymns(hymns: &mut [Hymn], order: SortOrder) {
    match order {
        SortOrder::NumAsc => hymns.sort_by(|a, b| a.number.cmp(&b.number)),
        SortOrder::NumDesc => hymns.sort_by(|a, b| b.number.cmp(&a.number)),
        SortOrder::TitleAsc => hymns.sort_by(compare_titles),
        SortOrder::TitleDesc => hymns.sort_by(|a, b| compare_titles(b, a)),
    }
}

fn compare_titles(a: &Hymn, b: &Hymn) -> Ordering {
    collate(&a.title, &b.title)
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.number.cmp(&b.number))
}

/// Spanish-aware comparison: case and accents are ignored at the first level,
/// `ñ` sorts between `n` and `o`, and whitespace/punctuation sort before
/// digits, which sort before letters.
pub fn collate(a: &str, b: &str) -> Ordering {
    let left = a.chars().map(collation_weight);
    let right = b.chars().map(collation_weight);
    left.cmp(right)
}

fn collation_weight(c: char) -> u32 {
    let folded = match c {
        'á' | 'à' | 'â' | 'ä' | 'Á' | 'À' | 'Â' | 'Ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => return letter_weight('n') + 1,
        other => other.to_lowercase().next().unwrap_or(other),
    };

    if folded.is_ascii_lowercase() {
        letter_weight(folded)
    } else if let Some(digit) = folded.to_digit(10) {
        100 + digit
    } else if folded.is_alphabetic() {
        // Letters outside the Spanish alphabet go after `z`, by code point.
        letter_weight('z') + 2 + folded as u32
    } else {
        1
    }
}

fn letter_weight(c: char) -> u32 {
    1000 + (c as u32 - 'a' as u32) * 2
}

/// Keeps hymns whose number contains the query, whose title contains it
/// (case-insensitive) or whose category equals it (case-insensitive).
/// An empty or blank query keeps everything.
pub fn filter_hymns<'a, I>(hymns: I, query: &str) -> Vec<Hymn>
where
    I: IntoIterator<Item = &'a Hymn>,
{
    let query = query.trim();
    if query.is_empty() {
        return hymns.into_iter().cloned().collect();
    }

    let lowered = query.to_lowercase();
    hymns
        .into_iter()
        .filter(|hymn| {
            hymn.number.to_string().contains(query)
                || hymn.title.to_lowercase().contains(&lowered)
                || (!hymn.group.is_empty() && hymn.group.to_lowercase() == lowered)
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub count: usize,
}

/// Hymns grouped under one category, in the order they were given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub hymns: Vec<Hymn>,
}

impl Section {
    pub fn summary(&self) -> CategorySummary {
        CategorySummary {
            name: self.title.clone(),
            count: self.hymns.len(),
        }
    }
}

/// Groups hymns by category. Sections appear in order of first appearance.
pub fn group_by_category<'a, I>(hymns: I) -> Vec<Section>
where
    I: IntoIterator<Item = &'a Hymn>,
{
    let mut sections: Vec<Section> = Vec::new();

    for hymn in hymns {
        match sections.iter_mut().find(|s| s.title == hymn.group) {
            Some(section) => section.hymns.push(hymn.clone()),
            None => sections.push(Section {
                title: hymn.group.clone(),
                hymns: vec![hymn.clone()],
            }),
        }
    }

    sections
}
