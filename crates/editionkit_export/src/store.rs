//! Content store seam and an in-memory implementation.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use chrono::Datelike;

use crate::period::SpecPeriod;
use crate::spec::{ContentItem, ExportError};

/// Source of exportable content items.
pub trait ContentStore {
    /// Published items dated inside `period`, newest first.
    fn list_items(&self, period: &SpecPeriod) -> Result<Vec<ContentItem>, ExportError>;

    /// Look up one item by id.
    fn get_item(&self, id: u64) -> Option<ContentItem>;

    /// Distinct calendar years with published items, newest first.
    fn list_years(&self) -> Vec<i32>;
}

/// Content store over an owned item list.
#[derive(Debug, Clone, Default)]
pub struct MemoryContentStore {
    items: Vec<ContentItem>,
}

impl MemoryContentStore {
    pub fn new(items: Vec<ContentItem>) -> Self {
        Self { items }
    }

    /// Load items from a JSON array.
    pub fn from_json(c_json: &str) -> Result<Self, ExportError> {
        Ok(Self::new(serde_json::from_str(c_json)?))
    }

    pub fn push(&mut self, item: ContentItem) {
        self.items.push(item);
    }
}

impl ContentStore for MemoryContentStore {
    fn list_items(&self, period: &SpecPeriod) -> Result<Vec<ContentItem>, ExportError> {
        let mut l_items: Vec<ContentItem> = self
            .items
            .iter()
            .filter(|item| {
                item.is_exportable() && item.published_at.is_some_and(|dt| period.contains(dt))
            })
            .cloned()
            .collect();
        l_items.sort_by_key(|item| Reverse(item.published_at));
        Ok(l_items)
    }

    fn get_item(&self, id: u64) -> Option<ContentItem> {
        self.items.iter().find(|item| item.id == id).cloned()
    }

    fn list_years(&self) -> Vec<i32> {
        let set_years: BTreeSet<i32> = self
            .items
            .iter()
            .filter(|item| item.is_exportable())
            .filter_map(|item| item.published_at.map(|dt| dt.year()))
            .collect();
        set_years.into_iter().rev().collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::spec::EnumContentStatus;

    fn build_item(id: u64, y: i32, m: u32, d: u32, status: EnumContentStatus) -> ContentItem {
        ContentItem {
            id,
            status,
            published_at: NaiveDate::from_ymd_opt(y, m, d).and_then(|dt| dt.and_hms_opt(10, 0, 0)),
            ..Default::default()
        }
    }

    fn build_store() -> MemoryContentStore {
        MemoryContentStore::new(vec![
            build_item(1, 2024, 3, 4, EnumContentStatus::Publish),
            build_item(2, 2024, 6, 1, EnumContentStatus::Publish),
            build_item(3, 2024, 6, 2, EnumContentStatus::Draft),
            build_item(4, 2024, 12, 31, EnumContentStatus::Publish),
            build_item(5, 2022, 5, 5, EnumContentStatus::Publish),
        ])
    }

    #[test]
    fn list_items_filters_period_and_status_newest_first() {
        let l_ids: Vec<u64> = build_store()
            .list_items(&SpecPeriod::new(2024).unwrap())
            .unwrap()
            .iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(l_ids, vec![2, 1]);
    }

    #[test]
    fn list_years_is_distinct_and_descending() {
        assert_eq!(build_store().list_years(), vec![2024, 2022]);
    }

    #[test]
    fn get_item_finds_by_id() {
        let store = build_store();
        assert_eq!(store.get_item(5).map(|item| item.id), Some(5));
        assert!(store.get_item(42).is_none());
    }

    #[test]
    fn from_json_parses_partial_items() {
        let store = MemoryContentStore::from_json(
            r#"[{"id": 9, "published_at": "2024-03-04T08:00:00", "title": "Hi"}]"#,
        )
        .unwrap();
        let item = store.get_item(9).unwrap();
        assert_eq!(item.title, "Hi");
        assert_eq!(item.status, EnumContentStatus::Publish);
        assert!(item.is_exportable());
    }
}
