//! Export run report.

use std::collections::BTreeMap;
use std::fmt;

/// Counters and warnings for one export run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportExport {
    /// Items handed to the formatter.
    pub cnt_items: u64,
    /// Sheet rows written, header included.
    pub cnt_rows: u64,
    /// Requested items that were missing or unpublished.
    pub cnt_skipped: u64,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl ReportExport {
    pub fn add_item(&mut self) {
        self.cnt_items += 1;
    }

    pub fn add_skipped(&mut self, warning: impl Into<String>) {
        self.cnt_skipped += 1;
        self.warnings.push(warning.into());
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_items".to_string(), self.cnt_items);
        dict_counts.insert("cnt_rows".to_string(), self.cnt_rows);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} items={} rows={} skipped={} warnings={}",
            self.cnt_items,
            self.cnt_rows,
            self.cnt_skipped,
            self.warning_count()
        )
    }
}

impl fmt::Display for ReportExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[EXPORT]"))
    }
}
