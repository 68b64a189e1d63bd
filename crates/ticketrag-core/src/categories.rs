//! Keyword categories used by the dashboard counters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::table::ReferenceTable;

pub struct Category {
    pub name: &'static str,
    pub icon: &'static str,
    /// Empty means "every ticket".
    pub keywords: &'static [&'static str],
}

pub const CATEGORIES: &[Category] = &[
    Category { name: "Camera", icon: "📹", keywords: &["camera", "ptz", "surveillance", "cctv"] },
    Category { name: "Door/Access", icon: "🚪", keywords: &["door", "access", "lock", "entry", "ada"] },
    Category { name: "Network", icon: "🌐", keywords: &["network", "connectivity", "internet", "wifi", "router"] },
    Category { name: "Hardware", icon: "🔧", keywords: &["hardware", "replacement", "equipment", "device"] },
    Category { name: "All Tickets", icon: "📋", keywords: &[] },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub count: usize,
    pub icon: String,
}

/// Count tickets whose source text mentions any keyword of each category
/// (case-insensitive substring match).
pub fn count_categories(table: &ReferenceTable) -> BTreeMap<String, CategoryCount> {
    let texts: Vec<String> = (0..table.len())
        .map(|row| table.source_text(row).unwrap_or_default().to_lowercase())
        .collect();

    CATEGORIES
        .iter()
        .map(|category| {
            let count = if category.keywords.is_empty() {
                texts.len()
            } else {
                texts.iter().filter(|t| category.keywords.iter().any(|k| t.contains(k))).count()
            };
            (category.name.to_string(), CategoryCount { count, icon: category.icon.to_string() })
        })
        .collect()
}
