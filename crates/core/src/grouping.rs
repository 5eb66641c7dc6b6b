//! Category grouping for listing screens.

use std::collections::BTreeMap;

use serde::Serialize;

/// Records sharing one category, in the order they were supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryGroup<T> {
    pub category: String,
    pub items: Vec<T>,
}

/// Group records by category.
///
/// Groups come out ordered by category name; records keep their relative input
/// order inside a group, so sort by name first if that is the desired order.
pub fn group_by_category<T, F>(records: impl IntoIterator<Item = T>, category_of: F) -> Vec<CategoryGroup<T>>
where
    F: Fn(&T) -> &str,
{
    let mut groups: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for record in records {
        let category = category_of(&record).to_string();
        groups.entry(category).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|(category, items)| CategoryGroup { category, items })
        .collect()
}
