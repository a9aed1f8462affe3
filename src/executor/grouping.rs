//! Grouping by collection

use std::collections::HashMap;

/// Group `(collection, item)` pairs by collection
///
/// Groups come out in order of each collection's first appearance, and items
/// keep their arrival order inside a group.
pub fn group_by_collection<T>(items: impl IntoIterator<Item = (String, T)>) -> Vec<(String, Vec<T>)> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<T>)> = Vec::new();

    for (collection, item) in items {
        match positions.get(&collection) {
            Some(&pos) => groups[pos].1.push(item),
            None => {
                positions.insert(collection.clone(), groups.len());
                groups.push((collection, vec![item]));
            }
        }
    }

    groups
}
