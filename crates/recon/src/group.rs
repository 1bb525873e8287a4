use std::collections::BTreeMap;

use concilia_core::Money;

/// One aggregation bucket: the grouping key, the summed amount, and the
/// positions (within the grouped slice) of the members that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<K> {
    pub key: K,
    pub total: Money,
    pub members: Vec<usize>,
}

/// Sum `items` into buckets keyed by `key`, ordered by key. Zero-sum groups
/// are kept and the input is left untouched; the caller maps member positions
/// back to whatever identity it tracks.
pub fn group_and_sum<T, K, FK, FA>(items: &[T], key: FK, amount: FA) -> Vec<Group<K>>
where
    K: Ord + Clone,
    FK: Fn(&T) -> K,
    FA: Fn(&T) -> Money,
{
    let mut buckets: BTreeMap<K, (Money, Vec<usize>)> = BTreeMap::new();
    for (pos, item) in items.iter().enumerate() {
        let entry = buckets
            .entry(key(item))
            .or_insert_with(|| (Money::zero(), Vec::new()));
        entry.0 = entry.0 + amount(item);
        entry.1.push(pos);
    }
    buckets
        .into_iter()
        .map(|(key, (total, members))| Group { key, total, members })
        .collect()
}
