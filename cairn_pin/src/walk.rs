use std::collections::{HashMap, VecDeque};

use cairn_core::{Hash, LinkResolver};

use crate::{PinError, PinResult};

/// Counts, for every key below a recursive pin, the number of distinct
/// link paths from the pinned node to it.
///
/// `links` are the pinned node's own links (duplicates count as separate
/// paths). Each distinct node is fetched once; the per-path counts are then
/// propagated in topological order, which gives the same totals as
/// incrementing a key once for every path that reaches it.
///
/// Any resolution failure aborts the walk and nothing is returned, so the
/// caller can apply the counts atomically. Path counts grow with every
/// layer of repeated links; a count that does not fit in a `u64` fails the
/// walk with [`PinError::RefCountOverflow`].
pub(crate) async fn closure_refs<R>(
    resolver: &R,
    links: &[Hash],
) -> PinResult<HashMap<Hash, u64>>
where
    R: LinkResolver + ?Sized,
{
    // Discover the sub-DAG, fetching each node once.
    let mut children: HashMap<Hash, Vec<Hash>> = HashMap::new();
    let mut queue: VecDeque<Hash> = links.iter().copied().collect();
    while let Some(key) = queue.pop_front() {
        if children.contains_key(&key) {
            continue;
        }
        let node_links = resolver.resolve_links(&key).await?;
        for child in &node_links {
            if !children.contains_key(child) {
                queue.push_back(*child);
            }
        }
        children.insert(key, node_links);
    }

    // In-degree counts every link occurrence inside the sub-DAG.
    let mut in_degree: HashMap<Hash, usize> = children.keys().map(|k| (*k, 0)).collect();
    for node_links in children.values() {
        for child in node_links {
            *in_degree.entry(*child).or_insert(0) += 1;
        }
    }

    let mut paths: HashMap<Hash, u64> = HashMap::with_capacity(children.len());
    for key in links {
        add_paths(&mut paths, *key, 1)?;
    }

    let mut ready: VecDeque<Hash> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(k, _)| *k)
        .collect();
    while let Some(key) = ready.pop_front() {
        let through = paths.get(&key).copied().unwrap_or(0);
        let Some(node_links) = children.get(&key) else {
            continue;
        };
        for child in node_links {
            add_paths(&mut paths, *child, through)?;
            if let Some(degree) = in_degree.get_mut(child) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push_back(*child);
                }
            }
        }
    }

    Ok(paths)
}

fn add_paths(paths: &mut HashMap<Hash, u64>, key: Hash, n: u64) -> PinResult<()> {
    let count = paths.entry(key).or_insert(0);
    *count = count
        .checked_add(n)
        .ok_or(PinError::RefCountOverflow(key))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cairn_core::{DagNode, LinkError};

    #[derive(Default)]
    struct MapResolver(HashMap<Hash, Vec<Hash>>);

    #[async_trait]
    impl LinkResolver for MapResolver {
        async fn fetch_node(&self, key: &Hash) -> Result<DagNode, LinkError> {
            self.0
                .get(key)
                .map(|links| DagNode::new(links.clone(), Vec::new()))
                .ok_or(LinkError::NotFound(*key))
        }
    }

    fn key(b: u8) -> Hash {
        Hash::from_bytes([b; 32])
    }

    #[tokio::test]
    async fn diamond_counts_both_paths() {
        // root -> a, b; a -> c; b -> c
        let resolver = MapResolver(HashMap::from([
            (key(1), vec![key(3)]),
            (key(2), vec![key(3)]),
            (key(3), vec![]),
        ]));
        let refs = closure_refs(&resolver, &[key(1), key(2)]).await.unwrap();
        assert_eq!(refs[&key(1)], 1);
        assert_eq!(refs[&key(2)], 1);
        assert_eq!(refs[&key(3)], 2);
    }

    #[tokio::test]
    async fn paths_multiply_through_layers() {
        // root -> a, a; a -> b, b; b -> c
        let resolver = MapResolver(HashMap::from([
            (key(1), vec![key(2), key(2)]),
            (key(2), vec![key(3)]),
            (key(3), vec![]),
        ]));
        let refs = closure_refs(&resolver, &[key(1), key(1)]).await.unwrap();
        assert_eq!(refs[&key(1)], 2);
        assert_eq!(refs[&key(2)], 4);
        assert_eq!(refs[&key(3)], 4);
    }

    #[tokio::test]
    async fn missing_child_fails_whole_walk() {
        let resolver = MapResolver(HashMap::from([(key(1), vec![key(2)])]));
        let err = closure_refs(&resolver, &[key(1)]).await.unwrap_err();
        assert!(matches!(err, PinError::Link(e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn doubling_chain_overflow_is_an_error() {
        // i -> i+1, i+1 for 66 layers: the last key has 2^65 paths
        let mut links = HashMap::new();
        for b in 0..65u8 {
            links.insert(key(b), vec![key(b + 1), key(b + 1)]);
        }
        links.insert(key(65), vec![]);
        let resolver = MapResolver(links);

        let err = closure_refs(&resolver, &[key(0)]).await.unwrap_err();
        assert!(matches!(err, PinError::RefCountOverflow(k) if k == key(64)));
    }
}
