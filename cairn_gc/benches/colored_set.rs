use std::sync::Arc;

use cairn_core::{BlockDag, DagNode};
use cairn_gc::colored_set;
use cairn_pin::Pinner;
use cairn_store_memory::{MemoryDatastore, MemoryStore};
use criterion::{Criterion, criterion_group, criterion_main};

type Dag = BlockDag<Arc<MemoryStore>>;

/// Builds `width` leaves shared by `fanout` parents under one root, so every
/// leaf is reachable along many paths.
async fn pinned_dag(
    width: usize,
    fanout: usize,
) -> anyhow::Result<(Dag, Pinner<Dag, MemoryDatastore>)> {
    let dag = BlockDag::new(Arc::new(MemoryStore::new()));

    let mut leaves = Vec::with_capacity(width);
    for i in 0..width {
        let leaf = DagNode::leaf(format!("leaf {i}").into_bytes());
        leaves.push(dag.add(&leaf).await?);
    }
    let mut parents = Vec::with_capacity(fanout);
    for i in 0..fanout {
        let parent = DagNode::new(leaves.clone(), format!("parent {i}").into_bytes());
        parents.push(dag.add(&parent).await?);
    }
    let root = DagNode::new(parents, b"root".to_vec());
    dag.add(&root).await?;

    let pinner = Pinner::new(dag.clone(), MemoryDatastore::new());
    pinner.pin(&root, true).await?;
    Ok((dag, pinner))
}

fn bench_colored_set(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let rt_handle = &rt;

    let (dag, pinner) = rt_handle.block_on(async { pinned_dag(5_000, 8).await.unwrap() });

    c.bench_function("colored_set_5k_shared_leaves", |b| {
        b.iter(|| {
            rt_handle.block_on(async {
                let live = colored_set(&pinner, &dag, &[])
                    .await
                    .unwrap();
                assert_eq!(live.len(), 5_000 + 8 + 1);
            });
        });
    });
}

criterion_group!(benches, bench_colored_set);
criterion_main!(benches);
