use anyhow::{Result, bail};
use cairn_core::Hash;
use cairn_gc::{CancellationToken, GarbageCollector, TracingObserver};
use futures::StreamExt;
use std::sync::Arc;
use tracing::warn;

use super::{Dag, Store, open_pinner};
use crate::config::CairnConfig;

pub async fn run_gc(
    config: &CairnConfig,
    store: Store,
    dag: Dag,
    best_effort: Vec<Hash>,
    quiet: bool,
) -> Result<()> {
    let pinner = Arc::new(open_pinner(config, dag.clone()).await?);
    let collector = GarbageCollector::new(store, pinner, dag)
        .with_observer(TracingObserver)
        .with_channel_capacity(config.gc.channel_capacity);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping garbage collection");
            on_interrupt.cancel();
        }
    });

    let mut results = collector.run(cancel.clone(), best_effort);
    let (mut removed, mut errors) = (0usize, 0usize);
    while let Some(result) = results.next().await {
        match result {
            Ok(key) => {
                if !quiet {
                    println!("removed {key}");
                }
                removed += 1;
            }
            Err(e) => {
                eprintln!("error: {:#}", anyhow::Error::from(e));
                errors += 1;
            }
        }
    }

    if cancel.is_cancelled() {
        bail!("garbage collection cancelled after removing {removed} blocks");
    }
    if errors > 0 {
        bail!("garbage collection finished with {errors} errors, removed {removed} blocks");
    }
    if !quiet {
        println!("removed {removed} blocks");
    }
    Ok(())
}
