use anyhow::{Context, Result};
use cairn_core::GcBlockstore;
use cairn_pin::{PinFilter, PinMode};

use super::{Dag, Store, open_pinner};
use crate::{PinCmd, config::CairnConfig};

pub async fn run_pin(cmd: PinCmd, config: &CairnConfig, store: &Store, dag: Dag) -> Result<()> {
    match cmd {
        PinCmd::Add { hash, direct } => {
            let _lock = store.pin_lock().await?;
            let pinner = open_pinner(config, dag).await?;
            pinner
                .pin_key(&hash, !direct)
                .await
                .with_context(|| format!("failed to pin {hash}"))?;
            pinner.flush().await?;
            println!("pinned {hash} {}", mode_name(direct));
        }
        PinCmd::Rm { hash, direct } => {
            let _lock = store.pin_lock().await?;
            let pinner = open_pinner(config, dag).await?;
            pinner
                .unpin(&hash, !direct)
                .await
                .with_context(|| format!("failed to unpin {hash}"))?;
            pinner.flush().await?;
            println!("unpinned {hash}");
        }
        PinCmd::Ls { filter } => {
            let pinner = open_pinner(config, dag).await?;
            list_pins(&pinner, filter).await;
        }
    }
    Ok(())
}

fn mode_name(direct: bool) -> PinMode {
    if direct {
        PinMode::Direct
    } else {
        PinMode::Recursive
    }
}

async fn list_pins(pinner: &super::CliPinner, filter: PinFilter) {
    if filter.includes(PinMode::Recursive) {
        for key in pinner.recursive_keys().await {
            println!("{key} {}", PinMode::Recursive);
        }
    }
    if filter.includes(PinMode::Direct) {
        for key in pinner.direct_keys().await {
            println!("{key} {}", PinMode::Direct);
        }
    }
    if filter.includes(PinMode::Indirect) {
        let mut indirect: Vec<_> = pinner.indirect_keys().await.into_iter().collect();
        indirect.sort();
        for (key, refs) in indirect {
            println!("{key} {} ({refs})", PinMode::Indirect);
        }
    }
}
