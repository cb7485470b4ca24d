use anyhow::{Context, Result};
use cairn_core::{BlockStore, DagNode, LinkResolver};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use super::Dag;
use crate::BlockCmd;

pub async fn run_block(cmd: BlockCmd, dag: &Dag) -> Result<()> {
    match cmd {
        BlockCmd::Put { path, links } => {
            let data = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let node = DagNode::new(links, data);
            let key = dag.add(&node).await?;
            println!("{key}");
        }
        BlockCmd::Get { hash, out } => {
            let node = dag
                .fetch_node(&hash)
                .await
                .with_context(|| format!("failed to fetch {hash}"))?;
            for link in &node.links {
                eprintln!("link {link}");
            }
            match out {
                Some(out) => {
                    tokio::fs::write(&out, &node.data)
                        .await
                        .with_context(|| format!("failed to write to {}", out.display()))?;
                    eprintln!("wrote {} bytes to {}", node.data.len(), out.display());
                }
                None => {
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&node.data).await?;
                    stdout.flush().await?;
                }
            }
        }
        BlockCmd::Ls => {
            let mut keys = dag.store().all_keys().await?;
            while let Some(key) = keys.next().await {
                println!("{}", key?);
            }
        }
    }
    Ok(())
}
