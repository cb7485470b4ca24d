use async_trait::async_trait;

use crate::{
    Hash,
    node::DagNode,
    store::{BlockStore, StoreError},
};

/// Errors from resolving a node or its links.
///
/// `NotFound` is kept apart from every other failure because best-effort
/// traversals tolerate it.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum LinkError {
    #[error("node not found: {0}")]
    NotFound(Hash),

    #[error("could not decode node {key}: {reason}")]
    Decode { key: Hash, reason: String },

    #[error(transparent)]
    Store(StoreError),
}

impl LinkError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LinkError::NotFound(_))
    }
}

impl From<StoreError> for LinkError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => LinkError::NotFound(key),
            other => LinkError::Store(other),
        }
    }
}

/// Resolves DAG nodes and the keys they link to.
#[async_trait]
pub trait LinkResolver: Send + Sync {
    /// Fetches and decodes the node stored under `key`.
    async fn fetch_node(&self, key: &Hash) -> Result<DagNode, LinkError>;

    /// Returns the child keys referenced by the node stored under `key`.
    async fn resolve_links(&self, key: &Hash) -> Result<Vec<Hash>, LinkError> {
        Ok(self.fetch_node(key).await?.links)
    }
}

#[async_trait]
impl<T: LinkResolver + ?Sized> LinkResolver for std::sync::Arc<T> {
    async fn fetch_node(&self, key: &Hash) -> Result<DagNode, LinkError> {
        (**self).fetch_node(key).await
    }

    async fn resolve_links(&self, key: &Hash) -> Result<Vec<Hash>, LinkError> {
        (**self).resolve_links(key).await
    }
}

/// Offline DAG service that reads nodes straight from a block store.
#[derive(Debug, Clone)]
pub struct BlockDag<S> {
    store: S,
}

impl<S: BlockStore> BlockDag<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Encodes and stores `node`, returning its key.
    pub async fn add(&self, node: &DagNode) -> Result<Hash, StoreError> {
        let bytes = node
            .to_bytes()
            .map_err(|e| StoreError::Other(anyhow::anyhow!("encode node: {e}")))?;
        self.store.put(bytes).await
    }
}

#[async_trait]
impl<S: BlockStore> LinkResolver for BlockDag<S> {
    async fn fetch_node(&self, key: &Hash) -> Result<DagNode, LinkError> {
        let bytes = self.store.get(key).await?;
        DagNode::from_bytes(&bytes).map_err(|e| {
            tracing::warn!(key = %key.fmt_short(), error = %e, "stored block is not a dag node");
            LinkError::Decode {
                key: *key,
                reason: e.to_string(),
            }
        })
    }
}
