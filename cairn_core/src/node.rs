use std::convert::Infallible;

use bytes::Bytes;
use minicbor::{Decode, Encode};

use crate::Hash;

/// A DAG node as stored in a block.
///
/// Encoded as a two element CBOR array `[links, data]`. The key of a node
/// is the hash of that encoding, so two nodes with the same links and data
/// always share a key.
#[derive(Encode, Decode, Clone, Debug, Default, PartialEq, Eq)]
#[cbor(array)]
pub struct DagNode {
    #[n(0)]
    pub links: Vec<Hash>,
    #[n(1)]
    #[cbor(with = "minicbor::bytes")]
    pub data: Vec<u8>,
}

impl DagNode {
    pub fn new(links: Vec<Hash>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            links,
            data: data.into(),
        }
    }

    /// A node without links or data.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A leaf node carrying only data.
    pub fn leaf(data: impl Into<Vec<u8>>) -> Self {
        Self::new(Vec::new(), data)
    }

    /// Decodes a node from block bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<DagNode, minicbor::decode::Error> {
        minicbor::decode(bytes)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, minicbor::encode::Error<Infallible>> {
        minicbor::to_vec(self)
    }

    pub fn to_bytes(&self) -> Result<Bytes, minicbor::encode::Error<Infallible>> {
        Ok(self.to_vec()?.into())
    }

    /// Key of this node: the hash of its encoded form.
    pub fn key(&self) -> Hash {
        // Encoding into a Vec cannot fail.
        let bytes = self.to_vec().unwrap_or_default();
        Hash::new(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_depends_on_links_and_data() {
        let a = DagNode::leaf(b"a".to_vec());
        let b = DagNode::leaf(b"b".to_vec());
        let parent = DagNode::new(vec![a.key()], Vec::new());
        assert_ne!(a.key(), b.key());
        assert_ne!(parent.key(), DagNode::empty().key());
        assert_eq!(a.key(), DagNode::leaf(b"a".to_vec()).key());
    }

    #[test]
    fn decode_restores_links() {
        let child = DagNode::leaf(b"child".to_vec());
        let parent = DagNode::new(vec![child.key(), child.key()], b"p".to_vec());
        let bytes = parent.to_bytes().unwrap();
        let decoded = DagNode::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, parent);
        assert_eq!(Hash::new(&bytes), parent.key());
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(DagNode::from_bytes(b"not a node").is_err());
    }
}
