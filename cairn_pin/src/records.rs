//! On-disk form of the pin state.
//!
//! The three structures are stored as independent records in a
//! [`Datastore`](cairn_core::Datastore), each a small versioned CBOR
//! document. Keys are written in ascending order so the encoding of a given
//! state is deterministic.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use cairn_core::{Hash, KeySet};
use minicbor::{Decode, Encode};

use crate::error::PinError;

pub const RECURSIVE_PIN_KEY: &str = "/local/pins/recursive/keys";
pub const DIRECT_PIN_KEY: &str = "/local/pins/direct/keys";
pub const INDIRECT_PIN_KEY: &str = "/local/pins/indirect/keys";

const RECORD_VERSION: u8 = 1;

#[derive(Encode, Decode, Debug, PartialEq, Eq)]
#[cbor(array)]
struct KeyListRecord {
    #[n(0)]
    version: u8,
    #[n(1)]
    keys: Vec<Hash>,
}

#[derive(Encode, Decode, Debug, PartialEq, Eq)]
#[cbor(array)]
struct RefCountRecord {
    #[n(0)]
    version: u8,
    #[n(1)]
    refs: BTreeMap<Hash, u64>,
}

fn corrupt(path: &'static str, reason: impl ToString) -> PinError {
    PinError::CorruptRecord {
        path,
        reason: reason.to_string(),
    }
}

pub(crate) fn encode_keys(path: &'static str, keys: &KeySet) -> Result<Bytes, PinError> {
    let record = KeyListRecord {
        version: RECORD_VERSION,
        keys: keys.to_sorted_vec(),
    };
    minicbor::to_vec(&record)
        .map(Bytes::from)
        .map_err(|e| corrupt(path, e))
}

pub(crate) fn decode_keys(path: &'static str, bytes: &[u8]) -> Result<KeySet, PinError> {
    let record: KeyListRecord = minicbor::decode(bytes).map_err(|e| corrupt(path, e))?;
    if record.version != RECORD_VERSION {
        return Err(corrupt(
            path,
            format!("unsupported record version {}", record.version),
        ));
    }
    Ok(record.keys.into_iter().collect())
}

pub(crate) fn encode_refs(refs: &HashMap<Hash, u64>) -> Result<Bytes, PinError> {
    let record = RefCountRecord {
        version: RECORD_VERSION,
        refs: refs.iter().map(|(k, n)| (*k, *n)).collect(),
    };
    minicbor::to_vec(&record)
        .map(Bytes::from)
        .map_err(|e| corrupt(INDIRECT_PIN_KEY, e))
}

pub(crate) fn decode_refs(bytes: &[u8]) -> Result<HashMap<Hash, u64>, PinError> {
    let record: RefCountRecord =
        minicbor::decode(bytes).map_err(|e| corrupt(INDIRECT_PIN_KEY, e))?;
    if record.version != RECORD_VERSION {
        return Err(corrupt(
            INDIRECT_PIN_KEY,
            format!("unsupported record version {}", record.version),
        ));
    }
    if let Some((key, _)) = record.refs.iter().find(|(_, n)| **n == 0) {
        return Err(corrupt(
            INDIRECT_PIN_KEY,
            format!("zero reference count for {key}"),
        ));
    }
    Ok(record.refs.into_iter().collect())
}
