//! Typed repositories over [`OptimizedStorage`](crate::storage::OptimizedStorage).
//!
//! Records are JSON encoded under string key prefixes. Secondary indexes are
//! separate keys whose value is the id of the indexed record, so a prefix scan
//! over an index yields ids in key order.
//!
//! Readers accept anything implementing [`KvRead`], which lets the same
//! function run against committed state or inside an open transaction.

pub mod accounts;
pub mod awards;
pub mod draws;
pub mod prizes;
pub mod tickets;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{LotteryResult, StorageError};
use crate::storage::{KvRead, StoreTransaction};

pub(crate) fn load_json<T, R>(reader: &R, key: &[u8]) -> LotteryResult<Option<T>>
where
    T: DeserializeOwned,
    R: KvRead + ?Sized,
{
    let Some(bytes) = reader.read(key)? else {
        return Ok(None);
    };

    let value = serde_json::from_slice(&bytes).map_err(|e| {
        StorageError::CorruptedData(format!(
            "Failed to decode {}: {}",
            String::from_utf8_lossy(key),
            e
        ))
    })?;
    Ok(Some(value))
}

pub(crate) fn scan_json<T, R>(reader: &R, prefix: &[u8]) -> LotteryResult<Vec<T>>
where
    T: DeserializeOwned,
    R: KvRead + ?Sized,
{
    reader
        .scan(prefix)?
        .into_iter()
        .map(|(key, bytes)| {
            serde_json::from_slice(&bytes).map_err(|e| {
                StorageError::CorruptedData(format!(
                    "Failed to decode {}: {}",
                    String::from_utf8_lossy(&key),
                    e
                ))
                .into()
            })
        })
        .collect()
}

pub(crate) fn stage_json<T: Serialize>(
    tx: &mut StoreTransaction<'_>,
    key: impl Into<Vec<u8>>,
    value: &T,
) -> LotteryResult<()> {
    let key = key.into();
    let bytes = serde_json::to_vec(value).map_err(|e| {
        StorageError::WriteFailed(format!(
            "Failed to encode {}: {}",
            String::from_utf8_lossy(&key),
            e
        ))
    })?;
    tx.put(key, bytes);
    Ok(())
}
