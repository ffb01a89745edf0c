//! Bincode Codec using `bincode`

use crate::traits::CacheCodec;
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Compact binary codec using `bincode`
///
/// Not self-describing: every process sharing the remote store must agree on
/// the value type's exact layout.
#[cfg_attr(docsrs, doc(cfg(feature = "bincode")))]
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeCodec;

impl CacheCodec for BincodeCodec {
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).context("failed to encode value with bincode")
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).context("failed to decode value with bincode")
    }

    fn name(&self) -> &'static str {
        "bincode"
    }
}
