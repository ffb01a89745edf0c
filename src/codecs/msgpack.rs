//! `MessagePack` Codec using `rmp-serde`

use crate::traits::CacheCodec;
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// `MessagePack` codec using `rmp-serde`
///
/// Encodes structs as maps, so values stay readable across processes that add
/// or reorder fields.
#[cfg_attr(docsrs, doc(cfg(feature = "msgpack")))]
#[derive(Debug, Default, Clone, Copy)]
pub struct MsgPackCodec;

impl CacheCodec for MsgPackCodec {
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(value).context("failed to encode value as MessagePack")
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        rmp_serde::from_slice(bytes).context("failed to decode value from MessagePack")
    }

    fn name(&self) -> &'static str {
        "msgpack"
    }
}
