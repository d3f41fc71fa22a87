//! Textual id to numeric point id mapping.
//!
//! Providers that only accept unsigned 64-bit point ids (Qdrant) address
//! records through [`numeric_id`]. The point id is the first 8 bytes of the
//! BLAKE3 digest of the id's UTF-8 bytes, read little-endian. BLAKE3 is
//! unkeyed here and has a fixed output, so every process on every platform
//! derives the same point id.
//!
//! Collisions are not detected. Two distinct ids that hash to the same value
//! address the same point, and the later upsert overwrites the earlier one.
//! At 64 bits this is negligible below ~10^9 records per index; callers that
//! need strict uniqueness deduplicate at the source.

use crate::error::{VectorError, VectorResult};

/// Map a non-empty textual id to its numeric point id.
pub fn numeric_id(id: &str) -> VectorResult<u64> {
    if id.is_empty() {
        return Err(VectorError::InvalidInput(
            "identifier must not be empty".to_string(),
        ));
    }

    let digest = blake3::hash(id.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    Ok(u64::from_le_bytes(prefix))
}
