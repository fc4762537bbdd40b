use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::AssetId;

/// Namespace for version 1 of the asset id scheme. A different derivation
/// must use a different namespace so ids from both schemes never collide.
pub const ASSET_ID_NAMESPACE_V1: Uuid = Uuid::from_u128(0x5f0c_2a7e_8d41_4b6a_9c3e_71d2_a4e8_b019);

/// Derive the id of an asset created by the given transaction.
///
/// The name hashed into the UUID v5 is `"<tx_id>_<seconds>.<nanos>"`, with
/// nanoseconds zero-padded to nine digits. Every executor replaying the same
/// transaction computes the same id.
pub fn derive_asset_id(tx_id: &str, timestamp: DateTime<Utc>) -> AssetId {
    let name = format!(
        "{}_{}.{:09}",
        tx_id,
        timestamp.timestamp(),
        timestamp.timestamp_subsec_nanos()
    );
    Uuid::new_v5(&ASSET_ID_NAMESPACE_V1, name.as_bytes()).to_string()
}
