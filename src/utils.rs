//! Contract identifiers.
//!
//! Generated contract ids are a UUIDv7 (time-ordered) encoded as bech32m,
//! with the configured id prefix as the human-readable part, e.g.
//! `contract_1qy...`.

use bech32::Bech32m;
use uuid7::uuid7;

/// New contract id under `hrp`. Fails only when `hrp` is not a valid bech32
/// human-readable part.
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}
