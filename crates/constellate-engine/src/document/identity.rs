use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::models::{SetupCode, Unit};

/// Length of the identifier before path-safety escaping.
const ID_LEN: usize = 8;

/// Stable content-derived identifier for one unit.
///
/// The fingerprint covers every setup block across all backends (in
/// backend-declaration order) plus the unit's canonical serialized form, so
/// two units share an identifier exactly when their kind, payload and full
/// setup context are byte-identical. Downstream caches key rendered artifacts
/// by this tag; at eight base64 characters it is a content tag, not a
/// security boundary.
pub fn unit_id(setup: &SetupCode, unit: &Unit) -> String {
    let serialized =
        serde_json::to_value(unit).expect("unit serialization cannot fail");
    fingerprint(setup, &serialized)
}

/// Fingerprints an already-serialized unit. `unit_json` must use the
/// canonical (sorted-key) object form that [`serde_json::to_value`] produces,
/// which is also what the persisted document stores.
pub fn fingerprint(setup: &SetupCode, unit_json: &Value) -> String {
    let mut hasher = Sha256::new();
    for block in setup.iter_blocks() {
        hasher.update(block.as_bytes());
    }
    hasher.update(unit_json.to_string().as_bytes());

    let encoded = STANDARD.encode(hasher.finalize());
    let short: String = encoded.chars().take(ID_LEN).collect();
    // `+` and `/` are unsafe in URL path segments. The escape is not
    // reversed anywhere; the collision risk is accepted.
    short.replace('+', "pl").replace('/', "sl")
}
