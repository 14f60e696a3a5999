//! Fuzz target for persisted value blobs.
//!
//! `PersistedValues::from_bytes` decodes length-prefixed vectors from
//! untrusted files, and `CompressedProbBackoffValues::from_persisted` replays
//! every bitstream it is handed. Malformed input must come back as an error:
//! no panic, no allocation beyond the input size.

#![no_main]

use libfuzzer_sys::fuzz_target;
use lmstore_core::values::{CompressedProbBackoffValues, PersistedValues};
use lmstore_core::{Offset, ProbBackoffPair, ValueContainer};

fuzz_target!(|data: &[u8]| {
    let Ok(persisted) = PersistedValues::from_bytes(data) else {
        return;
    };
    let Ok(values) = CompressedProbBackoffValues::from_persisted(persisted) else {
        return;
    };

    // A blob that loads must answer every offset it claims to hold.
    let mut out = ProbBackoffPair::default();
    for order in 0..values.num_orders() {
        let size = values.size(order);
        for offset in [0, size / 2, size.saturating_sub(1)] {
            if offset < size {
                values.get_from_offset(Offset(offset), order, &mut out);
            }
        }
    }
});
