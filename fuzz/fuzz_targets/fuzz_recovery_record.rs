//! Fuzz target: `RecoveryRecord::parse`
//!
//! The restore file is read back at startup and may be truncated or
//! corrupted by a power cut.  Invariants checked:
//! - No panics under any byte sequence
//! - Anything that parses re-encodes to a record that parses identically
//! - An active record always carries an address
//!
//! cargo fuzz run fuzz_recovery_record

#![no_main]

use charge_manager::recovery::RecoveryRecord;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(record) = RecoveryRecord::parse(text) else {
        return;
    };
    if record.active {
        assert!(!record.address.is_empty());
    }
    let again = RecoveryRecord::parse(&record.encode()).expect("encoded record must parse");
    assert_eq!(again, record);
});
