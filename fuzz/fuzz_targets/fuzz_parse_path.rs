#![no_main]

use formstate::path::{format_path, parse_path};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let name = String::from_utf8_lossy(data);
    let segments = parse_path(&name);
    assert!(!segments.is_empty());

    // Canonical names must be stable under a second round.
    let canonical = format_path(&segments);
    assert_eq!(format_path(&parse_path(&canonical)), canonical);
});
