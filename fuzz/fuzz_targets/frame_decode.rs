#![no_main]

use libfuzzer_sys::fuzz_target;
use queuehouse_core::frame;

fuzz_target!(|data: &[u8]| {
    // Feed arbitrary bytes to the frame decoder. It must reject all
    // malformed inputs without panicking:
    // - truncated length prefixes
    // - zero and oversized lengths
    // - frames cut off mid-payload
    let _ = frame::decode_frame(data, 1 << 20);
    let _ = frame::decode_frame(data, 1);

    // Walk as many consecutive frames as the input holds.
    let mut rest = data;
    while let Ok((_, consumed)) = frame::decode_frame(rest, 1 << 16) {
        rest = &rest[consumed..];
    }
});
