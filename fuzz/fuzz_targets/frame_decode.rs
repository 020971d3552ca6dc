#![no_main]

use beacon_ws::frame::decode;
use libfuzzer_sys::fuzz_target;

// `decode` is a pure function over a byte slice, so it can be fuzzed directly without any
// socket or runtime plumbing. The only property under test is "never panics" — malformed or
// truncated input must come back as `Err` or `Ok(None)`, never a crash.
fuzz_target!(|data: &[u8]| {
    let _ = decode(data, 32 << 20);
});
