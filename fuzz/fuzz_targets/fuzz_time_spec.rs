#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(spec) = std::str::from_utf8(data) else {
        return;
    };
    let Some(now) = chrono::DateTime::from_timestamp(1_700_000_000, 0) else {
        return;
    };
    let _ = keyward_engine::time_window::parse_time_spec(spec, now);
});
