#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // XML conversion and aggregation must not panic on any input.
    if let Ok(classes) = minicov::engine::xml::parse(data) {
        let _ = minicov::aggregate::aggregate(&classes);
    }
});
