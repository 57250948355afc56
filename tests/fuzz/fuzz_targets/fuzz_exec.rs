#![no_main]
use libfuzzer_sys::fuzz_target;
use minicov::exec::{read_exec, ExecutionDataStore};

fuzz_target!(|data: &[u8]| {
    // Exec reader must not panic on any input.
    let mut store = ExecutionDataStore::new();
    let _ = read_exec(&mut &*data, &mut store);
});
