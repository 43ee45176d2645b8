//! Schema fuzz target: feed arbitrary text to the TL schema compiler.
//! Compilation must not panic; it returns a schema or a `TlError`.
//! Build with: cargo fuzz run parser_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    if let Ok(schema) = tlschema::Schema::compile(s) {
        let _ = tlschema::generate(&schema, &tlschema::GeneratorOptions::default());
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run parser_fuzz");
}
