#![no_main]
use libfuzzer_sys::fuzz_target;
use regresql::plan::schema::PlanDocument;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        // Malformed documents must be reported, never panic
        if let Ok(document) = PlanDocument::parse(Path::new("fuzz.yaml"), content) {
            assert_eq!(document.names.len(), document.bindings.len());
            let _ = document.render();
        }
    }
});
