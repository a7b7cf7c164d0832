#![no_main]
use libfuzzer_sys::fuzz_target;
use regresql::parse_query_string;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let query = parse_query_string("fuzz.sql", text);

        // every occurrence maps to a known variable
        assert!(query.params.iter().all(|p| query.vars.contains(p)));
        assert!(query.vars.len() <= query.params.len());
        assert_eq!(query.ordinals.len(), query.params.len());
        assert_eq!(query.fold_args(&query.params).len(), query.vars.len());
    }
});
