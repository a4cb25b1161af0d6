#![no_main]

use keyed_di::{ConfigurationBuilder, JsonSource, MemorySource};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Arbitrary keys and documents must either load or fail with an error
    let _ = ConfigurationBuilder::new()
        .add_source(MemorySource::new().set(text, 1))
        .build();

    let Ok(config) = ConfigurationBuilder::new().add_source(JsonSource::new(text)).build() else {
        return;
    };

    // Every prefix of the input doubles as a lookup path
    for (end, _) in text.char_indices().take(32) {
        let path = &text[..end];
        let _ = config.get(path);
        let _ = config.section(path);
        let _ = config.bind::<serde_json::Value>(path);
    }
});
