#![no_main]

use std::sync::OnceLock;

use libfuzzer_sys::fuzz_target;
use vbulletin_bbcode::{ConversionConfig, convert};

static CONFIG: OnceLock<ConversionConfig> = OnceLock::new();

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let config = CONFIG.get_or_init(|| ConversionConfig::vbulletin().expect("preset is valid"));

    let result = convert(text, config);
    for warning in &result.warnings {
        assert!(warning.position < text.len());
        assert!(text.is_char_boundary(warning.position));
    }
});
