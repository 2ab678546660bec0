#![no_main]

use libfuzzer_sys::fuzz_target;
use vbulletin_bbcode::{Thread, parse_page};

fuzz_target!(|data: &[u8]| {
    if let Ok(dom) = parse_page(data) {
        let _ = Thread::from_dom(1, &dom);
    }
});
