//! Post conversion example demonstrating the BBCode converter
//!
//! Run with `RUST_LOG=debug` to see conversion warnings as they are found.
//! An optional argument names a TOML dialect file to use instead of the
//! stock vBulletin dialect.

use std::path::Path;

use tracing_subscriber::EnvFilter;
use vbulletin_bbcode::{BbCodeConverter, ConversionConfig};

const SAMPLES: &[(&str, &str)] = &[
    ("Well-formed post", "[b]Hello[/b] and [i]welcome[/i] to the [url=http://example.com/]forum[/url]!"),
    ("Quote with author", "[quote=\"Ann;4521\"]First![/quote]Not quite."),
    ("Lists", "[list=1][*]Read the rules[*]Be nice[/list]"),
    ("Unclosed tag", "[spoiler]The butler did it"),
    ("Unmatched closing tag", "Nothing open here[/b]"),
    ("Misnested tags", "[b]bold [i]both[/b] italic?[/i]"),
    ("Unsafe link", "[url=javascript:alert(1)]free stuff[/url]"),
    ("Unknown tag", "[marquee]retro[/marquee]"),
];

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ConversionConfig::from_toml_file(Path::new(&path)),
        None => ConversionConfig::vbulletin(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid dialect: {err}");
            std::process::exit(1);
        }
    };
    let converter = BbCodeConverter::new(config);

    println!("=== vBulletin BBCode Converter - Examples ===\n");
    for (title, bbcode) in SAMPLES {
        println!("{title}");
        println!("Input:  {bbcode}");

        let result = converter.convert(bbcode);
        println!("Output: {}", result.html);
        for warning in &result.warnings {
            println!("  warning: {warning}");
        }
        println!("---\n");
    }
}
