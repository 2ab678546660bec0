//! Thread extraction example
//!
//! Usage: `cargo run --example extract_thread -- <thread number or URL> [page.html]`
//!
//! Reads a saved `showthread.php` page (the bundled test fixture by
//! default), prints the author ranking and each post converted to HTML as
//! JSON lines.

use std::fs;
use std::process;

use serde_json::json;
use tracing_subscriber::EnvFilter;
use vbulletin_bbcode::{ConversionConfig, Thread, parse_page, parse_thread_reference};

const DEFAULT_PAGE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/showthread.html");

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let reference = args.next().unwrap_or_else(|| "1".to_string());
    let page_path = args.next().unwrap_or_else(|| DEFAULT_PAGE.to_string());

    if let Err(err) = run(&reference, &page_path) {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run(reference: &str, page_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let thread_id = parse_thread_reference(reference)?;
    let page = fs::read(page_path)?;
    let dom = parse_page(&page)?;
    let thread = Thread::from_dom(thread_id, &dom)?;
    let config = ConversionConfig::vbulletin()?;

    println!("Thread {} ({} posts)", thread.id(), thread.posts().len());
    for author in thread.ranked_authors() {
        let op = if author.is_op() { " [OP]" } else { "" };
        println!(
            "  {}{op}: {} posts {:?}",
            author.name(),
            author.post_count(),
            author.post_numbers()
        );
    }
    println!();

    for post in thread.posts() {
        let converted = post.convert_body(&config);
        let line = json!({
            "number": post.number,
            "author": post.author,
            "timestamp": post.timestamp,
            "html": converted.html,
            "warnings": converted.warnings,
        });
        println!("{line}");
    }
    Ok(())
}
