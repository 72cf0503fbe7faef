//! Ingest a presentation and print its slide timeline.
//!
//! Usage:
//!   cargo run --example simple_ingest -- deck.pptx

use std::env;
use std::process;

use pptx_ingest::config::ProcessOptions;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <deck.pptx>", args[0]);
        process::exit(1);
    }

    let result = pptx_ingest::process_path(&args[1], "example", &ProcessOptions::default());
    if !result.success {
        eprintln!("Ingest failed: {}", result.error.unwrap_or_default());
        process::exit(1);
    }

    for warning in &result.warnings {
        eprintln!("  warning: {warning}");
    }
    for slide in &result.slides {
        println!(
            "{:>3}. {} [{}] {} bullet(s), {:.1}s",
            slide.slide_number,
            slide.title,
            slide.layout.name,
            slide.bullet_points.len(),
            slide.duration
        );
    }
    if let Some(timeline) = &result.timeline {
        println!("Total: {:.1}s", timeline.total_duration);
    }
}
