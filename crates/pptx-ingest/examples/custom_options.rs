//! Ingest with custom options and a progress callback.
//!
//! Usage:
//!   cargo run --example custom_options -- deck.pptx

use std::env;
use std::fs;
use std::process;
use std::time::Duration;

use pptx_ingest::config::{ImageOptions, ProcessOptions};
use pptx_ingest::ir::{Transition, TransitionKind};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <deck.pptx>", args[0]);
        process::exit(1);
    }

    let data = fs::read(&args[1]).unwrap_or_else(|e| {
        eprintln!("Cannot read {}: {e}", args[1]);
        process::exit(1);
    });

    let options = ProcessOptions {
        // Eight seconds per slide
        default_duration: Some(8.0),
        transition: Some(Transition::new(TransitionKind::Push, 0.8)),
        images: ImageOptions {
            upload_enabled: false,
            generate_thumbnails: true,
        },
        deadline: Some(Duration::from_secs(30)),
        ..Default::default()
    };

    let result = pptx_ingest::process_with_progress(&data, "example", &options, |event| {
        eprintln!("[{:>3.0}%] {}", event.percentage(), event.stage);
    });

    match result.to_json(true) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Cannot serialize result: {e}");
            process::exit(1);
        }
    }
}
