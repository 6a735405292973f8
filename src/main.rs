//! # mdpager CLI
//!
//! Usage:
//!   mdpager document.json -o pages.json
//!   mdpager document.json -c options.json -o pages.json
//!   cat document.json | mdpager > pages.json
//!
//! Input is an mdast tree as JSON. Output is the recorded draw calls of every
//! page, as JSON. Set `RUST_LOG=debug` for pipeline logs.

use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use serde::Serialize;

use mdpager::diagnostics::Diagnostic;
use mdpager::error::ConvertError;
use mdpager::font::FontRegistry;
use mdpager::image_loader::FileLoader;
use mdpager::layout::PageExtent;
use mdpager::model::Document;
use mdpager::options::Options;
use mdpager::paint::{DrawOp, RecordingPainter};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Output {
    pages: Vec<OutputPage>,
    diagnostics: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputPage {
    #[serde(flatten)]
    extent: PageExtent,
    ops: Vec<DrawOp>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    let input_path = args.get(1).filter(|a| !a.starts_with('-')).cloned();
    let flag = |name: &str| {
        args.windows(2)
            .find(|w| w[0] == name)
            .map(|w| w[1].clone())
    };
    let options_path = flag("-c");
    let output_path = flag("-o");

    let input = match &input_path {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).map(|_| buf)
        }
    };
    let input = match input {
        Ok(input) => input,
        Err(e) => fail(&format!("Failed to read input: {}", e)),
    };
    let options_json = match options_path.as_deref().map(fs::read_to_string).transpose() {
        Ok(json) => json,
        Err(e) => fail(&format!("Failed to read options: {}", e)),
    };

    let base_dir = input_path
        .as_deref()
        .and_then(|p| Path::new(p).parent())
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let output = match run(&input, options_json.as_deref(), FileLoader::new(base_dir)).await {
        Ok(output) => output,
        Err(e) => fail(&e.to_string()),
    };

    let json = match serde_json::to_string_pretty(&output) {
        Ok(json) => json,
        Err(e) => fail(&format!("Failed to serialize pages: {}", e)),
    };
    match &output_path {
        Some(path) => {
            if let Err(e) = fs::write(path, &json) {
                fail(&format!("Failed to write {}: {}", path, e));
            }
            eprintln!("✓ Written {} pages to {}", output.pages.len(), path);
        }
        None => println!("{}", json),
    }
}

async fn run(
    input: &str,
    options_json: Option<&str>,
    loader: FileLoader,
) -> Result<Output, ConvertError> {
    let document = Document::from_json(input)?;
    let options = match options_json {
        Some(json) => Options::from_json(json)?,
        None => Options::default(),
    };
    let fonts = FontRegistry::from_specs(&options.fonts)?;
    let mut painter = RecordingPainter::new(&fonts);

    let conversion = mdpager::convert(&document, &options, &fonts, &loader, &mut painter).await?;

    let pages = conversion
        .pages
        .iter()
        .zip(painter.into_pages())
        .map(|(extent, recorded)| OutputPage {
            extent: *extent,
            ops: recorded.ops,
        })
        .collect();
    Ok(Output {
        pages,
        diagnostics: conversion
            .diagnostics
            .iter()
            .map(Diagnostic::to_string)
            .collect(),
    })
}

fn fail(message: &str) -> ! {
    eprintln!("✗ {}", message);
    std::process::exit(1);
}
