use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use rommap_core::hints::DisassemblerHints;
use rommap_core::image::ByteImage;
use rommap_core::model::{self, DetectedMap, MapType};
use rommap_core::persist;
use rommap_core::scan::{self, ScanOptions};
use rommap_core::templates::{Template, TemplateRescanner};

use crate::{sha256_bytes, CommandError};

/// Sweep step for the template rescan, in bytes.
const RESCAN_STRIDE: usize = 2;

/// Arguments for the scan command (mirrors the CLI flags).
#[derive(Debug, Clone)]
pub struct ScanArgs {
    pub image: String,
    pub templates: Option<String>,
    pub hints: Option<String>,
    pub out: String,
    pub min_rows: usize,
    pub max_cols: usize,
    pub threads: Option<usize>,
    pub grow_rows: bool,
    pub search_range: usize,
    pub templates_out: Option<String>,
    pub json: bool,
}

/// Scan a firmware image for candidate maps and persist them as JSON.
pub fn scan_command(args: &ScanArgs) -> Result<(), CommandError> {
    let bytes = persist::load_image_bytes(Path::new(&args.image))?;
    let image_hash = sha256_bytes(&bytes);
    let image = ByteImage::new(bytes);

    let templates: Option<Vec<Template>> = match &args.templates {
        Some(path) => Some(persist::load_templates(Path::new(path))?),
        None => None,
    };
    let hints: Option<DisassemblerHints> = match &args.hints {
        Some(path) => Some(persist::load_hints(Path::new(path))?),
        None => None,
    };

    let options = ScanOptions {
        min_rows: args.min_rows,
        max_cols: args.max_cols,
        workers: args.threads,
        grow_rows: args.grow_rows,
    };

    let started = Instant::now();
    let mut maps = scan::scan(&image, &options, hints.as_ref());

    let mut relocated = 0usize;
    if let Some(templates) = &templates {
        let rescanner = TemplateRescanner::new(args.search_range, RESCAN_STRIDE);
        let known_by_offset = BTreeMap::new();
        let hits = rescanner.rescan_detailed(&image, templates, &known_by_offset);
        relocated = hits.len();

        // Enrich brute-scan candidates that landed on a relocated template.
        for hit in &hits {
            for map in maps.iter_mut().filter(|map| map.offset == hit.new_offset) {
                map.datatype = hit.template.datatype.map(|datatype| datatype.as_str().to_string());
                map.decimal_places = hit.template.decimal_places;
                map.units = hit.template.units.clone();
                map.raw_embedded_xml = Some(hit.rewritten_xml.clone());
            }
        }

        if let Some(out) = &args.templates_out {
            let rewritten: BTreeMap<usize, String> = hits
                .iter()
                .map(|hit| (hit.new_offset, hit.rewritten_xml.clone()))
                .collect();
            persist::save_relocated(Path::new(out), &rewritten)?;
        }
    }

    model::sort_for_output(&mut maps);
    persist::save_maps(Path::new(&args.out), &maps)?;
    let elapsed = started.elapsed();

    let by_type = count_by_type(&maps);
    if args.json {
        let payload = serde_json::json!({
            "image": args.image,
            "image_size": image.size(),
            "image_sha256": image_hash,
            "candidates": maps.len(),
            "by_type": by_type,
            "relocated_templates": relocated,
            "elapsed_ms": elapsed.as_millis() as u64,
            "out": args.out,
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(text) => println!("{text}"),
            Err(_) => println!("{payload}"),
        }
        return Ok(());
    }

    println!("Scanned {} ({} bytes)", args.image, image.size());
    println!("  SHA-256:    {image_hash}");
    println!("  Candidates: {}", maps.len());
    for (label, count) in &by_type {
        println!("    {label}: {count}");
    }
    if templates.is_some() {
        println!("  Relocated templates: {relocated}");
    }
    println!("  Elapsed:    {:.2?}", elapsed);
    println!("  Wrote {}", args.out);

    Ok(())
}

/// Candidate counts per classified type, in stable label order.
fn count_by_type(maps: &[DetectedMap]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for map in maps {
        let label = match map.map_type {
            MapType::Unknown => "unknown",
            MapType::Fuel => "fuel",
            MapType::Ignition => "ignition",
            MapType::Boost => "boost",
            MapType::Maf => "maf",
            MapType::Injector => "injector",
        };
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}
