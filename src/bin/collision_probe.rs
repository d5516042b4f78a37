//! Collision Probe - terrain collision inspector
//!
//! Run with: `cargo run --bin collision-probe -- <ground_models.cfg> <objects.json> [x z]...`
//!
//! Loads a ground model config and a terrain object stream over flat ground
//! at height 0, prints registry and hash statistics, then the walkable
//! surface height at every `(x, z)` pair given on the command line.
//!
//! Set `RUST_LOG=debug` for per-object load messages.

use std::process::ExitCode;
use std::sync::Arc;

use log::error;
use terrain_collisions_engine::terrain::load_terrain_objects_file;
use terrain_collisions_engine::{CollisionConfig, CollisionService, FlatHeightfield, GroundModelRegistry};

fn usage() -> ExitCode {
    eprintln!("usage: collision-probe <ground_models.cfg> <objects.json> [x z]...");
    ExitCode::from(2)
}

fn parse_points(args: &[String]) -> Option<Vec<(f32, f32)>> {
    if args.len() % 2 != 0 {
        return None;
    }
    args.chunks_exact(2)
        .map(|pair| Some((pair[0].parse().ok()?, pair[1].parse().ok()?)))
        .collect()
}

fn run(ground_models: &str, objects: &str, points: &[(f32, f32)]) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = GroundModelRegistry::new();
    let loaded = registry.load_file(ground_models)?;
    println!("=== Ground models: {loaded} ===");
    for (_, gm) in registry.iter() {
        println!(
            "  {:<16} ms {:.2}  mc {:.2}  va {:.2}  fluid {}",
            gm.name,
            gm.ms,
            gm.mc,
            gm.va,
            gm.has_fluid_layer()
        );
    }

    let mut service = CollisionService::new(
        CollisionConfig::default(),
        Arc::new(registry),
        Arc::new(FlatHeightfield::new(0.0)),
    )?;
    let report = load_terrain_objects_file(&mut service, objects)?;
    let stats = service.stats();

    println!("=== Collision geometry ===");
    println!("  boxes:          {} ({} skipped)", stats.boxes, report.skipped);
    println!("  triangles:      {} ({} rejected)", stats.tris, report.rejected_tris);
    println!("  meshes:         {}", stats.meshes);
    println!("  event sources:  {}", stats.event_sources);
    println!(
        "  hash:           {}/{} buckets used, {} entries, largest bucket {}",
        stats.hash.used_buckets, stats.hash.buckets, stats.hash.total_entries, stats.hash.largest_bucket
    );
    if report.substituted_models > 0 {
        println!("  substituted ground models: {}", report.substituted_models);
    }

    if !points.is_empty() {
        println!("=== Surface heights ===");
        for &(x, z) in points {
            println!("  ({x:.2}, {z:.2}) -> {:.3}", service.surface_height(x, z));
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        return usage();
    }
    let Some(points) = parse_points(&args[2..]) else {
        return usage();
    };

    match run(&args[0], &args[1], &points) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("collision-probe: {e}");
            ExitCode::FAILURE
        }
    }
}
