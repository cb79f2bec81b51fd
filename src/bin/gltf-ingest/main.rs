//! gltf-ingest CLI - Tool for inspecting glTF and GLB assets.

use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use gltf_ingest::device::HeadlessDevice;
use gltf_ingest::pipeline::{FlipVPolicy, GltfContainer, GltfParser, ParseOptions};
use gltf_ingest::resources::Node;
use tracing::{debug, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "info";
    let mut flip_v = FlipVPolicy::default();
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            "--flip-v" => flip_v = FlipVPolicy::Always,
            "--no-flip-v" => flip_v = FlipVPolicy::Never,
            _ => filtered_args.push(arg),
        }
    }
    init_tracing(level);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let options = ParseOptions::new().with_flip_v(flip_v);
    match filtered_args[0] {
        // Info command - asset summary
        "info" | "i" => {
            let path = require_file(&filtered_args, "info");
            cmd_info(path, options);
        }

        // Tree command - node hierarchy per scene
        "tree" | "t" => {
            let path = require_file(&filtered_args, "tree");
            cmd_tree(path, options);
        }

        // Stats command - per-mesh statistics with timing
        "stats" | "s" => {
            let path = require_file(&filtered_args, "stats");
            cmd_stats(path, options);
        }

        "help" | "h" | "-h" | "--help" => print_help(),

        "version" | "--version" => {
            println!("gltf-ingest {} ({})", env!("CARGO_PKG_VERSION"), env!("GLTF_INGEST_BUILD_DATE"));
        }

        // Default: if file exists, show info; otherwise error
        other => {
            if Path::new(other).exists() {
                cmd_info(other, options);
            } else {
                eprintln!("Unknown command: {}", other);
                eprintln!();
                print_help();
                std::process::exit(1);
            }
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr));
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn require_file<'a>(args: &[&'a str], command: &str) -> &'a str {
    match args.get(1) {
        Some(path) => path,
        None => {
            eprintln!("Error: missing file argument");
            eprintln!("Usage: gltf-ingest {} <file.gltf|file.glb>", command);
            std::process::exit(1);
        }
    }
}

fn print_help() {
    println!("gltf-ingest - glTF 2.0 / GLB inspection toolkit");
    println!();
    println!("USAGE:");
    println!("    gltf-ingest [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info   <file>    Show asset info and resource counts");
    println!("    t, tree   <file>    Show node hierarchy of every scene");
    println!("    s, stats  <file>    Show per-mesh statistics with timing info");
    println!("    version             Show version and build date");
    println!("    h, help             Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Only show errors");
    println!("    --flip-v         Always flip texture V coordinates");
    println!("    --no-flip-v      Never flip texture V coordinates");
    println!();
    println!("NOTES:");
    println!("    - Passing a file directly is equivalent to 'info'");
    println!("    - RUST_LOG overrides the verbosity flags");
}

fn load(path: &str, options: ParseOptions) -> (GltfContainer, f64) {
    info!("Opening asset: {}", path);
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let parser = GltfParser::new(Arc::new(HeadlessDevice::new())).with_options(options);
    let start = Instant::now();
    match runtime.block_on(parser.load_file(path)) {
        Ok(container) => {
            let elapsed = start.elapsed().as_secs_f64() * 1000.0;
            debug!("Parsed in {:.2} ms", elapsed);
            (container, elapsed)
        }
        Err(e) => {
            eprintln!("Failed to open {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn cmd_info(path: &str, options: ParseOptions) {
    let (container, _) = load(path, options);
    let doc = &container.document;

    println!("Asset: {}", path);
    if let Some(asset) = &doc.asset {
        println!("Version: {}", asset.version);
    }
    if let Some(generator) = doc.generator() {
        println!("Generator: {}", generator);
    }
    if !doc.extensions_used.is_empty() {
        println!("Extensions: {}", doc.extensions_used.join(", "));
    }
    println!();

    let primitives: usize = container.renders.iter().map(|r| r.meshes.len()).sum();
    let textures = container.textures.iter().flatten().count();
    println!("Resources:");
    println!("  Scenes:     {}", container.scenes.len());
    println!("  Nodes:      {}", container.nodes.len());
    println!("  Meshes:     {} ({} primitives)", container.renders.len(), primitives);
    println!("  Materials:  {}", container.materials.len());
    println!("  Textures:   {} of {}", textures, container.textures.len());
    println!("  Skins:      {}", container.skins.len());
    println!("  Animations: {}", container.animations.len());
    println!("  Cameras:    {}", container.cameras.len());
    println!("  Lights:     {}", container.lights.len());
    if !container.variants.is_empty() {
        println!("  Variants:   {}", container.variants.join(", "));
    }
}

fn cmd_tree(path: &str, options: ParseOptions) {
    let (container, _) = load(path, options);
    let nodes = &container.nodes;

    for (i, scene) in container.scenes.iter().enumerate() {
        let marker = if container.default_scene == Some(i) { " (default)" } else { "" };
        println!("{}{}", scene.name(nodes), marker);
        for &child in scene.children(nodes) {
            print_tree(&container, child, 1);
        }
    }
}

fn print_tree(container: &GltfContainer, index: usize, depth: usize) {
    let Some(node) = container.nodes.get(index) else { return };
    println!("{}{}{}", "  ".repeat(depth), node.name, node_tags(container, index, node));
    for &child in &node.children {
        print_tree(container, child, depth + 1);
    }
}

fn node_tags(container: &GltfContainer, index: usize, node: &Node) -> String {
    let mut tags = Vec::new();
    if let Some(mesh) = node.mesh {
        tags.push(format!("mesh {}", mesh));
    }
    if let Some(skin) = node.skin {
        tags.push(format!("skin {}", skin));
    }
    if container.cameras.contains_key(&index) {
        tags.push("camera".to_string());
    }
    if let Some(light) = container.lights.get(&index) {
        tags.push(format!("{:?} light", light.light_type));
    }
    if tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", tags.join(", "))
    }
}

fn cmd_stats(path: &str, options: ParseOptions) {
    let (container, elapsed) = load(path, options);

    println!("Asset: {}", path);
    println!("Parse time: {:.2} ms", elapsed);
    println!();

    let mut total_vertices = 0;
    let mut total_indices = 0;
    for (i, render) in container.renders.iter().enumerate() {
        let name = render.name.as_deref().unwrap_or("<unnamed>");
        println!("Mesh {} '{}':", i, name);
        for mesh in &render.meshes {
            let vb = &mesh.vertex_buffer;
            let semantics: Vec<String> = vb.format.elements.iter().map(|e| format!("{:?}", e.semantic)).collect();
            let index_info = match &mesh.index_buffer {
                Some(ib) => format!("{} indices ({:?})", ib.count, ib.format),
                None => "non-indexed".to_string(),
            };
            println!(
                "  {:?}: {} vertices, stride {}, {} [{}]",
                mesh.topology,
                vb.num_vertices,
                vb.format.stride,
                index_info,
                semantics.join(" ")
            );
            if let Some(morph) = &mesh.morph {
                println!("    {} morph targets", morph.targets.len());
            }
            total_vertices += vb.num_vertices;
            total_indices += mesh.index_buffer.as_ref().map_or(0, |ib| ib.count);
        }
    }

    println!();
    println!("Totals: {} vertices, {} indices", total_vertices, total_indices);
    for track in &container.animations {
        println!("Animation '{}': {:.3}s, {} curves", track.name, track.duration, track.curves.len());
    }
}
