//! # Voxel Terrain Demo
//!
//! Runs a headless streaming session and logs what it loads.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- [config.json]
//! ```

fn main() {
    voxel_terrain::init_logging();
    if let Err(e) = voxel_terrain::run() {
        log::error!("Terrain demo failed: {}", e);
        std::process::exit(1);
    }
}
