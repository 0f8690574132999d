//! prism CLI - build and probe BVHs over synthetic scenes
//!
//! Generates a random scene, builds an accelerator over it and reports
//! build statistics or ray query throughput.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{debug, info};
use prism_accel::{
    BvhAccel, BvhSettings, Cuboid, GeometricPrimitive, Ray, SharedPrimitive, Sphere, SplitMethod,
    Triangle,
};
use prism_math::{Bounds3, Point3, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Parser)]
#[command(name = "prism")]
#[command(about = "Build and probe bounding volume hierarchies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a hierarchy and print its statistics
    Build {
        #[command(flatten)]
        scene: SceneArgs,
        #[command(flatten)]
        bvh: BvhArgs,
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Trace random rays through a hierarchy
    Trace {
        #[command(flatten)]
        scene: SceneArgs,
        #[command(flatten)]
        bvh: BvhArgs,
        /// Number of rays to trace
        #[arg(short, long, default_value_t = 100_000)]
        rays: usize,
        /// Check every result against a brute-force scan
        #[arg(long)]
        verify: bool,
    },
    /// Build with every split method and compare
    Compare {
        #[command(flatten)]
        scene: SceneArgs,
        /// Maximum primitives per leaf
        #[arg(long, default_value_t = 4)]
        max_prims: usize,
        /// Number of rays traced per method
        #[arg(short, long, default_value_t = 50_000)]
        rays: usize,
    },
}

#[derive(Args)]
struct SceneArgs {
    /// Number of primitives
    #[arg(short = 'n', long, default_value_t = 100_000)]
    count: usize,
    /// Primitive kind
    #[arg(long, value_enum, default_value_t = ShapeKind::Sphere)]
    shape: ShapeKind,
    /// Random seed
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

#[derive(Args)]
struct BvhArgs {
    /// Split method: sah, hlbvh, middle or equal
    #[arg(short, long, default_value = "sah")]
    split_method: String,
    /// Maximum primitives per leaf (clamped to 1..=255)
    #[arg(long, default_value_t = 4)]
    max_prims: usize,
}

impl BvhArgs {
    fn settings(&self) -> BvhSettings {
        BvhSettings::from_params(self.max_prims, &self.split_method)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ShapeKind {
    Sphere,
    Box,
    Triangle,
}

/// Half-width of the cube the scene is scattered through.
const SCENE_EXTENT: f64 = 100.0;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { scene, bvh, json } => {
            let prims = generate_scene(&scene);
            let accel = BvhAccel::with_settings(prims, &bvh.settings());
            let stats = accel.stats();
            if json {
                println!("{}", serde_json::to_string_pretty(stats)?);
            } else {
                println!("method:          {}", accel.split_method());
                println!("primitives:      {}", stats.primitives);
                println!("nodes:           {} ({} leaves)", stats.nodes(), stats.leaf_nodes);
                println!("depth:           {}", stats.depth);
                println!("max leaf:        {}", stats.max_leaf_primitives);
                println!("mean leaf:       {:.2}", stats.mean_leaf_primitives());
                println!("node memory:     {} KiB", stats.node_bytes / 1024);
                println!("world bound:     {:?} .. {:?}", accel.world_bound().min, accel.world_bound().max);
            }
        }
        Commands::Trace {
            scene,
            bvh,
            rays,
            verify,
        } => {
            let prims = generate_scene(&scene);
            let accel = BvhAccel::with_settings(prims.clone(), &bvh.settings());
            let rays = generate_rays(rays, scene.seed.wrapping_add(1));
            let hits = trace(&accel, &rays);
            if verify {
                verify_against_brute_force(&accel, &prims, &rays)?;
                println!("verified {} rays against brute force", rays.len());
            }
            println!("{hits} of {} rays hit", rays.len());
        }
        Commands::Compare {
            scene,
            max_prims,
            rays,
        } => {
            let prims = generate_scene(&scene);
            let rays = generate_rays(rays, scene.seed.wrapping_add(1));
            println!("{:<8} {:>10} {:>8} {:>6} {:>12} {:>14}", "method", "build", "nodes", "depth", "hits", "rays/s");
            for method in [
                SplitMethod::Sah,
                SplitMethod::Hlbvh,
                SplitMethod::Middle,
                SplitMethod::EqualCounts,
            ] {
                let start = Instant::now();
                let accel = BvhAccel::new(prims.clone(), max_prims, method);
                let build = start.elapsed();

                let start = Instant::now();
                let hits = trace(&accel, &rays);
                let rate = rays.len() as f64 / start.elapsed().as_secs_f64().max(1e-9);
                println!(
                    "{:<8} {:>10.2?} {:>8} {:>6} {:>12} {:>14.0}",
                    method.name(),
                    build,
                    accel.stats().nodes(),
                    accel.stats().depth,
                    hits,
                    rate
                );
            }
        }
    }

    Ok(())
}

fn generate_scene(args: &SceneArgs) -> Vec<SharedPrimitive> {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let start = Instant::now();
    let prims: Vec<SharedPrimitive> = (0..args.count)
        .map(|_| {
            let center = random_point(&mut rng, SCENE_EXTENT);
            let size = rng.gen_range(0.1..1.5);
            let prim = match args.shape {
                ShapeKind::Sphere => GeometricPrimitive::new(Arc::new(Sphere::new(center, size))),
                ShapeKind::Box => {
                    let half = Vec3::repeat(size);
                    GeometricPrimitive::new(Arc::new(Cuboid::new(Bounds3::new(
                        center - half,
                        center + half,
                    ))))
                }
                ShapeKind::Triangle => GeometricPrimitive::new(Arc::new(Triangle::new(
                    center,
                    center + random_point(&mut rng, size).coords,
                    center + random_point(&mut rng, size).coords,
                ))),
            };
            Arc::new(prim) as SharedPrimitive
        })
        .collect();
    debug!("generated {} primitives in {:?}", prims.len(), start.elapsed());
    prims
}

fn random_point(rng: &mut StdRng, extent: f64) -> Point3 {
    Point3::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    )
}

/// Rays from points around the scene toward points inside it.
fn generate_rays(n: usize, seed: u64) -> Vec<Ray> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let origin = random_point(&mut rng, 1.5 * SCENE_EXTENT);
            let target = random_point(&mut rng, SCENE_EXTENT);
            Ray::new(origin, target - origin)
        })
        .collect()
}

/// Count closest hits and log throughput.
fn trace(accel: &BvhAccel, rays: &[Ray]) -> usize {
    let start = Instant::now();
    let hits = rays
        .iter()
        .filter(|ray| accel.intersect(&mut { **ray }).is_some())
        .count();
    let elapsed = start.elapsed();
    info!(
        "traced {} rays in {:?} ({:.0} rays/s)",
        rays.len(),
        elapsed,
        rays.len() as f64 / elapsed.as_secs_f64().max(1e-9)
    );
    hits
}

fn verify_against_brute_force(
    accel: &BvhAccel,
    prims: &[SharedPrimitive],
    rays: &[Ray],
) -> Result<()> {
    for (i, ray) in rays.iter().enumerate() {
        let mut fast = *ray;
        let got = accel.intersect(&mut fast).map(|hit| hit.t);

        let mut slow = *ray;
        let mut expected = None;
        for prim in prims {
            if let Some(hit) = prim.intersect(&mut slow) {
                expected = Some(hit.t);
            }
        }

        let agree = match (got, expected) {
            (Some(a), Some(b)) => (a - b).abs() <= 1e-9 * b.abs().max(1.0),
            (None, None) => true,
            _ => false,
        };
        if !agree {
            bail!("ray {i}: accelerator returned {got:?}, brute force {expected:?}");
        }

        let any = prims.iter().any(|prim| prim.intersect_p(ray));
        if accel.intersect_p(ray) != any {
            bail!("ray {i}: occlusion mismatch (brute force says {any})");
        }
    }
    Ok(())
}
