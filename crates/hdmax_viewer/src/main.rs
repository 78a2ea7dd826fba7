// Nested instancing demo: builds a small forest scene in memory, syncs it
// before and after an edit and logs the resolved instance transforms.
// Run with: cargo run --release --bin hdmax_viewer -- [config.json]

use std::sync::Arc;

use anyhow::{Context, Result};
use hdmax_core::{MemorySceneDelegate, SdfPath};
use hdmax_math::{DMat4, DVec3, QuatH, Vec3};
use hdmax_render::{sync_meshes, InstancedMesh, RenderConfig, RenderIndex};

/// Grid of tree clusters; each cluster scatters a few trees, each tree draws
/// a trunk and a canopy mesh.
fn build_scene(delegate: &MemorySceneDelegate) -> Result<(Vec<InstancedMesh>, SdfPath)> {
    let clusters = SdfPath::new("/World/Clusters");
    let trees = SdfPath::new("/World/Clusters/Trees");
    let trunk = SdfPath::new("/World/Clusters/Trees/Trunk");
    let canopy = SdfPath::new("/World/Clusters/Trees/Canopy");

    delegate.add_instancer(&clusters, None)?;
    delegate.add_instancer(&trees, Some(&clusters))?;
    delegate.add_mesh(&trunk, Some(&trees), DMat4::IDENTITY)?;
    delegate.add_mesh(
        &canopy,
        Some(&trees),
        DMat4::from_translation(DVec3::new(0.0, 3.0, 0.0)),
    )?;

    // 3x3 grid of clusters, 50 units apart
    let cluster_positions: Vec<Vec3> = (0..9)
        .map(|i| Vec3::new((i % 3) as f32 * 50.0, 0.0, (i / 3) as f32 * 50.0))
        .collect();
    delegate.set_instance_primvar(&clusters, "instanceTranslations", cluster_positions)?;
    delegate.set_instance_indices(&clusters, &trees, (0..9).collect())?;

    // five trees per cluster, rotated and scaled individually
    let tree_positions: Vec<Vec3> = (0..5)
        .map(|i| {
            let angle = i as f32 * std::f32::consts::TAU / 5.0;
            Vec3::new(angle.cos() * 10.0, 0.0, angle.sin() * 10.0)
        })
        .collect();
    let tree_rotations: Vec<QuatH> = (0..5)
        .map(|i| {
            let half_angle = i as f32 * 0.3;
            QuatH::new(half_angle.cos(), 0.0, half_angle.sin(), 0.0)
        })
        .collect();
    let tree_scales: Vec<Vec3> = (0..5).map(|i| Vec3::splat(0.8 + i as f32 * 0.1)).collect();

    delegate.set_instance_primvar(&trees, "instanceTranslations", tree_positions)?;
    delegate.set_instance_primvar(&trees, "instanceRotations", tree_rotations)?;
    delegate.set_instance_primvar(&trees, "instanceScales", tree_scales)?;
    delegate.set_instance_indices(&trees, &trunk, (0..5).collect())?;
    delegate.set_instance_indices(&trees, &canopy, vec![0, 1, 2, 3])?;

    Ok((
        vec![InstancedMesh::new(trunk), InstancedMesh::new(canopy)],
        trees,
    ))
}

fn load_config() -> Result<RenderConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config '{}'", path))?;
            let config = RenderConfig::from_json_str(&json)
                .with_context(|| format!("Failed to parse config '{}'", path))?;
            log::info!("Loaded config from {}", path);
            Ok(config)
        }
        None => Ok(RenderConfig::default()),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting HdMax instancing demo");

    let config = load_config()?;
    let delegate = Arc::new(MemorySceneDelegate::new());
    let (meshes, trees) = build_scene(&delegate)?;
    let index = RenderIndex::new(delegate.clone(), config);

    let batches = sync_meshes(&index, &meshes);
    for batch in &batches {
        log::info!(
            "{}: {} instances, {} bytes",
            batch.mesh_id,
            batch.instance_count(),
            batch.as_bytes().len()
        );
        for instance in batch.instances.iter().take(3) {
            let origin = instance.matrix().transform_point3(Vec3::ZERO);
            log::info!("  instance at {:?}", origin);
        }
    }
    log::info!("First sync: {} primvar fetches", delegate.total_fetches());

    // unchanged scene: everything comes from the primvar caches
    sync_meshes(&index, &meshes);
    log::info!("Second sync: {} primvar fetches", delegate.total_fetches());

    // edit one instancer and sync again
    let bits = delegate.set_instance_primvar(
        &trees,
        "instanceScales",
        vec![Vec3::splat(2.0); 5],
    )?;
    index.change_tracker().mark_instancer_dirty(&trees, bits);
    sync_meshes(&index, &meshes);
    log::info!("After edit: {} primvar fetches", delegate.total_fetches());

    Ok(())
}
