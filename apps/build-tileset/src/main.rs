// This file is part of Nitrogen.
//
// Nitrogen is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Nitrogen is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with Nitrogen.  If not, see <http://www.gnu.org/licenses/>.

//! Drives the bottom-up tileset build: connects a project manifest's
//! already-chunked leaf tiles into a tree, walks it parent-by-parent
//! through the scheduler, optionally Poisson-stitches each parent's
//! composite texture, and serializes the result to a blob store.

mod content;
mod manifest;

use anyhow::{bail, Context, Result};
use content::{content_uri, TileData, TileContentDto};
use manifest::ProjectManifest;
use nalgebra::{Isometry3, Translation3, UnitQuaternion};
use parent_builder::{build_parent, DependencyInput, ParentBuildOptions};
use parking_lot::RwLock;
use poisson::{solve_image, PoissonParams};
use scheduler::{Master, TileJob, TileOutcome, WorkerPool};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use store::{BlobStore, FileBlobStore};
use structopt::StructOpt;
use tile_tree::{Tile, TileTree, ROOT_ID};
use tracing::{error, info, warn};

#[derive(Debug, StructOpt)]
#[structopt(name = "build-tileset", about = "Build a 3D-Tiles tileset from chunked tile content.")]
struct Opt {
    #[structopt(flatten)]
    trace: tracelog::TraceLogOpts,

    /// Project manifest describing the leaf tiles, camera images, frame
    /// graph, and site drives to build from.
    #[structopt(short = "i", long, parse(from_os_str))]
    input_manifest: PathBuf,

    /// Directory the tileset and its tile content are written under.
    #[structopt(short = "o", long, parse(from_os_str))]
    output_directory: PathBuf,

    /// Worker thread count for the parent-build pool.
    #[structopt(short = "w", long, default_value = "4")]
    workers: usize,

    /// Abort pending parent builds (in-flight ones finish) on the first failure.
    #[structopt(long)]
    quit_on_error: bool,

    /// Run a Poisson seam-removal pass over every baked parent texture.
    #[structopt(long)]
    poisson: bool,

    /// Maximum face count for a built parent mesh.
    #[structopt(long, default_value = "65536")]
    max_faces: usize,

    /// Vertex merge epsilon (meters) applied when building parent meshes.
    #[structopt(long, default_value = "0.002")]
    vertex_merge_epsilon: f64,

    /// Baked parent texture width in texels.
    #[structopt(long, default_value = "512")]
    texture_width: usize,

    /// Baked parent texture height in texels.
    #[structopt(long, default_value = "512")]
    texture_height: usize,
}

fn parent_build_options(opt: &Opt) -> ParentBuildOptions {
    ParentBuildOptions {
        vertex_merge_epsilon: opt.vertex_merge_epsilon,
        max_faces: opt.max_faces,
        texture_width: opt.texture_width,
        texture_height: opt.texture_height,
        ..ParentBuildOptions::default()
    }
}

/// Builds the leaf tiles and their content store from the manifest, and
/// validates the frame graph resolves to a root before committing to a
/// build run.
fn load_leaves(manifest: &ProjectManifest) -> Result<(Vec<Tile>, HashMap<String, TileData>)> {
    let mut tiles = Vec::with_capacity(manifest.leaves.len());
    let mut content = HashMap::with_capacity(manifest.leaves.len());
    for leaf in &manifest.leaves {
        let bounds = geometry::Aabb3::from_bounds(
            nalgebra::Point3::new(leaf.bounds_lo[0], leaf.bounds_lo[1], leaf.bounds_lo[2]),
            nalgebra::Point3::new(leaf.bounds_hi[0], leaf.bounds_hi[1], leaf.bounds_hi[2]),
        );
        tiles.push(Tile::new_leaf(leaf.id.clone(), bounds));
        let image = leaf.image.as_ref().map(|dto| dto.to_image()).transpose()?;
        content.insert(leaf.id.clone(), TileData { mesh: leaf.mesh.to_mesh(), image, index: None });
    }
    Ok((tiles, content))
}

fn validate_frame_graph(manifest: &ProjectManifest) {
    let cache = frame_cache::FrameCache::new();
    for node in &manifest.frames {
        let rotation = UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(
            node.rotation[3],
            node.rotation[0],
            node.rotation[1],
            node.rotation[2],
        ));
        let translation = Translation3::new(node.translation[0], node.translation[1], node.translation[2]);
        let prior = Isometry3::from_parts(translation, rotation);
        let frame_node = match &node.parent_id {
            Some(parent) => frame_cache::FrameNode::child_of(parent.clone(), prior),
            None => frame_cache::FrameNode::root(prior),
        };
        cache.set_frame(node.id.clone(), frame_node);
    }
    for node in &manifest.frames {
        if cache.transform_to_root(&node.id).is_none() {
            warn!(frame_id = %node.id, "frame does not resolve to a root, dropping it from scene validation");
        }
    }
}

/// Builds one non-leaf tile's content from its already-built dependencies,
/// persists it to the blob store, and records it in the shared content map.
fn build_one_parent(
    tile_id: &str,
    tree: &TileTree,
    content_store: &RwLock<HashMap<String, TileData>>,
    options: &ParentBuildOptions,
    blob_store: &dyn BlobStore,
    run_poisson: bool,
    poisson_params: &PoissonParams,
) -> Result<()> {
    let dep_ids = tree.find_nodes_required_for_parent(tile_id);
    let built = {
        let store = content_store.read();
        let mut dependencies = Vec::with_capacity(dep_ids.len());
        for dep_id in &dep_ids {
            let tile = tree.get(dep_id).with_context(|| format!("dependency {dep_id} missing from tree"))?;
            let data = store.get(dep_id).with_context(|| format!("dependency {dep_id} not yet built"))?;
            dependencies.push(DependencyInput {
                tile,
                mesh: &data.mesh,
                image: data.image.as_ref(),
                index: data.index.as_ref(),
            });
        }
        build_parent(tile_id, &dependencies, options)
    }?;

    let mut image = built.image;
    if run_poisson {
        if let Some(baked) = &image {
            let source_index: Option<Vec<u32>> =
                built.index.as_ref().map(|idx| (0..idx.width() * idx.height()).map(|i| {
                    let (r, c) = (i / idx.width(), i % idx.width());
                    idx.get(0, r, c).unwrap_or(0) as u32
                }).collect());
            let stitched = solve_image(baked, None, source_index.as_deref(), poisson_params)
                .context("poisson seam removal over baked parent texture")?;
            image = Some(stitched);
        }
    }

    let data = TileData { mesh: built.mesh, image, index: built.index };
    let dto = TileContentDto::from_data(&data)?;
    blob_store.put(&content_uri(tile_id), &dto.to_bytes()?)?;
    content_store.write().insert(tile_id.to_string(), data);
    Ok(())
}

fn run(opt: &Opt) -> Result<()> {
    let manifest = ProjectManifest::load(&opt.input_manifest)?;
    validate_frame_graph(&manifest);

    let (leaf_tiles, leaf_content) = load_leaves(&manifest)?;
    info!(leaf_count = leaf_tiles.len(), "loaded leaf tiles");

    let mut tree = TileTree::connect_by_name(leaf_tiles);
    tree.compute_bounds();
    let tree = Arc::new(tree);

    let blob_store: Arc<dyn BlobStore> = Arc::new(FileBlobStore::new(opt.output_directory.clone()));
    for (id, data) in &leaf_content {
        let dto = TileContentDto::from_data(data)?;
        blob_store.put(&content_uri(id), &dto.to_bytes()?)?;
    }
    let content_store = Arc::new(RwLock::new(leaf_content));

    let options = Arc::new(parent_build_options(opt));
    let poisson_params = Arc::new(PoissonParams::default());
    let run_poisson = opt.poisson;

    let pool = WorkerPool::new(opt.workers, {
        let tree = Arc::clone(&tree);
        let content_store = Arc::clone(&content_store);
        let options = Arc::clone(&options);
        let blob_store = Arc::clone(&blob_store);
        let poisson_params = Arc::clone(&poisson_params);
        move |job: TileJob| -> TileOutcome {
            // Leaf content was already loaded from the manifest; the only
            // thing the pool needs to do for a leaf is report it built, so
            // the master's dependency bookkeeping unblocks its parent.
            if tree.get(&job.tile_id).map(|t| t.leaf).unwrap_or(false) {
                return TileOutcome::Built { tile_id: job.tile_id };
            }
            let result = build_one_parent(
                &job.tile_id,
                &tree,
                &content_store,
                &options,
                blob_store.as_ref(),
                run_poisson,
                &poisson_params,
            );
            match result {
                Ok(()) => TileOutcome::Built { tile_id: job.tile_id },
                Err(e) => {
                    error!(tile_id = %job.tile_id, error = %e, "parent build failed");
                    TileOutcome::Failed { tile_id: job.tile_id, reason: e.to_string() }
                }
            }
        }
    });

    let mut master = Master::new(pool, opt.quit_on_error);
    for tile in tree.iter() {
        master.enqueue(tile.id.clone());
    }

    let tree_for_deps = Arc::clone(&tree);
    let ok = master.drive(|id| tree_for_deps.find_nodes_required_for_parent(id));
    master.shutdown();

    if !ok {
        bail!("one or more tiles failed to build; see logs for details");
    }

    let tiles_by_id: HashMap<String, Tile> = tree.iter().map(|t| (t.id.clone(), t.clone())).collect();
    let content_store = content_store.read();
    let tileset = tileset::build_tileset(ROOT_ID, &tiles_by_id, |id| {
        content_store.get(id).map(|_| content_uri(id))
    })?;
    drop(content_store);

    blob_store.put("tileset.json", &serde_json::to_vec_pretty(&tileset)?)?;

    let scene = tileset::SceneManifest {
        tilesets: vec!["tileset.json".to_string()],
        images: manifest.images.clone(),
        frames: manifest.frames.clone(),
        site_drives: manifest.site_drives.clone(),
    };
    blob_store.put("scene.json", &serde_json::to_vec_pretty(&scene)?)?;

    info!(tile_count = tiles_by_id.len(), "tileset build complete");
    Ok(())
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    let _guard = tracelog::init(&opt.trace)?;
    run(&opt)
}
