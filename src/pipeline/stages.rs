//! Pipeline stages.
//!
//! The asynchronous stages resolve every item of their kind concurrently
//! and fail on the first error; the resource stage then builds the graph
//! synchronously from the resolved data.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures_util::future::try_join_all;
use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use super::fetch::{decode_data_uri, fetch_with_retries, is_data_uri, resolve_uri, AssetFetcher};
use super::{GltfContainer, ParseOptions};
use crate::accessor::BufferViewData;
use crate::device::GraphicsDevice;
use crate::document::{Document, ImageSchema};
use crate::resources::{
    create_animation, create_camera, create_light, create_material, create_node, create_render, create_scenes,
    create_skin, create_texture, default_scene, link_hierarchy, texture_image_source, AnimationContext, ImageData,
    MaterialContext, MeshContext, SkinCache, Texture,
};
use crate::util::{get_indexed, Error, Result};

/// Where external resources come from.
#[derive(Clone, Copy)]
pub(crate) struct Resolver<'a> {
    pub fetcher: &'a dyn AssetFetcher,
    pub url_base: Option<&'a str>,
    pub max_retries: u32,
}

impl Resolver<'_> {
    /// Bytes behind `uri`, and the mime type a `data:` URI declares.
    async fn load(&self, uri: &str) -> Result<(Option<String>, Vec<u8>)> {
        if is_data_uri(uri) {
            return decode_data_uri(uri);
        }
        let url = resolve_uri(self.url_base, uri);
        Ok((None, fetch_with_retries(self.fetcher, &url, self.max_retries).await?))
    }
}

// ============================================================================
// Buffers
// ============================================================================

/// Resolve every buffer: GLB binary chunk, `data:` URI or external fetch.
#[instrument(skip_all, fields(count = document.buffers.len()))]
pub(crate) async fn load_buffers(
    document: &Document,
    binary: Option<Arc<[u8]>>,
    options: &ParseOptions,
    resolver: Resolver<'_>,
) -> Result<Vec<Arc<[u8]>>> {
    let hooks = &options.buffer;
    let loads = document.buffers.iter().enumerate().map(|(i, schema)| {
        let binary = binary.clone();
        async move {
            let custom = hooks.process_async.as_ref().and_then(|p| p(schema, i));
            let mut bytes: Arc<[u8]> = match (custom, &schema.uri) {
                (Some(future), _) => Arc::from(future.await?),
                (None, Some(uri)) => Arc::from(resolver.load(uri).await?.1),
                (None, None) => binary.ok_or_else(|| {
                    Error::invalid(format!("buffer {i} has no uri and the container has no binary chunk"))
                })?,
            };
            if bytes.len() < schema.byte_length {
                return Err(Error::invalid(format!(
                    "buffer {i} holds {} bytes but declares {}",
                    bytes.len(),
                    schema.byte_length
                )));
            }
            hooks.postprocess(schema, &mut bytes);
            Ok::<_, Error>(bytes)
        }
    });

    let buffers = try_join_all(loads).await?;
    debug!(count = buffers.len(), "buffers resolved");
    Ok(buffers)
}

// ============================================================================
// Buffer views
// ============================================================================

#[instrument(skip_all, fields(count = document.buffer_views.len()))]
pub(crate) async fn load_buffer_views(
    document: &Document,
    buffers: &[Arc<[u8]>],
    options: &ParseOptions,
) -> Result<Vec<BufferViewData>> {
    let hooks = &options.buffer_view;
    let loads = document.buffer_views.iter().map(|schema| async move {
        let buffer = get_indexed(buffers, schema.buffer, "buffer")?;
        let mut view = match hooks.process_async.as_ref().and_then(|p| p(schema, buffer)) {
            Some(future) => future.await?,
            None => BufferViewData::new(buffer.clone(), schema)?,
        };
        hooks.postprocess(schema, &mut view);
        Ok::<_, Error>(view)
    });
    try_join_all(loads).await
}

// ============================================================================
// Images and textures
// ============================================================================

async fn load_image(
    index: usize,
    schema: &ImageSchema,
    views: &[BufferViewData],
    options: &ParseOptions,
    resolver: Resolver<'_>,
) -> Result<ImageData> {
    let hooks = &options.image;
    let mut image = match hooks.process_async.as_ref().and_then(|p| p(schema, index)) {
        Some(future) => future.await?,
        None => {
            let (mime, bytes) = match (&schema.uri, schema.buffer_view) {
                (Some(uri), _) => {
                    let (declared, bytes) = resolver.load(uri).await?;
                    (schema.mime_type.clone().or(declared), bytes)
                }
                (None, Some(view)) => {
                    let view = get_indexed(views, view, "bufferView")?;
                    (schema.mime_type.clone(), view.bytes().to_vec())
                }
                (None, None) => return Err(Error::InvalidImage(index)),
            };
            ImageData::decode(bytes, mime.as_deref(), schema.name.clone())?
        }
    };
    hooks.postprocess(schema, &mut image);
    Ok(image)
}

/// Load the images textures reference, then build the textures.
///
/// Each image loads once, and images sharing a URI load once between them;
/// textures over the same image share its pixels but get their own
/// device handle. Textures without a usable source come back as `None`.
#[instrument(skip_all, fields(images = document.images.len(), textures = document.textures.len()))]
pub(crate) async fn load_textures(
    document: &Document,
    views: &[BufferViewData],
    device: &dyn GraphicsDevice,
    options: &ParseOptions,
    resolver: Resolver<'_>,
) -> Result<Vec<Option<Texture>>> {
    let sources: Vec<Option<usize>> = document
        .textures
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let source = texture_image_source(t);
            match source {
                Some(s) if s >= document.images.len() => {
                    warn!(texture = i, image = s, "texture references a missing image");
                    None
                }
                None => {
                    warn!(texture = i, "texture has no image source");
                    None
                }
                some => some,
            }
        })
        .collect();

    // Map every referenced image to the first image with the same URI.
    let mut canonical: BTreeMap<usize, usize> = BTreeMap::new();
    let mut by_uri: HashMap<&str, usize> = HashMap::new();
    for &image in sources.iter().flatten() {
        let target = match document.images[image].uri.as_deref() {
            Some(uri) => *by_uri.entry(uri).or_insert(image),
            None => image,
        };
        canonical.insert(image, target);
    }

    let mut unique: Vec<usize> = canonical.values().copied().collect();
    unique.sort_unstable();
    unique.dedup();

    let loads = unique.iter().map(|&i| async move {
        let image = load_image(i, &document.images[i], views, options, resolver).await?;
        Ok::<_, Error>((i, Arc::new(image)))
    });
    let loaded: HashMap<usize, Arc<ImageData>> = try_join_all(loads).await?.into_iter().collect();
    debug!(images = loaded.len(), "images loaded");

    let hooks = &options.texture;
    let builds = document.textures.iter().zip(&sources).map(|(schema, source)| {
        let image = source.and_then(|s| loaded.get(&canonical[&s])).cloned();
        async move {
            let Some(image) = image else { return Ok(None) };
            let mut texture = match hooks.process_async.as_ref().and_then(|p| p(schema, &image)) {
                Some(future) => future.await?,
                None => create_texture(device, schema, image, &document.samplers),
            };
            hooks.postprocess(schema, &mut texture);
            Ok::<_, Error>(Some(texture))
        }
    });
    try_join_all(builds).await
}

// ============================================================================
// Resource graph
// ============================================================================

/// Build nodes, scenes, skins, meshes, materials, animations, cameras and
/// lights from the resolved data.
#[instrument(skip_all)]
pub(crate) fn build_resources(
    document: Document,
    views: &[BufferViewData],
    textures: Vec<Option<Texture>>,
    device: Arc<dyn GraphicsDevice>,
    options: &ParseOptions,
) -> Result<GltfContainer> {
    let mut nodes: Vec<_> = document
        .nodes
        .iter()
        .enumerate()
        .map(|(i, schema)| {
            let mut node = match &options.node.process {
                Some(process) => process(schema, i),
                None => create_node(schema, i),
            };
            options.node.postprocess(schema, &mut node);
            node
        })
        .collect();
    link_hierarchy(&mut nodes, &document.nodes);

    let scenes = create_scenes(&document, &nodes);
    let default_scene = default_scene(&document);

    let mut skin_cache = SkinCache::new();
    let skins = document
        .skins
        .iter()
        .map(|s| create_skin(s, &document.accessors, views, &nodes, &mut skin_cache))
        .collect::<Result<Vec<_>>>()?;

    let flip_v = options.flip_v.should_flip(document.generator());
    if flip_v {
        warn!(generator = document.generator(), "flipping texture V coordinates for this generator");
    }
    let variants = document.variant_names();

    let mut mesh_ctx = MeshContext::new(device.as_ref(), &document.accessors, views);
    mesh_ctx.draco = options.draco.get();
    mesh_ctx.flip_v = flip_v;
    mesh_ctx.variant_names = &variants;
    let renders: Vec<_> = document
        .meshes
        .iter()
        .enumerate()
        .map(|(i, mesh)| create_render(mesh, i, &mut mesh_ctx))
        .collect();
    let MeshContext { mesh_variants, mesh_default_materials, .. } = mesh_ctx;

    let available: Vec<bool> = textures.iter().map(Option::is_some).collect();
    let material_ctx = MaterialContext { textures: &available };
    let materials: Vec<_> = document
        .materials
        .par_iter()
        .map(|schema| {
            let mut material = match &options.material.process {
                Some(process) => process(schema, &material_ctx),
                None => create_material(schema, &material_ctx),
            };
            options.material.postprocess(schema, &mut material);
            material
        })
        .collect();

    let animation_ctx = AnimationContext {
        accessors: &document.accessors,
        views,
        nodes: &nodes,
        meshes: &document.meshes,
    };
    let animations: Vec<_> = document
        .animations
        .par_iter()
        .enumerate()
        .filter_map(|(i, schema)| {
            let built = match &options.animation.process {
                Some(process) => process(schema, i, &animation_ctx),
                None => create_animation(schema, i, &animation_ctx),
            };
            match built {
                Ok(mut track) => {
                    options.animation.postprocess(schema, &mut track);
                    Some(track)
                }
                Err(e) => {
                    warn!(animation = i, error = %e, "failed to build animation");
                    None
                }
            }
        })
        .collect();

    let mut cameras = HashMap::new();
    let mut lights = HashMap::new();
    let mut light_schemas = document.lights();
    for schema in &mut light_schemas {
        options.light.preprocess(schema);
    }
    for (i, (schema, node)) in document.nodes.iter().zip(&nodes).enumerate() {
        if let Some(c) = schema.camera {
            match document.cameras.get(c) {
                Some(cs) => {
                    let mut camera = match &options.camera.process {
                        Some(process) => process(cs),
                        None => create_camera(cs),
                    };
                    options.camera.postprocess(cs, &mut camera);
                    cameras.insert(i, camera);
                }
                None => warn!(node = i, camera = c, "node references a missing camera"),
            }
        }
        if let Some(l) = node.light {
            match light_schemas.get(l) {
                Some(ls) => {
                    let mut light = match &options.light.process {
                        Some(process) => process(ls, &node.name),
                        None => create_light(ls, &node.name),
                    };
                    options.light.postprocess(ls, &mut light);
                    lights.insert(i, light);
                }
                None => warn!(node = i, light = l, "node references a missing light"),
            }
        }
    }

    debug!(
        nodes = nodes.len(),
        renders = renders.len(),
        materials = materials.len(),
        animations = animations.len(),
        "resource graph built"
    );

    Ok(GltfContainer {
        document,
        nodes,
        scenes,
        default_scene,
        animations,
        textures,
        materials,
        variants,
        mesh_variants,
        mesh_default_materials,
        renders,
        skins,
        lights,
        cameras,
        device,
    })
}
