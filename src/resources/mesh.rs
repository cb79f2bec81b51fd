//! Meshes and renders.
//!
//! Every glTF mesh becomes one [`Render`]; each of its primitives becomes a
//! [`Mesh`] with its own draw range. Vertex buffers are shared between
//! primitives that reference the same set of attribute accessors.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::accessor::{accessor_bounding_box, decode_accessor, decode_accessor_f32, AccessorData, BufferViewData};
use crate::device::GraphicsDevice;
use crate::document::{AccessorSchema, MeshSchema, PrimitiveSchema};
use crate::draco::{decode_draco_primitive, DracoDecoderModule, DracoPrimitive};
use crate::util::{get_indexed, BBox3f, ComponentType, Error, Result, Vec3};
use crate::vertex::{
    assemble_vertex_buffer, IndexBuffer, IndexFormat, PrimitiveTopology, Semantic, SourceDesc, SourceDescs,
    VertexBuffer,
};

// ============================================================================
// Types
// ============================================================================

/// Identity of a [`Mesh`] within one parse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub usize);

/// One blend shape.
#[derive(Clone, Debug, PartialEq)]
pub struct MorphTarget {
    pub name: String,
    /// Property animation curves drive this target's weight through.
    pub weight_property: String,
    pub delta_positions: Option<Vec<f32>>,
    pub delta_normals: Option<Vec<f32>>,
    pub aabb: Option<BBox3f>,
    pub default_weight: f32,
}

/// Blend shapes of a mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Morph {
    pub targets: Vec<MorphTarget>,
}

impl Morph {
    pub fn default_weights(&self) -> Vec<f32> {
        self.targets.iter().map(|t| t.default_weight).collect()
    }
}

/// A drawable primitive.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub id: MeshId,
    pub vertex_buffer: Arc<VertexBuffer>,
    pub index_buffer: Option<IndexBuffer>,
    pub topology: PrimitiveTopology,
    /// First index (or vertex) drawn.
    pub base: usize,
    /// Number of indices (or vertices) drawn.
    pub count: usize,
    pub indexed: bool,
    pub aabb: BBox3f,
    pub morph: Option<Morph>,
    /// Material used when no variant is active.
    pub material: Option<usize>,
}

/// The primitives of one glTF mesh.
#[derive(Clone, Debug, Default)]
pub struct Render {
    pub name: Option<String>,
    pub meshes: Vec<Arc<Mesh>>,
}

// ============================================================================
// Construction
// ============================================================================

/// State shared by every mesh built during one parse.
pub struct MeshContext<'a> {
    pub device: &'a dyn GraphicsDevice,
    pub accessors: &'a [AccessorSchema],
    pub views: &'a [BufferViewData],
    pub draco: Option<Arc<dyn DracoDecoderModule>>,
    pub flip_v: bool,
    /// `KHR_materials_variants` names, by index.
    pub variant_names: &'a [String],
    /// Vertex buffers keyed by their attribute signature.
    pub vertex_cache: HashMap<String, Arc<VertexBuffer>>,
    /// Per-primitive variant name → material index.
    pub mesh_variants: HashMap<MeshId, HashMap<String, usize>>,
    pub mesh_default_materials: HashMap<MeshId, usize>,
    next_id: usize,
}

impl<'a> MeshContext<'a> {
    pub fn new(device: &'a dyn GraphicsDevice, accessors: &'a [AccessorSchema], views: &'a [BufferViewData]) -> Self {
        Self {
            device,
            accessors,
            views,
            draco: None,
            flip_v: false,
            variant_names: &[],
            vertex_cache: HashMap::new(),
            mesh_variants: HashMap::new(),
            mesh_default_materials: HashMap::new(),
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> MeshId {
        let id = MeshId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Build every primitive of `schema`.
///
/// A primitive that fails to decode is logged and left out; the others
/// still build.
pub fn create_render(schema: &MeshSchema, mesh_index: usize, ctx: &mut MeshContext<'_>) -> Render {
    let mut meshes = Vec::with_capacity(schema.primitives.len());

    for (i, primitive) in schema.primitives.iter().enumerate() {
        match create_mesh(schema, primitive, ctx) {
            Ok(Some(mesh)) => meshes.push(Arc::new(mesh)),
            Ok(None) => debug!(mesh = mesh_index, primitive = i, "primitive has no positions; skipped"),
            Err(e) => warn!(mesh = mesh_index, primitive = i, error = %e, "failed to build primitive"),
        }
    }

    Render { name: schema.name.clone(), meshes }
}

/// Build one primitive; `Ok(None)` when it has no geometry.
pub fn create_mesh(mesh: &MeshSchema, primitive: &PrimitiveSchema, ctx: &mut MeshContext<'_>) -> Result<Option<Mesh>> {
    let draco = primitive.extensions.as_ref().and_then(|e| e.draco.as_ref());

    let decoded = match draco {
        Some(ext) => match ctx.draco.clone() {
            Some(module) => {
                let view = get_indexed(ctx.views, ext.buffer_view, "bufferView")?;
                Some(decode_draco_primitive(module.as_ref(), view.bytes(), &ext.attributes)?)
            }
            None => {
                warn!("primitive is Draco compressed but no decoder is configured; using plain accessors");
                None
            }
        },
        None => None,
    };

    let is_draco = decoded.is_some();
    let (vertex_buffer, index_buffer) = match decoded {
        Some(prim) => match draco_buffers(prim, ctx)? {
            Some(buffers) => buffers,
            None => return Ok(None),
        },
        None => match accessor_buffers(primitive, ctx)? {
            Some(buffers) => buffers,
            None => return Ok(None),
        },
    };

    let aabb = primitive
        .attributes
        .get("POSITION")
        .and_then(|&i| ctx.accessors.get(i))
        .and_then(accessor_bounding_box)
        .unwrap_or_else(|| positions_bounding_box(&vertex_buffer));

    let morph = if is_draco || primitive.targets.is_empty() {
        None
    } else {
        Some(create_morph(mesh, primitive, ctx)?)
    };

    let (indexed, count) = match &index_buffer {
        Some(ib) => (true, ib.count),
        None => (false, vertex_buffer.num_vertices),
    };

    let id = ctx.next_id();
    if let Some(material) = primitive.material {
        ctx.mesh_default_materials.insert(id, material);
    }
    if let Some(variants) = primitive.extensions.as_ref().and_then(|e| e.variants.as_ref()) {
        let mut mapping = HashMap::new();
        for m in &variants.mappings {
            for &v in &m.variants {
                match ctx.variant_names.get(v) {
                    Some(name) => {
                        mapping.insert(name.clone(), m.material);
                    }
                    None => warn!(variant = v, "material mapping names an undeclared variant"),
                }
            }
        }
        ctx.mesh_variants.insert(id, mapping);
    }

    Ok(Some(Mesh {
        id,
        vertex_buffer,
        index_buffer,
        topology: PrimitiveTopology::from_mode(primitive.mode),
        base: 0,
        count,
        indexed,
        aabb,
        morph,
        material: primitive.material,
    }))
}

type Buffers = (Arc<VertexBuffer>, Option<IndexBuffer>);

fn draco_buffers(prim: DracoPrimitive, ctx: &MeshContext<'_>) -> Result<Option<Buffers>> {
    let wide = prim.indices.as_ref().map(|i| i.to_u32());
    let Some(vertex_buffer) = assemble_vertex_buffer(ctx.device, prim.sources, wide.as_deref(), ctx.flip_v)? else {
        return Ok(None);
    };

    let index_buffer = match prim.indices {
        Some(indices) => {
            let component_type = match indices.format {
                IndexFormat::U8 => ComponentType::Uint8,
                IndexFormat::U16 => ComponentType::Uint16,
                IndexFormat::U32 => ComponentType::Uint32,
            };
            let data = AccessorData {
                component_type,
                num_components: 1,
                count: indices.count,
                bytes: Cow::Owned(indices.data),
            };
            Some(IndexBuffer::new(ctx.device, &data, prim.num_vertices)?)
        }
        None => None,
    };

    Ok(Some((Arc::new(vertex_buffer), index_buffer)))
}

/// Attribute signature used to share vertex buffers.
fn vertex_cache_key(primitive: &PrimitiveSchema) -> String {
    let mut parts: Vec<String> = primitive.attributes.iter().map(|(name, index)| format!("{name}:{index}")).collect();
    parts.sort();
    parts.join(",")
}

fn accessor_buffers(primitive: &PrimitiveSchema, ctx: &mut MeshContext<'_>) -> Result<Option<Buffers>> {
    if !primitive.attributes.contains_key("POSITION") {
        return Ok(None);
    }

    let indices = match primitive.indices {
        Some(index) => {
            let accessor = get_indexed(ctx.accessors, index, "accessor")?;
            Some(decode_accessor(accessor, ctx.views, true)?)
        }
        None => None,
    };
    let wide = indices.as_ref().map(|data| data.to_u32());

    let key = vertex_cache_key(primitive);
    let vertex_buffer = match ctx.vertex_cache.get(&key) {
        Some(vb) => vb.clone(),
        None => {
            let mut sources = SourceDescs::new();
            for (name, &index) in &primitive.attributes {
                let Some(semantic) = Semantic::from_gltf(name) else { continue };
                let accessor = get_indexed(ctx.accessors, index, "accessor")?;
                sources.insert(semantic, SourceDesc::from_accessor(accessor, ctx.views)?);
            }

            let Some(vb) = assemble_vertex_buffer(ctx.device, sources, wide.as_deref(), ctx.flip_v)? else {
                return Ok(None);
            };
            let vb = Arc::new(vb);
            ctx.vertex_cache.insert(key, vb.clone());
            vb
        }
    };

    if let Some(wide) = &wide {
        if let Some(&bad) = wide.iter().find(|&&i| i as usize >= vertex_buffer.num_vertices) {
            return Err(Error::index("vertex", bad as usize, vertex_buffer.num_vertices));
        }
    }

    let index_buffer = match &indices {
        Some(data) => Some(IndexBuffer::new(ctx.device, data, vertex_buffer.num_vertices)?),
        None => None,
    };

    Ok(Some((vertex_buffer, index_buffer)))
}

fn positions_bounding_box(vertex_buffer: &VertexBuffer) -> BBox3f {
    let mut aabb = BBox3f::EMPTY;
    if let Some(positions) = vertex_buffer.read_f32(Semantic::Position) {
        for p in positions.chunks_exact(3) {
            aabb.expand_by_point(Vec3::new(p[0], p[1], p[2]));
        }
    }
    aabb
}

/// Weight property of morph target `j`: `weight.name.<name>` when the mesh
/// names its targets, else `weight.<j>`.
pub fn morph_weight_property(target_names: Option<&[String]>, j: usize) -> String {
    match target_names.and_then(|names| names.get(j)) {
        Some(name) => format!("weight.name.{name}"),
        None => format!("weight.{j}"),
    }
}

fn create_morph(mesh: &MeshSchema, primitive: &PrimitiveSchema, ctx: &MeshContext<'_>) -> Result<Morph> {
    let names = mesh.extras.as_ref().and_then(|e| e.target_names.as_ref());
    let mut targets = Vec::with_capacity(primitive.targets.len());

    for (j, target) in primitive.targets.iter().enumerate() {
        let decode = |attribute: &str| -> Result<Option<Vec<f32>>> {
            match target.get(attribute) {
                Some(&index) => {
                    let accessor = get_indexed(ctx.accessors, index, "accessor")?;
                    Ok(Some(decode_accessor_f32(accessor, ctx.views)?))
                }
                None => Ok(None),
            }
        };

        let aabb = target
            .get("POSITION")
            .and_then(|&i| ctx.accessors.get(i))
            .and_then(accessor_bounding_box);

        targets.push(MorphTarget {
            name: names.and_then(|n| n.get(j)).cloned().unwrap_or_else(|| j.to_string()),
            weight_property: morph_weight_property(names.map(Vec::as_slice), j),
            delta_positions: decode("POSITION")?,
            delta_normals: decode("NORMAL")?,
            aabb,
            default_weight: mesh.weights.as_ref().and_then(|w| w.get(j)).copied().unwrap_or(0.0),
        });
    }

    Ok(Morph { targets })
}
