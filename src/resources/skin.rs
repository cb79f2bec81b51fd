//! Skins.

use std::collections::HashMap;
use std::sync::Arc;

use crate::accessor::{decode_accessor_f32, BufferViewData};
use crate::document::{AccessorSchema, SkinSchema};
use crate::resources::Node;
use crate::util::{get_indexed, Error, Mat4, Result};

/// Inverse bind matrices with the bone names they belong to.
#[derive(Clone, Debug, PartialEq)]
pub struct Skin {
    pub inverse_bind_matrices: Vec<Mat4>,
    pub bone_names: Vec<String>,
}

/// Skins already built during one parse, keyed by joined bone names.
#[derive(Debug, Default)]
pub struct SkinCache {
    skins: HashMap<String, Arc<Skin>>,
}

impl SkinCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.skins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skins.is_empty()
    }
}

/// Build a skin, or reuse an earlier one with the same bones.
///
/// Missing inverse bind matrices default to identity.
pub fn create_skin(
    schema: &SkinSchema,
    accessors: &[AccessorSchema],
    views: &[BufferViewData],
    nodes: &[Node],
    cache: &mut SkinCache,
) -> Result<Arc<Skin>> {
    let bone_names = schema
        .joints
        .iter()
        .map(|&j| get_indexed(nodes, j, "node").map(|n| n.name.clone()))
        .collect::<Result<Vec<_>>>()?;

    let key = bone_names.join("#");
    if let Some(skin) = cache.skins.get(&key) {
        return Ok(skin.clone());
    }

    let inverse_bind_matrices = match schema.inverse_bind_matrices {
        Some(index) => {
            let accessor = get_indexed(accessors, index, "accessor")?;
            let values = decode_accessor_f32(accessor, views)?;
            let matrices: Vec<Mat4> = values.chunks_exact(16).map(Mat4::from_cols_slice).collect();
            if matrices.len() < bone_names.len() {
                return Err(Error::invalid(format!(
                    "skin has {} joints but {} inverse bind matrices",
                    bone_names.len(),
                    matrices.len()
                )));
            }
            matrices
        }
        None => vec![Mat4::IDENTITY; bone_names.len()],
    };

    let skin = Arc::new(Skin { inverse_bind_matrices, bone_names });
    cache.skins.insert(key, skin.clone());
    Ok(skin)
}
