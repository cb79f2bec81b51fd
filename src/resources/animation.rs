//! Animation tracks.
//!
//! Each glTF animation becomes one [`AnimTrack`]. Sampler input and output
//! accessors are decoded once into shared [`AnimData`] arrays, and every
//! curve refers to them by position.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::accessor::{decode_accessor_f32, BufferViewData};
use crate::document::{AccessorSchema, AnimationSchema, MeshSchema};
use crate::resources::{morph_weight_property, node_path, Node};
use crate::util::{get_indexed, Result};

/// Keyframe interpolation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    #[default]
    Linear,
    CubicSpline,
}

impl Interpolation {
    pub fn from_gltf(name: Option<&str>) -> Self {
        match name {
            Some("STEP") => Self::Step,
            Some("CUBICSPLINE") => Self::CubicSpline,
            _ => Self::Linear,
        }
    }
}

/// Packed keyframe values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimData {
    /// Values per keyframe.
    pub components: usize,
    pub data: Vec<f32>,
}

/// Property driven by a curve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnimTarget {
    /// Node names from the hierarchy root down to the animated node.
    pub entity_path: Vec<String>,
    /// `localPosition`, `localRotation`, `localScale` or a morph weight.
    pub property: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnimCurve {
    pub paths: Vec<AnimTarget>,
    /// Index into [`AnimTrack::inputs`].
    pub input: usize,
    /// Index into [`AnimTrack::outputs`].
    pub output: usize,
    pub interpolation: Interpolation,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimTrack {
    pub name: String,
    /// Latest keyframe time.
    pub duration: f32,
    pub inputs: Vec<AnimData>,
    pub outputs: Vec<AnimData>,
    pub curves: Vec<AnimCurve>,
}

fn property_for(path: &str) -> Option<&'static str> {
    match path {
        "translation" => Some("localPosition"),
        "rotation" => Some("localRotation"),
        "scale" => Some("localScale"),
        _ => None,
    }
}

/// Document data animations are resolved against.
#[derive(Clone, Copy)]
pub struct AnimationContext<'a> {
    pub accessors: &'a [AccessorSchema],
    pub views: &'a [BufferViewData],
    /// Built nodes, for entity paths.
    pub nodes: &'a [Node],
    /// Mesh schemas, for morph target names.
    pub meshes: &'a [MeshSchema],
}

/// Default animation construction.
pub fn create_animation(schema: &AnimationSchema, index: usize, ctx: &AnimationContext<'_>) -> Result<AnimTrack> {
    let AnimationContext { accessors, views, nodes, meshes } = *ctx;
    let mut track = AnimTrack {
        name: schema.name.clone().unwrap_or_else(|| format!("animation_{index}")),
        ..Default::default()
    };

    // Shared arrays, in ascending accessor order.
    let input_ids: BTreeSet<usize> = schema.samplers.iter().map(|s| s.input).collect();
    let output_ids: BTreeSet<usize> = schema.samplers.iter().map(|s| s.output).collect();

    let mut input_map = BTreeMap::new();
    for id in input_ids {
        let accessor = get_indexed(accessors, id, "accessor")?;
        let data = decode_accessor_f32(accessor, views)?;
        if let Some(&last) = data.last() {
            track.duration = track.duration.max(last);
        }
        input_map.insert(id, track.inputs.len());
        track.inputs.push(AnimData { components: 1, data });
    }

    let mut output_map = BTreeMap::new();
    for id in output_ids {
        let accessor = get_indexed(accessors, id, "accessor")?;
        let data = decode_accessor_f32(accessor, views)?;
        output_map.insert(id, track.outputs.len());
        track.outputs.push(AnimData { components: accessor.accessor_type.num_components(), data });
    }

    // One curve per sampler; channels append their targets to it.
    let mut sampler_curves: Vec<AnimCurve> = schema
        .samplers
        .iter()
        .map(|s| AnimCurve {
            paths: Vec::new(),
            input: input_map[&s.input],
            output: output_map[&s.output],
            interpolation: Interpolation::from_gltf(s.interpolation.as_deref()),
        })
        .collect();
    let mut morph_curves = Vec::new();

    for channel in &schema.channels {
        let Some(node_index) = channel.target.node else { continue };
        if node_index >= nodes.len() {
            warn!(node = node_index, "animation channel targets a missing node");
            continue;
        }
        let Some(curve) = sampler_curves.get_mut(channel.sampler) else {
            warn!(sampler = channel.sampler, "animation channel references a missing sampler");
            continue;
        };
        let entity_path = node_path(nodes, node_index);

        if channel.target.path == "weights" {
            let names = nodes[node_index]
                .mesh
                .and_then(|m| meshes.get(m))
                .and_then(|m| m.extras.as_ref())
                .and_then(|e| e.target_names.as_deref());
            let template = curve.clone();
            morph_curves.extend(split_morph_curve(&mut track, &template, entity_path, names));
        } else if let Some(property) = property_for(&channel.target.path) {
            curve.paths.push(AnimTarget { entity_path, property: property.to_string() });
        } else {
            warn!(path = %channel.target.path, "ignoring unsupported animation channel path");
        }
    }

    track.curves = sampler_curves.into_iter().filter(|c| !c.paths.is_empty()).collect();
    track.curves.extend(morph_curves);

    for curve in &track.curves {
        let rotates = curve.paths.iter().any(|p| p.property == "localRotation");
        if rotates && curve.interpolation != Interpolation::CubicSpline {
            quat_continuity(&mut track.outputs[curve.output]);
        }
    }

    Ok(track)
}

/// One scalar curve per morph target, each with its own output array.
fn split_morph_curve(
    track: &mut AnimTrack,
    curve: &AnimCurve,
    entity_path: Vec<String>,
    target_names: Option<&[String]>,
) -> Vec<AnimCurve> {
    let keyframes = track.inputs[curve.input].data.len();
    let per_key = if curve.interpolation == Interpolation::CubicSpline { 3 } else { 1 };
    let values = track.outputs[curve.output].data.clone();
    let rows = keyframes * per_key;
    if rows == 0 || values.len() % rows != 0 {
        warn!(values = values.len(), keyframes, "morph weight output does not divide into targets");
        return Vec::new();
    }
    let num_targets = values.len() / rows;

    (0..num_targets)
        .map(|j| {
            let data: Vec<f32> = (0..rows).map(|k| values[k * num_targets + j]).collect();
            let output = track.outputs.len();
            track.outputs.push(AnimData { components: 1, data });
            AnimCurve {
                paths: vec![AnimTarget {
                    entity_path: entity_path.clone(),
                    property: morph_weight_property(target_names, j),
                }],
                input: curve.input,
                output,
                interpolation: curve.interpolation,
            }
        })
        .collect()
}

/// Negate quaternions that would take the long way round from their
/// predecessor.
pub fn quat_continuity(output: &mut AnimData) {
    if output.components != 4 {
        return;
    }
    let mut keys = output.data.chunks_exact_mut(4);
    let Some(first) = keys.next() else { return };
    let mut prev = [first[0], first[1], first[2], first[3]];

    for q in keys {
        let dot = prev[0] * q[0] + prev[1] * q[1] + prev[2] * q[2] + prev[3] * q[3];
        if dot < 0.0 {
            q.iter_mut().for_each(|c| *c = -*c);
        }
        prev = [q[0], q[1], q[2], q[3]];
    }
}
