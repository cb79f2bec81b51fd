//! Staged asset loading.
//!
//! - [`GltfParser`] - Entry point driving the stages in order
//! - [`ParseOptions`] - Hooks, flip-V policy, retries, Draco and cancellation
//! - [`GltfContainer`] - The finished resource graph
//! - [`AssetFetcher`] - Pluggable source for external URIs

mod container;
mod fetch;
mod options;
mod parser;
mod stages;

pub use container::GltfContainer;
pub use fetch::{decode_data_uri, fetch_with_retries, is_data_uri, resolve_uri, AssetFetcher, FileFetcher};
pub use options::{
    AnimationProcess, AsyncHooks, BufferProcess, BufferViewProcess, CameraProcess, CancelToken, FlipVPolicy,
    GlobalHooks, Hooks, ImageProcess, LightProcess, MaterialProcess, NodeProcess, ParseOptions, Postprocess,
    Preprocess, TextureProcess,
};
pub use parser::GltfParser;
