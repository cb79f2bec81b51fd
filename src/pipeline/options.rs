//! Parse options and per-resource hooks.
//!
//! Every resource type goes through the same steps: an optional
//! `preprocess` that may edit the schema record, the `process` step (a
//! built-in default unless overridden) and an optional `postprocess` that
//! sees the finished resource.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::accessor::BufferViewData;
use crate::document::{
    AnimationSchema, BufferSchema, BufferViewSchema, CameraSchema, Document, ImageSchema, LightSchema, MaterialSchema,
    NodeSchema, TextureSchema,
};
use crate::draco::DracoCapability;
use crate::pipeline::GltfContainer;
use crate::resources::{
    AnimTrack, AnimationContext, Camera, ImageData, Light, Material, MaterialContext, Node, Texture,
};
use crate::util::{Error, Result};

// ============================================================================
// Hook sets
// ============================================================================

/// Edits a schema record before it is processed.
pub type Preprocess<S> = Box<dyn Fn(&mut S) + Send + Sync>;

/// Observes or edits a finished resource.
pub type Postprocess<S, T> = Box<dyn Fn(&S, &mut T) + Send + Sync>;

/// Hooks of a synchronously built resource.
pub struct Hooks<S, T, P: ?Sized> {
    pub preprocess: Option<Preprocess<S>>,
    /// Replaces the default construction.
    pub process: Option<Box<P>>,
    pub postprocess: Option<Postprocess<S, T>>,
}

impl<S, T, P: ?Sized> Default for Hooks<S, T, P> {
    fn default() -> Self {
        Self { preprocess: None, process: None, postprocess: None }
    }
}

impl<S, T, P: ?Sized> Hooks<S, T, P> {
    pub fn with_preprocess(mut self, f: impl Fn(&mut S) + Send + Sync + 'static) -> Self {
        self.preprocess = Some(Box::new(f));
        self
    }

    pub fn with_process(mut self, f: Box<P>) -> Self {
        self.process = Some(f);
        self
    }

    pub fn with_postprocess(mut self, f: impl Fn(&S, &mut T) + Send + Sync + 'static) -> Self {
        self.postprocess = Some(Box::new(f));
        self
    }

    pub fn preprocess(&self, schema: &mut S) {
        if let Some(f) = &self.preprocess {
            f(schema);
        }
    }

    pub fn postprocess(&self, schema: &S, resource: &mut T) {
        if let Some(f) = &self.postprocess {
            f(schema, resource);
        }
    }
}

/// Hooks of a resource resolved by an asynchronous stage.
///
/// `process_async` may decline an item by returning `None`, in which case
/// the built-in loader runs.
pub struct AsyncHooks<S, T, P: ?Sized> {
    pub preprocess: Option<Preprocess<S>>,
    pub process_async: Option<Box<P>>,
    pub postprocess: Option<Postprocess<S, T>>,
}

impl<S, T, P: ?Sized> Default for AsyncHooks<S, T, P> {
    fn default() -> Self {
        Self { preprocess: None, process_async: None, postprocess: None }
    }
}

impl<S, T, P: ?Sized> AsyncHooks<S, T, P> {
    pub fn with_preprocess(mut self, f: impl Fn(&mut S) + Send + Sync + 'static) -> Self {
        self.preprocess = Some(Box::new(f));
        self
    }

    pub fn with_process_async(mut self, f: Box<P>) -> Self {
        self.process_async = Some(f);
        self
    }

    pub fn with_postprocess(mut self, f: impl Fn(&S, &mut T) + Send + Sync + 'static) -> Self {
        self.postprocess = Some(Box::new(f));
        self
    }

    pub fn preprocess(&self, schema: &mut S) {
        if let Some(f) = &self.preprocess {
            f(schema);
        }
    }

    pub fn postprocess(&self, schema: &S, resource: &mut T) {
        if let Some(f) = &self.postprocess {
            f(schema, resource);
        }
    }
}

/// Document-wide hooks, run before any stage and after the last one.
#[derive(Default)]
pub struct GlobalHooks {
    pub preprocess: Option<Box<dyn Fn(&mut Document) + Send + Sync>>,
    pub postprocess: Option<Box<dyn Fn(&mut GltfContainer) + Send + Sync>>,
}

// Process signatures. Asynchronous ones return `None` to defer to the
// built-in loader.
pub type NodeProcess = dyn Fn(&NodeSchema, usize) -> Node + Send + Sync;
pub type MaterialProcess = dyn Fn(&MaterialSchema, &MaterialContext<'_>) -> Material + Send + Sync;
pub type AnimationProcess = dyn Fn(&AnimationSchema, usize, &AnimationContext<'_>) -> Result<AnimTrack> + Send + Sync;
pub type CameraProcess = dyn Fn(&CameraSchema) -> Camera + Send + Sync;
/// Receives the name of the node the light is attached to.
pub type LightProcess = dyn Fn(&LightSchema, &str) -> Light + Send + Sync;
pub type BufferProcess = dyn Fn(&BufferSchema, usize) -> Option<BoxFuture<'static, Result<Vec<u8>>>> + Send + Sync;
pub type BufferViewProcess =
    dyn Fn(&BufferViewSchema, &Arc<[u8]>) -> Option<BoxFuture<'static, Result<BufferViewData>>> + Send + Sync;
pub type ImageProcess = dyn Fn(&ImageSchema, usize) -> Option<BoxFuture<'static, Result<ImageData>>> + Send + Sync;
pub type TextureProcess =
    dyn Fn(&TextureSchema, &Arc<ImageData>) -> Option<BoxFuture<'static, Result<Texture>>> + Send + Sync;

// ============================================================================
// Flip-V policy
// ============================================================================

/// When texture V coordinates are inverted during assembly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlipVPolicy {
    /// Flip when `asset.generator` starts with one of these names.
    Auto(Vec<String>),
    Always,
    Never,
}

impl Default for FlipVPolicy {
    fn default() -> Self {
        Self::Auto(vec!["PlayCanvas".to_string()])
    }
}

impl FlipVPolicy {
    pub fn should_flip(&self, generator: Option<&str>) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto(names) => {
                generator.is_some_and(|g| names.iter().any(|n| g.starts_with(n.as_str())))
            }
        }
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Shared flag checked between pipeline stages.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Error::Cancelled)` once cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// Options
// ============================================================================

/// Configuration of one parse.
pub struct ParseOptions {
    pub global: GlobalHooks,
    pub node: Hooks<NodeSchema, Node, NodeProcess>,
    pub buffer: AsyncHooks<BufferSchema, Arc<[u8]>, BufferProcess>,
    pub buffer_view: AsyncHooks<BufferViewSchema, BufferViewData, BufferViewProcess>,
    pub image: AsyncHooks<ImageSchema, ImageData, ImageProcess>,
    pub texture: AsyncHooks<TextureSchema, Texture, TextureProcess>,
    pub material: Hooks<MaterialSchema, Material, MaterialProcess>,
    pub animation: Hooks<AnimationSchema, AnimTrack, AnimationProcess>,
    pub camera: Hooks<CameraSchema, Camera, CameraProcess>,
    pub light: Hooks<LightSchema, Light, LightProcess>,
    pub flip_v: FlipVPolicy,
    /// Extra attempts for a failed external fetch.
    pub max_retries: u32,
    pub draco: Arc<DracoCapability>,
    pub cancel: CancelToken,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            global: GlobalHooks::default(),
            node: Hooks::default(),
            buffer: AsyncHooks::default(),
            buffer_view: AsyncHooks::default(),
            image: AsyncHooks::default(),
            texture: AsyncHooks::default(),
            material: Hooks::default(),
            animation: Hooks::default(),
            camera: Hooks::default(),
            light: Hooks::default(),
            flip_v: FlipVPolicy::default(),
            max_retries: 2,
            draco: Arc::new(DracoCapability::unavailable()),
            cancel: CancelToken::new(),
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flip_v(mut self, policy: FlipVPolicy) -> Self {
        self.flip_v = policy;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_draco(mut self, draco: Arc<DracoCapability>) -> Self {
        self.draco = draco;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_global(mut self, global: GlobalHooks) -> Self {
        self.global = global;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_v_policy() {
        let auto = FlipVPolicy::default();
        assert!(auto.should_flip(Some("PlayCanvas")));
        assert!(auto.should_flip(Some("PlayCanvas glb exporter 1.2")));
        assert!(!auto.should_flip(Some("Khronos glTF Blender I/O")));
        assert!(!auto.should_flip(None));
        assert!(FlipVPolicy::Always.should_flip(None));
        assert!(!FlipVPolicy::Never.should_flip(Some("PlayCanvas")));
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(matches!(token.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_hooks_run_in_order() {
        let hooks: Hooks<CameraSchema, Camera, CameraProcess> = Hooks::default()
            .with_preprocess(|s: &mut CameraSchema| s.name = Some("pre".into()))
            .with_postprocess(|s: &CameraSchema, c: &mut Camera| {
                c.name = s.name.as_ref().map(|n| format!("{n}+post"));
            });

        let mut schema = CameraSchema::default();
        hooks.preprocess(&mut schema);
        let mut camera = Camera::default();
        hooks.postprocess(&schema, &mut camera);
        assert_eq!(camera.name.as_deref(), Some("pre+post"));
    }
}
