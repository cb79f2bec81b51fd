//! Parse entry points.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use super::fetch::{AssetFetcher, FileFetcher};
use super::stages::{build_resources, load_buffer_views, load_buffers, load_textures, Resolver};
use super::{GltfContainer, ParseOptions};
use crate::device::GraphicsDevice;
use crate::document::parse_document;
use crate::glb::parse_container;
use crate::util::Result;

/// Turns glTF and GLB assets into [`GltfContainer`]s.
///
/// Stages run strictly in order (buffers, buffer views, textures, then the
/// resource graph). The first error of any stage ends the parse and later
/// stages never start.
pub struct GltfParser {
    device: Arc<dyn GraphicsDevice>,
    fetcher: Arc<dyn AssetFetcher>,
    options: ParseOptions,
    url_base: Option<String>,
}

impl GltfParser {
    /// Parser reading external resources from the local filesystem.
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        Self { device, fetcher: Arc::new(FileFetcher), options: ParseOptions::default(), url_base: None }
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn AssetFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Base that relative URIs resolve against.
    pub fn with_url_base(mut self, base: impl Into<String>) -> Self {
        self.url_base = Some(base.into());
        self
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    /// Parse `data`; `filename` decides between GLB and plain glTF.
    pub async fn parse(&self, filename: &str, data: &[u8]) -> Result<GltfContainer> {
        self.parse_with_base(filename, data, self.url_base.as_deref()).await
    }

    #[instrument(skip(self, data), fields(bytes = data.len()))]
    async fn parse_with_base(&self, filename: &str, data: &[u8], url_base: Option<&str>) -> Result<GltfContainer> {
        let options = &self.options;
        let cancel = &options.cancel;
        cancel.check()?;

        let container = parse_container(data, filename)?;
        let mut document = parse_document(container.json)?;
        let binary: Option<Arc<[u8]>> = container.binary.map(Arc::from);

        if let Some(preprocess) = &options.global.preprocess {
            preprocess(&mut document);
        }
        document.buffers.iter_mut().for_each(|s| options.buffer.preprocess(s));
        document.buffer_views.iter_mut().for_each(|s| options.buffer_view.preprocess(s));
        document.images.iter_mut().for_each(|s| options.image.preprocess(s));
        document.textures.iter_mut().for_each(|s| options.texture.preprocess(s));
        document.materials.iter_mut().for_each(|s| options.material.preprocess(s));
        document.animations.iter_mut().for_each(|s| options.animation.preprocess(s));
        document.cameras.iter_mut().for_each(|s| options.camera.preprocess(s));
        document.nodes.iter_mut().for_each(|s| options.node.preprocess(s));

        if document.uses_draco() && options.draco.get().is_none() {
            match options.draco.acquire().await {
                Ok(_) => debug!("draco decoder ready"),
                Err(e) => warn!(error = %e, "asset uses Draco compression but no decoder could be loaded"),
            }
        }

        let resolver = Resolver {
            fetcher: self.fetcher.as_ref(),
            url_base,
            max_retries: options.max_retries,
        };

        cancel.check()?;
        let buffers = load_buffers(&document, binary, options, resolver).await?;

        cancel.check()?;
        let views = load_buffer_views(&document, &buffers, options).await?;

        cancel.check()?;
        let textures = load_textures(&document, &views, self.device.as_ref(), options, resolver).await?;

        cancel.check()?;
        let mut result = build_resources(document, &views, textures, self.device.clone(), options)?;

        if let Some(postprocess) = &options.global.postprocess {
            postprocess(&mut result);
        }
        info!(
            nodes = result.nodes.len(),
            meshes = result.renders.len(),
            materials = result.materials.len(),
            "parsed {filename}"
        );
        Ok(result)
    }

    /// Blocking parse on a private current-thread runtime.
    ///
    /// Errors are logged and turned into `None`. Must not be called from
    /// inside an async runtime.
    pub fn parse_sync(&self, filename: &str, data: &[u8]) -> Option<GltfContainer> {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                error!(error = %e, "failed to start runtime");
                return None;
            }
        };
        match runtime.block_on(self.parse(filename, data)) {
            Ok(container) => Some(container),
            Err(e) => {
                error!(filename, error = %e, "failed to parse glTF");
                None
            }
        }
    }

    /// Parse the file at `path`, resolving relative URIs next to it unless
    /// a base was configured.
    pub async fn load_file(&self, path: impl AsRef<Path>) -> Result<GltfContainer> {
        let path = path.as_ref();
        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
        let parent = path.parent().map(|p| p.to_string_lossy().into_owned());
        let url_base = self.url_base.as_deref().or(parent.as_deref());

        #[cfg(feature = "mmap")]
        {
            let file = std::fs::File::open(path)?;
            // SAFETY: the map is read-only and dropped before this call returns.
            let mmap = unsafe { memmap2::Mmap::map(&file)? };
            self.parse_with_base(&filename, &mmap, url_base).await
        }

        #[cfg(not(feature = "mmap"))]
        {
            let data = tokio::fs::read(path).await?;
            self.parse_with_base(&filename, &data, url_base).await
        }
    }
}
