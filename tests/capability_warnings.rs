//! Device capability warnings raised while building index buffers.
//!
//! Meshes are built on rayon workers, so events are collected through a
//! process-wide subscriber; this binary holds a single test to keep the
//! count unambiguous.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{glb, wide_index_document};
use gltf_ingest::device::HeadlessDevice;
use gltf_ingest::pipeline::GltfParser;
use gltf_ingest::vertex::IndexFormat;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Counts `WARN` events emitted by the index buffer builder.
#[derive(Clone, Default)]
struct IndexWarnings(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> Layer<S> for IndexWarnings {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() == tracing::Level::WARN && meta.target().ends_with("vertex::index") {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[tokio::test]
async fn test_u32_narrowing_warns_past_u16_range() {
    let warnings = IndexWarnings::default();
    tracing::subscriber::set_global_default(tracing_subscriber::registry().with(warnings.clone())).unwrap();

    let parser = GltfParser::new(Arc::new(HeadlessDevice::with_capabilities(false, true)));

    let (json, bin) = wide_index_document(70_000);
    let container = parser.parse("wide.glb", &glb(&json, Some(&bin))).await.unwrap();
    let ib = container.renders[0].meshes[0].index_buffer.as_ref().unwrap();
    assert_eq!(ib.format, IndexFormat::U16);
    assert_eq!(warnings.0.load(Ordering::SeqCst), 1);

    let (json, bin) = wide_index_document(3);
    let container = parser.parse("small.glb", &glb(&json, Some(&bin))).await.unwrap();
    let ib = container.renders[0].meshes[0].index_buffer.as_ref().unwrap();
    assert_eq!(ib.format, IndexFormat::U16);
    assert_eq!(warnings.0.load(Ordering::SeqCst), 1);
}
