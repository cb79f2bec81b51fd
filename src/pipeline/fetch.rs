//! External resource resolution: fetchers, retries and `data:` URIs.

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tracing::{debug, warn};

use crate::util::{Error, Result};

/// Source of bytes for external URIs.
pub trait AssetFetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// Reads URIs as local file paths.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileFetcher;

impl AssetFetcher for FileFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        let path = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
        async move { Ok(tokio::fs::read(&path).await?) }.boxed()
    }
}

/// Fetch `url`, retrying up to `max_retries` more times after a failure.
pub async fn fetch_with_retries(fetcher: &dyn AssetFetcher, url: &str, max_retries: u32) -> Result<Vec<u8>> {
    let mut attempt = 0;
    loop {
        match fetcher.fetch(url).await {
            Ok(bytes) => {
                debug!(url, bytes = bytes.len(), "fetched external resource");
                return Ok(bytes);
            }
            Err(e) if attempt < max_retries => {
                attempt += 1;
                warn!(url, attempt, error = %e, "fetch failed, retrying");
            }
            Err(e) => {
                return Err(Error::Fetch { url: url.to_string(), reason: e.to_string() });
            }
        }
    }
}

pub fn is_data_uri(uri: &str) -> bool {
    uri.starts_with("data:")
}

fn is_absolute(uri: &str) -> bool {
    is_data_uri(uri) || uri.contains("://") || uri.starts_with('/')
}

/// Resolve `uri` against `base`; absolute URLs and `data:` URIs pass through.
pub fn resolve_uri(base: Option<&str>, uri: &str) -> String {
    match base {
        Some(base) if !base.is_empty() && !is_absolute(uri) => {
            format!("{}/{}", base.trim_end_matches('/'), uri)
        }
        _ => uri.to_string(),
    }
}

/// Decode a `data:[<mime>][;base64],<payload>` URI into its mime type and bytes.
pub fn decode_data_uri(uri: &str) -> Result<(Option<String>, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| Error::DataUri("missing 'data:' prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::DataUri("missing ',' separator".to_string()))?;

    let (mime, base64) = match header.strip_suffix(";base64") {
        Some(mime) => (mime, true),
        None => (header, false),
    };
    let mime = (!mime.is_empty()).then(|| mime.to_string());

    let bytes = if base64 {
        STANDARD
            .decode(payload.trim())
            .map_err(|e| Error::DataUri(e.to_string()))?
    } else {
        payload.as_bytes().to_vec()
    };
    Ok((mime, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_data_uri() {
        let (mime, bytes) = decode_data_uri("data:application/octet-stream;base64,AAECAw==").unwrap();
        assert_eq!(mime.as_deref(), Some("application/octet-stream"));
        assert_eq!(bytes, vec![0, 1, 2, 3]);

        let (mime, bytes) = decode_data_uri("data:,hello").unwrap();
        assert!(mime.is_none());
        assert_eq!(bytes, b"hello");

        assert!(matches!(decode_data_uri("data:;base64,@@@"), Err(Error::DataUri(_))));
        assert!(matches!(decode_data_uri("data:text/plain"), Err(Error::DataUri(_))));
    }

    #[test]
    fn test_resolve_uri() {
        assert_eq!(resolve_uri(Some("/assets/"), "mesh.bin"), "/assets/mesh.bin");
        assert_eq!(resolve_uri(Some("/assets"), "https://cdn/x.bin"), "https://cdn/x.bin");
        assert_eq!(resolve_uri(Some("/assets"), "data:,x"), "data:,x");
        assert_eq!(resolve_uri(None, "mesh.bin"), "mesh.bin");
    }

    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    impl AssetFetcher for Flaky {
        fn fetch<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let failures = self.failures;
            async move {
                if call < failures {
                    Err(Error::other("connection reset"))
                } else {
                    Ok(vec![7])
                }
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_retries() {
        let fetcher = Flaky { failures: 2, calls: AtomicU32::new(0) };
        assert_eq!(fetch_with_retries(&fetcher, "x", 2).await.unwrap(), vec![7]);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);

        let fetcher = Flaky { failures: 5, calls: AtomicU32::new(0) };
        let err = fetch_with_retries(&fetcher, "x.bin", 1).await.unwrap_err();
        assert!(matches!(err, Error::Fetch { ref url, .. } if url == "x.bin"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }
}
