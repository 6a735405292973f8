//! # Image Loading and Decoding
//!
//! Images are fetched once, up front, before layout. A single scan of the
//! document collects every `image` URL and every `imageReference` that
//! resolves to a definition; distinct URLs are then loaded and decoded
//! concurrently and the results land in a write-once [`ImageCache`].
//!
//! Decoding only goes as far as layout needs: PNG and JPEG report their
//! pixel dimensions and keep their raw bytes, SVG reports its declared size
//! and keeps its markup. Anything else is a decode failure.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::model::{Definitions, Document, Node};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("{0}")]
    Load(String),
    #[error("{0}")]
    Decode(String),
}

impl ImageError {
    fn into_diagnostic(self, url: &str) -> Diagnostic {
        match self {
            ImageError::Load(reason) => Diagnostic::ImageLoadFailure {
                url: url.to_string(),
                reason,
            },
            ImageError::Decode(reason) => Diagnostic::ImageDecodeFailure {
                url: url.to_string(),
                reason,
            },
        }
    }
}

/// Fetches the raw bytes behind an image URL.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<Vec<u8>, ImageError>;
}

/// Loads `data:` URIs and local files. Relative paths resolve against
/// `base_dir`; network schemes are rejected.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    pub base_dir: PathBuf,
}

impl FileLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

#[async_trait]
impl ImageLoader for FileLoader {
    async fn load(&self, url: &str) -> Result<Vec<u8>, ImageError> {
        if let Some(rest) = url.strip_prefix("data:") {
            return decode_data_uri(rest);
        }

        let path = match url.strip_prefix("file://") {
            Some(path) => PathBuf::from(path),
            None if url.contains("://") => {
                return Err(ImageError::Load(format!("unsupported URL scheme in '{}'", url)));
            }
            None => {
                let path = PathBuf::from(url);
                if path.is_absolute() {
                    path
                } else {
                    self.base_dir.join(path)
                }
            }
        };

        tokio::fs::read(&path)
            .await
            .map_err(|e| ImageError::Load(format!("failed to read '{}': {}", path.display(), e)))
    }
}

/// Decode the part of a data URI after `data:`.
fn decode_data_uri(rest: &str) -> Result<Vec<u8>, ImageError> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| ImageError::Load("invalid data URI: missing comma".to_string()))?;
    if meta.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| ImageError::Load(format!("base64 decode error: {}", e)))
    } else {
        Ok(percent_encoding::percent_decode_str(payload).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImagePayload {
    Raster { format: RasterFormat, bytes: Vec<u8> },
    Vector { markup: String },
}

/// A decoded image: natural size in points plus the payload to paint.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub width: f64,
    pub height: f64,
    pub payload: ImagePayload,
}

/// Classify and size raw image bytes.
pub fn decode_image_bytes(data: &[u8]) -> Result<ImageData, ImageError> {
    if let Ok(format) = image::guess_format(data) {
        let raster = match format {
            image::ImageFormat::Png => RasterFormat::Png,
            image::ImageFormat::Jpeg => RasterFormat::Jpeg,
            other => {
                return Err(ImageError::Decode(format!(
                    "unsupported image format {:?}",
                    other
                )))
            }
        };
        let (width, height) = image::io::Reader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ImageError::Decode(format!("format detection error: {}", e)))?
            .into_dimensions()
            .map_err(|e| ImageError::Decode(format!("failed to read dimensions: {}", e)))?;
        return Ok(ImageData {
            width: width as f64,
            height: height as f64,
            payload: ImagePayload::Raster {
                format: raster,
                bytes: data.to_vec(),
            },
        });
    }

    if let Ok(text) = std::str::from_utf8(data) {
        if text.contains("<svg") {
            let (width, height) = svg_dimensions(text)?;
            return Ok(ImageData {
                width,
                height,
                payload: ImagePayload::Vector {
                    markup: text.to_string(),
                },
            });
        }
    }

    Err(ImageError::Decode("unsupported image format".to_string()))
}

/// Declared size of the root `<svg>` element. `width`/`height` win; a
/// `viewBox` fills in whatever is missing.
fn svg_dimensions(content: &str) -> Result<(f64, f64), ImageError> {
    let mut reader = Reader::from_str(content);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"svg" => {
                let mut width = None;
                let mut height = None;
                let mut view_box = None;
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"width" => width = parse_length(&value),
                        b"height" => height = parse_length(&value),
                        b"viewBox" => view_box = parse_view_box(&value),
                        _ => {}
                    }
                }
                let width = width.or(view_box.map(|(w, _)| w));
                let height = height.or(view_box.map(|(_, h)| h));
                return match (width, height) {
                    (Some(w), Some(h)) if w > 0.0 && h > 0.0 => Ok((w, h)),
                    _ => Err(ImageError::Decode("svg has no intrinsic size".to_string())),
                };
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ImageError::Decode(format!("invalid svg: {}", e))),
            _ => {}
        }
        buf.clear();
    }
    Err(ImageError::Decode("missing <svg> element".to_string()))
}

/// Parse "120", "120px" or "90pt". Percentages have no intrinsic size.
fn parse_length(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.ends_with('%') {
        return None;
    }
    let number = s.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    number.trim().parse::<f64>().ok()
}

fn parse_view_box(s: &str) -> Option<(f64, f64)> {
    let parts: Vec<f64> = s
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|p| !p.is_empty())
        .filter_map(|p| p.parse::<f64>().ok())
        .collect();
    if parts.len() == 4 {
        Some((parts[2], parts[3]))
    } else {
        None
    }
}

/// Decoded images keyed by URL. Each key is written at most once.
#[derive(Debug, Clone, Default)]
pub struct ImageCache {
    images: HashMap<String, Arc<ImageData>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an image. Returns `false` and keeps the existing entry if the
    /// URL is already cached.
    pub fn insert(&mut self, url: impl Into<String>, data: ImageData) -> bool {
        let url = url.into();
        if self.images.contains_key(&url) {
            return false;
        }
        self.images.insert(url, Arc::new(data));
        true
    }

    pub fn get(&self, url: &str) -> Option<&Arc<ImageData>> {
        self.images.get(url)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Distinct image URLs in document order: `image` nodes directly and
/// `imageReference` nodes through their definitions.
pub fn collect_image_urls(document: &Document, definitions: &Definitions) -> Vec<String> {
    fn visit(nodes: &[Node], defs: &Definitions, seen: &mut HashSet<String>, out: &mut Vec<String>) {
        for node in nodes {
            let url = match node {
                Node::Image(image) => Some(image.url.as_str()),
                Node::ImageReference(reference) => {
                    defs.get(&reference.identifier).map(|d| d.url.as_str())
                }
                _ => None,
            };
            if let Some(url) = url {
                if seen.insert(url.to_string()) {
                    out.push(url.to_string());
                }
            }
            visit(node.children(), defs, seen, out);
        }
    }

    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    visit(&document.children, definitions, &mut seen, &mut urls);
    urls
}

/// Load and decode every image in `document` concurrently. Failures are
/// reported to `diagnostics` and leave the URL out of the cache.
pub async fn prefetch<L>(
    document: &Document,
    definitions: &Definitions,
    loader: &L,
    diagnostics: &Diagnostics,
) -> ImageCache
where
    L: ImageLoader + ?Sized,
{
    let urls = collect_image_urls(document, definitions);
    let mut cache = ImageCache::new();
    if urls.is_empty() {
        return cache;
    }
    log::debug!("Prefetching {} image(s)", urls.len());

    let fetches = urls.iter().map(|url| async move {
        let result = match loader.load(url).await {
            Ok(bytes) => decode_image_bytes(&bytes),
            Err(e) => Err(e),
        };
        (url, result)
    });

    for (url, result) in futures::future::join_all(fetches).await {
        match result {
            Ok(data) => {
                cache.insert(url.clone(), data);
            }
            Err(e) => {
                diagnostics.report(e.into_diagnostic(url));
            }
        }
    }
    log::debug!("Prefetched {}/{} image(s)", cache.len(), urls.len());
    cache
}
