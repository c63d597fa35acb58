//! Mockup Compositor
//!
//! Template problems are fatal. Logo problems never are: any failure to fetch,
//! read or decode the logo substitutes the placeholder logo, so a mockup is
//! always producible once the template resolves.

use image::{imageops, DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::{self, Cursor};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::artifacts::{key_from_reference, ArtifactStore, StoredArtifact};
use crate::catalog::{ColorTable, Point, ProductCatalog, Size};
use crate::models::OrderId;
use crate::recolor::recolor;

#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("Template not found or unreadable: {path}: {reason}")]
    TemplateLoad { path: String, reason: String },

    #[error("Failed to fetch logo from {url}: {reason}")]
    LogoFetch { url: String, reason: String },

    #[error("Failed to load logo {source_ref}: {reason}")]
    LogoLoad { source_ref: String, reason: String },

    #[error("Failed to encode mockup: {0}")]
    Encode(String),

    #[error("Failed to write mockup: {0}")]
    Io(#[from] io::Error),
}

/// Single-attempt download of a remote logo.
pub trait LogoFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, CompositeError>;
}

pub struct HttpLogoFetcher {
    agent: ureq::Agent,
}

impl HttpLogoFetcher {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent }
    }
}

impl LogoFetcher for HttpLogoFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, CompositeError> {
        let fail = |reason: String| CompositeError::LogoFetch {
            url: url.to_string(),
            reason,
        };
        let mut response = self.agent.get(url).call().map_err(|e| fail(e.to_string()))?;
        response
            .body_mut()
            .read_to_vec()
            .map_err(|e| fail(e.to_string()))
    }
}

pub fn is_remote(source: &str) -> bool {
    let lower = source.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// 100x100 transparent canvas with a solid red square.
pub fn placeholder_logo() -> RgbaImage {
    let mut img = RgbaImage::new(100, 100);
    for y in 20..80 {
        for x in 20..80 {
            img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
        }
    }
    img
}

/// Fit `logo` inside `max` preserving aspect ratio, never upscaling.
/// Nearest-neighbor sampling.
pub fn resize_logo(logo: &RgbaImage, max: Size) -> RgbaImage {
    let (width, height) = logo.dimensions();
    if width == 0 || height == 0 {
        return logo.clone();
    }

    let scale = (max.width as f64 / width as f64)
        .min(max.height as f64 / height as f64)
        .min(1.0);
    if scale >= 1.0 {
        return logo.clone();
    }

    let new_width = ((width as f64 * scale) as u32).max(1);
    let new_height = ((height as f64 * scale) as u32).max(1);

    RgbaImage::from_fn(new_width, new_height, |x, y| {
        let src_x = ((x as f64 / scale) as u32).min(width - 1);
        let src_y = ((y as f64 / scale) as u32).min(height - 1);
        *logo.get_pixel(src_x, src_y)
    })
}

/// Top-left corner that centers a `width` x `height` image on `anchor`.
pub fn placement(anchor: Point, width: u32, height: u32) -> Point {
    Point::new(anchor.x - (width / 2) as i64, anchor.y - (height / 2) as i64)
}

pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, CompositeError> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| CompositeError::Encode(e.to_string()))?;
    Ok(bytes)
}

pub fn mockup_key(order_id: OrderId) -> String {
    format!("mockups/order_{}.png", order_id)
}

pub struct Compositor {
    templates_dir: PathBuf,
    products: Arc<ProductCatalog>,
    colors: Arc<ColorTable>,
    artifacts: Arc<dyn ArtifactStore>,
    fetcher: Box<dyn LogoFetcher>,
}

impl Compositor {
    pub fn new(
        templates_dir: impl Into<PathBuf>,
        products: Arc<ProductCatalog>,
        colors: Arc<ColorTable>,
        artifacts: Arc<dyn ArtifactStore>,
        fetcher: Box<dyn LogoFetcher>,
    ) -> Self {
        Self {
            templates_dir: templates_dir.into(),
            products,
            colors,
            artifacts,
            fetcher,
        }
    }

    pub fn load_template(&self, product: &str) -> Result<RgbaImage, CompositeError> {
        let path = self.products.template_path(&self.templates_dir, product);
        let fail = |reason: String| CompositeError::TemplateLoad {
            path: path.display().to_string(),
            reason,
        };
        let bytes = std::fs::read(&path).map_err(|e| fail(e.to_string()))?;
        let template = image::load_from_memory(&bytes).map_err(|e| fail(e.to_string()))?;
        Ok(template.to_rgba8())
    }

    fn try_load_logo(&self, source: &str) -> Result<Option<RgbaImage>, CompositeError> {
        let bytes = if is_remote(source) {
            self.fetcher.fetch(source.trim())?
        } else {
            let load_err = |reason: String| CompositeError::LogoLoad {
                source_ref: source.to_string(),
                reason,
            };
            let key = key_from_reference(source).map_err(|e| load_err(e.to_string()))?;
            match self.artifacts.read(&key) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(load_err(e.to_string())),
            }
        };

        let logo = image::load_from_memory(&bytes).map_err(|e| {
            if is_remote(source) {
                CompositeError::LogoFetch {
                    url: source.to_string(),
                    reason: e.to_string(),
                }
            } else {
                CompositeError::LogoLoad {
                    source_ref: source.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;
        Ok(Some(logo.to_rgba8()))
    }

    /// Resolve a logo source, substituting the placeholder on any failure.
    pub fn load_logo(&self, source: &str) -> RgbaImage {
        match self.try_load_logo(source) {
            Ok(Some(logo)) => logo,
            Ok(None) => {
                warn!(logo = source, "logo not found, using placeholder");
                placeholder_logo()
            }
            Err(e) => {
                warn!(logo = source, error = %e, "logo unusable, using placeholder");
                placeholder_logo()
            }
        }
    }

    /// Build the mockup raster without persisting it.
    pub fn render(
        &self,
        logo_source: &str,
        product: &str,
        color_name: &str,
    ) -> Result<RgbaImage, CompositeError> {
        let spec = self.products.resolve(product);
        let template = self.load_template(product)?;

        let color = color_name.trim();
        let mut canvas = if color.is_empty() || color.eq_ignore_ascii_case("default") {
            template
        } else {
            recolor(&template, color, &self.colors)
        };

        let logo = resize_logo(&self.load_logo(logo_source), spec.max_logo);
        let at = placement(spec.anchor, logo.width(), logo.height());
        imageops::overlay(&mut canvas, &logo, at.x, at.y);
        Ok(canvas)
    }

    pub fn composite(
        &self,
        order_id: OrderId,
        logo_source: &str,
        product: &str,
        color_name: &str,
    ) -> Result<StoredArtifact, CompositeError> {
        let canvas = self.render(logo_source, product, color_name)?;
        let artifact = self.artifacts.write(&mockup_key(order_id), &encode_png(&canvas)?)?;
        info!(order_id, url = %artifact.url, sha256 = %artifact.sha256, "mockup composited");
        Ok(artifact)
    }
}
