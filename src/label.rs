//! Shipping Labels - Code 128 barcode + single page PDF
//!
//! Missing recipient fields are replaced with fixed defaults, so a label can
//! always be produced for an existing order. Every I/O failure aborts.

use barcoders::sym::code128::Code128;
use image::{DynamicImage, Rgba, RgbaImage};
use printpdf::{BuiltinFont, Image, ImageTransform, Mm, PdfDocument};
use serde::{Deserialize, Serialize};
use std::io::{self, BufWriter};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::artifacts::{ArtifactStore, StoredArtifact};
use crate::compositor::encode_png;
use crate::models::{Order, OrderId};

pub const BARCODE_PREFIX: &str = "PRINTFLOW-";
pub const BARCODE_WIDTH: u32 = 400;
pub const BARCODE_HEIGHT: u32 = 120;
pub const LABEL_TITLE: &str = "PRINTFLOW SHIPPING LABEL";

/// Code 128 character set B selector understood by `barcoders`.
const CHARSET_B: char = '\u{0181}';

const PAGE_WIDTH_MM: f32 = 215.9;
const PAGE_HEIGHT_MM: f32 = 279.4;

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("Failed to encode barcode: {0}")]
    BarcodeEncode(String),

    #[error("Barcode file not found after write: {0}")]
    BarcodeWrite(String),

    #[error("Failed to render label document: {0}")]
    DocumentRender(String),

    #[error("Label I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelFields {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

fn or_default(value: &Option<String>, default: &str) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

impl LabelFields {
    pub fn resolve(&self) -> Recipient {
        Recipient {
            name: or_default(&self.name, "Customer"),
            address: or_default(&self.address, "123 Main Street"),
            city: or_default(&self.city, "Anytown"),
            state: or_default(&self.state, "CA"),
            zip: or_default(&self.zip, "12345"),
        }
    }
}

/// Text content of a label page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDocument {
    pub title: String,
    pub lines: Vec<String>,
}

impl LabelDocument {
    pub fn new(order_id: OrderId, product: &str, size: &str, to: &Recipient) -> Self {
        let lines = vec![
            "TO:".to_string(),
            to.name.clone(),
            to.address.clone(),
            format!("{}, {} {}", to.city, to.state, to.zip),
            String::new(),
            format!("Order #{}", order_id),
            format!("Product: {}", product),
            format!("Size: {}", size),
        ];
        Self {
            title: LABEL_TITLE.to_string(),
            lines,
        }
    }
}

pub trait BarcodeEncoder {
    fn encode(&self, payload: &str) -> Result<RgbaImage, LabelError>;
}

pub trait DocumentRenderer {
    fn render(&self, document: &LabelDocument, barcode: &DynamicImage) -> Result<Vec<u8>, LabelError>;
}

/// Code 128 (set B) rasterized to a fixed size with integer module width.
pub struct Code128Encoder {
    pub width: u32,
    pub height: u32,
}

impl Default for Code128Encoder {
    fn default() -> Self {
        Self {
            width: BARCODE_WIDTH,
            height: BARCODE_HEIGHT,
        }
    }
}

impl BarcodeEncoder for Code128Encoder {
    fn encode(&self, payload: &str) -> Result<RgbaImage, LabelError> {
        let symbol = Code128::new(format!("{}{}", CHARSET_B, payload))
            .map_err(|e| LabelError::BarcodeEncode(format!("{:?}", e)))?;
        rasterize_modules(&symbol.encode(), self.width, self.height)
    }
}

/// Draw bar modules (1 = bar) centered on a white canvas.
pub fn rasterize_modules(modules: &[u8], width: u32, height: u32) -> Result<RgbaImage, LabelError> {
    let count = modules.len() as u32;
    if count == 0 || count > width {
        return Err(LabelError::BarcodeEncode(format!(
            "cannot fit {} modules into {} pixels",
            count, width
        )));
    }

    let module_width = width / count;
    let offset = (width - module_width * count) / 2;
    let mut img = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    for (i, _) in modules.iter().enumerate().filter(|(_, m)| **m == 1) {
        let start = offset + i as u32 * module_width;
        for x in start..start + module_width {
            for y in 0..height {
                img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
    }
    Ok(img)
}

/// US Letter page: bold title, recipient block, barcode 150mm wide.
pub struct PdfLabelRenderer;

impl DocumentRenderer for PdfLabelRenderer {
    fn render(&self, document: &LabelDocument, barcode: &DynamicImage) -> Result<Vec<u8>, LabelError> {
        let (doc, page, layer) = PdfDocument::new(
            document.title.clone(),
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Label",
        );
        let layer = doc.get_page(page).get_layer(layer);
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(render_err)?;
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(render_err)?;

        let top = PAGE_HEIGHT_MM - 10.0;
        layer.use_text(document.title.clone(), 18.0, Mm(10.0), Mm(top - 8.0), &bold);
        let mut y = top - 24.0;
        for line in &document.lines {
            layer.use_text(line.clone(), 12.0, Mm(10.0), Mm(y), &regular);
            y -= 8.0;
        }

        // 150mm wide, top edge 120mm below the top of the page.
        let width_mm = 150.0;
        let dpi = barcode.width() as f32 * 25.4 / width_mm;
        let height_mm = barcode.height() as f32 * 25.4 / dpi;
        let rgb = DynamicImage::ImageRgb8(barcode.to_rgb8());
        Image::from_dynamic_image(&rgb).add_to_layer(
            layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(10.0)),
                translate_y: Some(Mm(PAGE_HEIGHT_MM - 120.0 - height_mm)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );

        let mut writer = BufWriter::new(Vec::new());
        doc.save(&mut writer).map_err(render_err)?;
        writer.into_inner().map_err(render_err)
    }
}

fn render_err(e: impl std::fmt::Display) -> LabelError {
    LabelError::DocumentRender(e.to_string())
}

pub fn barcode_payload(order_id: OrderId) -> String {
    format!("{}{}", BARCODE_PREFIX, order_id)
}

pub fn barcode_key(order_id: OrderId) -> String {
    format!("labels/tmp/{}.png", order_id)
}

pub fn label_key(order_id: OrderId) -> String {
    format!("labels/order_{}.pdf", order_id)
}

pub struct LabelAssembler {
    artifacts: Arc<dyn ArtifactStore>,
    encoder: Box<dyn BarcodeEncoder>,
    renderer: Box<dyn DocumentRenderer>,
}

impl LabelAssembler {
    pub fn new(
        artifacts: Arc<dyn ArtifactStore>,
        encoder: Box<dyn BarcodeEncoder>,
        renderer: Box<dyn DocumentRenderer>,
    ) -> Self {
        Self {
            artifacts,
            encoder,
            renderer,
        }
    }

    pub fn generate_label(&self, order_id: OrderId, fields: &LabelFields) -> Result<StoredArtifact, LabelError> {
        self.assemble(order_id, "Custom Apparel", "Size TBD", fields)
    }

    /// Like `generate_label`, printing the order's product and size.
    pub fn generate_order_label(&self, order: &Order, fields: &LabelFields) -> Result<StoredArtifact, LabelError> {
        self.assemble(order.id, &order.product, &order.size, fields)
    }

    fn assemble(
        &self,
        order_id: OrderId,
        product: &str,
        size: &str,
        fields: &LabelFields,
    ) -> Result<StoredArtifact, LabelError> {
        let recipient = fields.resolve();

        let raster = self.encoder.encode(&barcode_payload(order_id))?;
        let png = encode_png(&raster).map_err(|e| LabelError::BarcodeEncode(e.to_string()))?;
        let key = barcode_key(order_id);
        self.artifacts.write(&key, &png)?;
        if !self.artifacts.exists(&key) {
            return Err(LabelError::BarcodeWrite(key));
        }
        let barcode = image::load_from_memory(&self.artifacts.read(&key)?)
            .map_err(|e| LabelError::BarcodeWrite(format!("{}: {}", key, e)))?;

        let document = LabelDocument::new(order_id, product, size, &recipient);
        let pdf = self.renderer.render(&document, &barcode)?;
        let artifact = self.artifacts.write(&label_key(order_id), &pdf)?;
        info!(order_id, url = %artifact.url, "shipping label generated");
        Ok(artifact)
    }
}
