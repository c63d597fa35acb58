//! Catalog - Product and Color Tables
//!
//! Both tables are total: `resolve` never fails, unknown names fall back to a
//! documented default. Keys are matched case-insensitively.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub type Rgb = [u8; 3];

/// Neutral gray used for any color name not in the table.
pub const DEFAULT_COLOR: Rgb = [113, 128, 150];

pub const DEFAULT_TEMPLATE: &str = "default.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSpec {
    /// Template file name, relative to the templates directory.
    pub template: String,
    /// Where the logo center lands on the template.
    pub anchor: Point,
    pub max_logo: Size,
}

impl ProductSpec {
    /// Left chest placement used for unrecognized products.
    pub fn fallback() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            anchor: Point::new(220, 200),
            max_logo: Size::new(150, 150),
        }
    }
}

/// Product registry - template path and logo placement per product
pub struct ProductCatalog {
    products: HashMap<String, ProductSpec>,
    fallback: ProductSpec,
}

impl ProductCatalog {
    pub fn empty() -> Self {
        Self {
            products: HashMap::new(),
            fallback: ProductSpec::fallback(),
        }
    }

    pub fn register(&mut self, name: &str, spec: ProductSpec) {
        self.products.insert(name.trim().to_lowercase(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&ProductSpec> {
        self.products.get(&name.trim().to_lowercase())
    }

    pub fn resolve(&self, name: &str) -> &ProductSpec {
        self.get(name).unwrap_or(&self.fallback)
    }

    pub fn template_path(&self, templates_dir: &Path, product: &str) -> PathBuf {
        templates_dir.join(&self.resolve(product).template)
    }

    /// Write a plain garment silhouette for every known template (and the
    /// fallback) that does not exist yet. Returns the files written.
    pub fn seed_templates(&self, templates_dir: &Path) -> io::Result<Vec<PathBuf>> {
        fs::create_dir_all(templates_dir)?;

        let mut names: Vec<&str> = self.products.values().map(|s| s.template.as_str()).collect();
        names.push(self.fallback.template.as_str());
        names.sort_unstable();
        names.dedup();

        let mut written = vec![];
        for name in names {
            let path = templates_dir.join(name);
            if path.exists() {
                continue;
            }
            placeholder_template()
                .save_with_format(&path, image::ImageFormat::Png)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            written.push(path);
        }
        Ok(written)
    }
}

impl Default for ProductCatalog {
    fn default() -> Self {
        let mut catalog = Self::empty();
        catalog.register(
            "Hoodie",
            ProductSpec {
                template: "hoodie.png".to_string(),
                anchor: Point::new(220, 200),
                max_logo: Size::new(150, 150),
            },
        );
        catalog.register(
            "T-Shirt",
            ProductSpec {
                template: "tshirt.png".to_string(),
                anchor: Point::new(200, 180),
                max_logo: Size::new(120, 120),
            },
        );
        catalog
    }
}

/// 500x600 light backdrop with a mid-gray garment block, so recoloring only
/// touches the garment.
pub fn placeholder_template() -> RgbaImage {
    let mut img = RgbaImage::from_pixel(500, 600, Rgba([240, 240, 240, 255]));
    for y in 100..500 {
        for x in 100..400 {
            img.put_pixel(x, y, Rgba([128, 128, 128, 255]));
        }
    }
    img
}

/// Color registry - name to RGB
pub struct ColorTable {
    colors: HashMap<String, Rgb>,
}

impl ColorTable {
    pub fn empty() -> Self {
        Self { colors: HashMap::new() }
    }

    pub fn register(&mut self, name: &str, rgb: Rgb) {
        self.colors.insert(name.trim().to_lowercase(), rgb);
    }

    /// Exact lookup; recoloring uses this to leave unknown colors alone.
    pub fn get(&self, name: &str) -> Option<Rgb> {
        self.colors.get(&name.trim().to_lowercase()).copied()
    }

    pub fn resolve(&self, name: &str) -> Rgb {
        self.get(name).unwrap_or(DEFAULT_COLOR)
    }

    pub fn css_hex(&self, name: &str) -> String {
        let [r, g, b] = self.resolve(name);
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }

    /// Sorted color names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.colors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ColorTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for (name, rgb) in [
            ("black", [45, 55, 72]),
            ("white", [247, 250, 252]),
            ("red", [229, 62, 62]),
            ("blue", [49, 130, 206]),
            ("green", [56, 161, 105]),
            ("yellow", [214, 158, 46]),
            ("purple", [128, 90, 213]),
            ("pink", [213, 63, 140]),
            ("gray", [113, 128, 150]),
            ("navy", [44, 82, 130]),
        ] {
            table.register(name, rgb);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_lookup_is_case_insensitive() {
        let catalog = ProductCatalog::default();
        assert_eq!(catalog.resolve("t-shirt").anchor, Point::new(200, 180));
        assert_eq!(catalog.resolve("HOODIE").max_logo, Size::new(150, 150));
    }

    #[test]
    fn test_unknown_product_falls_back() {
        let catalog = ProductCatalog::default();
        assert_eq!(catalog.resolve("Tote Bag"), &ProductSpec::fallback());
        assert!(catalog.get("Tote Bag").is_none());
    }

    #[test]
    fn test_color_defaults_to_gray() {
        let colors = ColorTable::default();
        assert_eq!(colors.resolve("Red"), [229, 62, 62]);
        assert_eq!(colors.resolve("chartreuse"), DEFAULT_COLOR);
        assert_eq!(colors.css_hex("chartreuse"), "#718096");
        assert_eq!(colors.css_hex("navy"), "#2c5282");
    }

    #[test]
    fn test_seed_templates_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = ProductCatalog::default();

        let first = catalog.seed_templates(dir.path()).unwrap();
        assert_eq!(first.len(), 3);
        assert!(dir.path().join("hoodie.png").exists());

        let second = catalog.seed_templates(dir.path()).unwrap();
        assert!(second.is_empty());
    }
}
