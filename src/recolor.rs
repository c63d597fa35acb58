//! Brightness-preserving template recoloring
//!
//! Only opaque mid-tone pixels are tinted. Near-black shadows and near-white
//! highlights pass through so fabric shading survives the remap.

use image::RgbaImage;

use crate::catalog::{ColorTable, Rgb};

/// Pixels at or below this alpha are treated as translucent.
pub const MIN_ALPHA: u8 = 127;
/// Exclusive brightness bounds for a colorable pixel.
pub const MIN_BRIGHTNESS: f64 = 30.0;
pub const MAX_BRIGHTNESS: f64 = 200.0;
/// Source brightness that maps to the unscaled target color.
pub const NEUTRAL_BRIGHTNESS: f64 = 128.0;

pub fn brightness(r: u8, g: u8, b: u8) -> f64 {
    (r as f64 + g as f64 + b as f64) / 3.0
}

pub fn is_colorable(px: [u8; 4]) -> bool {
    let [r, g, b, a] = px;
    let level = brightness(r, g, b);
    a > MIN_ALPHA && level > MIN_BRIGHTNESS && level < MAX_BRIGHTNESS
}

fn tint(px: [u8; 4], target: Rgb) -> [u8; 4] {
    let factor = brightness(px[0], px[1], px[2]) / NEUTRAL_BRIGHTNESS;
    let scale = |c: u8| (c as f64 * factor).min(255.0) as u8;
    [scale(target[0]), scale(target[1]), scale(target[2]), px[3]]
}

/// Recolor `template` toward `color_name`. Unknown colors return an identical
/// copy.
pub fn recolor(template: &RgbaImage, color_name: &str, colors: &ColorTable) -> RgbaImage {
    let mut out = template.clone();
    let Some(target) = colors.get(color_name) else {
        return out;
    };

    for px in out.pixels_mut() {
        if is_colorable(px.0) {
            px.0 = tint(px.0, target);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn single(px: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(1, 1, Rgba(px))
    }

    #[test]
    fn test_mid_gray_takes_exact_target() {
        let colors = ColorTable::default();
        let out = recolor(&single([128, 128, 128, 255]), "red", &colors);
        let red = colors.resolve("red");
        assert_eq!(out.get_pixel(0, 0).0, [red[0], red[1], red[2], 255]);
    }

    #[test]
    fn test_shadows_and_highlights_pass_through() {
        let colors = ColorTable::default();
        for name in ["red", "blue", "navy", "white"] {
            let dark = recolor(&single([10, 10, 10, 255]), name, &colors);
            assert_eq!(dark.get_pixel(0, 0).0, [10, 10, 10, 255]);

            let light = recolor(&single([230, 230, 230, 255]), name, &colors);
            assert_eq!(light.get_pixel(0, 0).0, [230, 230, 230, 255]);
        }
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        assert!(!is_colorable([30, 30, 30, 255]));
        assert!(is_colorable([31, 31, 31, 255]));
        assert!(is_colorable([199, 199, 199, 255]));
        assert!(!is_colorable([200, 200, 200, 255]));
        assert!(!is_colorable([128, 128, 128, 127]));
        assert!(is_colorable([128, 128, 128, 128]));
    }

    #[test]
    fn test_translucent_pixel_unchanged() {
        let colors = ColorTable::default();
        let out = recolor(&single([100, 100, 100, 60]), "blue", &colors);
        assert_eq!(out.get_pixel(0, 0).0, [100, 100, 100, 60]);
    }

    #[test]
    fn test_darker_source_gives_darker_tint_and_clamps() {
        let colors = ColorTable::default();
        let dark = recolor(&single([64, 64, 64, 200]), "blue", &colors);
        assert_eq!(dark.get_pixel(0, 0).0, [24, 65, 103, 200]);

        // 192/128 = 1.5; 229 * 1.5 clamps to 255.
        let bright = recolor(&single([192, 192, 192, 255]), "red", &colors);
        assert_eq!(bright.get_pixel(0, 0).0, [255, 93, 93, 255]);
    }

    #[test]
    fn test_unknown_color_is_identity() {
        let colors = ColorTable::default();
        let mut template = RgbaImage::new(4, 4);
        for (x, y, px) in template.enumerate_pixels_mut() {
            *px = Rgba([(x * 60) as u8, (y * 60) as u8, 128, 255]);
        }
        let out = recolor(&template, "chartreuse", &colors);
        assert_eq!(out, template);
    }
}
