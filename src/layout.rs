//! Placement policy for the composed post.
//!
//! Every fixed number of the post lives in [`PostLayout`]; the helpers here
//! are pure geometry so they can be checked without touching pixels.

use image::Rgb;

use crate::error::PostError;
use crate::models::BoundingBox;

/// Brand background color, #F36921.
pub const BRAND_ORANGE: Rgb<u8> = Rgb([243, 105, 33]);

/// Sizes, offsets and encoding settings of a post.
#[derive(Debug, Clone, PartialEq)]
pub struct PostLayout {
    /// Side of the square canvas in pixels.
    pub canvas_size: u32,
    pub background: Rgb<u8>,
    /// Width the header is stretched to. Its height is kept as is.
    pub header_width: u32,
    /// Width the product is scaled to, height follows the aspect ratio.
    pub product_width: u32,
    /// Vertical offset of the product's top edge.
    pub product_top: u32,
    /// JPEG quality, 1–100.
    pub jpeg_quality: u8,
}

impl Default for PostLayout {
    fn default() -> Self {
        Self {
            canvas_size: 1080,
            background: BRAND_ORANGE,
            header_width: 1080,
            product_width: 900,
            product_top: 350,
            jpeg_quality: 95,
        }
    }
}

impl PostLayout {
    /// Reject layouts that would produce a post without a visible header or
    /// product, or that the JPEG encoder cannot honor.
    pub fn validate(&self) -> Result<(), PostError> {
        if self.canvas_size == 0 {
            return Err(PostError::InvalidLayout("canvas size is 0".into()));
        }
        if self.header_width == 0 {
            return Err(PostError::InvalidLayout("header width is 0".into()));
        }
        if self.product_width == 0 {
            return Err(PostError::InvalidLayout("product width is 0".into()));
        }
        if self.product_top >= self.canvas_size {
            return Err(PostError::InvalidLayout(format!(
                "product top {} is below the {}px canvas",
                self.product_top, self.canvas_size
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(PostError::InvalidLayout(format!(
                "JPEG quality {} is outside 1-100",
                self.jpeg_quality
            )));
        }
        Ok(())
    }

    /// Target size of the header given its original height.
    pub fn header_size(&self, header_height: u32) -> (u32, u32) {
        (self.header_width, header_height.max(1))
    }

    /// Target size of the product crop: fixed width, height scaled by the
    /// same ratio and truncated.
    pub fn product_size(&self, width: u32, height: u32) -> (u32, u32) {
        let ratio = self.product_width as f64 / width.max(1) as f64;
        let scaled = (height as f64 * ratio) as u32;
        (self.product_width, scaled.max(1))
    }

    /// Top-left corner of the product: centered horizontally.
    pub fn product_origin(&self) -> (i64, i64) {
        let x = (self.canvas_size as i64 - self.product_width as i64) / 2;
        (x, self.product_top as i64)
    }
}

/// Clamp a box to an image of `width` × `height`. Returns `None` when
/// nothing of the box is left inside the image.
pub fn clamp_box(bbox: BoundingBox, width: u32, height: u32) -> Option<BoundingBox> {
    let clamped = BoundingBox {
        left: bbox.left.min(width),
        top: bbox.top.min(height),
        right: bbox.right.min(width),
        bottom: bbox.bottom.min(height),
    };
    if clamped.is_empty() { None } else { Some(clamped) }
}
