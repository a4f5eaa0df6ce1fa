use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};
use promopost::{BoundingBox, DetectError, Detection, Detector};
use std::path::{Path, PathBuf};

/// Creates a solid-color image of the given size and saves it as PNG in `dir`.
pub fn write_solid_image(dir: &Path, name: &str, width: u32, height: u32, color: Rgb<u8>) -> PathBuf {
    let img = ImageBuffer::from_pixel(width, height, color);
    let path = dir.join(name);
    img.save_with_format(&path, image::ImageFormat::Png)
        .expect("Failed to save test image");
    path
}

/// A white catalog page with one solid product rectangle on it.
pub fn catalog_image(width: u32, height: u32, product: BoundingBox, color: Rgb<u8>) -> RgbImage {
    ImageBuffer::from_fn(width, height, |x, y| {
        let inside = x >= product.left && x < product.right && y >= product.top && y < product.bottom;
        if inside { color } else { Rgb([255u8, 255u8, 255u8]) }
    })
}

/// Saves `catalog_image` as PNG in `dir`.
pub fn write_catalog(dir: &Path, name: &str, product: BoundingBox) -> PathBuf {
    let path = dir.join(name);
    catalog_image(400, 300, product, TEST_BLUE)
        .save_with_format(&path, image::ImageFormat::Png)
        .expect("Failed to save catalog image");
    path
}

/// Detector returning a fixed list of detections.
pub struct FixedDetector {
    pub detections: Vec<Detection>,
}

impl FixedDetector {
    pub fn single(bbox: BoundingBox, score: f32) -> Self {
        Self {
            detections: vec![Detection { bbox, score, class_id: 0 }],
        }
    }

    pub fn empty() -> Self {
        Self { detections: Vec::new() }
    }
}

impl Detector for FixedDetector {
    fn detect(&self, _image: &DynamicImage, min_score: f32) -> Result<Vec<Detection>, DetectError> {
        Ok(self
            .detections
            .iter()
            .filter(|d| d.score >= min_score)
            .cloned()
            .collect())
    }
}

/// Detector whose inference always fails.
pub struct FailingDetector;

impl Detector for FailingDetector {
    fn detect(&self, _image: &DynamicImage, _min_score: f32) -> Result<Vec<Detection>, DetectError> {
        Err(DetectError::Inference("backend exploded".to_string()))
    }
}

/// Deterministic detector: the bounding box of all non-white pixels.
pub struct ContentDetector;

impl Detector for ContentDetector {
    fn detect(&self, image: &DynamicImage, min_score: f32) -> Result<Vec<Detection>, DetectError> {
        let rgb = image.to_rgb8();
        let mut bounds: Option<BoundingBox> = None;

        for (x, y, pixel) in rgb.enumerate_pixels() {
            if pixel.0.iter().all(|&c| c > 240) {
                continue;
            }
            let b = bounds.get_or_insert(BoundingBox::new(x, y, x + 1, y + 1));
            b.left = b.left.min(x);
            b.top = b.top.min(y);
            b.right = b.right.max(x + 1);
            b.bottom = b.bottom.max(y + 1);
        }

        let score = 0.9;
        Ok(bounds
            .filter(|_| score >= min_score)
            .map(|bbox| vec![Detection { bbox, score, class_id: 0 }])
            .unwrap_or_default())
    }
}

/// Color constants for tests
pub const TEST_RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const TEST_BLUE: Rgb<u8> = Rgb([0, 0, 255]);
pub const TEST_GREEN: Rgb<u8> = Rgb([0, 255, 0]);
