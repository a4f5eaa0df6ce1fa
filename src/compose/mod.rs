pub mod steps;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageEncoder, RgbImage};

use crate::layout::{PostLayout, clamp_box};
use crate::models::BoundingBox;

/// Cut the product out of the catalog. The box is clamped to the image;
/// `None` if nothing of it lies inside.
pub fn crop_product(catalog: &DynamicImage, bbox: BoundingBox) -> Option<DynamicImage> {
    let region = clamp_box(bbox, catalog.width(), catalog.height())?;
    Some(catalog.crop_imm(region.left, region.top, region.width(), region.height()))
}

/// Stretch the header to the layout width, keeping its height.
pub fn resize_header(header: &DynamicImage, layout: &PostLayout) -> RgbImage {
    let (width, height) = layout.header_size(header.height());
    image::imageops::resize(&header.to_rgb8(), width, height, FilterType::Lanczos3)
}

/// Scale the product to the layout width, height following the aspect ratio.
pub fn resize_product(product: &DynamicImage, layout: &PostLayout) -> RgbImage {
    let (width, height) = layout.product_size(product.width(), product.height());
    image::imageops::resize(&product.to_rgb8(), width, height, FilterType::Lanczos3)
}

/// Paint header and product onto a fresh background canvas.
/// Pixels falling outside the canvas are clipped.
pub fn compose_canvas(header: &RgbImage, product: &RgbImage, layout: &PostLayout) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(layout.canvas_size, layout.canvas_size, layout.background);
    image::imageops::replace(&mut canvas, header, 0, 0);

    let (x, y) = layout.product_origin();
    image::imageops::replace(&mut canvas, product, x, y);
    canvas
}

/// Encode as baseline JPEG at `quality`.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    encoder.write_image(image.as_raw(), image.width(), image.height(), image::ExtendedColorType::Rgb8)?;
    Ok(buffer)
}
