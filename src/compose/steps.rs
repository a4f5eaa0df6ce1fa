use anyhow::Result;
use image::DynamicImage;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::compose::{compose_canvas, crop_product, resize_header, resize_product};
use crate::layout::PostLayout;
use crate::pipeline::{MetadataValue, PipelineContext, PipelineData, PipelineStep};

/// Crop each item's bounding box out of the original image
pub struct CropProductStep;

impl PipelineStep for CropProductStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();
        for item in data {
            let Some(bbox) = item.bbox else {
                return Err(anyhow::anyhow!("{} needs a located product", self.name()));
            };
            match crop_product(&item.original, bbox) {
                Some(cropped) => {
                    debug!("cropped {}x{} at {}", cropped.width(), cropped.height(), bbox);
                    result.push(item.with_image(cropped));
                }
                None => warn!("box {} lies outside the catalog, skipping", bbox),
            }
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "Crop Product"
    }
}

/// Scale the product to the layout's product width
pub struct ResizeProductStep {
    pub layout: PostLayout,
}

impl PipelineStep for ResizeProductStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();
        for item in data {
            let resized = resize_product(&item.image, &self.layout);
            let height = resized.height();
            let new_item = item
                .with_image(DynamicImage::ImageRgb8(resized))
                .with_metadata("product_height", MetadataValue::Int(height as i64));
            result.push(new_item);
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "Resize Product"
    }
}

/// Place header and product on the branded canvas
pub struct ComposePostStep {
    pub header: Arc<DynamicImage>,
    pub layout: PostLayout,
}

impl PipelineStep for ComposePostStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let header = resize_header(&self.header, &self.layout);
        let mut result = Vec::new();
        for item in data {
            let canvas = compose_canvas(&header, &item.image.to_rgb8(), &self.layout);
            result.push(item.with_image(DynamicImage::ImageRgb8(canvas)));
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "Compose Post"
    }
}
