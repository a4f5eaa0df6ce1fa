use anyhow::Result;
use image::{DynamicImage, Rgb};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::sync::Arc;
use tracing::info;

use crate::detection::ProductLocator;
use crate::models::Detection;
use crate::pipeline::{MetadataValue, PipelineContext, PipelineData, PipelineStep};

/// Run the detector and tag each image with the product's bounding box.
/// Images without a detection are dropped.
pub struct LocateProductStep {
    pub locator: Arc<ProductLocator>,
}

impl PipelineStep for LocateProductStep {
    fn process(&self, data: Vec<PipelineData>, context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let detections = self.locator.detect_all(&item.image)?;

            if context.debug.is_some() {
                context.save_debug_image("detections.png", &draw_detections(&item.image, &detections))?;
            }

            let Some(product) = detections.first() else {
                info!("no detection scored {:.2} or more", self.locator.threshold());
                continue;
            };

            let mut located = item
                .with_metadata("score", MetadataValue::Float(product.score))
                .with_metadata("class_id", MetadataValue::Int(product.class_id as i64))
                .with_metadata("detections", MetadataValue::Int(detections.len() as i64));
            located.bbox = Some(product.bbox);
            result.push(located);
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Locate Product"
    }
}

/// Outline every detection; the chosen product in green, the rest in red.
pub fn draw_detections(image: &DynamicImage, detections: &[Detection]) -> DynamicImage {
    let mut canvas = image.to_rgb8();

    for (i, detection) in detections.iter().enumerate().rev() {
        if detection.bbox.is_empty() {
            continue;
        }
        let color = if i == 0 { Rgb([0u8, 255, 0]) } else { Rgb([255u8, 0, 0]) };
        let rect = Rect::at(detection.bbox.left as i32, detection.bbox.top as i32)
            .of_size(detection.bbox.width(), detection.bbox.height());
        draw_hollow_rect_mut(&mut canvas, rect, color);
    }

    DynamicImage::ImageRgb8(canvas)
}
