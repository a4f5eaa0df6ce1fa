pub mod steps;
pub mod weights;
pub mod yolo;

use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::DetectError;
use crate::models::{BoundingBox, Detection};

pub use weights::DEFAULT_MODEL;
pub use yolo::YoloDetector;

/// Confidence a detection needs to count as the product.
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

/// Pluggable object detection backend.
pub trait Detector: Send + Sync {
    /// Detect objects scoring at least `min_score`, best first.
    fn detect(&self, image: &DynamicImage, min_score: f32) -> Result<Vec<Detection>, DetectError>;
}

enum Backend {
    /// YOLO weights resolved from a model identifier when first needed
    Model(String),
    Custom(Arc<dyn Detector>),
}

/// Finds the product in a catalog image: the first detection above the
/// confidence threshold.
pub struct ProductLocator {
    backend: Backend,
    confidence: f32,
}

impl ProductLocator {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            backend: Backend::Model(model_id.into()),
            confidence: DEFAULT_CONFIDENCE,
        }
    }

    pub fn with_detector(detector: Arc<dyn Detector>) -> Self {
        Self {
            backend: Backend::Custom(detector),
            confidence: DEFAULT_CONFIDENCE,
        }
    }

    pub fn confidence(mut self, threshold: f32) -> Self {
        self.confidence = threshold;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.confidence
    }

    /// All detections above the threshold, best first.
    pub fn detect_all(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectError> {
        let mut detections = match &self.backend {
            Backend::Model(id) => YoloDetector::load(id)?.detect(image, self.confidence)?,
            Backend::Custom(detector) => detector.detect(image, self.confidence)?,
        };
        detections.retain(|d| d.score >= self.confidence);
        debug!("{} detections above {:.2}", detections.len(), self.confidence);
        Ok(detections)
    }

    /// The first detection above the threshold.
    pub fn locate(&self, image: &DynamicImage) -> Result<Detection, DetectError> {
        let detection = self
            .detect_all(image)?
            .into_iter()
            .next()
            .ok_or(DetectError::NoProduct)?;
        info!(
            "product at {} (class {}, score {:.2})",
            detection.bbox, detection.class_id, detection.score
        );
        Ok(detection)
    }

    /// Read `path` and return the product's bounding box.
    pub fn locate_file(&self, path: &Path) -> Result<BoundingBox, DetectError> {
        let image = image::ImageReader::open(path)
            .map_err(image::ImageError::IoError)?
            .with_guessed_format()
            .map_err(image::ImageError::IoError)?
            .decode()?;
        Ok(self.locate(&image)?.bbox)
    }
}

/// Locate the product in `catalog` with the given model, reporting any
/// failure on the console instead of returning it.
pub fn locate_product(catalog: &Path, model_id: &str) -> Option<BoundingBox> {
    match ProductLocator::new(model_id).locate_file(catalog) {
        Ok(bbox) => Some(bbox),
        Err(e) => {
            eprintln!("Error detecting product: {e}");
            None
        }
    }
}
