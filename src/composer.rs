use image::{DynamicImage, ImageReader, RgbImage};
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::compose::encode_jpeg;
use crate::compose::steps::{ComposePostStep, CropProductStep, ResizeProductStep};
use crate::detection::steps::LocateProductStep;
use crate::detection::{DEFAULT_CONFIDENCE, DEFAULT_MODEL, Detector, ProductLocator};
use crate::error::{DetectError, FailureKind, PostError};
use crate::layout::PostLayout;
use crate::pipeline::Pipeline;

/// Builder for promotional posts.
///
/// Loads the catalog and header, finds the product, and lays both out on
/// the branded canvas described by a [`PostLayout`].
pub struct PostComposer {
    model_id: String,
    layout: PostLayout,
    confidence: f32,
    /// Overrides the YOLO backend resolved from `model_id`.
    detector: Option<Arc<dyn Detector>>,
    output_dir: PathBuf,
    debug_dir: Option<PathBuf>,
}

impl PostComposer {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            layout: PostLayout::default(),
            confidence: DEFAULT_CONFIDENCE,
            detector: None,
            output_dir: PathBuf::from("."),
            debug_dir: None,
        }
    }

    /// Replace the default layout. Fails if the layout cannot hold a product.
    pub fn layout(mut self, layout: PostLayout) -> Result<Self, PostError> {
        layout.validate()?;
        self.layout = layout;
        Ok(self)
    }

    /// Minimum detection score, within `[0, 1]`.
    pub fn confidence(mut self, threshold: f32) -> Result<Self, PostError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(PostError::InvalidConfidence(threshold));
        }
        self.confidence = threshold;
        Ok(self)
    }

    /// Use a custom detector instead of loading the model weights.
    pub fn detector(mut self, detector: Box<dyn Detector>) -> Self {
        self.detector = Some(Arc::from(detector));
        self
    }

    /// Directory the `<base>.jpg` file is written to (default: working directory).
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Save every intermediate image under `dir`, which must be empty or absent.
    pub fn debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dir = Some(dir.into());
        self
    }

    pub fn output_path(&self, base: &str) -> PathBuf {
        self.output_dir.join(format!("{base}.jpg"))
    }

    fn locator(&self) -> ProductLocator {
        let locator = match &self.detector {
            Some(detector) => ProductLocator::with_detector(detector.clone()),
            None => ProductLocator::new(self.model_id.clone()),
        };
        locator.confidence(self.confidence)
    }

    fn pipeline(&self, header: DynamicImage) -> Result<Pipeline, PostError> {
        let mut pipeline = Pipeline::new()
            .add_step(Arc::new(LocateProductStep {
                locator: Arc::new(self.locator()),
            }))
            .add_step(Arc::new(CropProductStep))
            .add_step(Arc::new(ResizeProductStep {
                layout: self.layout.clone(),
            }))
            .add_step(Arc::new(ComposePostStep {
                header: Arc::new(header),
                layout: self.layout.clone(),
            }));

        if let Some(dir) = &self.debug_dir {
            pipeline = pipeline.with_debug(dir.clone())?;
        }
        Ok(pipeline)
    }

    /// Compose already decoded images.
    pub fn compose_images(&self, catalog: DynamicImage, header: DynamicImage) -> Result<RgbImage, PostError> {
        let results = self.pipeline(header)?.run(catalog).map_err(PostError::from_step)?;

        let item = results
            .into_iter()
            .next()
            .ok_or_else(|| PostError::Detection(DetectError::NoProduct))?;
        if let (Some(score), Some(height)) = (item.get_float("score"), item.get_int("product_height")) {
            info!("product found with score {score:.2}, pasted at {}px tall", height);
        }
        Ok(item.image.to_rgb8())
    }

    /// Load both images and compose the post in memory.
    pub fn compose(&self, catalog: &Path, header: &Path) -> Result<RgbImage, PostError> {
        let catalog_image = load_image(catalog)?;
        let header_image = load_image(header)?;
        debug!(
            "catalog {}x{}, header {}x{}",
            catalog_image.width(),
            catalog_image.height(),
            header_image.width(),
            header_image.height()
        );
        self.compose_images(catalog_image, header_image)
    }

    /// Compose the post and write it as `<base>.jpg`. Nothing is written on failure.
    pub fn try_create(&self, catalog: &Path, header: &Path, base: &str) -> Result<PathBuf, PostError> {
        let canvas = self.compose(catalog, header)?;
        let bytes = encode_jpeg(&canvas, self.layout.jpeg_quality).map_err(PostError::Encode)?;

        let path = self.output_path(base);
        std::fs::write(&path, bytes)?;
        info!("wrote {}", path.display());
        Ok(path)
    }

    /// Like [`try_create`](Self::try_create), but reports the outcome on the
    /// console and never returns the error.
    pub fn create(&self, catalog: &Path, header: &Path, base: &str) -> Option<PathBuf> {
        match self.try_create(catalog, header, base) {
            Ok(path) => {
                println!("Image {base} created successfully.");
                Some(path)
            }
            Err(e) => {
                report_failure(&e);
                None
            }
        }
    }
}

/// Console message for a failed composition.
pub fn failure_message(err: &PostError) -> String {
    match err.kind() {
        FailureKind::Detection => format!("Error detecting product: {err}"),
        FailureKind::MissingFile => format!("Error: could not load one of the images. Detail: {err}"),
        FailureKind::Unexpected => format!("An unexpected error occurred: {err}"),
    }
}

pub fn report_failure(err: &PostError) {
    eprintln!("{}", failure_message(err));
}

/// Compose a post with default layout and settings.
pub fn create_post(catalog: &Path, header: &Path, base: &str, model_id: &str) -> Option<PathBuf> {
    PostComposer::new(model_id).create(catalog, header, base)
}

impl Default for PostComposer {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

/// Open and decode an image, telling a missing file apart from other failures.
pub fn load_image(path: &Path) -> Result<DynamicImage, PostError> {
    let file = File::open(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => PostError::MissingFile {
            path: path.to_path_buf(),
            source,
        },
        _ => PostError::Io(source),
    })?;

    ImageReader::new(BufReader::new(file))
        .with_guessed_format()?
        .decode()
        .map_err(|source| PostError::Decode {
            path: path.to_path_buf(),
            source,
        })
}
