use anyhow::Result;
use image::DynamicImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::models::BoundingBox;

/// Data that flows through the pipeline
/// Each PipelineData is one image (catalog, product crop or composed post) with its metadata
#[derive(Clone)]
pub struct PipelineData {
    /// The current image for this item
    pub image: DynamicImage,

    /// The image the pipeline started from (shared via Arc)
    pub original: Arc<DynamicImage>,

    /// Region of `original` this item refers to (None means full image)
    pub bbox: Option<BoundingBox>,

    /// Metadata attached by steps (e.g. "score", "class_id")
    pub metadata: HashMap<String, MetadataValue>,
}

/// Metadata value types
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Float(f32),
    Int(i64),
}

impl PipelineData {
    /// Create PipelineData for a full image
    pub fn from_image(image: DynamicImage) -> Self {
        let original = Arc::new(image.clone());
        Self {
            image,
            original,
            bbox: None,
            metadata: HashMap::new(),
        }
    }

    /// Replace the image, keeping origin, region and metadata
    pub fn with_image(self, image: DynamicImage) -> Self {
        Self { image, ..self }
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.metadata.get(key) {
            Some(MetadataValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.metadata.get(key) {
            Some(MetadataValue::Int(v)) => Some(*v),
            _ => None,
        }
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

impl PipelineContext {
    /// Save an extra image into the debug directory, if debug mode is on
    pub fn save_debug_image(&self, name: &str, image: &DynamicImage) -> Result<()> {
        if let Some(debug_config) = &self.debug {
            let path = debug_config.output_dir.join(name);
            image
                .save(&path)
                .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
            debug!("saved debug image {}", path.display());
        }
        Ok(())
    }
}

/// Trait that all pipeline steps must implement
pub trait PipelineStep: Send + Sync {
    /// Process data and return transformed data
    /// Steps can filter (many → fewer, possibly none) or transform (many → many)
    fn process(&self, data: Vec<PipelineData>, context: &PipelineContext) -> Result<Vec<PipelineData>>;

    /// Human-readable name for this step (used in logs and debug directory names)
    fn name(&self) -> &str;
}

/// Composable pipeline builder
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            context: PipelineContext::default(),
        }
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Helper method to add a step from a Box (for convenience)
    pub fn add_step_boxed(mut self, step: Box<dyn PipelineStep>) -> Self {
        self.steps.push(Arc::from(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order on an input image
    pub fn run(&self, input: DynamicImage) -> Result<Vec<PipelineData>> {
        self.run_partial(input, self.steps.len())
    }

    /// Run the pipeline but stop after `num_steps` steps (useful for debugging)
    pub fn run_partial(&self, input: DynamicImage, num_steps: usize) -> Result<Vec<PipelineData>> {
        if let Some(debug_config) = &self.context.debug {
            let input_dir = debug_config.output_dir.join("00_input");
            save_items(&input_dir, std::slice::from_ref(&input))?;
            debug!("saved 00_input/01.png");
        }

        let mut data = vec![PipelineData::from_image(input)];

        for (step_idx, step) in self.steps.iter().take(num_steps).enumerate() {
            debug!("running step: {} (processing {} items)", step.name(), data.len());

            data = step.process(data, &self.context)?;

            if let Some(debug_config) = &self.context.debug {
                let step_dir_name = format!(
                    "{:02}_{}",
                    step_idx + 1,
                    step.name().to_lowercase().replace(' ', "_")
                );
                let images: Vec<DynamicImage> = data.iter().map(|item| item.image.clone()).collect();
                save_items(&debug_config.output_dir.join(&step_dir_name), &images)?;
                debug!("saved {} images to {}/", images.len(), step_dir_name);
            }

            debug!("  → {} items", data.len());

            // Nothing left to transform; later steps would only see an empty list
            if data.is_empty() {
                break;
            }
        }

        Ok(data)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn save_items(dir: &Path, images: &[DynamicImage]) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    for (idx, image) in images.iter().enumerate() {
        let output_path = dir.join(format!("{:02}.png", idx + 1));
        image
            .save(&output_path)
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
    }
    Ok(())
}
