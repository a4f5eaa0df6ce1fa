pub mod compose;
pub mod composer;
pub mod detection;
pub mod error;
pub mod layout;
pub mod models;
pub mod pipeline;

pub use composer::{PostComposer, create_post};
pub use detection::{Detector, ProductLocator, YoloDetector, locate_product};
pub use error::{DetectError, FailureKind, PostError};
pub use layout::PostLayout;
pub use models::{BoundingBox, Detection};
pub use pipeline::{MetadataValue, Pipeline, PipelineContext, PipelineData, PipelineStep};
