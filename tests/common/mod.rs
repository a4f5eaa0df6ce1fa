#![allow(dead_code, unused_imports)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from promopost for tests
pub use promopost::{
    BoundingBox, DetectError, Detection, Detector, FailureKind, PostComposer, PostError, PostLayout,
    ProductLocator,
};
