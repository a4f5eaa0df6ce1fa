//! YOLO object detector running on the rten inference engine.
//!
//! Handles the two output layouts YOLO exports come in:
//! rows `[1, N, 5 + C]` (box, objectness, class scores) and
//! channels `[1, 4 + C, N]` (box, class scores, no objectness).

use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use rten::Model;
use rten_tensor::NdTensor;
use rten_tensor::prelude::*;
use std::path::Path;
use tracing::debug;

use crate::detection::Detector;
use crate::detection::weights;
use crate::error::DetectError;
use crate::models::{BoundingBox, Detection};

/// Padding value used around the letterboxed image.
const LETTERBOX_FILL: u8 = 114;

/// Tuning knobs of the YOLO decoder.
#[derive(Debug, Clone)]
pub struct YoloParams {
    /// Side of the square model input.
    pub input_size: u32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            iou_threshold: 0.7,
            max_detections: 300,
        }
    }
}

/// How a letterboxed input maps back to the source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub source_width: u32,
    pub source_height: u32,
}

impl Letterbox {
    pub fn new(source_width: u32, source_height: u32, input_size: u32) -> Self {
        let scale = (input_size as f32 / source_width.max(1) as f32)
            .min(input_size as f32 / source_height.max(1) as f32);
        let scaled_w = (source_width as f32 * scale).round();
        let scaled_h = (source_height as f32 * scale).round();
        Self {
            scale,
            pad_x: ((input_size as f32 - scaled_w) / 2.0).floor(),
            pad_y: ((input_size as f32 - scaled_h) / 2.0).floor(),
            source_width,
            source_height,
        }
    }

    /// Map a model-space center/size box to clipped source corners.
    pub fn unmap(&self, cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
        let max_x = self.source_width as f32;
        let max_y = self.source_height as f32;
        let x1 = ((cx - w / 2.0 - self.pad_x) / self.scale).clamp(0.0, max_x);
        let y1 = ((cy - h / 2.0 - self.pad_y) / self.scale).clamp(0.0, max_y);
        let x2 = ((cx + w / 2.0 - self.pad_x) / self.scale).clamp(0.0, max_x);
        let y2 = ((cy + h / 2.0 - self.pad_y) / self.scale).clamp(0.0, max_y);
        (x1, y1, x2, y2)
    }
}

/// Scale `image` into a `size` × `size` square, centered on a gray fill.
pub fn letterbox(image: &DynamicImage, size: u32) -> (RgbImage, Letterbox) {
    let geometry = Letterbox::new(image.width(), image.height(), size);
    let scaled_w = ((image.width() as f32 * geometry.scale).round() as u32).clamp(1, size);
    let scaled_h = ((image.height() as f32 * geometry.scale).round() as u32).clamp(1, size);

    let resized = image::imageops::resize(&image.to_rgb8(), scaled_w, scaled_h, FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(size, size, Rgb([LETTERBOX_FILL; 3]));
    image::imageops::replace(&mut canvas, &resized, geometry.pad_x as i64, geometry.pad_y as i64);

    (canvas, geometry)
}

/// Convert an RGB image into a `[1, 3, H, W]` tensor scaled to `[0, 1]`.
pub fn to_input_tensor(image: &RgbImage) -> NdTensor<f32, 4> {
    let (width, height) = image.dimensions();
    let plane = (width * height) as usize;
    let mut data = vec![0.0f32; 3 * plane];

    for (x, y, pixel) in image.enumerate_pixels() {
        let offset = (y * width + x) as usize;
        for channel in 0..3 {
            data[channel * plane + offset] = pixel[channel] as f32 / 255.0;
        }
    }

    NdTensor::from_data([1, 3, height as usize, width as usize], data)
}

/// Decode a raw `[1, a, b]` output into candidate detections above
/// `conf_threshold`, in source-image coordinates.
pub fn decode_predictions(
    shape: &[usize],
    data: &[f32],
    geometry: &Letterbox,
    conf_threshold: f32,
) -> Result<Vec<Detection>, DetectError> {
    let &[batch, dim_a, dim_b] = shape else {
        return Err(DetectError::UnexpectedOutput(shape.to_vec()));
    };
    if batch != 1 || data.len() != dim_a * dim_b {
        return Err(DetectError::UnexpectedOutput(shape.to_vec()));
    }

    // Predictions outnumber attributes in every real export
    let rows_layout = dim_a >= dim_b;
    let (count, attrs) = if rows_layout { (dim_a, dim_b) } else { (dim_b, dim_a) };
    let min_attrs = if rows_layout { 6 } else { 5 };
    if attrs < min_attrs {
        return Err(DetectError::UnexpectedOutput(shape.to_vec()));
    }

    let at = |pred: usize, attr: usize| -> f32 {
        if rows_layout {
            data[pred * attrs + attr]
        } else {
            data[attr * count + pred]
        }
    };

    let mut detections = Vec::new();
    for pred in 0..count {
        let (objectness, class_start) = if rows_layout { (at(pred, 4), 5) } else { (1.0, 4) };
        if objectness < conf_threshold {
            continue;
        }

        let (class_id, class_score) = (class_start..attrs)
            .map(|attr| (attr - class_start, at(pred, attr)))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        let score = objectness * class_score;
        if score < conf_threshold {
            continue;
        }

        let (x1, y1, x2, y2) = geometry.unmap(at(pred, 0), at(pred, 1), at(pred, 2), at(pred, 3));
        let bbox = BoundingBox::from_corners(x1, y1, x2, y2);
        if bbox.is_empty() {
            continue;
        }

        detections.push(Detection { bbox, score, class_id });
    }

    Ok(detections)
}

/// Intersection over union of two boxes.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let left = a.left.max(b.left);
    let top = a.top.max(b.top);
    let right = a.right.min(b.right);
    let bottom = a.bottom.min(b.bottom);

    let inter = BoundingBox { left, top, right, bottom }.area() as f32;
    let union = (a.area() + b.area()) as f32 - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

/// Class-aware non-maximum suppression. Output is sorted by descending score.
pub fn non_max_suppression(
    mut detections: Vec<Detection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in detections {
        if keep.len() >= max_detections {
            break;
        }
        let suppressed = keep.iter().any(|kept| {
            kept.class_id == candidate.class_id && iou(&kept.bbox, &candidate.bbox) > iou_threshold
        });
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}

/// Detector backed by a YOLO model in `.rten` format.
pub struct YoloDetector {
    model: Model,
    params: YoloParams,
}

impl YoloDetector {
    /// Load the weights for `model_id` from the standard search locations.
    pub fn load(model_id: &str) -> Result<Self, DetectError> {
        let path = weights::resolve_model_path(model_id, &weights::search_dirs())?;
        Self::load_file(&path)
    }

    pub fn load_file(path: &Path) -> Result<Self, DetectError> {
        debug!("loading detection model from {}", path.display());
        let model = Model::load_file(path).map_err(|e| DetectError::ModelLoad {
            path: path.to_path_buf(),
            reason: e.to_string().trim_end().to_string(),
        })?;
        Ok(Self {
            model,
            params: YoloParams::default(),
        })
    }
}

impl Detector for YoloDetector {
    fn detect(&self, image: &DynamicImage, min_score: f32) -> Result<Vec<Detection>, DetectError> {
        let (input_image, geometry) = letterbox(image, self.params.input_size);
        let input = to_input_tensor(&input_image);

        let output = self
            .model
            .run_one(input.view().into(), None)
            .map_err(|e| DetectError::Inference(e.to_string()))?;
        let output = NdTensor::<f32, 3>::try_from(output).map_err(|e| DetectError::Inference(e.to_string()))?;

        let shape = output.shape().to_vec();
        let data = output.to_vec();
        let candidates = decode_predictions(&shape, &data, &geometry, min_score)?;
        debug!("{} candidates above {:.2}", candidates.len(), min_score);

        Ok(non_max_suppression(
            candidates,
            self.params.iou_threshold,
            self.params.max_detections,
        ))
    }
}
