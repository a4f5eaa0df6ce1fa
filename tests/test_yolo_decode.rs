use image::{DynamicImage, Rgb, RgbImage};
use promopost::detection::yolo::{
    Letterbox, decode_predictions, iou, letterbox, non_max_suppression, to_input_tensor,
};
use promopost::{BoundingBox, DetectError, Detection};
use rten_tensor::prelude::*;

const CLASSES: usize = 2;
const PREDICTIONS: usize = 8;

/// One prediction: cx, cy, w, h, objectness, class scores.
type Pred = [f32; 5 + CLASSES];

fn rows_output(preds: &[Pred]) -> (Vec<usize>, Vec<f32>) {
    let mut data = vec![0.0; PREDICTIONS * (5 + CLASSES)];
    for (i, pred) in preds.iter().enumerate() {
        data[i * (5 + CLASSES)..(i + 1) * (5 + CLASSES)].copy_from_slice(pred);
    }
    (vec![1, PREDICTIONS, 5 + CLASSES], data)
}

/// Same predictions in the transposed layout, with objectness folded into
/// the class scores.
fn channels_output(preds: &[Pred]) -> (Vec<usize>, Vec<f32>) {
    let attrs = 4 + CLASSES;
    let mut data = vec![0.0; attrs * PREDICTIONS];
    for (i, pred) in preds.iter().enumerate() {
        for attr in 0..4 {
            data[attr * PREDICTIONS + i] = pred[attr];
        }
        for class in 0..CLASSES {
            data[(4 + class) * PREDICTIONS + i] = pred[4] * pred[5 + class];
        }
    }
    (vec![1, attrs, PREDICTIONS], data)
}

fn identity() -> Letterbox {
    Letterbox::new(640, 640, 640)
}

#[test]
fn decodes_rows_layout() {
    let (shape, data) = rows_output(&[
        [100.0, 100.0, 50.0, 40.0, 0.9, 0.1, 0.8],
        [300.0, 300.0, 20.0, 20.0, 0.3, 0.9, 0.0],
    ]);

    let detections = decode_predictions(&shape, &data, &identity(), 0.5).unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].bbox, BoundingBox::new(75, 80, 125, 120));
    assert_eq!(detections[0].class_id, 1);
    assert!((detections[0].score - 0.72).abs() < 1e-6);
}

#[test]
fn channels_layout_decodes_to_same_boxes() {
    let preds = [
        [100.0, 100.0, 50.0, 40.0, 0.9, 0.1, 0.8],
        [400.0, 200.0, 80.0, 60.0, 1.0, 0.7, 0.2],
        [300.0, 300.0, 20.0, 20.0, 0.3, 0.9, 0.0],
    ];
    let (rows_shape, rows_data) = rows_output(&preds);
    let (chan_shape, chan_data) = channels_output(&preds);

    let rows = decode_predictions(&rows_shape, &rows_data, &identity(), 0.5).unwrap();
    let chans = decode_predictions(&chan_shape, &chan_data, &identity(), 0.5).unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows.len(), chans.len());
    for (a, b) in rows.iter().zip(&chans) {
        assert_eq!(a.bbox, b.bbox);
        assert_eq!(a.class_id, b.class_id);
        assert!((a.score - b.score).abs() < 1e-6);
    }
}

#[test]
fn boxes_are_clipped_to_source() {
    let (shape, data) = rows_output(&[[10.0, 630.0, 60.0, 40.0, 1.0, 1.0, 0.0]]);
    let detections = decode_predictions(&shape, &data, &identity(), 0.5).unwrap();
    assert_eq!(detections[0].bbox, BoundingBox::new(0, 610, 40, 640));
    assert!(detections[0].bbox.fits_within(640, 640));
}

#[test]
fn letterbox_padding_is_removed() {
    // 1280x640 → scale 0.5, 640x320 centered with 160 rows of padding above
    let geometry = Letterbox::new(1280, 640, 640);
    assert_eq!(geometry.scale, 0.5);
    assert_eq!((geometry.pad_x, geometry.pad_y), (0.0, 160.0));

    let (x1, y1, x2, y2) = geometry.unmap(320.0, 320.0, 100.0, 50.0);
    assert_eq!((x1, y1, x2, y2), (540.0, 270.0, 740.0, 370.0));
}

#[test]
fn letterbox_centers_scaled_image_on_gray() {
    let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 100, Rgb([255, 0, 0])));
    let (canvas, geometry) = letterbox(&source, 64);

    assert_eq!(canvas.dimensions(), (64, 64));
    assert_eq!(geometry.pad_y, 16.0);
    assert_eq!(*canvas.get_pixel(0, 0), Rgb([114, 114, 114]));
    assert_eq!(*canvas.get_pixel(32, 63), Rgb([114, 114, 114]));
    assert_eq!(*canvas.get_pixel(32, 32), Rgb([255, 0, 0]));
}

#[test]
fn input_tensor_is_planar_and_normalized() {
    let image = RgbImage::from_pixel(4, 2, Rgb([255, 0, 51]));
    let tensor = to_input_tensor(&image);

    assert_eq!(tensor.shape(), [1, 3, 2, 4]);
    let data = tensor.to_vec();
    assert!(data[0..8].iter().all(|&v| v == 1.0));
    assert!(data[8..16].iter().all(|&v| v == 0.0));
    assert!(data[16..24].iter().all(|&v| (v - 0.2).abs() < 1e-6));
}

#[test]
fn rejects_unexpected_shapes() {
    let cases: Vec<(Vec<usize>, usize)> = vec![
        (vec![1, 3, 2], 6),
        (vec![2, 8, 7], 112),
        (vec![8, 7], 56),
        (vec![1, 8, 7], 10),
    ];
    for (shape, len) in cases {
        let data = vec![0.0; len];
        let err = decode_predictions(&shape, &data, &identity(), 0.5).unwrap_err();
        assert!(matches!(err, DetectError::UnexpectedOutput(_)), "shape {shape:?}");
    }
}

fn det(left: u32, top: u32, right: u32, bottom: u32, score: f32, class_id: usize) -> Detection {
    Detection { bbox: BoundingBox::new(left, top, right, bottom), score, class_id }
}

#[test]
fn iou_of_simple_boxes() {
    let a = BoundingBox::new(0, 0, 10, 10);
    assert_eq!(iou(&a, &a), 1.0);
    assert_eq!(iou(&a, &BoundingBox::new(20, 20, 30, 30)), 0.0);
    // 50 shared of 150 total
    assert!((iou(&a, &BoundingBox::new(5, 0, 15, 10)) - 1.0 / 3.0).abs() < 1e-6);
}

#[test]
fn nms_keeps_best_of_overlapping_same_class() {
    let kept = non_max_suppression(
        vec![det(0, 0, 100, 100, 0.6, 0), det(2, 2, 100, 100, 0.9, 0)],
        0.7,
        300,
    );
    assert_eq!(kept, vec![det(2, 2, 100, 100, 0.9, 0)]);
}

#[test]
fn nms_keeps_overlapping_boxes_of_different_classes() {
    let kept = non_max_suppression(
        vec![det(0, 0, 100, 100, 0.6, 0), det(2, 2, 100, 100, 0.9, 1)],
        0.7,
        300,
    );
    assert_eq!(kept.len(), 2);
    assert_eq!(kept[0].score, 0.9);
}

#[test]
fn nms_sorts_and_caps() {
    let kept = non_max_suppression(
        vec![
            det(0, 0, 10, 10, 0.5, 0),
            det(100, 100, 110, 110, 0.95, 0),
            det(200, 200, 210, 210, 0.7, 0),
        ],
        0.7,
        2,
    );
    let scores: Vec<f32> = kept.iter().map(|d| d.score).collect();
    assert_eq!(scores, vec![0.95, 0.7]);
}
