//! De-duplication and ranking of raw detections.
//!
//! Greedy non-maximum suppression: walk candidates strongest first and
//! keep one only if it does not overlap any kept box by more than the
//! IoU threshold. Sorting is stable, so equal confidences keep input order.

use crate::types::{Bounds, Detection};
use std::cmp::Ordering;

/// Overlap above which two boxes are treated as the same face.
pub const IOU_THRESHOLD: f64 = 0.5;

/// Intersection over union of two boxes. 0 when either is empty.
pub fn iou(a: &Bounds, b: &Bounds) -> f64 {
    let inter = a.intersection_area(b);
    let union = a.area() + b.area() - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

/// Greedy NMS over `candidates`, strongest first.
pub fn deduplicate(mut candidates: Vec<Detection>, threshold: f64) -> Vec<Detection> {
    candidates.sort_by(strongest_first);
    let mut kept: Vec<Detection> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if kept
            .iter()
            .all(|k| iou(&k.bounds, &candidate.bounds) <= threshold)
        {
            kept.push(candidate);
        }
    }
    kept
}

/// Drop detections below `min_confidence`.
pub fn filter_by_confidence(mut detections: Vec<Detection>, min_confidence: f64) -> Vec<Detection> {
    detections.retain(|d| d.confidence >= min_confidence);
    detections
}

/// Sort strongest first and keep at most `max_faces`.
pub fn truncate_to_strongest(mut detections: Vec<Detection>, max_faces: usize) -> Vec<Detection> {
    detections.sort_by(strongest_first);
    detections.truncate(max_faces);
    detections
}

fn strongest_first(a: &Detection, b: &Detection) -> Ordering {
    b.confidence.total_cmp(&a.confidence)
}
