// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Geometry helpers over canonical rows.
//!
//! Segments are parent/child point pairs; segment surface and volume treat
//! the pair as a truncated cone.

use crate::dataformat::Row;

/// Squared euclidean distance between two points.
pub fn point_dist2(p1: [f64; 3], p2: [f64; 3]) -> f64 {
    let dx = p1[0] - p2[0];
    let dy = p1[1] - p2[1];
    let dz = p1[2] - p2[2];
    dx * dx + dy * dy + dz * dz
}

/// Euclidean distance between two points.
pub fn point_dist(p1: [f64; 3], p2: [f64; 3]) -> f64 {
    point_dist2(p1, p2).sqrt()
}

/// Length of a segment.
pub fn segment_length(p0: &Row, p1: &Row) -> f64 {
    point_dist(p0.xyz(), p1.xyz())
}

/// Lateral surface area of a segment, treated as a truncated cone
/// (end caps excluded).
pub fn segment_area(p0: &Row, p1: &Row) -> f64 {
    let r0 = p0.r;
    let r1 = p1.r;
    let h2 = point_dist2(p0.xyz(), p1.xyz());
    std::f64::consts::PI * (r0 + r1) * ((r0 - r1) * (r0 - r1) + h2).sqrt()
}

/// Volume of a segment, treated as a truncated cone.
pub fn segment_volume(p0: &Row, p1: &Row) -> f64 {
    let r0 = p0.r;
    let r1 = p1.r;
    let h = point_dist(p0.xyz(), p1.xyz());
    std::f64::consts::PI * h * (r0 * r0 + r0 * r1 + r1 * r1) / 3.0
}

/// Average distance between a point and a collection of points.
pub fn average_points_dist(center: [f64; 3], points: &[Row]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let total: f64 = points.iter().map(|p| point_dist(center, p.xyz())).sum();
    total / points.len() as f64
}

/// Path length along an ordered chain of points.
pub fn path_distance(points: &[Row]) -> f64 {
    points
        .windows(2)
        .map(|w| segment_length(&w[0], &w[1]))
        .sum()
}

/// Centroid of a collection of points.
pub fn centroid(points: &[Row]) -> [f64; 3] {
    if points.is_empty() {
        return [0.0, 0.0, 0.0];
    }
    let n = points.len() as f64;
    let mut c = [0.0, 0.0, 0.0];
    for p in points {
        c[0] += p.x;
        c[1] += p.y;
        c[2] += p.z;
    }
    [c[0] / n, c[1] / n, c[2] / n]
}
