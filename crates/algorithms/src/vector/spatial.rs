//! Spatial overlay: union, dissolve, selection

use crate::maybe_rayon::*;
use geo::{BooleanOps, BoundingRect, Geometry, Intersects, MultiPolygon, Polygon, Rect};

/// Union many multipolygons into one.
///
/// Inputs are merged pairwise in a fixed balanced tree, so the result does
/// not depend on thread scheduling. Each level of the tree runs in
/// parallel when the `parallel` feature is on.
pub fn union_all(mut parts: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    parts.retain(|p| !p.0.is_empty());

    while parts.len() > 1 {
        let pairs = parts.len() / 2;
        let odd = (parts.len() % 2 == 1).then(|| parts.pop()).flatten();

        let merged: Vec<MultiPolygon<f64>> = (0..pairs)
            .into_par_iter()
            .map(|i| parts[2 * i].union(&parts[2 * i + 1]))
            .collect();

        parts = merged;
        parts.extend(odd);
    }

    parts.pop().unwrap_or_else(|| MultiPolygon::new(vec![]))
}

/// Dissolve polygons into a single (possibly multipart) region with no
/// internal seams.
pub fn dissolve(polygons: &[Polygon<f64>]) -> MultiPolygon<f64> {
    union_all(
        polygons
            .iter()
            .map(|p| MultiPolygon::new(vec![p.clone()]))
            .collect(),
    )
}

/// Keep the candidates that intersect the reference geometry.
///
/// Order of the survivors follows the input.
pub fn select_by_intersection(candidates: &[Polygon<f64>], reference: &Geometry<f64>) -> Vec<Polygon<f64>> {
    let Some(extent) = reference.bounding_rect() else {
        return Vec::new();
    };

    candidates
        .iter()
        .filter(|p| p.bounding_rect().is_some_and(|b| rects_overlap(&b, &extent)))
        .filter(|p| p.intersects(reference))
        .cloned()
        .collect()
}

fn rects_overlap(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x && a.max().x >= b.min().x && a.min().y <= b.max().y && a.max().y >= b.min().y
}
