//! Range-fan construction: a circular ring sector bounded by an inner
//! and outer radius and a horizontal bearing span.
//!
//! Bearings are compass bearings (0 = north, clockwise). They are mapped
//! to Cartesian angles with `(450 - bearing) % 360`, so a fan spanning
//! 0..90 opens towards the north-east quadrant of the map.

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Point, Polygon, Ring, SpatialReference};

/// Maximum number of segments a single arc is tessellated into.
pub const MAX_ARC_SEGMENTS: f64 = 360.0;

/// Observer buffer radius as a fraction of the outer radius.
const OBSERVER_BUFFER_RATIO: f64 = 0.01;
/// Target chord length of the observer buffer, as a fraction of the
/// outer radius.
const OBSERVER_BUFFER_CHORD_RATIO: f64 = 0.002;

/// Slack when counting arc steps so that `delta / step` landing a hair
/// under an integer still reaches the final bearing.
const STEP_COUNT_EPSILON: f64 = 1e-9;

fn default_end_bearing() -> f64 {
    360.0
}

fn default_angle_step() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeFanSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Point>,
    #[serde(default)]
    pub inner_radius: f64,
    pub outer_radius: f64,
    #[serde(default)]
    pub start_bearing: f64,
    #[serde(default = "default_end_bearing")]
    pub end_bearing: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_reference: Option<SpatialReference>,
    #[serde(default = "default_angle_step")]
    pub angle_step: f64,
    /// Add a small ring around the center when the inner radius is
    /// masked out, so the observer stays inside the polygon.
    #[serde(default)]
    pub include_observer_buffer: bool,
}

impl RangeFanSpec {
    pub fn new(
        center: Point,
        inner_radius: f64,
        outer_radius: f64,
        start_bearing: f64,
        end_bearing: f64,
        spatial_reference: SpatialReference,
    ) -> Self {
        Self {
            center: Some(center),
            inner_radius,
            outer_radius,
            start_bearing,
            end_bearing,
            spatial_reference: Some(spatial_reference),
            angle_step: default_angle_step(),
            include_observer_buffer: false,
        }
    }

    pub fn with_angle_step(mut self, step: f64) -> Self {
        self.angle_step = step;
        self
    }

    pub fn with_observer_buffer(mut self, include: bool) -> Self {
        self.include_observer_buffer = include;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RangeFanError {
    #[error("range fan has no center point")]
    MissingCenter,
    #[error("range fan has no spatial reference")]
    MissingSpatialReference,
    #[error("{which} is not a finite number")]
    NonFinite { which: &'static str },
    #[error("{which} radius must be non-negative, got {value}")]
    NegativeRadius { which: &'static str, value: f64 },
    #[error("inner radius {inner} exceeds outer radius {outer}")]
    InnerExceedsOuter { inner: f64, outer: f64 },
    #[error("{which} bearing {value} is outside [0, 360]")]
    BearingOutOfRange { which: &'static str, value: f64 },
}

fn validate(spec: &RangeFanSpec) -> Result<(Point, SpatialReference), RangeFanError> {
    let center = spec.center.ok_or(RangeFanError::MissingCenter)?;
    let sr = spec
        .spatial_reference
        .ok_or(RangeFanError::MissingSpatialReference)?;

    for (which, v) in [
        ("center x", center.x),
        ("center y", center.y),
        ("inner radius", spec.inner_radius),
        ("outer radius", spec.outer_radius),
        ("start bearing", spec.start_bearing),
        ("end bearing", spec.end_bearing),
    ] {
        if !v.is_finite() {
            return Err(RangeFanError::NonFinite { which });
        }
    }

    if spec.inner_radius < 0.0 {
        return Err(RangeFanError::NegativeRadius {
            which: "inner",
            value: spec.inner_radius,
        });
    }
    if spec.outer_radius < 0.0 {
        return Err(RangeFanError::NegativeRadius {
            which: "outer",
            value: spec.outer_radius,
        });
    }
    if spec.inner_radius > spec.outer_radius {
        return Err(RangeFanError::InnerExceedsOuter {
            inner: spec.inner_radius,
            outer: spec.outer_radius,
        });
    }
    for (which, value) in [("start", spec.start_bearing), ("end", spec.end_bearing)] {
        if !(0.0..=360.0).contains(&value) {
            return Err(RangeFanError::BearingOutOfRange { which, value });
        }
    }
    Ok((center, sr))
}

/// Point at `radius` from (cx, cy) along a compass bearing.
pub fn point_at_bearing(cx: f64, cy: f64, radius: f64, bearing: f64) -> (f64, f64) {
    let cartesian = (450.0 - bearing) % 360.0;
    let rad = cartesian.to_radians();
    (cx + radius * rad.cos(), cy + radius * rad.sin())
}

/// Step actually used for an arc spanning `delta` degrees.
/// Widened to `delta / MAX_ARC_SEGMENTS` when the requested step is
/// unusable or would emit too many vertices.
fn effective_step(delta: f64, requested: f64) -> f64 {
    if requested.is_finite() && requested > 0.0 && delta / requested <= MAX_ARC_SEGMENTS {
        return requested;
    }
    let widened = delta / MAX_ARC_SEGMENTS;
    debug!("range fan: angle step {requested} widened to {widened} for a {delta} degree arc");
    widened
}

/// Bearings from `from` towards `to` in increments of `step`, never
/// overshooting `to`. Computed by index so rounding does not accumulate.
fn arc_bearings(from: f64, to: f64, step: f64) -> impl Iterator<Item = f64> {
    let span = (to - from).abs();
    let dir = if to >= from { 1.0 } else { -1.0 };
    let steps = span / step + STEP_COUNT_EPSILON;
    let count = if steps.is_finite() {
        steps.floor().min(MAX_ARC_SEGMENTS) as usize
    } else {
        MAX_ARC_SEGMENTS as usize
    };
    (0..=count).map(move |i| from + dir * i as f64 * step)
}

fn circle_ring(cx: f64, cy: f64, radius: f64, step: f64, clockwise: bool) -> Ring {
    let (from, to) = if clockwise { (0.0, 360.0) } else { (360.0, 0.0) };
    let mut vertices: Vec<(f64, f64)> = arc_bearings(from, to, step)
        .map(|b| point_at_bearing(cx, cy, radius, b))
        .collect();
    close_ring(&mut vertices);
    Ring::new(vertices)
}

fn close_ring(vertices: &mut Vec<(f64, f64)>) {
    if let Some(&first) = vertices.first() {
        if vertices.last() != Some(&first) || vertices.len() == 1 {
            vertices.push(first);
        }
    }
}

fn observer_buffer_ring(cx: f64, cy: f64, outer_radius: f64) -> Ring {
    let radius = outer_radius * OBSERVER_BUFFER_RATIO;
    // circumference / chord, with both scaled by the outer radius
    let segments = (std::f64::consts::TAU * OBSERVER_BUFFER_RATIO / OBSERVER_BUFFER_CHORD_RATIO)
        .ceil()
        .clamp(8.0, MAX_ARC_SEGMENTS);
    circle_ring(cx, cy, radius, 360.0 / segments, true)
}

/// Build the range-fan polygon described by `spec`.
///
/// A zero or full-turn span yields a circle (outer ring clockwise, plus
/// a counterclockwise hole when the inner radius is positive). Anything
/// else yields a single closed sector ring: apex or outer arc first,
/// then the inner arc in reverse.
pub fn build_range_fan(spec: &RangeFanSpec) -> Result<Polygon, RangeFanError> {
    let (center, sr) = validate(spec)?;
    let (cx, cy) = (center.x, center.y);
    let inner = spec.inner_radius;
    let outer = spec.outer_radius;

    // A span crossing north (e.g. 270 -> 90) runs from a negative bearing.
    let mut start = spec.start_bearing;
    let end = spec.end_bearing;
    if start > end {
        start -= 360.0;
    }
    let delta = (start - end).abs();

    let mut rings = Vec::with_capacity(3);

    if delta == 0.0 || delta >= 360.0 {
        let step = effective_step(360.0, spec.angle_step);
        rings.push(circle_ring(cx, cy, outer, step, true));
        if inner > 0.0 {
            rings.push(circle_ring(cx, cy, inner, step, false));
        }
    } else {
        let step = effective_step(delta, spec.angle_step);
        let min_angle = start.min(end);
        let max_angle = start.max(end);

        let mut vertices: Vec<(f64, f64)> = Vec::new();
        if inner == 0.0 {
            vertices.push((cx, cy));
        }
        vertices.extend(arc_bearings(min_angle, max_angle, step).map(|b| point_at_bearing(cx, cy, outer, b)));
        if inner > 0.0 {
            vertices.extend(arc_bearings(max_angle, min_angle, step).map(|b| point_at_bearing(cx, cy, inner, b)));
        }
        let first = vertices[0];
        vertices.push(first);
        rings.push(Ring::new(vertices));
    }

    if spec.include_observer_buffer && inner > 0.0 {
        rings.push(observer_buffer_ring(cx, cy, outer));
    }

    Ok(Polygon {
        rings,
        spatial_reference: sr,
    })
}
