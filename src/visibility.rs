//! Line-of-sight (LLOS) and radial line-of-sight (RLOS) orchestration.
//!
//! Elevation sampling and sight-line tracing are supplied by the host
//! through [`ElevationSurface`] and [`LineOfSightTracer`]. This module
//! resolves observer/target heights, runs the observer x target loop and
//! tallies the results, or builds the per-observer range fans for RLOS.

use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::offset::{distance_to_map_units, offset_to_surface_z_units};
use crate::range_fan::{build_range_fan, RangeFanError, RangeFanSpec};
use crate::types::{Point, Point3, Polygon, SpatialReference};
use crate::units::{convert_angle, AngularUnit, DistanceUnit};

// -- Collaborators ---------------------------------------------------

/// An elevation surface the host can sample.
pub trait ElevationSurface: Sync {
    /// Elevation at (x, y) in Z units, NaN where the surface has no data.
    fn elevation(&self, x: f64, y: f64) -> f64;

    fn is_void(&self, z: f64) -> bool {
        z.is_nan()
    }

    fn z_factor(&self) -> f64 {
        1.0
    }

    /// Linear unit of the surface's coordinate system, if known.
    fn linear_unit(&self) -> Option<DistanceUnit>;

    fn spatial_reference(&self) -> Option<SpatialReference>;
}

/// Result of tracing one sight line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstruction: Option<Point3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<Vec<Point3>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invisible: Option<Vec<Point3>>,
    pub target_visible: bool,
}

pub trait LineOfSightTracer: Sync {
    fn trace(&self, surface: &dyn ElevationSurface, from: &Point3, to: &Point3) -> Trace;
}

// -- Errors ----------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VisibilityError {
    #[error("no observer points supplied")]
    NoObservers,
    #[error("no target points supplied")]
    NoTargets,
    #[error("{role} {index} has spatial reference {found} but the surface uses {expected}")]
    SpatialReferenceMismatch {
        role: &'static str,
        index: usize,
        expected: u32,
        found: u32,
    },
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error(transparent)]
    RangeFan(#[from] RangeFanError),
}

fn invalid(name: &'static str, reason: impl Into<String>) -> VisibilityError {
    VisibilityError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}

// -- Parameters ------------------------------------------------------

fn default_observer_offset() -> f64 {
    2.0
}

fn default_max_distance() -> f64 {
    1000.0
}

fn default_right_horizontal_fov() -> f64 {
    360.0
}

fn default_bottom_vertical_fov() -> f64 {
    -90.0
}

fn default_top_vertical_fov() -> f64 {
    90.0
}

fn default_angle_step() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlosParams {
    #[serde(default = "default_observer_offset")]
    pub observer_offset: f64,
    #[serde(default)]
    pub target_offset: f64,
    #[serde(default)]
    pub offset_unit: DistanceUnit,
}

impl Default for LlosParams {
    fn default() -> Self {
        Self {
            observer_offset: default_observer_offset(),
            target_offset: 0.0,
            offset_unit: DistanceUnit::Meters,
        }
    }
}

impl LlosParams {
    pub fn validate(&self) -> Result<(), VisibilityError> {
        require_finite("observer_offset", self.observer_offset)?;
        require_finite("target_offset", self.target_offset)?;
        Ok(())
    }
}

/// RLOS inputs. Distances are in `distance_unit`, fields of view in
/// `angular_unit`; horizontal FOV is a bearing span from left to right.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RlosParams {
    #[serde(default = "default_observer_offset")]
    pub observer_offset: f64,
    #[serde(default)]
    pub surface_offset: f64,
    #[serde(default)]
    pub offset_unit: DistanceUnit,
    #[serde(default)]
    pub min_distance: f64,
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,
    #[serde(default)]
    pub distance_unit: DistanceUnit,
    #[serde(default)]
    pub left_horizontal_fov: f64,
    #[serde(default = "default_right_horizontal_fov")]
    pub right_horizontal_fov: f64,
    #[serde(default = "default_bottom_vertical_fov")]
    pub bottom_vertical_fov: f64,
    #[serde(default = "default_top_vertical_fov")]
    pub top_vertical_fov: f64,
    #[serde(default)]
    pub angular_unit: AngularUnit,
    #[serde(default = "default_angle_step")]
    pub angle_step: f64,
    #[serde(default)]
    pub include_observer_buffer: bool,
}

impl Default for RlosParams {
    fn default() -> Self {
        Self {
            observer_offset: default_observer_offset(),
            surface_offset: 0.0,
            offset_unit: DistanceUnit::Meters,
            min_distance: 0.0,
            max_distance: default_max_distance(),
            distance_unit: DistanceUnit::Meters,
            left_horizontal_fov: 0.0,
            right_horizontal_fov: default_right_horizontal_fov(),
            bottom_vertical_fov: default_bottom_vertical_fov(),
            top_vertical_fov: default_top_vertical_fov(),
            angular_unit: AngularUnit::Degrees,
            angle_step: default_angle_step(),
            include_observer_buffer: false,
        }
    }
}

/// Fields of view in degrees, rounded for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldOfView {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

impl RlosParams {
    /// Check every parameter and return the fields of view in degrees.
    pub fn validate(&self) -> Result<FieldOfView, VisibilityError> {
        require_finite("observer_offset", self.observer_offset)?;
        require_finite("surface_offset", self.surface_offset)?;
        require_finite("min_distance", self.min_distance)?;
        require_finite("max_distance", self.max_distance)?;
        if self.min_distance < 0.0 {
            return Err(invalid("min_distance", "must be non-negative"));
        }
        if self.max_distance < 0.0 {
            return Err(invalid("max_distance", "must be non-negative"));
        }
        if self.min_distance > self.max_distance {
            return Err(invalid(
                "min_distance",
                format!("{} exceeds max_distance {}", self.min_distance, self.max_distance),
            ));
        }

        let to_degrees = |name: &'static str, v: f64| -> Result<f64, VisibilityError> {
            require_finite(name, v)?;
            Ok(round_display_angle(convert_angle(
                self.angular_unit,
                AngularUnit::Degrees,
                v,
            )))
        };
        let fov = FieldOfView {
            left: to_degrees("left_horizontal_fov", self.left_horizontal_fov)?,
            right: to_degrees("right_horizontal_fov", self.right_horizontal_fov)?,
            bottom: to_degrees("bottom_vertical_fov", self.bottom_vertical_fov)?,
            top: to_degrees("top_vertical_fov", self.top_vertical_fov)?,
        };
        require_range("left_horizontal_fov", fov.left, 0.0, 360.0)?;
        require_range("right_horizontal_fov", fov.right, 0.0, 360.0)?;
        require_range("bottom_vertical_fov", fov.bottom, -90.0, 0.0)?;
        require_range("top_vertical_fov", fov.top, 0.0, 90.0)?;
        Ok(fov)
    }
}

fn require_finite(name: &'static str, v: f64) -> Result<(), VisibilityError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(invalid(name, "must be a finite number"))
    }
}

fn require_range(name: &'static str, v: f64, lo: f64, hi: f64) -> Result<(), VisibilityError> {
    if (lo..=hi).contains(&v) {
        Ok(())
    } else {
        Err(invalid(name, format!("{v} degrees is outside [{lo}, {hi}]")))
    }
}

/// Round an angle to one decimal place, ties to even.
pub fn round_display_angle(degrees: f64) -> f64 {
    (degrees * 10.0).round_ties_even() / 10.0
}

// -- Point resolution ------------------------------------------------

/// Points with a usable elevation, keyed by input index, plus the
/// indices of points that fell on void cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolved {
    pub points: Vec<(usize, Point3)>,
    pub void: Vec<usize>,
}

pub fn resolve_points<S: ElevationSurface + ?Sized>(
    points: &[Point],
    surface: &S,
    offset_in_z_units: f64,
) -> Resolved {
    let mut out = Resolved::default();
    for (i, p) in points.iter().enumerate() {
        let z = surface.elevation(p.x, p.y);
        if surface.is_void(z) || !z.is_finite() {
            out.void.push(i);
            continue;
        }
        out.points.push((i, Point3::new(p.x, p.y, z + offset_in_z_units)));
    }
    out
}

fn check_spatial_references<S: ElevationSurface + ?Sized>(
    role: &'static str,
    points: &[Point],
    surface: &S,
) -> Result<(), VisibilityError> {
    let Some(expected) = surface.spatial_reference() else {
        return Ok(());
    };
    for (index, p) in points.iter().enumerate() {
        if let Some(found) = p.spatial_reference {
            if found != expected {
                return Err(VisibilityError::SpatialReferenceMismatch {
                    role,
                    index,
                    expected: expected.wkid,
                    found: found.wkid,
                });
            }
        }
    }
    Ok(())
}

// -- LLOS ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SightLine {
    pub observer: usize,
    pub target: usize,
    pub from: Point3,
    pub to: Point3,
    /// Planar length of the sight line in map units.
    pub length: f64,
    pub trace: Trace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlosReport {
    /// Offsets actually applied, in surface Z units.
    pub observer_z_offset: f64,
    pub target_z_offset: f64,
    /// Sorted by (observer, target).
    pub sight_lines: Vec<SightLine>,
    /// Number of observers that see each target, by target input index.
    pub target_observer_counts: Vec<usize>,
    /// Whether each observer sees at least one target, by observer input index.
    pub observer_sees_target: Vec<bool>,
    /// Longest planar sight line, in map units.
    pub longest_sight_line: f64,
    pub skipped_observers: Vec<usize>,
    pub skipped_targets: Vec<usize>,
}

/// Trace every observer against every target and tally the outcome.
///
/// Points on void cells are skipped and listed in the report; they never
/// fail the run. One trace call is made per resolved observer/target pair.
pub fn run_llos<S: ElevationSurface, T: LineOfSightTracer>(
    observers: &[Point],
    targets: &[Point],
    surface: &S,
    tracer: &T,
    params: &LlosParams,
) -> Result<LlosReport, VisibilityError> {
    if observers.is_empty() {
        return Err(VisibilityError::NoObservers);
    }
    if targets.is_empty() {
        return Err(VisibilityError::NoTargets);
    }
    params.validate()?;
    check_spatial_references("observer", observers, surface)?;
    check_spatial_references("target", targets, surface)?;

    let z_factor = surface.z_factor();
    let unit = surface.linear_unit();
    let observer_z_offset = offset_to_surface_z_units(params.observer_offset, params.offset_unit, z_factor, unit);
    let target_z_offset = offset_to_surface_z_units(params.target_offset, params.offset_unit, z_factor, unit);

    let resolved_obs = resolve_points(observers, surface, observer_z_offset);
    let resolved_tgt = resolve_points(targets, surface, target_z_offset);
    if !resolved_obs.void.is_empty() {
        warn!("llos: {} observer(s) outside the surface were skipped", resolved_obs.void.len());
    }
    if !resolved_tgt.void.is_empty() {
        warn!("llos: {} target(s) outside the surface were skipped", resolved_tgt.void.len());
    }
    debug!(
        "llos: tracing {} observers x {} targets",
        resolved_obs.points.len(),
        resolved_tgt.points.len()
    );

    let num_observers = observers.len();
    let num_targets = targets.len();

    struct ThreadAccum {
        target_counts: Vec<usize>,
        observer_sees: Vec<bool>,
        lines: Vec<SightLine>,
        longest: f64,
    }

    let make_accum = || ThreadAccum {
        target_counts: vec![0; num_targets],
        observer_sees: vec![false; num_observers],
        lines: Vec::new(),
        longest: 0.0,
    };

    let merged = resolved_obs
        .points
        .par_iter()
        .fold(make_accum, |mut acc, &(oi, from)| {
            for &(ti, to) in &resolved_tgt.points {
                let trace = tracer.trace(surface, &from, &to);
                if trace.target_visible {
                    acc.target_counts[ti] += 1;
                    acc.observer_sees[oi] = true;
                }
                let length = (to.x - from.x).hypot(to.y - from.y);
                acc.longest = acc.longest.max(length);
                acc.lines.push(SightLine {
                    observer: oi,
                    target: ti,
                    from,
                    to,
                    length,
                    trace,
                });
            }
            acc
        })
        .reduce(make_accum, |mut a, b| {
            for (count, extra) in a.target_counts.iter_mut().zip(&b.target_counts) {
                *count += extra;
            }
            for (seen, other) in a.observer_sees.iter_mut().zip(&b.observer_sees) {
                *seen |= *other;
            }
            a.lines.extend(b.lines);
            a.longest = a.longest.max(b.longest);
            a
        });

    let mut sight_lines = merged.lines;
    sight_lines.sort_by_key(|l| (l.observer, l.target));

    Ok(LlosReport {
        observer_z_offset,
        target_z_offset,
        sight_lines,
        target_observer_counts: merged.target_counts,
        observer_sees_target: merged.observer_sees,
        longest_sight_line: merged.longest,
        skipped_observers: resolved_obs.void,
        skipped_targets: resolved_tgt.void,
    })
}

// -- RLOS ------------------------------------------------------------

/// Per-observer RLOS values, ready to be written to an output layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RlosObserver {
    pub index: usize,
    pub location: Point3,
    /// Observer and surface offsets in surface Z units.
    pub observer_offset: f64,
    pub surface_offset: f64,
    /// Inner and outer radii in map units.
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub azimuth1: f64,
    pub azimuth2: f64,
    pub vert1: f64,
    pub vert2: f64,
    pub range_fan: Polygon,
    pub max_range_mask: Polygon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RlosReport {
    pub field_of_view: FieldOfView,
    pub observers: Vec<RlosObserver>,
    pub skipped_observers: Vec<usize>,
}

/// Build the RLOS range fan and max-range mask for each observer.
pub fn run_rlos<S: ElevationSurface>(
    observers: &[Point],
    surface: &S,
    params: &RlosParams,
) -> Result<RlosReport, VisibilityError> {
    if observers.is_empty() {
        return Err(VisibilityError::NoObservers);
    }
    let fov = params.validate()?;
    check_spatial_references("observer", observers, surface)?;

    let z_factor = surface.z_factor();
    let unit = surface.linear_unit();
    let observer_offset = offset_to_surface_z_units(params.observer_offset, params.offset_unit, z_factor, unit);
    let surface_offset = offset_to_surface_z_units(params.surface_offset, params.offset_unit, z_factor, unit);
    let inner_radius = distance_to_map_units(params.min_distance, params.distance_unit, unit);
    let outer_radius = distance_to_map_units(params.max_distance, params.distance_unit, unit);

    let resolved = resolve_points(observers, surface, observer_offset);
    if !resolved.void.is_empty() {
        warn!("rlos: {} observer(s) outside the surface were skipped", resolved.void.len());
    }
    debug!(
        "rlos: {} observers, radii {inner_radius}..{outer_radius}, azimuth {}..{}",
        resolved.points.len(),
        fov.left,
        fov.right
    );

    let results: Result<Vec<RlosObserver>, VisibilityError> = resolved
        .points
        .par_iter()
        .map(|&(index, location)| -> Result<RlosObserver, VisibilityError> {
            let source = &observers[index];
            let sr = surface
                .spatial_reference()
                .or(source.spatial_reference)
                .ok_or(RangeFanError::MissingSpatialReference)?;
            let center = Point::new(location.x, location.y).with_spatial_reference(sr);

            let fan = RangeFanSpec::new(center, inner_radius, outer_radius, fov.left, fov.right, sr)
                .with_angle_step(params.angle_step)
                .with_observer_buffer(params.include_observer_buffer);
            let mask = RangeFanSpec::new(center, 0.0, outer_radius, 0.0, 360.0, sr).with_angle_step(params.angle_step);

            Ok(RlosObserver {
                index,
                location,
                observer_offset,
                surface_offset,
                inner_radius,
                outer_radius,
                azimuth1: fov.left,
                azimuth2: fov.right,
                vert1: fov.bottom,
                vert2: fov.top,
                range_fan: build_range_fan(&fan)?,
                max_range_mask: build_range_fan(&mask)?,
            })
        })
        .collect();

    Ok(RlosReport {
        field_of_view: fov,
        observers: results?,
        skipped_observers: resolved.void,
    })
}

// -- Tests -----------------------------------------------------------
