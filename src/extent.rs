//! Point-in-extent checks against a surface's area of interest.
//!
//! A missing extent, or one without a spatial reference, accepts every
//! point. Projection is delegated to a [`Projector`]; a point that
//! cannot be projected is treated as outside.

use log::warn;

use crate::types::{Envelope, Point, SpatialReference};

pub trait Projector {
    /// Reproject `point` into `target`, or `None` if that is not possible.
    fn project(&self, point: &Point, target: SpatialReference) -> Option<Point>;
}

/// Projector that performs no reprojection: it accepts points already
/// in the target reference, and untagged points as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct SameReferenceProjector;

impl Projector for SameReferenceProjector {
    fn project(&self, point: &Point, target: SpatialReference) -> Option<Point> {
        match point.spatial_reference {
            None => Some(point.with_spatial_reference(target)),
            Some(sr) if sr == target => Some(*point),
            Some(_) => None,
        }
    }
}

pub fn is_within_extent(point: &Point, extent: Option<&Envelope>, projector: &dyn Projector) -> bool {
    let Some(extent) = extent else {
        return true;
    };
    let Some(target) = extent.spatial_reference else {
        return true;
    };

    let projected = if point.spatial_reference == Some(target) {
        *point
    } else {
        match projector.project(point, target) {
            Some(p) => p,
            None => {
                warn!(
                    "extent check: could not project ({}, {}) into wkid {}",
                    point.x, point.y, target.wkid
                );
                return false;
            }
        }
    };
    extent.contains_xy(projected.x, projected.y)
}

/// Indices of points inside and outside an extent, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtentPartition {
    pub inside: Vec<usize>,
    pub outside: Vec<usize>,
}

pub fn partition_by_extent(
    points: &[Point],
    extent: Option<&Envelope>,
    projector: &dyn Projector,
) -> ExtentPartition {
    let mut out = ExtentPartition::default();
    for (i, p) in points.iter().enumerate() {
        if is_within_extent(p, extent, projector) {
            out.inside.push(i);
        } else {
            out.outside.push(i);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const UTM: SpatialReference = SpatialReference { wkid: 32611 };
    const WEB: SpatialReference = SpatialReference { wkid: 3857 };

    /// Shifts x by a fixed amount when moving from WEB to UTM.
    struct ShiftProjector;

    impl Projector for ShiftProjector {
        fn project(&self, point: &Point, target: SpatialReference) -> Option<Point> {
            match (point.spatial_reference, target) {
                (Some(WEB), UTM) => Some(Point::new(point.x - 1000.0, point.y).with_spatial_reference(UTM)),
                _ => None,
            }
        }
    }

    fn aoi() -> Envelope {
        Envelope::new(0.0, 0.0, 100.0, 100.0).with_spatial_reference(UTM)
    }

    #[test]
    fn missing_extent_accepts_everything() {
        let far = Point::new(1e9, -1e9).with_spatial_reference(WEB);
        assert!(is_within_extent(&far, None, &SameReferenceProjector));
        let untagged = Envelope::new(0.0, 0.0, 1.0, 1.0);
        assert!(is_within_extent(&far, Some(&untagged), &SameReferenceProjector));
    }

    #[test]
    fn same_reference_inclusive() {
        let env = aoi();
        let p = SameReferenceProjector;
        assert!(is_within_extent(&Point::new(0.0, 0.0).with_spatial_reference(UTM), Some(&env), &p));
        assert!(is_within_extent(&Point::new(100.0, 50.0).with_spatial_reference(UTM), Some(&env), &p));
        assert!(!is_within_extent(&Point::new(100.5, 50.0).with_spatial_reference(UTM), Some(&env), &p));
        // Untagged points are taken to be in the extent's reference.
        assert!(is_within_extent(&Point::new(50.0, 50.0), Some(&env), &p));
    }

    #[test]
    fn projects_before_testing() {
        let env = aoi();
        let web = Point::new(1050.0, 50.0).with_spatial_reference(WEB);
        assert!(is_within_extent(&web, Some(&env), &ShiftProjector));
        let web_out = Point::new(50.0, 50.0).with_spatial_reference(WEB);
        assert!(!is_within_extent(&web_out, Some(&env), &ShiftProjector));
    }

    #[test]
    fn projection_failure_is_outside() {
        let env = aoi();
        let p = Point::new(50.0, 50.0).with_spatial_reference(WEB);
        assert!(!is_within_extent(&p, Some(&env), &SameReferenceProjector));
    }

    #[test]
    fn partition_keeps_order() {
        let env = aoi();
        let pts = vec![
            Point::new(10.0, 10.0).with_spatial_reference(UTM),
            Point::new(-1.0, 10.0).with_spatial_reference(UTM),
            Point::new(99.0, 99.0).with_spatial_reference(UTM),
            Point::new(5.0, 5.0).with_spatial_reference(WEB),
        ];
        let part = partition_by_extent(&pts, Some(&env), &SameReferenceProjector);
        assert_eq!(part.inside, vec![0, 2]);
        assert_eq!(part.outside, vec![1, 3]);

        let all = partition_by_extent(&pts, None, &SameReferenceProjector);
        assert_eq!(all.inside, vec![0, 1, 2, 3]);
        assert!(all.outside.is_empty());
    }
}
