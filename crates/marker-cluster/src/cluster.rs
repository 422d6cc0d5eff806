//! Greedy first-fit grid-bucket clustering in screen space

use crate::viewport::{ScreenPoint, ViewportState};
use crate::{GeoPoint, PointFeature};
use serde::Serialize;

/// Runtime grouping of nearby features. Built fresh on every render pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster<'a> {
    /// Equal-weight mean of member positions, in geographic coordinates.
    pub center: GeoPoint,
    /// Members in assignment order; the first member anchored the cluster.
    pub members: Vec<&'a PointFeature>,
    /// Container pixel of `center` under the viewport used to build it.
    pub bucket_key: ScreenPoint,
}

impl<'a> Cluster<'a> {
    fn seed(feature: &'a PointFeature, pixel: ScreenPoint) -> Self {
        Self {
            center: feature.position,
            members: vec![feature],
            bucket_key: pixel,
        }
    }

    fn absorb(&mut self, feature: &'a PointFeature, viewport: &ViewportState) {
        self.members.push(feature);
        let n = self.members.len() as f64;
        self.center = GeoPoint {
            latitude: (self.center.latitude * (n - 1.0) + feature.position.latitude) / n,
            longitude: (self.center.longitude * (n - 1.0) + feature.position.longitude) / n,
        };
        self.bucket_key = viewport.project(&self.center);
    }

    fn accepts(&self, pixel: &ScreenPoint, radius_px: f64) -> bool {
        (pixel.x - self.bucket_key.x).abs() < radius_px
            && (pixel.y - self.bucket_key.y).abs() < radius_px
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }
}

/// Assign each feature, in the given order, to the first cluster whose
/// centroid lies within `radius_px` on both axes, or start a new one.
///
/// The caller is responsible for ordering and viewport filtering.
pub fn cluster_features<'a>(
    features: &[&'a PointFeature],
    viewport: &ViewportState,
    radius_px: f64,
) -> Vec<Cluster<'a>> {
    let mut clusters: Vec<Cluster<'a>> = Vec::new();

    for &feature in features {
        let pixel = viewport.project(&feature.position);

        match clusters.iter_mut().find(|c| c.accepts(&pixel, radius_px)) {
            Some(cluster) => cluster.absorb(feature, viewport),
            None => clusters.push(Cluster::seed(feature, pixel)),
        }
    }

    clusters
}
