//! Viewport state and Web-Mercator projection
//!
//! Container pixels follow the slippy-map convention: origin at the top-left
//! corner of the map element, x to the east, y to the south, 256px tiles.

use crate::{ClusterError, GeoPoint, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const TILE_SIZE: f64 = 256.0;
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

/// Geographic rectangle in degrees. `west > east` means the box crosses
/// the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        if point.latitude < self.south || point.latitude > self.north {
            return false;
        }
        if self.west <= self.east {
            point.longitude >= self.west && point.longitude <= self.east
        } else {
            point.longitude >= self.west || point.longitude <= self.east
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a GeoPoint>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::new(first.latitude, first.longitude, first.latitude, first.longitude);
        for p in iter {
            bounds.extend(p);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, point: &GeoPoint) {
        self.south = self.south.min(point.latitude);
        self.north = self.north.max(point.latitude);
        self.west = self.west.min(point.longitude);
        self.east = self.east.max(point.longitude);
    }

    /// Bounding box of every position in a GeoJSON geometry (country
    /// boundaries are Polygon or MultiPolygon).
    pub fn from_geometry(geometry: &geojson::Geometry) -> Option<Self> {
        let mut points = Vec::new();
        collect_positions(&geometry.value, &mut points);
        Self::from_points(points.iter())
    }

    pub fn center(&self) -> GeoPoint {
        let east = if self.west <= self.east {
            self.east
        } else {
            self.east + 360.0
        };
        let mut longitude = (self.west + east) / 2.0;
        if longitude > 180.0 {
            longitude -= 360.0;
        }
        GeoPoint {
            latitude: (self.south + self.north) / 2.0,
            longitude,
        }
    }
}

fn collect_positions(value: &geojson::Value, out: &mut Vec<GeoPoint>) {
    use geojson::Value;

    let mut push = |position: &Vec<f64>| {
        if let [lon, lat, ..] = position.as_slice() {
            out.push(GeoPoint {
                latitude: *lat,
                longitude: *lon,
            });
        }
    };

    match value {
        Value::Point(p) => push(p),
        Value::MultiPoint(ps) | Value::LineString(ps) => ps.iter().for_each(push),
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            lines.iter().flatten().for_each(push)
        }
        Value::MultiPolygon(polygons) => polygons.iter().flatten().flatten().for_each(push),
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_positions(&g.value, out);
            }
        }
    }
}

/// Map viewport: what the user currently sees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub center: GeoPoint,
    pub zoom: f64,
    pub width_px: f64,
    pub height_px: f64,
}

impl ViewportState {
    pub fn new(center: GeoPoint, zoom: f64, width_px: f64, height_px: f64) -> Result<Self> {
        if !center.is_valid() {
            return Err(ClusterError::InvalidCoordinates(format!(
                "viewport center lat={}, lon={}",
                center.latitude, center.longitude
            )));
        }
        if !zoom.is_finite() || zoom < 0.0 {
            return Err(ClusterError::InvalidViewport(format!("zoom {}", zoom)));
        }
        if !(width_px > 0.0 && height_px > 0.0) {
            return Err(ClusterError::InvalidViewport(format!(
                "size {}x{}",
                width_px, height_px
            )));
        }
        Ok(Self {
            center,
            zoom,
            width_px,
            height_px,
        })
    }

    /// Whole-world view used before any country is selected.
    pub fn world(width_px: f64, height_px: f64) -> Self {
        Self {
            center: GeoPoint {
                latitude: 0.0,
                longitude: 0.0,
            },
            zoom: 2.0,
            width_px,
            height_px,
        }
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom.max(0.0);
        self
    }

    pub fn with_center(mut self, center: GeoPoint) -> Self {
        self.center = center;
        self
    }

    pub fn world_size(zoom: f64) -> f64 {
        TILE_SIZE * 2f64.powf(zoom)
    }

    /// Absolute pixel position in the world map at `zoom`.
    pub fn project_world(point: &GeoPoint, zoom: f64) -> ScreenPoint {
        let size = Self::world_size(zoom);
        let latitude = point.latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE);
        let sin = latitude.to_radians().sin();
        ScreenPoint {
            x: (point.longitude + 180.0) / 360.0 * size,
            y: (0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * PI)) * size,
        }
    }

    pub fn unproject_world(pixel: &ScreenPoint, zoom: f64) -> GeoPoint {
        let size = Self::world_size(zoom);
        let y = pixel.y.clamp(0.0, size);
        let n = PI - 2.0 * PI * y / size;
        GeoPoint {
            latitude: n.sinh().atan().to_degrees(),
            longitude: (pixel.x / size * 360.0 - 180.0).clamp(-180.0, 180.0),
        }
    }

    /// Pixel position relative to the map container's top-left corner.
    pub fn project(&self, point: &GeoPoint) -> ScreenPoint {
        let p = Self::project_world(point, self.zoom);
        let c = Self::project_world(&self.center, self.zoom);
        ScreenPoint {
            x: p.x - c.x + self.width_px / 2.0,
            y: p.y - c.y + self.height_px / 2.0,
        }
    }

    /// Geographic bounds of the visible container.
    pub fn bounds(&self) -> GeoBounds {
        let c = Self::project_world(&self.center, self.zoom);
        let north_west = Self::unproject_world(
            &ScreenPoint {
                x: c.x - self.width_px / 2.0,
                y: c.y - self.height_px / 2.0,
            },
            self.zoom,
        );
        let south_east = Self::unproject_world(
            &ScreenPoint {
                x: c.x + self.width_px / 2.0,
                y: c.y + self.height_px / 2.0,
            },
            self.zoom,
        );
        GeoBounds::new(
            south_east.latitude,
            north_west.longitude,
            north_west.latitude,
            south_east.longitude,
        )
    }

    /// Largest integer zoom (up to `max_zoom`) at which `bounds` fits in a
    /// `width_px` x `height_px` container, centred on the box.
    pub fn fit_bounds(bounds: &GeoBounds, width_px: f64, height_px: f64, max_zoom: u8) -> Self {
        let (west, east) = if bounds.west <= bounds.east {
            (bounds.west, bounds.east)
        } else {
            (-180.0, 180.0)
        };
        let north_west = GeoPoint {
            latitude: bounds.north,
            longitude: west,
        };
        let south_east = GeoPoint {
            latitude: bounds.south,
            longitude: east,
        };

        let mut zoom = 0.0;
        for z in (0..=max_zoom).rev() {
            let z = f64::from(z);
            let a = Self::project_world(&north_west, z);
            let b = Self::project_world(&south_east, z);
            if (b.x - a.x).abs() <= width_px && (b.y - a.y).abs() <= height_px {
                zoom = z;
                break;
            }
        }

        let a = Self::project_world(&north_west, zoom);
        let b = Self::project_world(&south_east, zoom);
        let center = Self::unproject_world(
            &ScreenPoint {
                x: (a.x + b.x) / 2.0,
                y: (a.y + b.y) / 2.0,
            },
            zoom,
        );

        Self {
            center,
            zoom,
            width_px,
            height_px,
        }
    }
}
