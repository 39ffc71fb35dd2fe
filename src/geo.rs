//! Local planar <-> geodetic coordinate transform
//!
//! The fleet flies in a local Cartesian frame anchored at a fixed
//! geodetic origin; remote consumers see latitude/longitude. Longitude
//! is corrected by the cosine of the *origin* latitude, a small-area
//! approximation that only holds near the origin. Do not use this for
//! fleets spread over a large area.

use crate::fleet::FleetError;

/// A point in the local planar frame. z is altitude and passes through
/// the projection untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LocalPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl LocalPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Squared planar (x/y) distance to another point, ignoring altitude
    pub fn planar_distance_sq(&self, other: &LocalPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A geodetic position in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Converts between the local planar frame and geodetic coordinates
/// around a fixed origin. Stateless apart from the origin; immutable for
/// the process lifetime.
#[derive(Debug, Clone)]
pub struct GeoProjector {
    origin_lat: f64,
    origin_lng: f64,
    /// Degrees per local unit
    scale_factor: f64,
    /// Cached cos(origin latitude); nonzero for any valid origin
    lat_cos: f64,
}

impl GeoProjector {
    pub fn new(origin_lat: f64, origin_lng: f64, scale_factor: f64) -> Result<Self, FleetError> {
        if !origin_lat.is_finite() || !origin_lng.is_finite() {
            return Err(FleetError::InvalidInput(format!(
                "non-finite origin ({origin_lat}, {origin_lng})"
            )));
        }
        if !(scale_factor > 0.0) || !scale_factor.is_finite() {
            return Err(FleetError::InvalidInput(format!(
                "scale factor must be positive, got {scale_factor}"
            )));
        }

        Ok(Self {
            origin_lat,
            origin_lng,
            scale_factor,
            lat_cos: origin_lat.to_radians().cos(),
        })
    }

    /// Project a local pose to geodetic coordinates
    pub fn to_geo(&self, p: LocalPoint) -> GeoPoint {
        GeoPoint {
            lat: self.origin_lat + p.y * self.scale_factor,
            lng: self.origin_lng + p.x * self.scale_factor / self.lat_cos,
        }
    }

    /// Algebraic inverse of [`to_geo`](Self::to_geo)
    ///
    /// Altitude cannot be recovered from a geodetic point, so `z` must be
    /// supplied by the caller (typically the targeted agent's current z).
    pub fn to_local(&self, g: GeoPoint, z: f64) -> Result<LocalPoint, FleetError> {
        if !g.lat.is_finite() || !g.lng.is_finite() {
            return Err(FleetError::InvalidInput(format!(
                "non-finite geo point ({}, {})",
                g.lat, g.lng
            )));
        }

        Ok(LocalPoint {
            x: (g.lng - self.origin_lng) * self.lat_cos / self.scale_factor,
            y: (g.lat - self.origin_lat) / self.scale_factor,
            z,
        })
    }
}
