//! Decoded route geometry.
//!
//! The backend answers with GeoJSON `LineString` geometry, which is already
//! in `lon,lat` order. Points that fall outside the coordinate ranges are
//! dropped at decode time rather than failing the whole route.

use serde::{Deserialize, Deserializer, Serialize};

use crate::coordinate::Coordinate;

/// A route line as an ordered list of coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Polyline {
    points: Vec<Coordinate>,
}

impl Polyline {
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Coordinate> {
        self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// South-west and north-east corners, for fitting the map view.
    pub fn bounds(&self) -> Option<(Coordinate, Coordinate)> {
        let first = self.points.first()?;
        let (mut min_lon, mut min_lat) = (first.lon(), first.lat());
        let (mut max_lon, mut max_lat) = (min_lon, min_lat);
        for point in &self.points[1..] {
            min_lon = min_lon.min(point.lon());
            min_lat = min_lat.min(point.lat());
            max_lon = max_lon.max(point.lon());
            max_lat = max_lat.max(point.lat());
        }
        Some((
            Coordinate::new(min_lon, min_lat).ok()?,
            Coordinate::new(max_lon, max_lat).ok()?,
        ))
    }
}

#[derive(Deserialize)]
struct GeoJsonLine {
    #[serde(default)]
    coordinates: Vec<Vec<f64>>,
}

impl<'de> Deserialize<'de> for Polyline {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let line = GeoJsonLine::deserialize(deserializer)?;
        let points = line
            .coordinates
            .into_iter()
            .filter_map(|pair| match pair.as_slice() {
                [lon, lat, ..] => Coordinate::new(*lon, *lat).ok(),
                _ => None,
            })
            .collect();
        Ok(Polyline { points })
    }
}
