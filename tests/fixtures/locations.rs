//! Real locations for realistic test fixtures.
//!
//! Coordinates sourced from OpenStreetMap. The Monaco set is routable
//! against the Geofabrik Monaco extract used by the container tests.

use osrm_inspector::Coordinate;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lon: f64,
    pub lat: f64,
}

impl Location {
    pub const fn new(name: &'static str, lon: f64, lat: f64) -> Self {
        Self { name, lon, lat }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lon, self.lat).expect("fixture coordinates are in range")
    }
}

pub const MONACO: &[Location] = &[
    Location::new("Monaco-Ville, Palais Princier", 7.4197, 43.7311),
    Location::new("Casino de Monte-Carlo", 7.4281, 43.7394),
    Location::new("Port Hercule", 7.4246, 43.7356),
    Location::new("Fontvieille, Stade Louis II", 7.4155, 43.7276),
    Location::new("Larvotto Beach", 7.4358, 43.7447),
];

pub const JAKARTA: &[Location] = &[
    Location::new("Monas", 106.8272, -6.1754),
    Location::new("Bundaran HI", 106.8230, -6.1950),
    Location::new("Senayan", 106.8020, -6.2180),
    Location::new("Kota Tua", 106.8133, -6.1352),
];

pub fn coordinates(locations: &[Location]) -> Vec<Coordinate> {
    locations.iter().map(Location::coordinate).collect()
}
