//! osrm-inspector core
//!
//! Keeps an ordered waypoint list consistent across text inputs, map markers
//! and an OSRM-compatible routing backend.

pub mod config;
pub mod coordinate;
pub mod executor;
pub mod import;
pub mod inspector;
pub mod osrm;
pub mod polyline;
pub mod profile;
pub mod request;
pub mod response;
pub mod session;
pub mod sync;
pub mod traits;
pub mod waypoints;

pub use config::{InspectorConfig, ProfileConfig};
pub use coordinate::Coordinate;
pub use executor::{OverlapPolicy, QueryError, RouteQueryExecutor, RouteSuccess};
pub use inspector::Inspector;
pub use osrm::{OsrmClient, OsrmConfig};
pub use sync::{ClickTarget, WaypointEvent, WaypointSync};
pub use traits::{BackendError, RouteBackend};
pub use waypoints::{SlotId, WaypointRole, WaypointStore};
