//! Proximity search: nearest point and line features, zone containment.

mod index;
mod zones;

pub use index::{ProximityIndex, ProximityResult};
pub use zones::ZoneIndex;
