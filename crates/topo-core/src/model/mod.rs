// ── Domain model ──
//
// Output types of the entity downloader.

pub mod config_record;
pub mod results;

pub use config_record::{ConfigRecord, Coordinate, EntitiesKind, NAME_PARAMETER, Template};
pub use results::{ResultsByType, TYPES_AS_ENTITIES_TYPE};
