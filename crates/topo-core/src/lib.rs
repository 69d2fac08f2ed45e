// topo-core: adaptive, concurrent entity-type downloader.

pub mod config;
pub mod convert;
pub mod downloader;
pub mod error;
pub mod fields;
pub mod model;
pub mod retry;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DownloadSettings, EnvironmentConfig, LimitedClient, TlsVerification};
pub use convert::{config_id_from_name, to_config_record};
pub use downloader::Downloader;
pub use error::CoreError;
pub use fields::{FieldExclusionSet, FieldRule, FieldRules, FieldSelector};
pub use model::{ConfigRecord, ResultsByType, TYPES_AS_ENTITIES_TYPE};

pub use topo_api::Error as ApiError;
pub use topo_api::{EntityList, EntityTypeCatalog, EntityTypeDescriptor, ListEntitiesOptions};
