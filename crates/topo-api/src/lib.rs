// topo-api: async client for a monitoring platform's entity endpoints.

pub mod client;
pub mod error;
pub mod limit;
pub mod transport;
pub mod types;

pub use client::{EntitiesClient, EntityTypeCatalog, ListEntitiesOptions};
pub use error::Error;
pub use limit::LimitedTransport;
pub use transport::{HttpTransport, RawResponse, TlsMode, Transport, TransportConfig};
pub use types::{EntityList, EntityRecord, EntityTypeDescriptor, ErrorEnvelope};
