// Entity endpoints client.
//
// Wraps a `Transport` with the two calls the downloader needs: the type
// catalog and the per-type entity listing. Both follow `nextPageKey`
// continuation until the platform reports no further pages.

use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::Error;
use crate::transport::Transport;
use crate::types::{EntitiesPage, EntityList, EntityTypeDescriptor, EntityTypesPage};

pub const PATH_ENTITIES: &str = "api/v2/entities";
pub const PATH_ENTITY_TYPES: &str = "api/v2/entityTypes";

/// Page size used when the caller supplies a non-positive one.
pub const DEFAULT_ENTITY_PAGE_SIZE: i64 = 500;

const ENTITY_TYPES_PAGE_SIZE: i64 = 500;

/// Caller-supplied listing parameters, shared read-only by every worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListEntitiesOptions {
    /// Window start, in minutes before now.
    pub time_from_minutes: i64,
    /// Window end, in minutes before now.
    pub time_to_minutes: i64,
    pub entity_page_size: i64,
}

impl Default for ListEntitiesOptions {
    fn default() -> Self {
        Self {
            time_from_minutes: 7 * 24 * 60,
            time_to_minutes: 0,
            entity_page_size: DEFAULT_ENTITY_PAGE_SIZE,
        }
    }
}

impl ListEntitiesOptions {
    pub fn page_size(&self) -> i64 {
        if self.entity_page_size > 0 {
            self.entity_page_size
        } else {
            DEFAULT_ENTITY_PAGE_SIZE
        }
    }

    /// Resolve the window against the current time, as millisecond epoch strings.
    ///
    /// Fails when either bound falls outside the representable date range.
    pub fn timeframe(&self) -> Result<(String, String), Error> {
        let now = Utc::now();
        let from = minutes_before(now, self.time_from_minutes)?;
        let to = minutes_before(now, self.time_to_minutes)?;
        Ok((
            from.timestamp_millis().to_string(),
            to.timestamp_millis().to_string(),
        ))
    }
}

fn minutes_before(now: DateTime<Utc>, minutes: i64) -> Result<DateTime<Utc>, Error> {
    TimeDelta::try_minutes(minutes)
        .and_then(|delta| now.checked_sub_signed(delta))
        .ok_or(Error::TimeframeOutOfRange { minutes })
}

/// The type catalog: parsed descriptors plus the raw records, which are
/// kept so the catalog can be stored as a pseudo entity type.
#[derive(Debug, Clone)]
pub struct EntityTypeCatalog {
    pub types: Vec<EntityTypeDescriptor>,
    pub as_entities: EntityList,
}

impl EntityTypeCatalog {
    pub fn get(&self, type_id: &str) -> Option<&EntityTypeDescriptor> {
        self.types.iter().find(|t| t.type_id() == type_id)
    }
}

/// A paginated response shape.
trait Paged: DeserializeOwned {
    type Item;
    fn next_page_key(&self) -> Option<&str>;
    fn into_items(self) -> Vec<Self::Item>;
}

impl Paged for EntitiesPage {
    type Item = crate::types::EntityRecord;

    fn next_page_key(&self) -> Option<&str> {
        self.next_page_key.as_deref().filter(|k| !k.is_empty())
    }

    fn into_items(self) -> Vec<Self::Item> {
        self.entities
    }
}

impl Paged for EntityTypesPage {
    type Item = crate::types::EntityRecord;

    fn next_page_key(&self) -> Option<&str> {
        self.next_page_key.as_deref().filter(|k| !k.is_empty())
    }

    fn into_items(self) -> Vec<Self::Item> {
        self.types
    }
}

/// Async client for the entity and entity-type endpoints.
pub struct EntitiesClient<T> {
    transport: T,
}

impl<T: Transport> EntitiesClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get_page<P: Paged>(&self, path: &str, query: &[(&str, String)]) -> Result<P, Error> {
        let resp = self.transport.get(path, query).await?;
        if !resp.is_success() {
            return Err(Error::Response {
                status: resp.status,
                body: resp.body,
            });
        }
        serde_json::from_str(&resp.body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: resp.body,
        })
    }

    /// Fetch the first page with `query`, then follow continuation keys.
    ///
    /// Follow-up requests carry only `nextPageKey`; the platform rejects
    /// any other parameter alongside it.
    async fn paginate_all<P: Paged>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<P::Item>, Error> {
        let mut page: P = self.get_page(path, query).await?;
        let mut all = Vec::new();

        loop {
            let next = page.next_page_key().map(str::to_owned);
            all.extend(page.into_items());

            let Some(key) = next else {
                break;
            };
            debug!(path, received = all.len(), "following next page");
            page = self.get_page(path, &[("nextPageKey", key)]).await?;
        }

        Ok(all)
    }

    // ── Public API ───────────────────────────────────────────────────

    /// List every entity type, parsed and raw.
    ///
    /// `GET /api/v2/entityTypes`
    pub async fn list_entity_types(&self) -> Result<EntityTypeCatalog, Error> {
        let records = self
            .paginate_all::<EntityTypesPage>(
                PATH_ENTITY_TYPES,
                &[("pageSize", ENTITY_TYPES_PAGE_SIZE.to_string())],
            )
            .await?;

        let types = records
            .iter()
            .map(|raw| {
                EntityTypeDescriptor::from_raw(raw).map_err(|e| Error::Deserialization {
                    message: e.to_string(),
                    body: raw.get().to_owned(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let fetched_at = Utc::now().timestamp_millis().to_string();
        debug!(count = types.len(), "listed entity types");

        Ok(EntityTypeCatalog {
            types,
            as_entities: EntityList {
                entities: records,
                from: fetched_at.clone(),
                to: fetched_at,
            },
        })
    }

    /// List all entities of one type over the configured window.
    ///
    /// `GET /api/v2/entities?entitySelector=type("<id>")&pageSize=..&fields=..&from=..&to=..`
    ///
    /// A rejected request comes back as [`Error::Response`] carrying the
    /// status and raw body, so the caller can inspect the error envelope.
    pub async fn list_entities(
        &self,
        type_id: &str,
        fields: &str,
        opts: &ListEntitiesOptions,
    ) -> Result<EntityList, Error> {
        let (from, to) = opts.timeframe()?;
        let query = [
            ("entitySelector", format!("type(\"{type_id}\")")),
            ("pageSize", opts.page_size().to_string()),
            ("fields", fields.to_owned()),
            ("from", from.clone()),
            ("to", to.clone()),
        ];

        let entities = self
            .paginate_all::<EntitiesPage>(PATH_ENTITIES, &query)
            .await?;

        Ok(EntityList { entities, from, to })
    }
}
