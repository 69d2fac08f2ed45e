// ── Entity downloader ──
//
// Fans out one worker per entity type. Each worker negotiates its own
// field set with the platform, narrowing it after every field rejection,
// and writes its record into the shared results exactly once. A failing
// type is logged and recorded; it never stops its siblings.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use topo_api::{EntitiesClient, EntityList, EntityTypeCatalog, EntityTypeDescriptor, Transport};

use crate::config::DownloadSettings;
use crate::convert::to_config_record;
use crate::error::CoreError;
use crate::fields::{FieldExclusionSet, FieldSelector};
use crate::model::{ResultsByType, TYPES_AS_ENTITIES_TYPE};
use crate::retry::narrow_on_rejection;

/// Downloads entity types through a shared client.
///
/// Cheaply cloneable; every worker holds its own handle to the client,
/// selector and settings.
pub struct Downloader<T> {
    client: Arc<EntitiesClient<T>>,
    selector: Arc<FieldSelector>,
    settings: Arc<DownloadSettings>,
}

impl<T> Clone for Downloader<T> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            selector: Arc::clone(&self.selector),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<T: Transport + 'static> Downloader<T> {
    pub fn new(client: EntitiesClient<T>, settings: DownloadSettings) -> Self {
        Self {
            client: Arc::new(client),
            selector: Arc::new(FieldSelector::default()),
            settings: Arc::new(settings),
        }
    }

    /// Replace the field selector (and with it the rule tables).
    pub fn with_selector(mut self, selector: FieldSelector) -> Self {
        self.selector = Arc::new(selector);
        self
    }

    // ── Entry points ─────────────────────────────────────────────────

    /// Download either the given types, or every type when none are given,
    /// and log a summary.
    ///
    /// Returns `None` when the run finished but produced no entity records,
    /// so callers can tell "found nothing" apart from a result set.
    pub async fn download_entities(
        &self,
        specific_types: &[String],
    ) -> Result<Option<ResultsByType>, CoreError> {
        let results = if specific_types.is_empty() {
            self.download_all().await?
        } else {
            debug!(types = ?specific_types, "entity types to download");
            self.download(specific_types).await?
        };

        let count = results.entity_type_count();
        if count == 0 {
            info!("No entities were found. No files will be created.");
            return Ok(None);
        }

        info!(count, "Downloaded {count} entity types.");
        Ok(Some(results))
    }

    /// Download every type in the catalog.
    pub async fn download_all(&self) -> Result<ResultsByType, CoreError> {
        self.check_window()?;
        debug!("fetching all entity types to download");
        let EntityTypeCatalog { types, as_entities } = self.catalog().await?;
        Ok(self.download_types(types, as_entities).await)
    }

    /// Download only the given types.
    ///
    /// Fails before any entity request if a requested type is not in the
    /// catalog.
    pub async fn download(&self, type_ids: &[String]) -> Result<ResultsByType, CoreError> {
        if type_ids.is_empty() {
            return Err(CoreError::NoTypesRequested);
        }
        self.check_window()?;

        debug!("fetching specific entity types to download");
        let catalog = self.catalog().await?;
        let selected = select_types(&catalog, type_ids)?;
        Ok(self.download_types(selected, catalog.as_entities).await)
    }

    /// Fetch the type catalog on its own.
    pub async fn catalog(&self) -> Result<EntityTypeCatalog, CoreError> {
        self.client.list_entity_types().await.map_err(|source| {
            warn!(error = %source, "failed to fetch entity types; skipping entities download");
            CoreError::CatalogFetch { source }
        })
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Reject a window that cannot be resolved before any request is sent.
    fn check_window(&self) -> Result<(), CoreError> {
        self.settings.list.timeframe().map(drop).map_err(CoreError::from)
    }

    async fn download_types(
        &self,
        types: Vec<EntityTypeDescriptor>,
        catalog_entities: EntityList,
    ) -> ResultsByType {
        let results = Arc::new(Mutex::new(ResultsByType::new()));
        let mut workers = JoinSet::new();

        for descriptor in types {
            let this = self.clone();
            let results = Arc::clone(&results);
            workers.spawn(async move { this.run_worker(descriptor, &results).await });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "entity type worker did not finish");
            }
        }

        let mut results = std::mem::take(&mut *results.lock().await);

        let catalog_record = to_config_record(
            &catalog_entities,
            TYPES_AS_ENTITIES_TYPE,
            &self.settings.project_name,
        );
        results.insert(TYPES_AS_ENTITIES_TYPE, vec![catalog_record]);

        results
    }

    async fn run_worker(&self, descriptor: EntityTypeDescriptor, results: &Mutex<ResultsByType>) {
        let type_id = descriptor.type_id();

        match self.fetch_type(&descriptor).await {
            Ok(list) if list.entities.is_empty() => {
                debug!(type_id, "no entities for type");
            }
            Ok(list) => {
                debug!(type_id, count = list.entities.len(), "downloaded entities");
                let record = to_config_record(&list, type_id, &self.settings.project_name);
                results.lock().await.insert(type_id, vec![record]);
            }
            Err(err) => {
                warn!(type_id, error = %err, "failed to fetch entities for type");
                results.lock().await.record_failure(type_id, err.to_string());
            }
        }
    }

    /// Fetch one type, narrowing the field set until the platform accepts it.
    ///
    /// Attempts run strictly in sequence; each sees the exclusions left by
    /// the previous one. The loop ends once a rejection names no new field.
    async fn fetch_type(&self, descriptor: &EntityTypeDescriptor) -> Result<EntityList, CoreError> {
        let type_id = descriptor.type_id();
        let mut excluded = FieldExclusionSet::new();
        let mut attempt: u32 = 1;

        loop {
            let fields = self.selector.select(descriptor, &excluded);
            debug!(type_id, attempt, fields = %fields, "listing entities");

            let err = match self
                .client
                .list_entities(type_id, &fields, &self.settings.list)
                .await
            {
                Ok(list) => return Ok(list),
                Err(err) => err,
            };

            match narrow_on_rejection(type_id, err, &mut excluded) {
                Ok(added) => {
                    warn!(type_id, ?added, "property error in type: will not extract");
                    let delay = self.settings.field_retry_delay;
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(err) => return Err(CoreError::for_type(type_id, err)),
            }
        }
    }
}

/// Resolve requested ids against the catalog, in request order.
fn select_types(
    catalog: &EntityTypeCatalog,
    type_ids: &[String],
) -> Result<Vec<EntityTypeDescriptor>, CoreError> {
    let mut seen = BTreeSet::new();
    let mut selected = Vec::with_capacity(type_ids.len());
    let mut missing = Vec::new();

    for id in type_ids {
        if !seen.insert(id.as_str()) {
            continue;
        }
        match catalog.get(id) {
            Some(descriptor) => selected.push(descriptor.clone()),
            None => missing.push(id.clone()),
        }
    }

    if missing.is_empty() {
        Ok(selected)
    } else {
        warn!(?missing, found = selected.len(), "did not find all requested entity types");
        Err(CoreError::TypeNotFound { missing })
    }
}
