//! Drives the row builder over every item selected by the id source.

use tracing::info;

use crate::error::{ScrapeError, StoreError};
use crate::extraction::{AreaRowBuilder, Row, ID_FIELD};
use crate::sources::{IdSource, ItemFetcher};

/// Destination for the collected rows.
pub trait RowStore {
    /// Upsert `rows`, treating `unique_keys` as the row identity.
    ///
    /// Returns the number of rows written.
    fn save(&mut self, unique_keys: &[&str], rows: &[Row]) -> Result<usize, StoreError>;
}

/// Counts reported after a successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ids: usize,
    pub items: usize,
    pub rows_saved: usize,
}

/// Id source -> item fetcher -> row builder -> row store.
pub struct AreaCollector<S, F> {
    id_source: S,
    fetcher: F,
    builder: AreaRowBuilder,
}

impl<S: IdSource, F: ItemFetcher> AreaCollector<S, F> {
    pub fn new(id_source: S, fetcher: F) -> Self {
        Self {
            id_source,
            fetcher,
            builder: AreaRowBuilder::new(),
        }
    }

    /// Ids to scrape; an empty answer is an error, not an empty dataset.
    pub fn fetch_ids(&self) -> Result<Vec<String>, ScrapeError> {
        let ids = self.id_source.fetch_ids()?;
        if ids.is_empty() {
            return Err(ScrapeError::NoIds);
        }
        Ok(ids)
    }

    /// Fetch the items for `ids` and shape one row per item, in fetch order.
    pub fn rows_for(&self, ids: &[String]) -> Result<Vec<Row>, ScrapeError> {
        self.fetch_and_build(ids).map(|(_, rows)| rows)
    }

    /// Number of fetched items, and their rows.
    fn fetch_and_build(&self, ids: &[String]) -> Result<(usize, Vec<Row>), ScrapeError> {
        let items = self.fetcher.fetch_items(ids)?;

        let mut rows = Vec::with_capacity(items.len());
        for item in &items {
            let row = self.builder.build(item)?;
            if !row.is_empty() {
                rows.push(row);
            }
        }
        Ok((items.len(), rows))
    }

    /// All rows for the current id selection.
    pub fn collect(&self) -> Result<Vec<Row>, ScrapeError> {
        let ids = self.fetch_ids()?;
        self.rows_for(&ids)
    }

    /// Collect every row and save it to `store` keyed by `id`.
    pub fn run<St: RowStore>(&self, store: &mut St) -> Result<RunSummary, ScrapeError> {
        let ids = self.fetch_ids()?;
        let (items, rows) = self.fetch_and_build(&ids)?;
        info!("Built {} rows from {} items ({} ids)", rows.len(), items, ids.len());

        let rows_saved = store.save(&[ID_FIELD], &rows)?;
        Ok(RunSummary {
            ids: ids.len(),
            items,
            rows_saved,
        })
    }
}
