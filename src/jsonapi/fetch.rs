//! Cursor pagination over a JSON:API collection
//!
//! Follows `links.next` until absent. Pages are fetched strictly in sequence;
//! any failed page aborts the whole fetch.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use super::client::PageSource;
use super::decode::{IncludedResource, PrimaryRecord};
use crate::error::{ExportError, Result};

/// Included resources keyed by remote id; a later copy replaces an earlier one
#[derive(Debug, Clone, Default)]
pub struct IncludedSet {
    by_id: HashMap<String, IncludedResource>,
}

impl IncludedSet {
    pub fn insert(&mut self, resource: IncludedResource) {
        self.by_id.insert(resource.id().to_string(), resource);
    }

    pub fn get(&self, id: &str) -> Option<&IncludedResource> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IncludedResource> {
        self.by_id.values()
    }
}

impl FromIterator<IncludedResource> for IncludedSet {
    fn from_iter<I: IntoIterator<Item = IncludedResource>>(iter: I) -> Self {
        let mut set = IncludedSet::default();
        for resource in iter {
            set.insert(resource);
        }
        set
    }
}

/// Everything gathered from one complete walk of the collection
#[derive(Debug, Clone, Default)]
pub struct FetchedCollection {
    /// Primary records in page order
    pub records: Vec<PrimaryRecord>,
    pub included: IncludedSet,
    pub pages: usize,
}

pub struct ResourceFetcher {
    source: Arc<dyn PageSource>,
}

impl ResourceFetcher {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self { source }
    }

    /// Fetch every page starting at `start_url`
    pub async fn fetch_all(&self, start_url: &str) -> Result<FetchedCollection> {
        let mut collection = FetchedCollection::default();
        let mut visited: HashSet<String> = HashSet::new();
        let mut next = Some(start_url.to_string());

        while let Some(url) = next.take() {
            if !visited.insert(url.clone()) {
                return Err(ExportError::transport(
                    url,
                    "pagination cycle: next link revisits a fetched page",
                ));
            }

            collection.pages += 1;
            info!(page = collection.pages, "Fetching page");
            let doc = self.source.fetch_page(&url).await?;

            for resource in &doc.data {
                collection.records.push(PrimaryRecord::try_from(resource)?);
            }
            for resource in doc.included.iter().flatten() {
                collection.included.insert(IncludedResource::try_from(resource)?);
            }

            debug!(
                page = collection.pages,
                page_records = doc.data.len(),
                records = collection.records.len(),
                included = collection.included.len(),
                "Page accumulated"
            );

            next = doc.next_url().map(str::to_string);
        }

        info!(
            pages = collection.pages,
            records = collection.records.len(),
            included = collection.included.len(),
            "Collection fetched"
        );
        Ok(collection)
    }
}
