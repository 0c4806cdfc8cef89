use chrono::NaiveDate;

use crate::BAND;
use crate::store::{Collection, Item, ItemStore, Result, StoreError};

/// Deterministic collection name for a `(location, year)` key. At most one
/// collection exists per key; this name is the key.
pub fn collection_name(location: &str, year: i32) -> String {
    format!("{BAND} {location} {year}")
}

/// Forms and grows run collections against the host store. The only
/// component with side effects on persisted state; membership invariants
/// live here, not in callers.
pub struct CollectionManager<S: ItemStore> {
    store: S,
}

impl<S: ItemStore> CollectionManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Look up the collection for a key, if one exists.
    pub fn find_existing(&self, location: &str, year: i32) -> Result<Option<Collection>> {
        self.store.find_collection(&collection_name(location, year))
    }

    /// Create the collection for a key. Losing a creation race is success:
    /// the winner's row is re-resolved and returned.
    pub fn create(&self, location: &str, year: i32) -> Result<Collection> {
        let name = collection_name(location, year);
        match self.store.create_collection(&name) {
            Ok(collection) => Ok(collection),
            Err(StoreError::AlreadyExists(_)) => {
                log::debug!("lost creation race for '{name}', re-resolving");
                self.store
                    .find_collection(&name)?
                    .ok_or(StoreError::AlreadyExists(name))
            }
            Err(e) => Err(e),
        }
    }

    /// Add an item to a collection. Advisory: an item the host has not yet
    /// persisted has no durable id, so the add is skipped (logged) and the
    /// deferred processing path retries it once the id exists. Returns true
    /// only when a new membership row was written.
    pub fn add_member(&self, collection: &Collection, item: &Item) -> Result<bool> {
        let Some(item_id) = item.id else {
            log::info!(
                "item '{}' has no durable id yet; membership in '{}' deferred",
                item.name,
                collection.name
            );
            return Ok(false);
        };

        let added = self.store.add_to_collection(collection.id, item_id)?;
        if added {
            log::info!("added '{}' to '{}'", item.name, collection.name);
        } else {
            log::debug!("'{}' already in '{}'", item.name, collection.name);
        }
        Ok(added)
    }

    /// Find-or-form the collection for a run and enroll `item` in it.
    ///
    /// When no collection exists yet, the store is scanned for other items
    /// dated within the run whose name or overview references the location.
    /// A lone show forms nothing; the collection is created the first time
    /// a second member is discovered. Safe to repeat: reruns never create a
    /// duplicate collection or membership.
    pub fn process_run(
        &self,
        item: &Item,
        location: &str,
        year: i32,
        run_dates: &[NaiveDate],
    ) -> Result<()> {
        if let Some(existing) = self.find_existing(location, year)? {
            self.add_member(&existing, item)?;
            return Ok(());
        }

        let (Some(&start), Some(&end)) = (run_dates.iter().min(), run_dates.iter().max()) else {
            log::debug!("empty run dates for {location} {year}, nothing to group");
            return Ok(());
        };

        let location_lower = location.to_lowercase();
        let siblings: Vec<Item> = self
            .store
            .items_in_date_range(start, end)?
            .into_iter()
            .filter(|other| other.id != item.id)
            .filter(|other| references_location(other, &location_lower))
            .collect();

        if siblings.is_empty() {
            log::debug!("no run siblings yet for {location} {year}; lone show stays ungrouped");
            return Ok(());
        }

        let collection = self.create(location, year)?;
        self.add_member(&collection, item)?;
        for sibling in &siblings {
            self.add_member(&collection, sibling)?;
        }
        Ok(())
    }
}

/// Whether an item's name or overview mentions the location.
fn references_location(item: &Item, location_lower: &str) -> bool {
    if item.name.to_lowercase().contains(location_lower) {
        return true;
    }
    item.overview
        .as_deref()
        .is_some_and(|o| o.to_lowercase().contains(location_lower))
}
