//! The association index: which edges touch which gadget.
//!
//! Edges are bucketed under their (start id, end id) pair, in insertion
//! order. The index is the authority for connectivity queries and for the
//! cascade when a gadget is removed; it holds strong handles, so an indexed
//! association stays alive even when no other owner remains.
//!
//! The index does not observe the model. Callers that re-anchor an
//! association must move it to its new bucket themselves via
//! [`AssociationIndex::update`].

use indexmap::IndexMap;
use log::debug;

use crate::{association::Association, error::ModelError, identifier::GadgetId};

/// Directed two-level bucket map of associations.
#[derive(Debug, Default)]
pub struct AssociationIndex {
    buckets: IndexMap<GadgetId, IndexMap<GadgetId, Vec<Association>>>,
}

impl AssociationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed associations
    pub fn len(&self) -> usize {
        self.buckets
            .values()
            .flat_map(|ends| ends.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Files the association under its current endpoint ids.
    ///
    /// Parallel edges are kept in insertion order; inserting the same
    /// association twice files it twice, which the callers above this layer
    /// never do.
    pub fn insert(&mut self, association: &Association) {
        let start = association.start_id();
        let end = association.end_id();
        debug!(association:% = association.id(), start:% = start, end:% = end; "Indexing association");
        self.buckets
            .entry(start)
            .or_default()
            .entry(end)
            .or_default()
            .push(association.clone());
    }

    /// Unfiles the association from its current bucket; a no-op when it was
    /// never indexed. Emptied buckets are pruned so stale gadget ids do not
    /// accumulate.
    pub fn remove(&mut self, association: &Association) {
        self.remove_under(association, association.start_id(), association.end_id());
    }

    /// Moves an association whose endpoints changed from its old bucket to
    /// the one matching its current endpoint ids.
    ///
    /// Fails with [`ModelError::NotIndexed`] when the association is not
    /// filed under `(old_start, old_end)`; the index is unchanged in that
    /// case.
    pub fn update(
        &mut self,
        association: &Association,
        old_start: GadgetId,
        old_end: GadgetId,
    ) -> Result<(), ModelError> {
        let found = self
            .buckets
            .get(&old_start)
            .and_then(|ends| ends.get(&old_end))
            .is_some_and(|bucket| bucket.contains(association));
        if !found {
            return Err(ModelError::NotIndexed(association.id()));
        }
        self.remove_under(association, old_start, old_end);
        self.insert(association);
        Ok(())
    }

    /// Associations from `start` to `end`, in insertion order
    pub fn find_start_end(&self, start: GadgetId, end: GadgetId) -> Vec<Association> {
        self.buckets
            .get(&start)
            .and_then(|ends| ends.get(&end))
            .cloned()
            .unwrap_or_default()
    }

    /// Associations starting at `start`, in insertion order
    pub fn find_start(&self, start: GadgetId) -> Vec<Association> {
        self.buckets
            .get(&start)
            .map(|ends| ends.values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// Associations ending at `end`, in insertion order
    pub fn find_end(&self, end: GadgetId) -> Vec<Association> {
        self.buckets
            .values()
            .filter_map(|ends| ends.get(&end))
            .flatten()
            .cloned()
            .collect()
    }

    /// Associations touching `gadget` at either end. A self-loop is filed
    /// under both roles but reported once.
    pub fn find_either(&self, gadget: GadgetId) -> Vec<Association> {
        let mut found = self.find_start(gadget);
        for association in self.find_end(gadget) {
            if !found.contains(&association) {
                found.push(association);
            }
        }
        found
    }

    /// Unfiles every association touching `gadget` and returns them, each
    /// once. This is the index half of removing a gadget; the caller owns
    /// detaching the returned associations from the model.
    pub fn remove_gadget(&mut self, gadget: GadgetId) -> Vec<Association> {
        let removed = self.find_either(gadget);
        for association in &removed {
            self.remove(association);
        }
        debug!(gadget:% = gadget, count = removed.len(); "Unindexed associations of removed gadget");
        removed
    }

    fn remove_under(&mut self, association: &Association, start: GadgetId, end: GadgetId) {
        let Some(ends) = self.buckets.get_mut(&start) else {
            return;
        };
        if let Some(bucket) = ends.get_mut(&end) {
            bucket.retain(|candidate| candidate != association);
            if bucket.is_empty() {
                ends.shift_remove(&end);
            }
        }
        if ends.is_empty() {
            self.buckets.shift_remove(&start);
        }
    }
}
