//! The in-memory collection of QR codes the dashboard renders.
//!
//! Entries are always kept sorted ascending by id with at most one entry
//! per id. Every mutation goes through a method here so those two
//! invariants hold no matter which path (refresh, push, rename, delete)
//! changed the set.

use crate::error::CoreError;
use crate::qr_code::{QrCode, ScanUpdate};
use crate::types::DbId;

/// Aggregate figures shown in the dashboard header cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub active_links: usize,
    pub total_scans: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingSet {
    entries: Vec<QrCode>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a working set from a collection fetched from the server.
    pub fn from_collection(items: Vec<QrCode>) -> Self {
        let mut set = Self::new();
        set.replace_all(items);
        set
    }

    /// Replace the whole set with a fresh server collection.
    ///
    /// The collection is sorted by id. If the server ever returns the same
    /// id twice, the later row wins.
    pub fn replace_all(&mut self, mut items: Vec<QrCode>) {
        items.sort_by_key(|qr| qr.id);
        items.dedup_by(|later, kept| {
            if later.id == kept.id {
                std::mem::swap(later, kept);
                true
            } else {
                false
            }
        });
        self.entries = items;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QrCode> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[QrCode] {
        &self.entries
    }

    pub fn ids(&self) -> Vec<DbId> {
        self.entries.iter().map(|qr| qr.id).collect()
    }

    pub fn get(&self, id: DbId) -> Option<&QrCode> {
        self.position(id).map(|idx| &self.entries[idx])
    }

    pub fn contains(&self, id: DbId) -> bool {
        self.position(id).is_some()
    }

    pub fn total_scans(&self) -> u64 {
        self.entries.iter().map(|qr| qr.scan_count).sum()
    }

    pub fn stats(&self) -> DashboardStats {
        DashboardStats {
            active_links: self.len(),
            total_scans: self.total_scans(),
        }
    }

    /// Overwrite the scan counter of the matching entry.
    ///
    /// Returns `false` (and changes nothing) when no entry has that id.
    pub fn apply_scan_update(&mut self, update: &ScanUpdate) -> bool {
        match self.position(update.id) {
            Some(idx) => {
                self.entries[idx].scan_count = update.scan_count;
                true
            }
            None => false,
        }
    }

    /// Set the custom label of one entry. Only the label changes.
    pub fn rename(&mut self, id: DbId, label: impl Into<String>) -> Result<(), CoreError> {
        let idx = self.position(id).ok_or(CoreError::NotFound {
            entity: "qr_code",
            id,
        })?;
        self.entries[idx].custom_name = Some(label.into());
        Ok(())
    }

    /// Remove an entry, returning it if it was present.
    pub fn remove(&mut self, id: DbId) -> Option<QrCode> {
        self.position(id).map(|idx| self.entries.remove(idx))
    }

    fn position(&self, id: DbId) -> Option<usize> {
        self.entries.binary_search_by_key(&id, |qr| qr.id).ok()
    }
}

impl<'a> IntoIterator for &'a WorkingSet {
    type Item = &'a QrCode;
    type IntoIter = std::slice::Iter<'a, QrCode>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
