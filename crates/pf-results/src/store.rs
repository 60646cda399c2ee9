//! The shared polar store.
//!
//! Names are unique. Structural mutations (insert, remove, reorder) take the
//! write side of one `RwLock`, so they exclude each other and readers only
//! ever see whole mutations. A merge additionally holds the merge mutex from
//! start to finish, and `insert`/`remove` wait on it, so no other structural
//! change lands between a merge's jobs. Readers receive `Arc` handles and
//! interpolate without holding any lock.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use pf_batch::NameIndex;
use pf_core::{Tolerances, nearly_equal};
use pf_polars::{BoundaryLayerRecord, ReferenceCurve};
use tracing::debug;

use crate::palette::{Color, pick_color};

/// A stored polar and its display color.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEntry {
    pub curve: Arc<ReferenceCurve>,
    pub color: Color,
}

/// Coalesced change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Changed { revision: u64 },
}

#[derive(Debug, Default)]
pub(crate) struct StoreInner {
    entries: Vec<StoreEntry>,
    index: HashMap<String, usize>,
    details: Vec<BoundaryLayerRecord>,
    detail_names: HashSet<String>,
    revision: u64,
}

impl StoreInner {
    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.curve.name().to_string(), i))
            .collect();
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub(crate) fn contains_detail(&self, name: &str) -> bool {
        self.detail_names.contains(name)
    }

    /// Insert unless the name is taken. Returns false for a duplicate.
    pub(crate) fn insert_curve(&mut self, curve: ReferenceCurve, color: Option<Color>) -> bool {
        if self.contains(curve.name()) {
            return false;
        }
        let color = color.unwrap_or_else(|| pick_color(self.entries.iter().map(|e| &e.color)));
        self.index
            .insert(curve.name().to_string(), self.entries.len());
        self.entries.push(StoreEntry {
            curve: Arc::new(curve),
            color,
        });
        true
    }

    /// Insert a detail record unless its name is taken.
    pub(crate) fn insert_detail(&mut self, record: BoundaryLayerRecord) -> bool {
        if !self.detail_names.insert(record.name.clone()) {
            return false;
        }
        self.details.push(record);
        true
    }

    pub(crate) fn remove_curve(&mut self, name: &str) -> bool {
        let Some(pos) = self.index.get(name).copied() else {
            return false;
        };
        self.entries.remove(pos);
        self.reindex();
        let detail_names = &mut self.detail_names;
        self.details.retain(|d| {
            let keep = d.parent.as_deref() != Some(name);
            if !keep {
                detail_names.remove(&d.name);
            }
            keep
        });
        true
    }

    /// Sort polars by subject, conditions, then name; details by parent and angle.
    pub(crate) fn reorder(&mut self) {
        self.entries.sort_by(|a, b| {
            let (ca, cb) = (&a.curve, &b.curve);
            ca.subject()
                .cmp(cb.subject())
                .then(ca.reynolds().total_cmp(&cb.reynolds()))
                .then(ca.mach().total_cmp(&cb.mach()))
                .then(ca.conditions().ncrit.total_cmp(&cb.conditions().ncrit))
                .then_with(|| ca.name().cmp(cb.name()))
        });
        self.reindex();
        self.details.sort_by(|a, b| {
            a.parent
                .cmp(&b.parent)
                .then(a.alpha.total_cmp(&b.alpha))
                .then_with(|| a.name.cmp(&b.name))
        });
    }

    /// Re-pick colors for `names` in display order, avoiding every other entry's color.
    pub(crate) fn recolor(&mut self, names: &HashSet<String>) {
        if names.is_empty() {
            return;
        }
        let mut used: Vec<Color> = self
            .entries
            .iter()
            .filter(|e| !names.contains(e.curve.name()))
            .map(|e| e.color)
            .collect();
        for entry in self.entries.iter_mut() {
            if names.contains(entry.curve.name()) {
                entry.color = pick_color(&used);
                used.push(entry.color);
            }
        }
    }

    pub(crate) fn bump_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }
}

#[derive(Debug, Default)]
pub struct SharedStore {
    inner: RwLock<StoreInner>,
    merge_lock: Mutex<()>,
    listeners: Mutex<Vec<Sender<StoreEvent>>>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation leaves `StoreInner` consistent before it can panic, so a
    // poisoned lock still guards valid data.
    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Held by a whole merge and by `insert`/`remove`; always taken before
    /// the write lock.
    pub(crate) fn merge_guard(&self) -> MutexGuard<'_, ()> {
        self.merge_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.read().contains(name)
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<ReferenceCurve>> {
        let inner = self.read();
        inner
            .index
            .get(name)
            .map(|&i| Arc::clone(&inner.entries[i].curve))
    }

    pub fn color_of(&self, name: &str) -> Option<Color> {
        let inner = self.read();
        inner.index.get(name).map(|&i| inner.entries[i].color)
    }

    /// Insert a polar with a fresh display color. Returns false if the name exists.
    ///
    /// Waits for any merge in progress.
    pub fn insert(&self, curve: ReferenceCurve) -> bool {
        let _merge = self.merge_guard();
        let revision = {
            let mut inner = self.write();
            let name = curve.name().to_string();
            if !inner.insert_curve(curve, None) {
                debug!(%name, "insert rejected, name exists");
                return false;
            }
            inner.reorder();
            inner.bump_revision()
        };
        self.notify(revision);
        true
    }

    /// Remove a polar and every detail record parented to it.
    ///
    /// Waits for any merge in progress.
    pub fn remove(&self, name: &str) -> bool {
        let _merge = self.merge_guard();
        let revision = {
            let mut inner = self.write();
            if !inner.remove_curve(name) {
                return false;
            }
            inner.bump_revision()
        };
        self.notify(revision);
        true
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.read().revision
    }

    /// Polar names in display order.
    pub fn names(&self) -> Vec<String> {
        self.read()
            .entries
            .iter()
            .map(|e| e.curve.name().to_string())
            .collect()
    }

    /// All entries in display order.
    pub fn entries(&self) -> Vec<StoreEntry> {
        self.read().entries.clone()
    }

    /// Polars of `subject`, ascending in Reynolds number.
    pub fn curves_for_subject(&self, subject: &str) -> Vec<Arc<ReferenceCurve>> {
        let mut curves: Vec<Arc<ReferenceCurve>> = self
            .read()
            .entries
            .iter()
            .filter(|e| e.curve.subject() == subject)
            .map(|e| Arc::clone(&e.curve))
            .collect();
        curves.sort_by(|a, b| a.reynolds().total_cmp(&b.reynolds()));
        curves
    }

    /// Polars of `subject` at one Mach number and amplification factor,
    /// ascending in Reynolds number: a family that varies only in Reynolds.
    pub fn reynolds_family(&self, subject: &str, mach: f64, ncrit: f64) -> Vec<Arc<ReferenceCurve>> {
        let tol = Tolerances {
            abs: 1e-9,
            rel: 1e-9,
        };
        self.curves_for_subject(subject)
            .into_iter()
            .filter(|c| {
                nearly_equal(c.mach(), mach, tol) && nearly_equal(c.conditions().ncrit, ncrit, tol)
            })
            .collect()
    }

    pub fn detail_exists(&self, name: &str) -> bool {
        self.read().contains_detail(name)
    }

    /// Detail records parented to `curve_name`, ascending in angle of attack.
    pub fn details_for(&self, curve_name: &str) -> Vec<BoundaryLayerRecord> {
        self.read()
            .details
            .iter()
            .filter(|d| d.parent.as_deref() == Some(curve_name))
            .cloned()
            .collect()
    }

    pub fn detail_count(&self) -> usize {
        self.read().details.len()
    }

    pub(crate) fn all_details(&self) -> Vec<BoundaryLayerRecord> {
        self.read().details.clone()
    }

    /// Receive a `StoreEvent` after every committed change.
    pub fn subscribe(&self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub(crate) fn notify(&self, revision: u64) {
        let event = StoreEvent::Changed { revision };
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|tx| tx.send(event).is_ok());
    }
}

impl NameIndex for SharedStore {
    fn contains_name(&self, name: &str) -> bool {
        self.exists(name)
    }
}
