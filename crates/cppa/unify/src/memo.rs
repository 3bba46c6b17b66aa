use crate::error::{Result, UnifyError};
use crate::key::{Category, UnificationKey};
use cppa_document::Element;
use std::collections::HashMap;

/// Outcome of unifying one component pair. `None` means neither side named
/// a component, which unifies trivially but emits nothing.
pub type Unified = Option<Element>;

#[derive(Debug, Clone)]
enum MemoEntry {
    InProgress,
    Done(Result<Unified>),
}

/// Results for one component category, keyed by [`UnificationKey`].
///
/// A key is marked in progress before its unification recurses, so a
/// reference cycle back to it fails with [`UnifyError::Reentrant`] instead
/// of recursing forever. Failures are cached like successes.
#[derive(Debug)]
pub struct MemoTable {
    category: Category,
    entries: HashMap<UnificationKey, MemoEntry>,
    order: Vec<UnificationKey>,
}

impl MemoTable {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Cached outcome for `key`, if unification has already started.
    pub fn lookup(&self, key: &UnificationKey) -> Option<Result<Unified>> {
        self.entries.get(key).map(|entry| match entry {
            MemoEntry::InProgress => Err(UnifyError::Reentrant {
                category: self.category,
                key: key.clone(),
            }),
            MemoEntry::Done(result) => result.clone(),
        })
    }

    pub fn begin(&mut self, key: &UnificationKey) {
        if self
            .entries
            .insert(key.clone(), MemoEntry::InProgress)
            .is_none()
        {
            self.order.push(key.clone());
        }
    }

    /// Record the outcome for `key` and hand it back.
    pub fn finish(&mut self, key: &UnificationKey, result: Result<Unified>) -> Result<Unified> {
        self.entries
            .insert(key.clone(), MemoEntry::Done(result.clone()));
        result
    }

    /// The unified element for a key that completed successfully.
    pub fn unified(&self, key: &UnificationKey) -> Option<&Element> {
        match self.entries.get(key) {
            Some(MemoEntry::Done(Ok(Some(element)))) => Some(element),
            _ => None,
        }
    }

    pub fn succeeded(&self, key: &UnificationKey) -> bool {
        matches!(self.entries.get(key), Some(MemoEntry::Done(Ok(_))))
    }

    pub fn failed(&self, key: &UnificationKey) -> bool {
        matches!(self.entries.get(key), Some(MemoEntry::Done(Err(_))))
    }

    /// Keys in the order their unification started.
    pub fn keys(&self) -> impl Iterator<Item = &UnificationKey> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The four per-run caches.
#[derive(Debug)]
pub struct MemoTables {
    channels: MemoTable,
    transports: MemoTable,
    packages: MemoTable,
    payload_profiles: MemoTable,
}

impl Default for MemoTables {
    fn default() -> Self {
        Self {
            channels: MemoTable::new(Category::Channel),
            transports: MemoTable::new(Category::Transport),
            packages: MemoTable::new(Category::Package),
            payload_profiles: MemoTable::new(Category::PayloadProfile),
        }
    }
}

impl MemoTables {
    /// Table for a memoised category. Action bindings are never memoised
    /// and map to the channel table.
    pub fn table(&self, category: Category) -> &MemoTable {
        match category {
            Category::Transport => &self.transports,
            Category::Package => &self.packages,
            Category::PayloadProfile => &self.payload_profiles,
            Category::Channel | Category::ActionBinding => &self.channels,
        }
    }

    pub fn table_mut(&mut self, category: Category) -> &mut MemoTable {
        match category {
            Category::Transport => &mut self.transports,
            Category::Package => &mut self.packages,
            Category::PayloadProfile => &mut self.payload_profiles,
            Category::Channel | Category::ActionBinding => &mut self.channels,
        }
    }
}
