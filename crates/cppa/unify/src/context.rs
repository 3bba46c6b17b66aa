//! Mutable state of one unification run.

use crate::config::UnifierConfig;
use crate::dependency::DependencyGraph;
use crate::error::{Result, UnifyError};
use crate::identifier::{self, IdentifierGenerator};
use crate::key::{Category, Direction, UnificationKey};
use crate::memo::{MemoTables, Unified};
use crate::primitives::merge_attributes;
use cppa_document::Element;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

/// Everything a run accumulates: memo tables, dependency edges, assigned
/// identifiers, included action bindings and the credential generator.
///
/// The two (already preprocessed) profiles are borrowed for `'p`, so
/// handlers can hold references into them while mutating the context.
pub struct UnificationContext<'p> {
    pub(crate) acpp: &'p Element,
    pub(crate) bcpp: &'p Element,
    pub(crate) acpp_id: String,
    pub(crate) bcpp_id: String,
    pub(crate) config: &'p UnifierConfig,
    pub(crate) memo: MemoTables,
    pub(crate) dependencies: DependencyGraph,
    identifiers: IdentifierGenerator,
    pub(crate) action_bindings: Vec<UnificationKey>,
    rng: StdRng,
}

impl<'p> UnificationContext<'p> {
    pub fn new(
        acpp: &'p Element,
        acpp_id: impl Into<String>,
        bcpp: &'p Element,
        bcpp_id: impl Into<String>,
        config: &'p UnifierConfig,
    ) -> Self {
        let rng = match config.credential_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            acpp,
            bcpp,
            acpp_id: acpp_id.into(),
            bcpp_id: bcpp_id.into(),
            config,
            memo: MemoTables::default(),
            dependencies: DependencyGraph::new(),
            identifiers: IdentifierGenerator::new(),
            action_bindings: Vec::new(),
            rng,
        }
    }

    /// Key pairing component `a` of profile A with component `b` of B.
    pub fn key(&self, a: Option<&str>, b: Option<&str>) -> UnificationKey {
        UnificationKey::new(&self.acpp_id, a, &self.bcpp_id, b)
    }

    /// Derived identifier of a key.
    pub fn id(&mut self, key: &UnificationKey) -> Result<String> {
        self.identifiers.identifier(key)
    }

    pub fn record(&mut self, source: &UnificationKey, category: Category, target: &UnificationKey) {
        self.dependencies.record(source, category, target);
    }

    /// Look `key` up in the `category` table, computing and caching it on a
    /// miss. Failures are cached too and replayed on later lookups.
    pub fn memoize(
        &mut self,
        category: Category,
        key: &UnificationKey,
        compute: impl FnOnce(&mut Self) -> Result<Unified>,
    ) -> Result<Unified> {
        if let Some(cached) = self.memo.table(category).lookup(key) {
            debug!(category = %category, key = %key, ok = cached.is_ok(), "Cache hit");
            return cached;
        }
        self.memo.table_mut(category).begin(key);
        let result = compute(self);
        match &result {
            Ok(_) => debug!(category = %category, key = %key, "Unified"),
            Err(e) => debug!(category = %category, key = %key, error = %e, "Unification failed"),
        }
        self.memo.table_mut(category).finish(key, result)
    }

    /// Resolve a component id anywhere in profile A.
    pub fn a_lookup(&self, kind: &str, id: &str) -> Result<&'p Element> {
        self.acpp
            .find_by_id(id)
            .ok_or_else(|| UnifyError::dangling(kind, id))
    }

    /// Resolve a component id anywhere in profile B.
    pub fn b_lookup(&self, kind: &str, id: &str) -> Result<&'p Element> {
        self.bcpp
            .find_by_id(id)
            .ok_or_else(|| UnifyError::dangling(kind, id))
    }

    /// Username derived from the key of the component being unified.
    pub fn username(&self, key: &UnificationKey) -> String {
        identifier::username(key, self.config.username_length)
    }

    pub fn password(&mut self) -> String {
        identifier::password(&mut self.rng, self.config.password_length)
    }

    /// Merge the CPPA children named `local` of `a` and `b` through
    /// `handler`. Counts must be equal; children pair up by position. Each
    /// merged child then takes the union of its inputs' attributes.
    #[allow(clippy::too_many_arguments)]
    pub fn merge_complex_children<F>(
        &mut self,
        key: &UnificationKey,
        a: &'p Element,
        b: &'p Element,
        out: &mut Element,
        local: &str,
        direction: Option<Direction>,
        mut handler: F,
    ) -> Result<()>
    where
        F: FnMut(
            &mut Self,
            &UnificationKey,
            &'p Element,
            &'p Element,
            &mut Element,
            Option<Direction>,
        ) -> Result<()>,
    {
        let a_children: Vec<&'p Element> = a.cppa_children(local).collect();
        let b_children: Vec<&'p Element> = b.cppa_children(local).collect();
        if a_children.len() != b_children.len() {
            return Err(UnifyError::CountMismatch {
                element: local.to_string(),
                a: a_children.len(),
                b: b_children.len(),
            });
        }
        for (a_child, b_child) in a_children.into_iter().zip(b_children) {
            let mut merged = Element::new(a_child.name().clone());
            handler(self, key, a_child, b_child, &mut merged, direction)?;
            merge_attributes(a_child, b_child, &mut merged, false)?;
            out.push(merged);
        }
        Ok(())
    }
}
