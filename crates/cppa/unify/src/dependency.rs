//! Dependency edges between unified components and the inclusion sweep
//! that decides which of them end up in the agreement.
//!
//! Unification is speculative: many candidate channel pairs are tried and
//! cached, but only components reachable from a successfully merged action
//! binding may be emitted. Edges are recorded as components consume each
//! other; the sweep then walks them from the included action bindings.

use crate::key::{Category, UnificationKey};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A `(source, category, target)` edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub source: UnificationKey,
    pub category: Category,
    pub target: UnificationKey,
}

#[derive(Debug, Default)]
pub struct DependencyGraph {
    edges: HashMap<UnificationKey, Vec<(Category, UnificationKey)>>,
    edge_count: usize,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `source` consumes `target`. Duplicate edges are ignored.
    pub fn record(&mut self, source: &UnificationKey, category: Category, target: &UnificationKey) {
        let targets = self.edges.entry(source.clone()).or_default();
        if targets
            .iter()
            .any(|(c, t)| *c == category && t == target)
        {
            return;
        }
        debug!(source = %source, category = %category, target = %target, "Dependency recorded");
        targets.push((category, target.clone()));
        self.edge_count += 1;
    }

    /// Targets of `source` in `category`, in recording order.
    pub fn targets<'a>(
        &'a self,
        source: &UnificationKey,
        category: Category,
    ) -> impl Iterator<Item = &'a UnificationKey> + 'a {
        self.edges
            .get(source)
            .into_iter()
            .flatten()
            .filter(move |(c, _)| *c == category)
            .map(|(_, t)| t)
    }

    pub fn len(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }

    /// Compute the components reachable from the included action bindings.
    ///
    /// 1. channels and payload profiles of included action bindings;
    /// 2. channels of included channels, transitively, including channels
    ///    referenced from their packages' external payloads;
    /// 3. transports of included channels;
    /// 4. packages of included channels.
    pub fn sweep(&self, action_bindings: &[UnificationKey]) -> Inclusion {
        let mut inclusion = Inclusion::default();
        for binding in action_bindings {
            inclusion.include(Category::ActionBinding, binding);
        }

        for binding in action_bindings {
            for channel in self.targets(binding, Category::Channel) {
                inclusion.include(Category::Channel, channel);
            }
            for profile in self.targets(binding, Category::PayloadProfile) {
                inclusion.include(Category::PayloadProfile, profile);
            }
        }

        // The list grows while it is walked, which makes the closure transitive.
        let mut next = 0;
        while next < inclusion.channels.len() {
            let channel = inclusion.channels[next].clone();
            let mut reached: Vec<UnificationKey> =
                self.targets(&channel, Category::Channel).cloned().collect();
            for package in self.targets(&channel, Category::Package) {
                reached.extend(self.targets(package, Category::Channel).cloned());
            }
            for target in &reached {
                inclusion.include(Category::Channel, target);
            }
            next += 1;
        }

        let channels = inclusion.channels.clone();
        for channel in &channels {
            for transport in self.targets(channel, Category::Transport) {
                inclusion.include(Category::Transport, transport);
            }
        }
        for channel in &channels {
            for package in self.targets(channel, Category::Package) {
                inclusion.include(Category::Package, package);
            }
        }

        debug!(
            action_bindings = inclusion.action_bindings.len(),
            channels = inclusion.channels.len(),
            transports = inclusion.transports.len(),
            payload_profiles = inclusion.payload_profiles.len(),
            packages = inclusion.packages.len(),
            "Inclusion sweep complete"
        );
        inclusion
    }
}

/// Components selected for emission, each list in inclusion order.
#[derive(Debug, Default, Clone)]
pub struct Inclusion {
    pub action_bindings: Vec<UnificationKey>,
    pub channels: Vec<UnificationKey>,
    pub transports: Vec<UnificationKey>,
    pub payload_profiles: Vec<UnificationKey>,
    pub packages: Vec<UnificationKey>,
    seen: HashSet<(Category, UnificationKey)>,
}

impl Inclusion {
    fn include(&mut self, category: Category, key: &UnificationKey) {
        if !self.seen.insert((category, key.clone())) {
            return;
        }
        let list = match category {
            Category::ActionBinding => &mut self.action_bindings,
            Category::Channel => &mut self.channels,
            Category::Transport => &mut self.transports,
            Category::PayloadProfile => &mut self.payload_profiles,
            Category::Package => &mut self.packages,
        };
        list.push(key.clone());
    }

    pub fn contains(&self, category: Category, key: &UnificationKey) -> bool {
        self.seen.contains(&(category, key.clone()))
    }
}
