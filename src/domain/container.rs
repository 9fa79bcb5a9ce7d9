//! Ordering container
//!
//! Holds source units in three buckets (normal, extension, replacement)
//! and lazily computes a topological order of the normal units that
//! respects their provides/requires edges. Extensions are spliced in
//! right after the unit they extend; replacements overwrite the unit
//! they replace in place. The computed order is cached until the next
//! push.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use log::error;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use thiserror::Error;

use super::source_unit::SourceUnit;
use super::tag::Tag;
use super::tag_tree::TagTree;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("circular dependencies detected: {}", describe_cycles(.cycles))]
    CyclicDependency { cycles: Vec<Vec<String>> },
}

fn describe_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| cycle.join(" => "))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Anything that can be pushed into a container.
#[derive(Debug)]
pub enum ContainerItem {
    Unit(SourceUnit),
    Units(Vec<SourceUnit>),
    Container(Container),
    None,
}

impl From<SourceUnit> for ContainerItem {
    fn from(unit: SourceUnit) -> Self {
        ContainerItem::Unit(unit)
    }
}

impl From<Option<SourceUnit>> for ContainerItem {
    fn from(unit: Option<SourceUnit>) -> Self {
        match unit {
            Some(unit) => ContainerItem::Unit(unit),
            None => ContainerItem::None,
        }
    }
}

impl From<Vec<SourceUnit>> for ContainerItem {
    fn from(units: Vec<SourceUnit>) -> Self {
        ContainerItem::Units(units)
    }
}

impl From<Container> for ContainerItem {
    fn from(container: Container) -> Self {
        ContainerItem::Container(container)
    }
}

/// A set of source units maintaining a topologically sorted order.
#[derive(Debug, Default, Clone)]
pub struct Container {
    normal: Vec<SourceUnit>,
    extensions: Vec<SourceUnit>,
    replacements: Vec<SourceUnit>,

    /// Cached sorted sequence; `None` means dirty.
    sorted: Option<Vec<SourceUnit>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a container from an initial set of units.
    pub fn from_units(units: impl IntoIterator<Item = SourceUnit>) -> Self {
        let mut container = Self::new();
        for unit in units {
            container.push(unit);
        }
        container
    }

    /// Pushes a unit, a sequence of units, or another container.
    ///
    /// Units are classified into buckets by their extension/replacement
    /// flags. Duplicates already present in the target bucket are
    /// ignored. Any push invalidates the cached order.
    pub fn push(&mut self, item: impl Into<ContainerItem>) -> &mut Self {
        match item.into() {
            ContainerItem::Unit(unit) => self.push_unit(unit),
            ContainerItem::Units(units) => {
                for unit in units {
                    self.push_unit(unit);
                }
            }
            ContainerItem::Container(container) => {
                for unit in container.all_units() {
                    self.push_unit(unit.clone());
                }
            }
            ContainerItem::None => {}
        }
        self.sorted = None;
        self
    }

    fn push_unit(&mut self, unit: SourceUnit) {
        let bucket = if unit.is_extension() {
            &mut self.extensions
        } else if unit.is_replacement() {
            &mut self.replacements
        } else {
            &mut self.normal
        };
        if !bucket.contains(&unit) {
            bucket.push(unit);
        }
    }

    /// All units regardless of bucket, in push order, unsorted.
    pub fn all_units(&self) -> impl Iterator<Item = &SourceUnit> {
        self.normal
            .iter()
            .chain(self.extensions.iter())
            .chain(self.replacements.iter())
    }

    pub fn normal_units(&self) -> &[SourceUnit] {
        &self.normal
    }

    pub fn extension_units(&self) -> &[SourceUnit] {
        &self.extensions
    }

    pub fn replacement_units(&self) -> &[SourceUnit] {
        &self.replacements
    }

    /// True while the cached order is valid.
    pub fn is_sorted(&self) -> bool {
        self.sorted.is_some()
    }

    /// The materialized order, sorting first if dirty.
    pub fn sources(&mut self) -> Result<&[SourceUnit], ContainerError> {
        self.ensure_sorted()?;
        Ok(self.sorted.as_deref().unwrap_or_default())
    }

    /// Ordered filesystem paths of the sorted units, optionally made
    /// relative to `root`.
    pub fn required_files(&mut self, root: Option<&Path>) -> Result<Vec<PathBuf>, ContainerError> {
        let files = self
            .sources()?
            .iter()
            .flat_map(|unit| unit.required_files())
            .collect::<Vec<_>>();
        Ok(match root {
            Some(root) => files.iter().map(|f| relative_to(f, root)).collect(),
            None => files,
        })
    }

    /// Union of all provided tags across the sorted order.
    pub fn provides(&mut self) -> Result<Vec<Tag>, ContainerError> {
        let mut tags = Vec::new();
        for unit in self.sources()? {
            for tag in unit.provides() {
                if !tags.contains(tag) {
                    tags.push(tag.clone());
                }
            }
        }
        Ok(tags)
    }

    /// Union of all required tags minus the provided ones, i.e. the
    /// requirements this container cannot satisfy by itself.
    pub fn requires(&mut self) -> Result<Vec<Tag>, ContainerError> {
        let provided: HashSet<Tag> = self.provides()?.into_iter().collect();
        let mut tags = Vec::new();
        for unit in self.sources()? {
            for tag in unit.requires() {
                if !provided.contains(tag) && !tags.contains(tag) {
                    tags.push(tag.clone());
                }
            }
        }
        Ok(tags)
    }

    fn ensure_sorted(&mut self) -> Result<(), ContainerError> {
        if self.sorted.is_some() {
            return Ok(());
        }
        let mut order = self.topsort()?;
        self.insert_extensions(&mut order);
        self.insert_replacements(&mut order);
        dedup_preserving_first(&mut order);
        self.sorted = Some(order);
        Ok(())
    }

    /// Topologically sorts the normal units.
    ///
    /// Edges are resolved through a provides index over the normal
    /// units; a requirement may be a wildcard pattern, so one
    /// requirement can yield several providers. Kahn's algorithm runs
    /// with a LIFO ready stack seeded in discovery order, so among
    /// simultaneously-ready units the most recently discovered one is
    /// emitted first. Only edge order is contractual.
    fn topsort(&self) -> Result<Vec<SourceUnit>, ContainerError> {
        // Index slots by position among normal units. A replacement
        // occupies the slot of the unit it replaces at splice time, so
        // slot-level edges already point at whatever ultimately fills
        // the position.
        let mut tree: TagTree<usize> = TagTree::new();
        for (slot, unit) in self.normal.iter().enumerate() {
            for tag in unit.provides() {
                tree.insert(&tag.full_name(), slot);
            }
        }

        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..self.normal.len()).map(|i| graph.add_node(i)).collect();

        let mut lookup_cache: HashMap<String, Vec<usize>> = HashMap::new();
        for (slot, unit) in self.normal.iter().enumerate() {
            for requirement in unit.requires() {
                let key = requirement.full_name();
                let providers = lookup_cache
                    .entry(key)
                    .or_insert_with_key(|key| tree.glob(key));
                for &provider in providers.iter() {
                    graph.update_edge(nodes[provider], nodes[slot], ());
                }
            }
        }

        let mut indegree = vec![0usize; self.normal.len()];
        for edge in graph.edge_references() {
            indegree[graph[edge.target()]] += 1;
        }

        let mut ready: Vec<usize> = (0..self.normal.len())
            .filter(|&slot| indegree[slot] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.normal.len());

        while let Some(slot) = ready.pop() {
            order.push(slot);
            for neighbor in graph.neighbors(nodes[slot]) {
                let target = graph[neighbor];
                indegree[target] -= 1;
                if indegree[target] == 0 {
                    ready.push(target);
                }
            }
        }

        if order.len() < self.normal.len() {
            let cycles = self.collect_cycles(&graph);
            error!(
                "circular dependencies discovered, a valid order is impossible: {}",
                describe_cycles(&cycles)
            );
            return Err(ContainerError::CyclicDependency { cycles });
        }

        Ok(order.into_iter().map(|slot| self.normal[slot].clone()).collect())
    }

    /// Extracts cycle chains for diagnostics. Best effort: every
    /// non-trivial strongly connected component is reported as one
    /// closed chain of filenames.
    fn collect_cycles(&self, graph: &DiGraph<usize, ()>) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();
        for scc in petgraph::algo::tarjan_scc(graph) {
            let is_self_loop =
                scc.len() == 1 && graph.find_edge(scc[0], scc[0]).is_some();
            if scc.len() < 2 && !is_self_loop {
                continue;
            }
            let members: HashSet<NodeIndex> = scc.iter().copied().collect();
            let mut chain = vec![scc[0]];
            let mut seen = HashSet::from([scc[0]]);
            let mut current = scc[0];
            while let Some(next) = graph
                .neighbors(current)
                .find(|n| members.contains(n) && !seen.contains(n))
            {
                chain.push(next);
                seen.insert(next);
                current = next;
            }
            let mut names: Vec<String> = chain
                .iter()
                .map(|&node| self.normal[graph[node]].to_string())
                .collect();
            if let Some(first) = names.first().cloned() {
                names.push(first);
            }
            cycles.push(names);
        }
        cycles
    }

    /// Splices each extension right after the first unit providing the
    /// tag it extends. Extensions without a present target are dropped.
    fn insert_extensions(&self, order: &mut Vec<SourceUnit>) {
        for extension in &self.extensions {
            let Some(target) = extension.extends() else { continue };
            if let Some(pos) = order.iter().position(|unit| unit.provides().contains(target)) {
                order.insert(pos + 1, extension.clone());
            }
        }
    }

    /// Overwrites, in place, the first unit providing the tag each
    /// replacement replaces. Replacements without a present target are
    /// no-ops.
    fn insert_replacements(&self, order: &mut [SourceUnit]) {
        for replacement in &self.replacements {
            let Some(target) = replacement.replaces() else { continue };
            if let Some(pos) = order.iter().position(|unit| unit.provides().contains(target)) {
                order[pos] = replacement.clone();
            }
        }
    }
}

fn dedup_preserving_first(units: &mut Vec<SourceUnit>) {
    let mut seen: Vec<SourceUnit> = Vec::with_capacity(units.len());
    units.retain(|unit| {
        if seen.contains(unit) {
            false
        } else {
            seen.push(unit.clone());
            true
        }
    });
}

/// Projects `path` relative to `root`, walking up with `..` where the
/// paths diverge. Both paths are expected to be absolute.
fn relative_to(path: &Path, root: &Path) -> PathBuf {
    let path_components: Vec<_> = path.components().collect();
    let root_components: Vec<_> = root.components().collect();

    let common = path_components
        .iter()
        .zip(root_components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common..root_components.len() {
        result.push("..");
    }
    for component in &path_components[common..] {
        result.push(component);
    }
    result
}
