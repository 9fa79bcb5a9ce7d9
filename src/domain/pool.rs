//! Resolution pool
//!
//! The pool aggregates every known source unit across packages and
//! resolves tags to their providers. It maintains three registries
//! (provides, extensions, replacements), a wildcard-capable provides
//! index, and a per-unit cache of direct dependency lookups. The pool
//! computes transitive closures; linearizing them is the ordering
//! container's job.

use std::collections::{HashMap, VecDeque};

use log::warn;
use thiserror::Error;

use super::container::Container;
use super::package::Package;
use super::source_unit::SourceUnit;
use super::tag::Tag;
use super::tag_tree::TagTree;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("illegal lookup key {0:?}: parses to an empty tag name")]
    InvalidLookupKey(String),
}

/// A lookup argument: a tag, a raw tag string, or a unit passed through.
#[derive(Debug, Clone)]
pub enum LookupKey {
    Tag(Tag),
    Name(String),
    Unit(SourceUnit),
}

impl From<Tag> for LookupKey {
    fn from(tag: Tag) -> Self {
        LookupKey::Tag(tag)
    }
}

impl From<&Tag> for LookupKey {
    fn from(tag: &Tag) -> Self {
        LookupKey::Tag(tag.clone())
    }
}

impl From<&str> for LookupKey {
    fn from(name: &str) -> Self {
        LookupKey::Name(name.to_string())
    }
}

impl From<String> for LookupKey {
    fn from(name: String) -> Self {
        LookupKey::Name(name)
    }
}

impl From<SourceUnit> for LookupKey {
    fn from(unit: SourceUnit) -> Self {
        LookupKey::Unit(unit)
    }
}

impl From<&SourceUnit> for LookupKey {
    fn from(unit: &SourceUnit) -> Self {
        LookupKey::Unit(unit.clone())
    }
}

/// Anything that can be registered into a pool.
#[derive(Debug)]
pub enum PoolEntry {
    Unit(SourceUnit),
    Units(Vec<SourceUnit>),
    Package(Package),
    Pool(Pool),
}

impl From<SourceUnit> for PoolEntry {
    fn from(unit: SourceUnit) -> Self {
        PoolEntry::Unit(unit)
    }
}

impl From<Vec<SourceUnit>> for PoolEntry {
    fn from(units: Vec<SourceUnit>) -> Self {
        PoolEntry::Units(units)
    }
}

impl From<Package> for PoolEntry {
    fn from(package: Package) -> Self {
        PoolEntry::Package(package)
    }
}

impl From<Pool> for PoolEntry {
    fn from(pool: Pool) -> Self {
        PoolEntry::Pool(pool)
    }
}

/// Global registry resolving tags to units across all known packages.
#[derive(Debug, Default)]
pub struct Pool {
    packages: Vec<Package>,
    units: Vec<SourceUnit>,

    /// Tag -> canonical providing unit. Later registrations for the
    /// same tag win; the conflict is logged, not fatal.
    provides_map: HashMap<Tag, SourceUnit>,

    /// Tag -> extension units targeting it.
    extensions_map: HashMap<Tag, Vec<SourceUnit>>,

    /// Tag -> replacement unit targeting it.
    replacement_map: HashMap<Tag, SourceUnit>,

    /// Wildcard-capable index over all provided tags.
    provides_tree: TagTree<Tag>,

    /// Direct-dependency lookups, keyed by canonical unit.
    dependency_cache: HashMap<SourceUnit, Vec<SourceUnit>>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    /// All packages registered so far, unordered.
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// All units registered so far, unordered.
    pub fn units(&self) -> &[SourceUnit] {
        &self.units
    }

    /// Registers a unit, a package, another pool, or a plain sequence.
    pub fn register(&mut self, entry: impl Into<PoolEntry>) -> &mut Self {
        match entry.into() {
            PoolEntry::Unit(unit) => self.register_unit(unit),
            PoolEntry::Units(units) => {
                for unit in units {
                    self.register_unit(unit);
                }
            }
            PoolEntry::Package(package) => {
                for unit in package.units() {
                    self.register_unit(unit.clone());
                }
                for extension in package.extensions() {
                    self.register_unit(extension.clone());
                }
                self.packages.push(package);
            }
            PoolEntry::Pool(pool) => {
                for unit in pool.units {
                    self.register_unit(unit);
                }
                self.packages.extend(pool.packages);
            }
        }
        self
    }

    fn register_unit(&mut self, unit: SourceUnit) {
        for tag in unit.provides() {
            self.provides_tree.insert(&tag.full_name(), tag.clone());
        }

        if unit.is_extension() {
            if let Some(target) = unit.extends() {
                self.extensions_map.entry(target.clone()).or_default().push(unit.clone());
            }
        } else {
            for tag in unit.provides() {
                if let Some(existing) = self.provides_map.get(tag) {
                    if existing != &unit {
                        warn!(
                            "redeclared {} in {} (previously declared in {})",
                            tag, unit, existing
                        );
                    }
                }
                self.provides_map.insert(tag.clone(), unit.clone());
            }
            if let Some(replaced) = unit.replaces() {
                self.replacement_map.insert(replaced.clone(), unit.clone());
            }
        }

        self.units.push(unit);
    }

    /// Resolves a key to the canonical unit providing it.
    ///
    /// A unit passes through unchanged; a string is parsed to a tag
    /// first and fails with [`PoolError::InvalidLookupKey`] when the
    /// parsed tag name is empty.
    pub fn lookup(&self, key: impl Into<LookupKey>) -> Result<Option<SourceUnit>, PoolError> {
        match key.into() {
            LookupKey::Unit(unit) => Ok(Some(unit)),
            LookupKey::Tag(tag) => Ok(self.provides_map.get(&tag).cloned()),
            LookupKey::Name(name) => {
                let tag = Tag::new(&name);
                if tag.is_empty() {
                    return Err(PoolError::InvalidLookupKey(name));
                }
                Ok(self.provides_map.get(&tag).cloned())
            }
        }
    }

    /// Resolves the direct dependencies of a unit through the global
    /// provides index, wildcard-aware. A requirement with no provider
    /// anywhere in the pool is logged and skipped; it may be satisfied
    /// by a bundle outside the pool's knowledge. Results are cached per
    /// unit until [`Pool::flush_cache`].
    pub fn lookup_direct_dependencies(
        &mut self,
        key: impl Into<LookupKey>,
    ) -> Result<Vec<SourceUnit>, PoolError> {
        let Some(unit) = self.lookup(key)? else {
            return Ok(Vec::new());
        };
        if let Some(cached) = self.dependency_cache.get(&unit) {
            return Ok(cached.clone());
        }
        let dependencies = self.resolve_direct_dependencies(&unit);
        self.dependency_cache.insert(unit, dependencies.clone());
        Ok(dependencies)
    }

    fn resolve_direct_dependencies(&self, unit: &SourceUnit) -> Vec<SourceUnit> {
        let mut dependencies = Vec::new();
        for requirement in unit.requires() {
            let matches = self.provides_tree.glob(&requirement.full_name());
            if matches.is_empty() {
                warn!("{} is missing {}", unit, requirement);
                continue;
            }
            for tag in matches {
                if let Some(provider) = self.provides_map.get(&tag) {
                    if !dependencies.contains(provider) {
                        dependencies.push(provider.clone());
                    }
                }
            }
        }
        dependencies
    }

    /// Transitive closure of a unit's dependencies: repeated expansion
    /// until no new units appear. Unordered, duplicate-free; does not
    /// include the unit itself unless it is reachable from its own
    /// requirements.
    pub fn lookup_dependencies(
        &mut self,
        key: impl Into<LookupKey>,
    ) -> Result<Vec<SourceUnit>, PoolError> {
        let Some(unit) = self.lookup(key)? else {
            return Ok(Vec::new());
        };
        let mut closure: Vec<SourceUnit> = Vec::new();
        let mut queue: VecDeque<SourceUnit> =
            self.lookup_direct_dependencies(&unit)?.into_iter().collect();
        while let Some(dependency) = queue.pop_front() {
            if closure.contains(&dependency) {
                continue;
            }
            for next in self.lookup_direct_dependencies(&dependency)? {
                if !closure.contains(&next) {
                    queue.push_back(next);
                }
            }
            closure.push(dependency);
        }
        Ok(closure)
    }

    /// The replacement targeting any of the unit's provided tags.
    pub fn lookup_replacement(&self, unit: &SourceUnit) -> Option<SourceUnit> {
        unit.provides()
            .iter()
            .find_map(|tag| self.replacement_map.get(tag).cloned())
    }

    /// All extensions targeting any of the unit's provided tags.
    pub fn lookup_extensions(&self, unit: &SourceUnit) -> Vec<SourceUnit> {
        let mut extensions = Vec::new();
        for tag in unit.provides() {
            if let Some(found) = self.extensions_map.get(tag) {
                for extension in found {
                    if !extensions.contains(extension) {
                        extensions.push(extension.clone());
                    }
                }
            }
        }
        extensions
    }

    /// Assembles the full sortable unit set for a package: every
    /// regular unit plus its transitive dependencies, then every
    /// collected unit's replacement and extensions. Returns a container
    /// ready to be sorted.
    pub fn compile_package(&mut self, package: &Package) -> Result<Container, PoolError> {
        let mut collected: Vec<SourceUnit> = Vec::new();
        for unit in package.units() {
            if !collected.contains(unit) {
                collected.push(unit.clone());
            }
            if unit.is_replacement() {
                continue;
            }
            for dependency in self.lookup_dependencies(unit)? {
                if !collected.contains(&dependency) {
                    collected.push(dependency);
                }
            }
        }

        let mut extras: Vec<SourceUnit> = Vec::new();
        for unit in &collected {
            if let Some(replacement) = self.lookup_replacement(unit) {
                extras.push(replacement);
            }
            extras.extend(self.lookup_extensions(unit));
        }

        let mut container = Container::new();
        container.push(collected);
        container.push(extras);
        Ok(container)
    }

    /// Drops all cached dependency resolutions.
    pub fn flush_cache(&mut self) {
        self.dependency_cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(name: &str, provides: &[&str], requires: &[&str]) -> SourceUnit {
        let mut header = String::from("/*\n---\ndescription: test\n");
        header.push_str(&format!("provides: [{}]\n", provides.join(", ")));
        if !requires.is_empty() {
            header.push_str(&format!("requires: [{}]\n", requires.join(", ")));
        }
        header.push_str("...\n*/\n");
        SourceUnit::from_text(&header, None)
            .unwrap()
            .with_filename(format!("/pool/{name}.js"))
    }

    fn pool_with(units: &[SourceUnit]) -> Pool {
        let mut pool = Pool::new();
        pool.register(units.to_vec());
        pool
    }

    #[test]
    fn lookup_by_tag_string_and_unit() {
        let a = unit("a", &["Core/Class"], &[]);
        let pool = pool_with(&[a.clone()]);

        assert_eq!(pool.lookup(Tag::new("Core/Class")).unwrap(), Some(a.clone()));
        assert_eq!(pool.lookup("Core/Class").unwrap(), Some(a.clone()));
        // Normalization applies to string keys.
        assert_eq!(pool.lookup("core/class").unwrap(), Some(a.clone()));
        assert_eq!(pool.lookup(&a).unwrap(), Some(a));
    }

    #[test]
    fn lookup_missing_tag_is_none() {
        let pool = pool_with(&[]);
        assert_eq!(pool.lookup("Missing/Tag").unwrap(), None);
    }

    #[test]
    fn empty_key_is_invalid() {
        let pool = pool_with(&[]);
        let err = pool.lookup("").unwrap_err();
        assert!(matches!(err, PoolError::InvalidLookupKey(_)));
    }

    #[test]
    fn direct_dependencies_resolve_through_the_index() {
        let a = unit("a", &["Core/Class"], &[]);
        let b = unit("b", &["Core/Hash"], &["Core/Class"]);
        let mut pool = pool_with(&[a.clone(), b.clone()]);

        assert_eq!(pool.lookup_direct_dependencies(&b).unwrap(), vec![a]);
    }

    #[test]
    fn direct_dependencies_support_wildcards() {
        let a = unit("a", &["Core/Class"], &[]);
        let b = unit("b", &["Core/Hash"], &[]);
        let app = unit("app", &["App/Main"], &["Core/*"]);
        let mut pool = pool_with(&[a.clone(), b.clone(), app.clone()]);

        let deps = pool.lookup_direct_dependencies(&app).unwrap();
        assert!(deps.contains(&a));
        assert!(deps.contains(&b));
        assert_eq!(deps.len(), 2);
    }

    #[test]
    fn unresolved_requirement_is_nonfatal() {
        let b = unit("b", &["Core/Hash"], &["Core/Missing"]);
        let mut pool = pool_with(&[b.clone()]);

        assert!(pool.lookup_direct_dependencies(&b).unwrap().is_empty());
    }

    #[test]
    fn diamond_closure_has_no_duplicates() {
        let d = unit("d", &["D"], &[]);
        let b = unit("b", &["B"], &["D"]);
        let c = unit("c", &["C"], &["D"]);
        let a = unit("a", &["A"], &["B", "C"]);
        let mut pool = pool_with(&[a.clone(), b.clone(), c.clone(), d.clone()]);

        let closure = pool.lookup_dependencies(&a).unwrap();
        assert_eq!(closure.len(), 3);
        assert!(closure.contains(&b));
        assert!(closure.contains(&c));
        assert!(closure.contains(&d));
    }

    #[test]
    fn closure_of_unknown_key_is_empty() {
        let mut pool = pool_with(&[]);
        assert!(pool.lookup_dependencies("No/Such").unwrap().is_empty());
    }

    #[test]
    fn redeclaration_last_wins() {
        let first = unit("first", &["Core/Class"], &[]);
        let second = unit("second", &["Core/Class"], &[]);
        let pool = pool_with(&[first, second.clone()]);

        assert_eq!(pool.lookup("Core/Class").unwrap(), Some(second));
    }

    #[test]
    fn dependency_cache_is_flushable() {
        let a = unit("a", &["Core/Class"], &[]);
        let b = unit("b", &["Core/Hash"], &["Core/Class"]);
        let mut pool = pool_with(&[b.clone()]);

        // Resolved (and cached) before `a` is known.
        assert!(pool.lookup_direct_dependencies(&b).unwrap().is_empty());

        pool.register(a.clone());
        assert!(pool.lookup_direct_dependencies(&b).unwrap().is_empty());

        pool.flush_cache();
        assert_eq!(pool.lookup_direct_dependencies(&b).unwrap(), vec![a]);
    }

    #[test]
    fn replacement_and_extension_lookup() {
        let klass = unit("klass", &["Core/Class"], &[]);

        let repl_text =
            "/*\n---\ndescription: r\nprovides: [Class]\nreplaces: Core/Class\n...\n*/\n";
        let repl = SourceUnit::from_text(repl_text, Some("Test"))
            .unwrap()
            .with_filename("/pool/repl.js");

        let ext_text = "/*\n---\ndescription: e\nextends: Core/Class\n...\n*/\n";
        let ext = SourceUnit::from_text(ext_text, Some("Test"))
            .unwrap()
            .with_filename("/pool/ext.js");

        let pool = pool_with(&[klass.clone(), repl.clone(), ext.clone()]);

        assert_eq!(pool.lookup_replacement(&klass), Some(repl));
        assert_eq!(pool.lookup_extensions(&klass), vec![ext]);
    }

    #[test]
    fn compile_package_collects_dependencies_and_grafts() {
        let core = unit("core", &["Core/Class"], &[]);
        let helper = unit("helper", &["Core/Hash"], &["Core/Class"]);

        let ext_text = "/*\n---\ndescription: e\nextends: Core/Class\n...\n*/\n";
        let ext = SourceUnit::from_text(ext_text, Some("Orwik"))
            .unwrap()
            .with_filename("/pool/class_ext.js");

        let mut pool = pool_with(&[core.clone(), helper.clone(), ext.clone()]);

        let mut package = Package::new("App");
        let main = unit("main", &["App/Main"], &["Core/Hash"]);
        package.add_unit(main.clone());
        pool.register(vec![main.clone()]);

        let mut container = pool.compile_package(&package).unwrap();
        let order = container.sources().unwrap().to_vec();

        assert!(order.contains(&main));
        assert!(order.contains(&helper));
        assert!(order.contains(&core));
        // The extension rides along and sits right after its target.
        let core_pos = order.iter().position(|u| u == &core).unwrap();
        assert_eq!(order.iter().position(|u| u == &ext), Some(core_pos + 1));
        // Dependency order holds.
        let helper_pos = order.iter().position(|u| u == &helper).unwrap();
        let main_pos = order.iter().position(|u| u == &main).unwrap();
        assert!(core_pos < helper_pos && helper_pos < main_pos);
    }
}
