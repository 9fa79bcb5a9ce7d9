//! Packaging step: concatenates sorted units into one bundle string.

use super::container::{Container, ContainerError};
use super::postproc::process_all;

/// Joins the working text of a container's sorted units.
#[derive(Debug)]
pub struct Packager {
    container: Container,
}

impl Packager {
    pub fn new(container: Container) -> Self {
        Packager { container }
    }

    /// Concatenates all sources in dependency order, newline-joined.
    pub fn pack(&mut self) -> Result<String, ContainerError> {
        self.pack_with(&[])
    }

    /// Like [`Packager::pack`], but runs the named post-processors over
    /// the already-ordered units first. The container itself is left
    /// untouched; splicing has happened by the time text is rewritten.
    pub fn pack_with(&mut self, processors: &[String]) -> Result<String, ContainerError> {
        let sources = self.container.sources()?.to_vec();
        let processed = process_all(sources, processors);
        let parts: Vec<&str> = processed.iter().map(|unit| unit.working_text()).collect();
        Ok(parts.join("\n"))
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source_unit::SourceUnit;

    fn unit(name: &str, provides: &str, requires: Option<&str>) -> SourceUnit {
        let mut header = format!("/*\n---\ndescription: t\nprovides: [{provides}]\n");
        if let Some(requires) = requires {
            header.push_str(&format!("requires: [{requires}]\n"));
        }
        header.push_str("...\n*/\n");
        SourceUnit::from_text(&format!("{header}// body of {name}\n"), None)
            .unwrap()
            .with_filename(format!("/p/{name}.js"))
    }

    #[test]
    fn pack_joins_in_dependency_order() {
        let a = unit("a", "A", None);
        let b = unit("b", "B", Some("A"));

        let mut container = Container::new();
        container.push(b);
        container.push(a);

        let bundle = Packager::new(container).pack().unwrap();
        let a_pos = bundle.find("body of a").unwrap();
        let b_pos = bundle.find("body of b").unwrap();
        assert!(a_pos < b_pos);
    }

    #[test]
    fn pack_empty_container() {
        let bundle = Packager::new(Container::new()).pack().unwrap();
        assert!(bundle.is_empty());
    }

    #[test]
    fn pack_with_rewrites_text_without_reordering() {
        let a = unit("a", "A", None);
        let b = unit("b", "B", Some("A"));

        let mut container = Container::new();
        container.push(b);
        container.push(a);

        let mut packager = Packager::new(container);
        let bundle = packager.pack_with(&["semicolon".to_string()]).unwrap();
        assert!(bundle.starts_with(";\n"));
        let a_pos = bundle.find("body of a").unwrap();
        let b_pos = bundle.find("body of b").unwrap();
        assert!(a_pos < b_pos);

        // The container keeps its original text.
        let untouched = packager.pack().unwrap();
        assert!(!untouched.starts_with(";\n"));
    }
}
