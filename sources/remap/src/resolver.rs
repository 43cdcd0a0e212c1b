//! Rename decisions for single symbols.
//!
//! Member lookups try the owner first and then walk its ancestors in graph
//! order; the first ancestor with an entry decides the name. Anything without
//! an entry keeps its name.

use parse::flags::{FieldAccessFlags, MethodAccessFlags};
use parse::remap::Remapper;
use tracing::trace;

use crate::inheritance::InheritanceGraph;
use crate::mapping::MappingTable;

#[derive(Clone, Copy)]
pub struct Resolver<'r> {
    mappings: &'r MappingTable,
    graph: &'r InheritanceGraph,
}

impl<'r> Resolver<'r> {
    pub fn new(mappings: &'r MappingTable, graph: &'r InheritanceGraph) -> Self {
        Self { mappings, graph }
    }

    pub fn resolve_class(&self, name: &str) -> Option<&'r str> {
        self.mappings.lookup_class(name)
    }

    pub fn resolve_field(&self, owner: &str, name: &str) -> Option<&'r str> {
        if let Some(mapped) = self.mappings.lookup_field(owner, name) {
            return Some(mapped);
        }

        self.graph.ancestors_of(owner).find_map(|ancestor| {
            let mapped = self.mappings.lookup_field(ancestor, name)?;
            trace!("{}.{} is inherited from {}", owner, name, ancestor);
            Some(mapped)
        })
    }

    pub fn resolve_method(&self, owner: &str, name: &str, descriptor: &str) -> Option<&'r str> {
        if let Some(mapped) = self.mappings.lookup_method(owner, name, descriptor) {
            return Some(mapped);
        }

        self.graph.ancestors_of(owner).find_map(|ancestor| {
            let mapped = self.mappings.lookup_method(ancestor, name, descriptor)?;
            trace!("{}.{}{} is inherited from {}", owner, name, descriptor, ancestor);
            Some(mapped)
        })
    }
}

impl<'r> Remapper for Resolver<'r> {
    fn map_class(&self, name: &str) -> Option<String> {
        self.resolve_class(name).map(|s| s.to_string())
    }

    fn map_field_name(
        &self,
        owner: &str,
        name: &str,
        _descriptor: &str,
        declared: Option<FieldAccessFlags>,
    ) -> Option<String> {
        // Private and static declarations are never the target of an inherited name
        let mapped = match declared {
            Some(flags) if flags.intersects(FieldAccessFlags::PRIVATE | FieldAccessFlags::STATIC) => {
                self.mappings.lookup_field(owner, name)
            }
            _ => self.resolve_field(owner, name),
        };

        mapped.map(|s| s.to_string())
    }

    fn map_method_name(
        &self,
        owner: &str,
        name: &str,
        descriptor: &str,
        declared: Option<MethodAccessFlags>,
    ) -> Option<String> {
        if name.starts_with('<') {
            return None;
        }

        let mapped = match declared {
            Some(flags) if flags.intersects(MethodAccessFlags::PRIVATE | MethodAccessFlags::STATIC) => {
                self.mappings.lookup_method(owner, name, descriptor)
            }
            _ => self.resolve_method(owner, name, descriptor),
        };

        mapped.map(|s| s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inheritance::ClassNode;
    use crate::mapping::Direction;
    use parse::flags::ClassFileAccessFlags;

    fn graph(classes: &[(&str, Option<&str>, &[&str])]) -> InheritanceGraph {
        let mut graph = InheritanceGraph::new();
        for (name, super_name, interfaces) in classes {
            graph.insert(ClassNode {
                name: name.to_string(),
                super_name: super_name.map(|s| s.to_string()),
                interfaces: interfaces.iter().map(|s| s.to_string()).collect(),
                access_flags: ClassFileAccessFlags::PUBLIC,
            });
        }
        graph
    }

    #[test]
    fn it_resolves_inherited_fields() -> anyhow::Result<()> {
        let mappings = MappingTable::parse("Base f g\n", Direction::Forward)?;
        let graph = graph(&[("Base", None, &[]), ("Derived", Some("Base"), &[])]);
        let resolver = Resolver::new(&mappings, &graph);

        assert_eq!(resolver.resolve_field("Derived", "f"), Some("g"));
        assert_eq!(resolver.resolve_field("Derived", "h"), None);
        assert_eq!(resolver.resolve_field("Unrelated", "f"), None);

        Ok(())
    }

    #[test]
    fn it_keeps_overloads_apart() -> anyhow::Result<()> {
        let mappings = MappingTable::parse("Owner m (I)V n\n", Direction::Forward)?;
        let graph = graph(&[("Owner", None, &[]), ("Sub", Some("Owner"), &[])]);
        let resolver = Resolver::new(&mappings, &graph);

        assert_eq!(resolver.resolve_method("Sub", "m", "(I)V"), Some("n"));
        assert_eq!(resolver.resolve_method("Owner", "m", "(Ljava/lang/String;)V"), None);
        assert_eq!(resolver.resolve_method("Sub", "m", "(Ljava/lang/String;)V"), None);

        Ok(())
    }

    #[test]
    fn it_takes_the_first_ancestor_that_matches() -> anyhow::Result<()> {
        // Inconsistent mappings: the superclass and an interface disagree
        let mappings = MappingTable::parse(
            "Base run ()V fromBase\nTask run ()V fromTask\nApi call ()V fromApi\nTask call ()V fromTask\n",
            Direction::Forward,
        )?;
        let graph = graph(&[
            ("Base", None, &["Api"]),
            ("Impl", Some("Base"), &["Task"]),
            ("Task", None, &[]),
            ("Api", None, &[]),
        ]);
        let resolver = Resolver::new(&mappings, &graph);

        assert_eq!(resolver.resolve_method("Impl", "run", "()V"), Some("fromBase"));
        // Interfaces of the class itself come before those of its superclass
        assert_eq!(resolver.resolve_method("Impl", "call", "()V"), Some("fromTask"));

        Ok(())
    }

    #[test]
    fn it_does_not_climb_for_private_declarations() -> anyhow::Result<()> {
        let mappings = MappingTable::parse("Base f g\nBase m ()V n\n", Direction::Forward)?;
        let graph = graph(&[("Base", None, &[]), ("Derived", Some("Base"), &[])]);
        let resolver = Resolver::new(&mappings, &graph);

        assert_eq!(
            resolver.map_field_name("Derived", "f", "I", Some(FieldAccessFlags::PRIVATE)),
            None
        );
        assert_eq!(
            resolver.map_field_name("Derived", "f", "I", Some(FieldAccessFlags::PUBLIC)),
            Some("g".to_string())
        );
        assert_eq!(
            resolver.map_method_name("Derived", "m", "()V", Some(MethodAccessFlags::STATIC)),
            None
        );
        assert_eq!(
            resolver.map_method_name("Derived", "m", "()V", None),
            Some("n".to_string())
        );

        Ok(())
    }

    #[test]
    fn it_passes_unknown_symbols_through() -> anyhow::Result<()> {
        let mappings = MappingTable::parse("a net/World\n", Direction::Forward)?;
        let graph = InheritanceGraph::new();
        let resolver = Resolver::new(&mappings, &graph);

        assert_eq!(resolver.map_class("java/lang/String"), None);
        assert_eq!(resolver.map_class("a"), Some("net/World".to_string()));
        assert_eq!(resolver.map_method_name("a", "<init>", "()V", None), None);
        assert_eq!(
            resolver.map_descriptor("(La;Ljava/lang/String;)[La;")?,
            "(Lnet/World;Ljava/lang/String;)[Lnet/World;"
        );

        Ok(())
    }
}
