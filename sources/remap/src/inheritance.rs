//! The class hierarchy across every archive visible to a run.
//!
//! Nodes live in an arena indexed by name. The graph is built once and then
//! only read, ancestor walks borrow it and carry their own cursor.

use std::collections::{HashMap, HashSet};

use parse::{classfile::ClassHeader, flags::ClassFileAccessFlags, parser::Parser};
use tracing::{debug, info, trace};

use crate::error::{RemapError, Result};
use crate::provider::ClassProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNode {
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub access_flags: ClassFileAccessFlags,
}

impl From<ClassHeader> for ClassNode {
    fn from(header: ClassHeader) -> Self {
        Self {
            name: header.name,
            super_name: header.super_name,
            interfaces: header.interfaces,
            access_flags: header.access_flags,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InheritanceGraph {
    nodes: Vec<ClassNode>,
    index: HashMap<String, usize>,
}

impl InheritanceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every class of every provider. Earlier providers win name collisions.
    pub fn build(providers: &mut [Box<dyn ClassProvider>]) -> Result<Self> {
        let mut graph = Self::new();

        for provider in providers.iter_mut() {
            let origin = provider.describe();
            let mut added = 0;

            for name in provider.names() {
                let Some(bytes) = provider.class_bytes(&name)? else {
                    continue;
                };

                let header = Parser::new(&bytes)
                    .parse_header()
                    .map_err(|source| RemapError::MalformedClass {
                        entry: format!("{}!{}.class", origin, name),
                        source,
                    })?;

                if graph.insert(header) {
                    added += 1;
                }
            }

            debug!("Indexed {} classes from {}", added, origin);
        }

        info!("Inheritance graph holds {} classes", graph.len());
        Ok(graph)
    }

    /// Add a class unless one of the same name is already known.
    pub fn insert(&mut self, header: impl Into<ClassNode>) -> bool {
        let node = header.into();
        if self.index.contains_key(&node.name) {
            trace!("Keeping the first definition of {}", node.name);
            return false;
        }

        self.index.insert(node.name.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    pub fn get(&self, name: &str) -> Option<&ClassNode> {
        self.index.get(name).map(|&index| &self.nodes[index])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every ancestor of `name`: the superclass chain first, then the
    /// interfaces of the class and of each superclass, depth first.
    /// A class outside the graph is yielded but its own ancestry is unknown.
    pub fn ancestors_of(&self, name: &str) -> Ancestors<'_> {
        let mut ancestors = Ancestors {
            graph: self,
            next_super: None,
            chain: vec![],
            expanded: 0,
            stack: vec![],
            seen: HashSet::new(),
        };

        match self.get(name) {
            Some(node) => {
                ancestors.seen.insert(node.name.as_str());
                ancestors.next_super = node.super_name.as_deref();
                ancestors.chain.push(node);
            }
            None => trace!("Missing ancestor: {} is not on the classpath", name),
        }

        ancestors
    }
}

pub struct Ancestors<'g> {
    graph: &'g InheritanceGraph,
    next_super: Option<&'g str>,
    /// The class itself followed by each superclass found so far
    chain: Vec<&'g ClassNode>,
    /// How many of `chain` have had their interfaces queued
    expanded: usize,
    stack: Vec<&'g str>,
    seen: HashSet<&'g str>,
}

impl<'g> Ancestors<'g> {
    fn visit(&self, name: &'g str) -> Option<&'g ClassNode> {
        let node = self.graph.get(name);
        if node.is_none() {
            trace!("Missing ancestor: {} is not on the classpath", name);
        }

        node
    }
}

impl<'g> Iterator for Ancestors<'g> {
    type Item = &'g str;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(name) = self.next_super.take() {
            // A cycle ends the chain, malformed input should not loop forever
            if self.seen.insert(name) {
                if let Some(node) = self.visit(name) {
                    self.next_super = node.super_name.as_deref();
                    self.chain.push(node);
                }

                return Some(name);
            }
        }

        loop {
            while let Some(name) = self.stack.pop() {
                if !self.seen.insert(name) {
                    continue;
                }

                if let Some(node) = self.visit(name) {
                    self.stack
                        .extend(node.interfaces.iter().rev().map(|s| s.as_str()));
                }

                return Some(name);
            }

            let node = *self.chain.get(self.expanded)?;
            self.expanded += 1;
            self.stack
                .extend(node.interfaces.iter().rev().map(|s| s.as_str()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryProvider;
    use parse::builder::ClassBuilder;

    fn node(name: &str, super_name: Option<&str>, interfaces: &[&str]) -> ClassNode {
        ClassNode {
            name: name.to_string(),
            super_name: super_name.map(|s| s.to_string()),
            interfaces: interfaces.iter().map(|s| s.to_string()).collect(),
            access_flags: ClassFileAccessFlags::PUBLIC,
        }
    }

    fn diamond() -> InheritanceGraph {
        let mut graph = InheritanceGraph::new();
        graph.insert(node("C", Some("B"), &["I", "J"]));
        graph.insert(node("B", Some("A"), &["K"]));
        graph.insert(node("A", Some("java/lang/Object"), &["J"]));
        graph.insert(node("I", None, &["L"]));
        graph.insert(node("J", None, &["L"]));
        graph.insert(node("K", None, &[]));
        graph.insert(node("L", None, &[]));
        graph
    }

    #[test]
    fn it_walks_superclasses_before_interfaces() {
        let graph = diamond();
        let order: Vec<&str> = graph.ancestors_of("C").collect();

        assert_eq!(
            order,
            vec!["B", "A", "java/lang/Object", "I", "L", "J", "K"]
        );
    }

    #[test]
    fn it_restarts_every_walk() {
        let graph = diamond();
        let first: Vec<&str> = graph.ancestors_of("B").collect();
        let second: Vec<&str> = graph.ancestors_of("B").collect();

        assert_eq!(first, vec!["A", "java/lang/Object", "K", "J", "L"]);
        assert_eq!(first, second);
    }

    #[test]
    fn it_stops_at_unknown_classes() {
        let mut graph = InheritanceGraph::new();
        graph.insert(node("Derived", Some("lib/Base"), &["lib/Api"]));

        let order: Vec<&str> = graph.ancestors_of("Derived").collect();
        assert_eq!(order, vec!["lib/Base", "lib/Api"]);

        assert_eq!(graph.ancestors_of("Nowhere").count(), 0);
    }

    #[test]
    fn it_survives_cycles() {
        let mut graph = InheritanceGraph::new();
        graph.insert(node("A", Some("B"), &["I"]));
        graph.insert(node("B", Some("A"), &[]));
        graph.insert(node("I", None, &["I"]));

        let order: Vec<&str> = graph.ancestors_of("A").collect();
        assert_eq!(order, vec!["B", "I"]);
    }

    #[test]
    fn it_keeps_the_first_definition() -> anyhow::Result<()> {
        let mut input = MemoryProvider::new();
        input.insert(ClassBuilder::new("net/World", Some("net/Base"))?.to_bytes()?)?;

        let mut classpath = MemoryProvider::new();
        classpath.insert(ClassBuilder::new("net/World", Some("java/lang/Object"))?.to_bytes()?)?;
        classpath.insert(ClassBuilder::new("net/Base", Some("java/lang/Object"))?.to_bytes()?)?;

        let mut providers: Vec<Box<dyn ClassProvider>> = vec![Box::new(input), Box::new(classpath)];
        let graph = InheritanceGraph::build(&mut providers)?;

        assert_eq!(graph.len(), 2);
        assert_eq!(
            graph.get("net/World").and_then(|n| n.super_name.as_deref()),
            Some("net/Base")
        );
        assert!(graph.contains("net/Base"));

        Ok(())
    }
}
