//! Construct tree: node identity, the parent-scope seam, and the root app.
//!
//! Construction is pure: building an `App` and its stacks allocates
//! in-memory descriptors only. Problems such as duplicate ids surface when
//! the app is synthesized (see `core::synth::validate_app`).

use super::stack::Stack;

/// Separator between ids in a construct path.
pub const PATH_SEP: &str = "/";

/// Identity of a construct: its own id and its path from the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    id: String,
    path: String,
}

impl Node {
    /// The root node. Its id and path are both empty.
    pub fn root() -> Self {
        Self {
            id: String::new(),
            path: String::new(),
        }
    }

    /// Derive a child node under this one.
    pub fn child(&self, id: &str) -> Self {
        let path = if self.path.is_empty() {
            id.to_string()
        } else {
            format!("{}{}{}", self.path, PATH_SEP, id)
        };
        Self {
            id: id.to_string(),
            path,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path components from the root (empty for the root itself).
    pub fn components(&self) -> Vec<&str> {
        if self.path.is_empty() {
            Vec::new()
        } else {
            self.path.split(PATH_SEP).collect()
        }
    }
}

/// Anything that occupies a place in the construct tree and can act as a
/// parent scope.
pub trait Construct {
    fn node(&self) -> &Node;
}

/// Root scope holding the application's stacks in declaration order.
#[derive(Debug, Clone)]
pub struct App {
    node: Node,
    stacks: Vec<Stack>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            node: Node::root(),
            stacks: Vec::new(),
        }
    }

    /// Register a stack. Ids are not checked here.
    pub fn add_stack(&mut self, stack: impl Into<Stack>) {
        let stack = stack.into();
        tracing::debug!(stack = stack.node().path(), "registered stack");
        self.stacks.push(stack);
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    /// Look up a stack by construct id (first match).
    pub fn stack(&self, id: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.node().id() == id)
    }
}

impl Construct for App {
    fn node(&self) -> &Node {
        &self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stack::StackProps;

    #[test]
    fn test_root_node_is_empty() {
        let root = Node::root();
        assert_eq!(root.id(), "");
        assert_eq!(root.path(), "");
        assert!(root.components().is_empty());
    }

    #[test]
    fn test_child_paths() {
        let dev = Node::root().child("Dev");
        assert_eq!(dev.path(), "Dev");
        let table = dev.child("UsersTable");
        assert_eq!(table.id(), "UsersTable");
        assert_eq!(table.path(), "Dev/UsersTable");
        assert_eq!(table.components(), vec!["Dev", "UsersTable"]);
    }

    #[test]
    fn test_app_keeps_declaration_order() {
        let mut app = App::new();
        let b = Stack::new(&app, "Beta", StackProps::default());
        let a = Stack::new(&app, "Alpha", StackProps::default());
        app.add_stack(b);
        app.add_stack(a);
        let ids: Vec<_> = app.stacks().iter().map(|s| s.node().id()).collect();
        assert_eq!(ids, vec!["Beta", "Alpha"]);
        assert!(app.stack("Alpha").is_some());
        assert!(app.stack("Gamma").is_none());
    }

    #[test]
    fn test_app_accepts_duplicate_ids() {
        let mut app = App::new();
        let first = Stack::new(&app, "Dev", StackProps::default());
        let second = Stack::new(&app, "Dev", StackProps::default());
        app.add_stack(first);
        app.add_stack(second);
        assert_eq!(app.stacks().len(), 2);
    }
}
