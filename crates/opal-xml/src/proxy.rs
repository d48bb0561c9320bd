//! Tree-adapter contract
//!
//! The serialization engine is written once against this trait and never
//! against a concrete document library. Nodes are plain copyable tokens;
//! "no node" is an ordinary token answering `is_valid == false`, so the
//! walk code reads the same for hits and misses.

use opal_reflect::Value;

/// Abstraction over a hierarchical document the engine can walk
pub trait TreeProxy {
    /// Opaque node token
    type Node: Copy;

    /// Whether the token refers to a live node
    fn is_valid(&self, node: Self::Node) -> bool;

    /// Append a child element; an invalid token signals the tree rejected
    /// it
    fn add_child(&mut self, parent: Self::Node, name: &str) -> Self::Node;

    /// First child, optionally restricted to a tag name
    fn first_child(&self, parent: Self::Node, name: Option<&str>) -> Self::Node;

    /// Next sibling, optionally restricted to a tag name
    fn next_sibling(&self, node: Self::Node, name: Option<&str>) -> Self::Node;

    /// Text content as a string-kinded value
    fn text(&self, node: Self::Node) -> Value;

    /// Replace the text content with the value's rendering
    fn set_text(&mut self, node: Self::Node, value: &Value);

    /// Element tag name
    fn name(&self, node: Self::Node) -> String;
}
