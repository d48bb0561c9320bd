//! Arena-backed XML document
//!
//! [`XmlTree`] stores elements in a flat arena indexed by [`NodeId`] and
//! implements [`TreeProxy`] over it. Parsing walks the quick-xml event
//! stream with a stack of open elements; writing replays the arena
//! depth-first through a quick-xml writer. Only elements and text are
//! modeled — attributes, comments and processing instructions are ignored
//! on read and never produced on write, which is all the serialized tree
//! shape needs.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use opal_reflect::Value;

use crate::error::{Result, XmlError};
use crate::proxy::TreeProxy;

const NO_NODE: usize = usize::MAX;

/// Token addressing one element of an [`XmlTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

impl NodeId {
    /// Token answering `is_valid == false` on every tree
    pub const INVALID: NodeId = NodeId(NO_NODE);
}

#[derive(Debug)]
struct NodeData {
    name: String,
    text: String,
    parent: usize,
    children: Vec<usize>,
}

/// In-memory XML document with one root element
#[derive(Debug)]
pub struct XmlTree {
    nodes: Vec<NodeData>,
}

impl XmlTree {
    /// New document holding just a root element
    pub fn with_root(name: impl Into<String>) -> Self {
        Self {
            nodes: vec![NodeData {
                name: name.into(),
                text: String::new(),
                parent: NO_NODE,
                children: Vec::new(),
            }],
        }
    }

    /// Root element token
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Parse a document from XML text
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut nodes: Vec<NodeData> = Vec::new();
        let mut open: Vec<usize> = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Start(element) => {
                    let index = Self::push_element(&mut nodes, &open, &element)?;
                    open.push(index);
                }
                Event::Empty(element) => {
                    Self::push_element(&mut nodes, &open, &element)?;
                }
                Event::Text(ref text) => {
                    let content = text.unescape().unwrap_or_default();
                    let trimmed = content.trim();
                    if !trimmed.is_empty() {
                        if let Some(&top) = open.last() {
                            nodes[top].text.push_str(trimmed);
                        }
                    }
                }
                Event::CData(ref data) => {
                    if let Some(&top) = open.last() {
                        nodes[top]
                            .text
                            .push_str(&String::from_utf8_lossy(data.as_ref()));
                    }
                }
                Event::End(_) => {
                    open.pop();
                }
                Event::Eof => break,
                // Declarations, comments and processing instructions
                // carry nothing the tree models.
                _ => {}
            }
        }

        if nodes.is_empty() {
            return Err(XmlError::Malformed {
                reason: "document has no root element".to_string(),
            });
        }
        Ok(Self { nodes })
    }

    /// Render the document as XML text
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        self.write_node(&mut writer, 0)?;
        String::from_utf8(writer.into_inner()).map_err(|e| XmlError::Malformed {
            reason: e.to_string(),
        })
    }

    fn push_element(
        nodes: &mut Vec<NodeData>,
        open: &[usize],
        element: &BytesStart<'_>,
    ) -> Result<usize> {
        let name = String::from_utf8_lossy(element.name().as_ref()).to_string();
        let parent = open.last().copied();
        if parent.is_none() && !nodes.is_empty() {
            return Err(XmlError::Malformed {
                reason: "document has more than one root element".to_string(),
            });
        }
        let index = nodes.len();
        nodes.push(NodeData {
            name,
            text: String::new(),
            parent: parent.unwrap_or(NO_NODE),
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            nodes[parent].children.push(index);
        }
        Ok(index)
    }

    fn write_node(&self, writer: &mut Writer<Vec<u8>>, index: usize) -> Result<()> {
        let node = &self.nodes[index];
        writer.write_event(Event::Start(BytesStart::new(node.name.as_str())))?;
        if !node.text.is_empty() {
            writer.write_event(Event::Text(BytesText::new(node.text.as_str())))?;
        }
        for &child in &node.children {
            self.write_node(writer, child)?;
        }
        writer.write_event(Event::End(BytesEnd::new(node.name.as_str())))?;
        Ok(())
    }

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0)
    }
}

impl TreeProxy for XmlTree {
    type Node = NodeId;

    fn is_valid(&self, node: NodeId) -> bool {
        node.0 < self.nodes.len()
    }

    fn add_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        if !self.is_valid(parent) {
            return NodeId::INVALID;
        }
        let index = self.nodes.len();
        self.nodes.push(NodeData {
            name: name.to_string(),
            text: String::new(),
            parent: parent.0,
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(index);
        NodeId(index)
    }

    fn first_child(&self, parent: NodeId, name: Option<&str>) -> NodeId {
        let Some(node) = self.node(parent) else {
            return NodeId::INVALID;
        };
        node.children
            .iter()
            .find(|&&child| name.is_none_or(|n| self.nodes[child].name == n))
            .map(|&child| NodeId(child))
            .unwrap_or(NodeId::INVALID)
    }

    fn next_sibling(&self, node: NodeId, name: Option<&str>) -> NodeId {
        let Some(data) = self.node(node) else {
            return NodeId::INVALID;
        };
        let Some(parent) = self.nodes.get(data.parent) else {
            return NodeId::INVALID;
        };
        let Some(position) = parent.children.iter().position(|&c| c == node.0) else {
            return NodeId::INVALID;
        };
        parent.children[position + 1..]
            .iter()
            .find(|&&sibling| name.is_none_or(|n| self.nodes[sibling].name == n))
            .map(|&sibling| NodeId(sibling))
            .unwrap_or(NodeId::INVALID)
    }

    fn text(&self, node: NodeId) -> Value {
        self.node(node)
            .map(|n| Value::String(n.text.clone()))
            .unwrap_or(Value::None)
    }

    fn set_text(&mut self, node: NodeId, value: &Value) {
        if let Some(data) = self.nodes.get_mut(node.0) {
            data.text = value.to_string();
        }
    }

    fn name(&self, node: NodeId) -> String {
        self.node(node).map(|n| n.name.clone()).unwrap_or_default()
    }
}
