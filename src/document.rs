/*!
 * Owned document tree.
 *
 * The tree has a document root, one node per record (opened by a record
 * header line), one node per paragraph (non-blank line) and one node per
 * subtitle caption, attached to the paragraph holding its mark. Paragraphs
 * before the first record header hang directly off the root.
 *
 * Nodes live in an arena and refer to each other by `NodeId`, so parent
 * links, siblings and child indexes are plain lookups.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::captions::CaptionExtractor;

/// Record header lines, e.g. `^^^ {: .rid #rid-63480009}`
static RECORD_HEADER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\^\^\^[^\n]*#rid-([[:alnum:]]+)").expect("Invalid record header regex")
});

/// Index of a node in its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// What a node represents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Record { record_id: String },
    Paragraph { line: usize },
    Caption { sequence_index: usize, char_length: usize },
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct DocumentTree {
    nodes: Vec<Node>,
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentTree {
    /// Tree holding only the document root
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Build the tree of a marked-up text
    pub fn parse(text: &str, extractor: &CaptionExtractor) -> Self {
        let mut tree = Self::new();
        let mut captions = extractor.extract(text).into_iter().peekable();
        let mut container = tree.root();
        let mut line_start = 0;

        for (line_no, line) in text.split('\n').enumerate() {
            let line_end = line_start + line.len();

            if let Some(caps) = RECORD_HEADER_REGEX.captures(line) {
                container = tree.append_child(
                    tree.root(),
                    NodeKind::Record {
                        record_id: caps[1].to_string(),
                    },
                );
            } else if !line.trim().is_empty() {
                let paragraph = tree.append_child(container, NodeKind::Paragraph { line: line_no });
                while let Some(caption) = captions.next_if(|c| c.position < line_end) {
                    tree.append_child(
                        paragraph,
                        NodeKind::Caption {
                            sequence_index: caption.sequence_index,
                            char_length: caption.char_length,
                        },
                    );
                }
            }

            line_start = line_end + 1;
        }

        tree
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Position of a node among its parent's children
    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.child_index(id)?;
        self.children(parent).get(idx + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.child_index(id)?;
        idx.checked_sub(1).map(|i| self.children(parent)[i])
    }

    /// Add a node as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let index = self.children(parent).len();
        self.insert_child(parent, index, kind)
    }

    /// Add a node at `index` among the children of `parent`
    pub fn insert_child(&mut self, parent: NodeId, index: usize, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        let children = &mut self.nodes[parent.0].children;
        children.insert(index.min(children.len()), id);
        id
    }

    /// Detach a node (and its subtree) from its parent
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Nodes below `id` in document order, `id` excluded
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// Caption nodes in document order
    pub fn captions(&self) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| matches!(self.kind(*id), NodeKind::Caption { .. }))
            .collect()
    }

    /// Record id of the closest record ancestor
    pub fn record_of(&self, id: NodeId) -> Option<&str> {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if let NodeKind::Record { record_id } = self.kind(node) {
                return Some(record_id);
            }
            current = self.parent(node);
        }
        None
    }

    /// Record id of every caption that belongs to a record, in document order
    pub fn record_ids(&self) -> Vec<String> {
        self.captions()
            .into_iter()
            .filter_map(|id| self.record_of(id).map(str::to_string))
            .collect()
    }
}
