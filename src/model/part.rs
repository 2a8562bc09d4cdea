//! The MIME part tree of one message, stored as an arena.
//!
//! Parts refer to each other by index only. Index 0 is the top-level
//! content node; every other part has exactly one parent, and a parent's
//! children are kept in boundary-appearance order.

use std::collections::BTreeMap;

/// One MIME entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Part {
    /// Transfer-decoded payload. Empty for `multipart/*` containers.
    pub content: Vec<u8>,
    /// Lowercased MIME type, e.g. `text/plain`.
    pub content_type: String,
    /// Per-part header attributes (`charset`, `filename`, `transfer-encoding`, …).
    pub attributes: BTreeMap<String, String>,
    /// `None` for the root.
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

impl Part {
    /// `text/*` parts and parts without a type carry literal text.
    pub fn is_text(&self) -> bool {
        self.content_type.is_empty() || self.content_type.starts_with("text/")
    }

    pub fn is_multipart(&self) -> bool {
        self.content_type.starts_with("multipart/")
    }

    /// Payload as text (lossy for non-UTF-8 content).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// Arena of [`Part`]s with parent/child links by index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartForest {
    parts: Vec<Part>,
}

impl PartForest {
    /// Append a part under `parent` and return its index.
    ///
    /// # Panics
    /// If `parent` does not refer to an existing part.
    pub fn push(
        &mut self,
        content_type: impl Into<String>,
        content: Vec<u8>,
        attributes: BTreeMap<String, String>,
        parent: Option<usize>,
    ) -> usize {
        let index = self.parts.len();
        if let Some(p) = parent {
            self.parts[p].children.push(index);
        }
        self.parts.push(Part {
            content,
            content_type: content_type.into(),
            attributes,
            parent,
            children: Vec::new(),
        });
        index
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Part> {
        self.parts.get(index)
    }

    pub fn root(&self) -> Option<&Part> {
        self.parts.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter()
    }

    pub fn parent_of(&self, index: usize) -> Option<usize> {
        self.parts.get(index).and_then(|p| p.parent)
    }

    pub fn children_of(&self, index: usize) -> &[usize] {
        self.parts
            .get(index)
            .map(|p| p.children.as_slice())
            .unwrap_or(&[])
    }

    /// Indices in depth-first order starting at the root.
    pub fn depth_first(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.parts.len());
        let mut stack: Vec<usize> = self
            .parts
            .iter()
            .enumerate()
            .filter(|(_, p)| p.parent.is_none())
            .map(|(i, _)| i)
            .rev()
            .collect();
        while let Some(i) = stack.pop() {
            order.push(i);
            stack.extend(self.parts[i].children.iter().rev());
        }
        order
    }
}
