//! Rendering container outlines and the top-level index.

use crate::hierarchy::DirectoryRole;

/// One link line in an outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineLink {
    pub title: String,
    /// Sanitized archive entry name.
    pub target: String,
}

/// An emitted directory and what was written beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    pub name: String,
    pub role: DirectoryRole,
    pub documents: Vec<OutlineLink>,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    pub fn new(name: impl Into<String>, role: DirectoryRole) -> Self {
        Self { name: name.into(), role, documents: Vec::new(), children: Vec::new() }
    }

    /// Whether this node or any non-attachment descendant lists a document.
    pub fn has_documents(&self) -> bool {
        !self.documents.is_empty()
            || self
                .children
                .iter()
                .any(|c| c.role != DirectoryRole::Attachments && c.has_documents())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OutlineBuilder {
    max_heading_level: u8,
}

impl Default for OutlineBuilder {
    fn default() -> Self {
        Self { max_heading_level: 6 }
    }
}

impl OutlineBuilder {
    pub fn new(max_heading_level: u8) -> Self {
        Self { max_heading_level: max_heading_level.clamp(1, 6) }
    }

    /// Outline of `node`: its own documents, then one heading per
    /// subdirectory, nested `base_level + depth - 1` deep.
    pub fn container_outline(&self, node: &OutlineNode, base_level: u8) -> String {
        let mut blocks = Vec::new();
        self.outline_blocks(node, base_level, 1, &mut blocks);
        finish(blocks)
    }

    /// The index document: standalone pages first, then every root
    /// container as a second-level heading followed by its outline.
    pub fn top_level_index(
        &self,
        title: &str,
        pages: &[OutlineLink],
        containers: &[OutlineNode],
    ) -> String {
        let mut blocks = vec![format!("# {title}")];
        if !pages.is_empty() {
            blocks.push(link_list(pages));
        }
        for container in containers {
            if container.role != DirectoryRole::RootContainer {
                continue;
            }
            blocks.push(format!("{} {}", "#".repeat(self.level(2).into()), container.name));
            self.outline_blocks(container, 3, 1, &mut blocks);
        }
        finish(blocks)
    }

    fn outline_blocks(&self, node: &OutlineNode, base: u8, depth: u8, blocks: &mut Vec<String>) {
        if !node.documents.is_empty() {
            blocks.push(link_list(&node.documents));
        }
        for child in &node.children {
            if child.role == DirectoryRole::Attachments || !child.has_documents() {
                continue;
            }
            let level = self.level(base.saturating_add(depth).saturating_sub(1));
            blocks.push(format!("{} {}", "#".repeat(level.into()), child.name));
            self.outline_blocks(child, base, depth.saturating_add(1), blocks);
        }
    }

    fn level(&self, wanted: u8) -> u8 {
        wanted.clamp(1, self.max_heading_level)
    }
}

fn link_list(links: &[OutlineLink]) -> String {
    links
        .iter()
        .map(|l| format!("- [{}]({})", l.title.replace('[', "\\[").replace(']', "\\]"), l.target))
        .collect::<Vec<_>>()
        .join("\n")
}

fn finish(blocks: Vec<String>) -> String {
    let mut out = blocks.join("\n\n");
    out.push('\n');
    out
}
