//! Indexed HTML node arena.
//!
//! Nodes live in a flat `Vec` and refer to each other by index, so whole
//! subtrees can be rewritten without chasing pointers. Detached nodes stay
//! in the arena but are unreachable from the root. All traversal helpers
//! return owned id lists; transformation passes collect the nodes they want
//! to touch first and mutate afterwards, which keeps iteration valid while
//! the tree changes underneath.

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub enum NodeData {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Dom {
    pub fn new() -> Self {
        let root = Node {
            data: NodeData::Element {
                tag: "#document".to_string(),
                attrs: Vec::new(),
            },
            parent: None,
            children: Vec::new(),
        };
        Dom {
            nodes: vec![root],
            root: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(Node {
            data: NodeData::Element {
                tag: tag.to_string(),
                attrs: Vec::new(),
            },
            parent: None,
            children: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(Node {
            data: NodeData::Text(text.to_string()),
            parent: None,
            children: Vec::new(),
        })
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id].data, NodeData::Element { .. })
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].data {
            NodeData::Text(t) => Some(t),
            NodeData::Element { .. } => None,
        }
    }

    pub fn set_text_node(&mut self, id: NodeId, text: &str) {
        if let NodeData::Text(t) = &mut self.nodes[id].data {
            *t = text.to_string();
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id].data {
            if let Some(entry) = attrs.iter_mut().find(|(k, _)| k == name) {
                entry.1 = value.to_string();
            } else {
                attrs.push((name.to_string(), value.to_string()));
            }
        }
    }

    /// Whole-token class membership, like the browser's `classList`.
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .map(|c| c.split_ascii_whitespace().any(|t| t == class))
            .unwrap_or(false)
    }

    /// Substring match over the raw class attribute, like a `[class*=x]`
    /// selector.
    pub fn class_contains(&self, id: NodeId, fragment: &str) -> bool {
        self.attr(id, "class")
            .map(|c| c.contains(fragment))
            .unwrap_or(false)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id].children.clone()
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
            .collect()
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    /// Unlinks a node from its parent. The node stays in the arena.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id].parent.take() {
            self.nodes[parent].children.retain(|&c| c != id);
        }
    }

    /// Replaces a node with the given nodes at its position in the parent.
    pub fn replace_with(&mut self, id: NodeId, replacements: &[NodeId]) {
        let Some(parent) = self.nodes[id].parent else {
            return;
        };
        // Detach first: a replacement may currently sit next to `id` and
        // shift its position.
        for &r in replacements {
            self.detach(r);
        }
        let Some(pos) = self.nodes[parent].children.iter().position(|&c| c == id) else {
            return;
        };
        self.nodes[parent]
            .children
            .splice(pos..=pos, replacements.iter().copied());
        self.nodes[id].parent = None;
        for &r in replacements {
            self.nodes[r].parent = Some(parent);
        }
    }

    /// Replaces a node with a new text node holding `text`.
    pub fn replace_with_text(&mut self, id: NodeId, text: &str) {
        let t = self.create_text(text);
        self.replace_with(id, &[t]);
    }

    /// Moves all children of a node into its place and removes the node.
    pub fn hoist_children(&mut self, id: NodeId) {
        let children = self.children(id);
        self.replace_with(id, &children);
    }

    /// Drops all children and installs a single text child.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        for child in self.children(id) {
            self.detach(child);
        }
        let t = self.create_text(text);
        self.append_child(id, t);
    }

    /// Preorder descendants of a node, the node itself excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id].children.iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.nodes[n].children.iter().rev().copied());
        }
        out
    }

    /// Preorder descendant elements matching a predicate.
    pub fn find_all<F>(&self, scope: NodeId, pred: F) -> Vec<NodeId>
    where
        F: Fn(&Dom, NodeId) -> bool,
    {
        self.descendants(scope)
            .into_iter()
            .filter(|&n| self.is_element(n) && pred(self, n))
            .collect()
    }

    pub fn find_first<F>(&self, scope: NodeId, pred: F) -> Option<NodeId>
    where
        F: Fn(&Dom, NodeId) -> bool,
    {
        self.descendants(scope)
            .into_iter()
            .find(|&n| self.is_element(n) && pred(self, n))
    }

    /// First descendant element with the given tag name.
    pub fn find_tag(&self, scope: NodeId, tag: &str) -> Option<NodeId> {
        self.find_first(scope, |d, n| d.tag(n) == Some(tag))
    }

    pub fn find_all_tags(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        self.find_all(scope, |d, n| d.tag(n) == Some(tag))
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.nodes[id].parent?;
        let siblings = &self.nodes[parent].children;
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings[pos + 1..]
            .iter()
            .copied()
            .find(|&s| self.is_element(s))
    }

    pub fn prev_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.nodes[id].parent?;
        let siblings = &self.nodes[parent].children;
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings[..pos]
            .iter()
            .rev()
            .copied()
            .find(|&s| self.is_element(s))
    }

    /// Nearest ancestor (self excluded) matching a predicate.
    pub fn closest<F>(&self, id: NodeId, pred: F) -> Option<NodeId>
    where
        F: Fn(&Dom, NodeId) -> bool,
    {
        let mut current = self.nodes[id].parent;
        while let Some(n) = current {
            if self.is_element(n) && pred(self, n) {
                return Some(n);
            }
            current = self.nodes[n].parent;
        }
        None
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let NodeData::Text(t) = &self.nodes[id].data {
            out.push_str(t);
        }
        for n in self.descendants(id) {
            if let NodeData::Text(t) = &self.nodes[n].data {
                out.push_str(t);
            }
        }
        out
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Dom, NodeId, NodeId, NodeId) {
        let mut dom = Dom::new();
        let div = dom.create_element("div");
        let p = dom.create_element("p");
        let text = dom.create_text("hello");
        let root = dom.root();
        dom.append_child(root, div);
        dom.append_child(div, p);
        dom.append_child(p, text);
        (dom, div, p, text)
    }

    #[test]
    fn test_text_content() {
        let (dom, div, ..) = sample();
        assert_eq!(dom.text_content(div), "hello");
    }

    #[test]
    fn test_hoist_children() {
        let (mut dom, div, p, text) = sample();
        dom.hoist_children(p);
        assert_eq!(dom.children(div), vec![text]);
        assert_eq!(dom.parent(text), Some(div));
        assert_eq!(dom.parent(p), None);
    }

    #[test]
    fn test_replace_with_text() {
        let (mut dom, div, p, _) = sample();
        dom.replace_with_text(p, "[x] ");
        assert_eq!(dom.text_content(div), "[x] ");
    }

    #[test]
    fn test_class_helpers() {
        let mut dom = Dom::new();
        let el = dom.create_element("div");
        dom.set_attr(el, "class", "checkbox checkbox-on");
        assert!(dom.has_class(el, "checkbox-on"));
        assert!(!dom.has_class(el, "checkbox-o"));
        assert!(dom.class_contains(el, "box-on"));
    }

    #[test]
    fn test_siblings() {
        let mut dom = Dom::new();
        let root = dom.root();
        let a = dom.create_element("ul");
        let t = dom.create_text("\n");
        let b = dom.create_element("ul");
        dom.append_child(root, a);
        dom.append_child(root, t);
        dom.append_child(root, b);
        assert_eq!(dom.next_element_sibling(a), Some(b));
        assert_eq!(dom.prev_element_sibling(b), Some(a));
        assert_eq!(dom.next_element_sibling(b), None);
    }

    #[test]
    fn test_closest() {
        let (dom, _, p, text) = sample();
        let found = dom.closest(text, |d, n| d.tag(n) == Some("p"));
        assert_eq!(found, Some(p));
        assert!(dom.closest(text, |d, n| d.tag(n) == Some("table")).is_none());
    }
}
