use crate::name::{ns, QName};
use serde::{Deserialize, Serialize};

/// A single attribute on an element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

/// A child node. Text is carried on the owning [`Element`], so only
/// elements and the markup that canonicalisation drops appear here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Element(Element),
    Comment { text: String },
    ProcessingInstruction { target: String, data: Option<String> },
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// Index path from an ancestor to one of its descendant elements.
///
/// Each step indexes the parent's node list (not just its element
/// children), so a path stays valid until that parent's nodes change.
pub type ElementPath = Vec<usize>;

/// An element with ordered attributes, optional text and ordered children.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    name: QName,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    nodes: Vec<Node>,
}

impl Element {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            text: None,
            nodes: Vec::new(),
        }
    }

    /// Shorthand for an element in the CPPA3 namespace.
    pub fn cppa(local: impl Into<String>) -> Self {
        Self::new(QName::cppa(local))
    }

    // ── Builders ────────────────────────────────────────────────────

    pub fn with_attr(mut self, local: &str, value: impl Into<String>) -> Self {
        self.set_attr(local, value);
        self
    }

    pub fn with_qattr(mut self, name: QName, value: impl Into<String>) -> Self {
        self.set_qattr(name, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.nodes.push(Node::Element(child));
        self
    }

    pub fn with_comment(mut self, text: impl Into<String>) -> Self {
        self.nodes.push(Node::Comment { text: text.into() });
        self
    }

    // ── Name ────────────────────────────────────────────────────────

    pub fn name(&self) -> &QName {
        &self.name
    }

    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.name.is(namespace, local)
    }

    pub fn is_cppa(&self, local: &str) -> bool {
        self.name.is_cppa(local)
    }

    // ── Attributes ──────────────────────────────────────────────────

    /// Value of an unqualified attribute.
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace.is_none() && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    pub fn qattr(&self, name: &QName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| &a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Set an unqualified attribute, keeping its position if it exists.
    pub fn set_attr(&mut self, local: &str, value: impl Into<String>) {
        self.set_qattr(QName::unqualified(local), value);
    }

    pub fn set_qattr(&mut self, name: QName, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    pub fn remove_attr(&mut self, local: &str) -> Option<String> {
        let index = self
            .attributes
            .iter()
            .position(|a| a.name.namespace.is_none() && a.name.local == local)?;
        Some(self.attributes.remove(index).value)
    }

    // ── Text ────────────────────────────────────────────────────────

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: Option<String>) {
        self.text = text;
    }

    // ── Children ────────────────────────────────────────────────────

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn push(&mut self, child: Element) {
        self.nodes.push(Node::Element(child));
    }

    pub fn push_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.nodes.iter().filter_map(Node::as_element)
    }

    pub fn children_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.nodes.iter_mut().filter_map(Node::as_element_mut)
    }

    /// Child elements with the given name. Items borrow from `self` only,
    /// not from the name arguments.
    pub fn children_named<'a, 'n>(
        &'a self,
        namespace: &'n str,
        local: &'n str,
    ) -> ChildrenNamed<'a, 'n> {
        ChildrenNamed {
            nodes: self.nodes.iter(),
            namespace,
            local,
        }
    }

    pub fn cppa_children<'a, 'n>(&'a self, local: &'n str) -> ChildrenNamed<'a, 'n> {
        self.children_named(ns::CPPA, local)
    }

    pub fn child(&self, namespace: &str, local: &str) -> Option<&Element> {
        self.children().find(|c| c.is(namespace, local))
    }

    pub fn cppa_child(&self, local: &str) -> Option<&Element> {
        self.child(ns::CPPA, local)
    }

    /// Text of the first CPPA child with the given name.
    pub fn cppa_child_text(&self, local: &str) -> Option<&str> {
        self.cppa_child(local).and_then(Element::text)
    }

    /// Remove every child element matching the predicate.
    pub fn retain_children(&mut self, mut keep: impl FnMut(&Element) -> bool) {
        self.nodes.retain(|node| match node {
            Node::Element(element) => keep(element),
            _ => true,
        });
    }

    // ── Traversal ───────────────────────────────────────────────────

    /// Descendant elements in document order, excluding `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        let mut stack = Vec::new();
        push_children_reversed(&mut stack, self);
        Descendants { stack }
    }

    /// `self` followed by its descendants in document order.
    pub fn descendants_or_self(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// First element (including `self`) whose `id` attribute equals `id`.
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        self.descendants_or_self().find(|e| e.attr("id") == Some(id))
    }

    /// Paths to every descendant-or-self element matching the predicate,
    /// in document order. The empty path denotes `self`.
    pub fn find_paths(&self, mut matches: impl FnMut(&Element) -> bool) -> Vec<ElementPath> {
        let mut found = Vec::new();
        let mut path = Vec::new();
        collect_paths(self, &mut path, &mut matches, &mut found);
        found
    }

    pub fn get_by_path(&self, path: &[usize]) -> Option<&Element> {
        path.iter().try_fold(self, |element, &index| {
            element.nodes.get(index).and_then(Node::as_element)
        })
    }

    pub fn get_by_path_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = self;
        for &index in path {
            current = current.nodes.get_mut(index).and_then(Node::as_element_mut)?;
        }
        Some(current)
    }

    // ── Canonical form ──────────────────────────────────────────────

    /// Rebuild the tree keeping only elements, their attributes and text.
    /// Attribute and child order are preserved.
    pub fn canonicalize(&self) -> Element {
        Element {
            name: self.name.clone(),
            attributes: self.attributes.clone(),
            text: self.text.clone(),
            nodes: self
                .children()
                .map(|child| Node::Element(child.canonicalize()))
                .collect(),
        }
    }
}

fn push_children_reversed<'a>(stack: &mut Vec<&'a Element>, element: &'a Element) {
    stack.extend(element.nodes.iter().rev().filter_map(Node::as_element));
}

fn collect_paths(
    element: &Element,
    path: &mut ElementPath,
    matches: &mut impl FnMut(&Element) -> bool,
    found: &mut Vec<ElementPath>,
) {
    if matches(element) {
        found.push(path.clone());
    }
    for (index, node) in element.nodes.iter().enumerate() {
        if let Node::Element(child) = node {
            path.push(index);
            collect_paths(child, path, matches, found);
            path.pop();
        }
    }
}

/// Iterator over the child elements of one name.
pub struct ChildrenNamed<'a, 'n> {
    nodes: std::slice::Iter<'a, Node>,
    namespace: &'n str,
    local: &'n str,
}

impl<'a> Iterator for ChildrenNamed<'a, '_> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let (namespace, local) = (self.namespace, self.local);
        self.nodes
            .by_ref()
            .filter_map(Node::as_element)
            .find(|e| e.is(namespace, local))
    }
}

/// Pre-order iterator over elements.
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        push_children_reversed(&mut self.stack, next);
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Element {
        Element::cppa("CPP")
            .with_child(
                Element::cppa("PartyInfo")
                    .with_child(Element::cppa("PartyName").with_text("Buyer"))
                    .with_comment("registered party")
                    .with_child(
                        Element::cppa("PartyId")
                            .with_attr("type", "urn:oasis:names:tc:ebcore:partyid-type:iso6523:0088")
                            .with_text("123456789"),
                    ),
            )
            .with_child(Element::cppa("ebMS3Channel").with_attr("id", "ch_a1"))
    }

    #[test]
    fn descendants_are_in_document_order() {
        let doc = sample();
        let names: Vec<_> = doc
            .descendants()
            .map(|e| e.name().local.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["PartyInfo", "PartyName", "PartyId", "ebMS3Channel"]
        );
        assert_eq!(doc.descendants_or_self().count(), 5);
    }

    #[test]
    fn find_by_id_searches_whole_tree() {
        let doc = sample();
        let channel = doc.find_by_id("ch_a1").unwrap();
        assert!(channel.is_cppa("ebMS3Channel"));
        assert!(doc.find_by_id("missing").is_none());
    }

    #[test]
    fn set_attr_keeps_position() {
        let mut e = Element::cppa("X").with_attr("a", "1").with_attr("b", "2");
        e.set_attr("a", "3");
        let names: Vec<_> = e.attributes().iter().map(|a| a.name.local.clone()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(e.attr("a"), Some("3"));
        assert_eq!(e.remove_attr("a").as_deref(), Some("3"));
        assert_eq!(e.attr("a"), None);
    }

    #[test]
    fn qualified_attributes_do_not_shadow_unqualified() {
        let e = Element::cppa("Description")
            .with_qattr(QName::xml("lang"), "en")
            .with_attr("lang", "fr");
        assert_eq!(e.qattr(&QName::xml("lang")), Some("en"));
        assert_eq!(e.attr("lang"), Some("fr"));
    }

    #[test]
    fn paths_resolve_back_to_elements() {
        let mut doc = sample();
        let paths = doc.find_paths(|e| e.is_cppa("PartyId"));
        assert_eq!(paths.len(), 1);
        assert_eq!(doc.get_by_path(&paths[0]).unwrap().text(), Some("123456789"));

        doc.get_by_path_mut(&paths[0])
            .unwrap()
            .set_text(Some("987".into()));
        assert_eq!(
            doc.descendants().find(|e| e.is_cppa("PartyId")).unwrap().text(),
            Some("987")
        );
        assert_eq!(doc.find_paths(|e| e.is_cppa("CPP")), vec![Vec::<usize>::new()]);
    }

    #[test]
    fn canonicalize_drops_comments_only() {
        let doc = sample();
        let canonical = doc.canonicalize();
        let party_info = canonical.cppa_child("PartyInfo").unwrap();
        assert_eq!(party_info.nodes().len(), 2);
        assert!(party_info
            .nodes()
            .iter()
            .all(|n| matches!(n, Node::Element(_))));
        assert_eq!(canonical.descendants().count(), doc.descendants().count());
    }

    #[test]
    fn retain_children_filters_elements() {
        let mut doc = sample();
        doc.retain_children(|c| !c.is_cppa("ebMS3Channel"));
        assert!(doc.cppa_child("ebMS3Channel").is_none());
        assert!(doc.cppa_child("PartyInfo").is_some());
    }

    #[test]
    fn serializes_as_json() {
        let doc = sample();
        let json = serde_json::to_string(&doc).unwrap();
        let back: Element = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }
}
