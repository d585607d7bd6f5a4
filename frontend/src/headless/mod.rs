//! In-memory host for running page behaviors without a browser.
//!
//! [`MemoryDom`] keeps a small element tree with attributes, classes, inline
//! styles and event listeners; events bubble from the target through its
//! ancestors to the document. Intersections are driven explicitly with
//! [`MemoryDom::intersect`].

mod clock;
mod selector;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{debug, warn};

pub use clock::{ManualScheduler, RecordingViewport};

use crate::error::DomError;
use crate::host::{
    Dom, DomEvent, EventHandler, Intersection, IntersectionHandler, ListenerId, ObserverId,
    ObserverOptions, Rect,
};
use selector::{Selector, Subject};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

const ROOT: NodeId = NodeId(0);
const HEAD: NodeId = NodeId(1);
const BODY: NodeId = NodeId(2);

const FORM_CONTROLS: [&str; 3] = ["input", "textarea", "select"];

#[derive(Debug, Default)]
struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    classes: Vec<String>,
    styles: Vec<(String, String)>,
    content: String,
    value: Option<String>,
    checked: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    rect: Rect,
    offset_height: f64,
}

impl Element {
    fn new(tag: &str) -> Self {
        let tag = tag.to_ascii_lowercase();
        let value = FORM_CONTROLS.contains(&tag.as_str()).then(String::new);
        Self {
            tag,
            value,
            ..Self::default()
        }
    }
}

impl Subject for Element {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn attribute(&self, name: &str) -> Option<String> {
        if name == "class" {
            return (!self.classes.is_empty()).then(|| self.classes.join(" "));
        }
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    Node(NodeId),
    Document,
    Window,
}

struct Listener {
    id: ListenerId,
    target: Target,
    event: String,
    handler: Rc<RefCell<EventHandler<NodeId>>>,
}

struct Observer {
    id: ObserverId,
    options: ObserverOptions,
    targets: Vec<NodeId>,
    handler: Rc<RefCell<IntersectionHandler<NodeId>>>,
}

/// Element tree with `html`, `head` and `body` already in place.
pub struct MemoryDom {
    nodes: RefCell<Vec<Element>>,
    listeners: RefCell<Vec<Listener>>,
    observers: RefCell<Vec<Observer>>,
    next_id: Cell<u64>,
    intersection: Cell<bool>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    pub fn new() -> Self {
        let mut html = Element::new("html");
        html.children = vec![HEAD, BODY];
        let mut head = Element::new("head");
        head.parent = Some(ROOT);
        let mut body = Element::new("body");
        body.parent = Some(ROOT);
        Self {
            nodes: RefCell::new(vec![html, head, body]),
            listeners: RefCell::new(Vec::new()),
            observers: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            intersection: Cell::new(true),
        }
    }

    pub fn body_node(&self) -> NodeId {
        BODY
    }

    /// Appends a new element under `parent`. `class`, `value` and `checked`
    /// attributes initialize the corresponding element state.
    pub fn element(&self, parent: NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let id = self.push(Element::new(tag));
        for (name, value) in attributes {
            self.write_attribute(id, name, value);
            match *name {
                "value" => self.set_value(id, value),
                "checked" => self.set_checked(id, true),
                _ => {}
            }
        }
        self.link(parent, id);
        id
    }

    pub fn set_value(&self, node: NodeId, value: &str) {
        self.with_mut(node, |element| {
            if element.value.is_some() {
                element.value = Some(value.to_string());
            }
        });
    }

    pub fn set_checked(&self, node: NodeId, checked: bool) {
        self.with_mut(node, |element| element.checked = checked);
    }

    pub fn set_rect(&self, node: NodeId, rect: Rect) {
        self.with_mut(node, |element| element.rect = rect);
    }

    pub fn set_offset_height(&self, node: NodeId, height: f64) {
        self.with_mut(node, |element| element.offset_height = height);
    }

    pub fn set_intersection_support(&self, supported: bool) {
        self.intersection.set(supported);
    }

    pub fn tag(&self, node: NodeId) -> String {
        self.with(node, |element| element.tag.clone())
            .unwrap_or_default()
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.with(node, |element| element.children.clone())
            .unwrap_or_default()
    }

    pub fn classes(&self, node: NodeId) -> Vec<String> {
        self.with(node, |element| element.classes.clone())
            .unwrap_or_default()
    }

    /// Listeners currently registered anywhere, document and window included.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Targets still watched by some observer.
    pub fn observed(&self) -> Vec<NodeId> {
        let mut targets: Vec<NodeId> = self
            .observers
            .borrow()
            .iter()
            .flat_map(|observer| observer.targets.iter().copied())
            .collect();
        targets.sort();
        targets.dedup();
        targets
    }

    pub fn observer_options(&self) -> Vec<ObserverOptions> {
        self.observers
            .borrow()
            .iter()
            .map(|observer| observer.options.clone())
            .collect()
    }

    /// Dispatches `event` at `target` and bubbles it to the document.
    pub fn dispatch(&self, target: NodeId, mut event: DomEvent<NodeId>) -> DomEvent<NodeId> {
        if event.target.is_none() {
            event.target = Some(target);
        }
        let mut path: Vec<Target> = self.ancestry(target).into_iter().map(Target::Node).collect();
        if self.is_attached(&target) {
            path.push(Target::Document);
        }
        for hop in path {
            self.invoke(hop, &event);
            if event.propagation_stopped() {
                break;
            }
        }
        event
    }

    pub fn click(&self, node: NodeId) -> DomEvent<NodeId> {
        self.dispatch(node, DomEvent::new("click"))
    }

    pub fn fire(&self, node: NodeId, kind: &str) -> DomEvent<NodeId> {
        self.dispatch(node, DomEvent::new(kind))
    }

    /// A `keydown` from the page body.
    pub fn press_key(&self, key: &str) -> DomEvent<NodeId> {
        self.dispatch(BODY, DomEvent::new("keydown").with_key(key))
    }

    pub fn dispatch_window(&self, event: DomEvent<NodeId>) -> DomEvent<NodeId> {
        self.invoke(Target::Window, &event);
        event
    }

    pub fn resize(&self) -> DomEvent<NodeId> {
        self.dispatch_window(DomEvent::new("resize"))
    }

    /// Reports intersection changes to every observer watching the nodes.
    pub fn intersect(&self, changes: &[(NodeId, bool)]) {
        let batches: Vec<(ObserverId, Rc<RefCell<IntersectionHandler<NodeId>>>, Vec<Intersection<NodeId>>)> =
            self.observers
                .borrow()
                .iter()
                .filter_map(|observer| {
                    let entries: Vec<Intersection<NodeId>> = changes
                        .iter()
                        .filter(|(node, _)| observer.targets.contains(node))
                        .map(|&(target, is_intersecting)| Intersection {
                            target,
                            is_intersecting,
                        })
                        .collect();
                    (!entries.is_empty())
                        .then(|| (observer.id, Rc::clone(&observer.handler), entries))
                })
                .collect();

        for (id, handler, entries) in batches {
            let finished = (*handler.borrow_mut())(&entries);
            if let Some(observer) = self
                .observers
                .borrow_mut()
                .iter_mut()
                .find(|observer| observer.id == id)
            {
                observer.targets.retain(|target| !finished.contains(target));
            }
        }
    }

    fn invoke(&self, target: Target, event: &DomEvent<NodeId>) {
        let handlers: Vec<(ListenerId, Rc<RefCell<EventHandler<NodeId>>>)> = self
            .listeners
            .borrow()
            .iter()
            .filter(|listener| listener.target == target && listener.event == event.kind)
            .map(|listener| (listener.id, Rc::clone(&listener.handler)))
            .collect();
        for (id, handler) in handlers {
            // A handler earlier in this hop may have removed this one.
            let still_registered = self.listeners.borrow().iter().any(|l| l.id == id);
            if !still_registered {
                continue;
            }
            match handler.try_borrow_mut() {
                Ok(mut handler) => (*handler)(event),
                Err(_) => warn!("skipping re-entrant {} handler", event.kind),
            }
        }
    }

    fn outer_html(&self, node: NodeId) -> String {
        let open = self
            .with(node, |element| {
                let mut open = format!("<{}", element.tag);
                if !element.classes.is_empty() {
                    open.push_str(&format!(" class=\"{}\"", element.classes.join(" ")));
                }
                for (name, value) in &element.attributes {
                    open.push_str(&format!(" {}=\"{}\"", name, value));
                }
                if !element.styles.is_empty() {
                    let css: String = element
                        .styles
                        .iter()
                        .map(|(name, value)| format!("{}:{};", name, value))
                        .collect();
                    open.push_str(&format!(" style=\"{}\"", css));
                }
                open.push('>');
                open
            })
            .unwrap_or_default();
        format!("{}{}</{}>", open, self.inner_html(&node), self.tag(node))
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn push(&self, element: Element) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(element);
        NodeId(nodes.len() - 1)
    }

    fn with<R>(&self, node: NodeId, read: impl FnOnce(&Element) -> R) -> Option<R> {
        self.nodes.borrow().get(node.0).map(read)
    }

    fn with_mut<R>(&self, node: NodeId, write: impl FnOnce(&mut Element) -> R) -> Option<R> {
        self.nodes.borrow_mut().get_mut(node.0).map(write)
    }

    fn exists(&self, node: NodeId) -> Result<(), DomError> {
        if node.0 < self.nodes.borrow().len() {
            Ok(())
        } else {
            Err(DomError::Host(format!("unknown node {}", node.0)))
        }
    }

    fn write_attribute(&self, node: NodeId, name: &str, value: &str) {
        self.with_mut(node, |element| {
            if name == "class" {
                element.classes = value.split_whitespace().map(str::to_string).collect();
                return;
            }
            match element.attributes.iter_mut().find(|(key, _)| key == name) {
                Some((_, existing)) => *existing = value.to_string(),
                None => element
                    .attributes
                    .push((name.to_string(), value.to_string())),
            }
        });
    }

    fn unlink(&self, node: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        let Some(parent) = nodes.get_mut(node.0).and_then(|element| element.parent.take()) else {
            return;
        };
        if let Some(parent) = nodes.get_mut(parent.0) {
            parent.children.retain(|child| *child != node);
        }
    }

    fn link(&self, parent: NodeId, child: NodeId) {
        self.unlink(child);
        let mut nodes = self.nodes.borrow_mut();
        if let Some(element) = nodes.get_mut(child.0) {
            element.parent = Some(parent);
        }
        if let Some(element) = nodes.get_mut(parent.0) {
            element.children.push(child);
        }
    }

    /// `node` followed by its ancestors.
    fn ancestry(&self, node: NodeId) -> Vec<NodeId> {
        let nodes = self.nodes.borrow();
        let mut chain = Vec::new();
        let mut cursor = nodes.get(node.0).map(|_| node);
        while let Some(current) = cursor {
            chain.push(current);
            cursor = nodes[current.0].parent;
        }
        chain
    }

    fn descendants(&self, node: NodeId, into: &mut Vec<NodeId>) {
        for child in self.children(node) {
            into.push(child);
            self.descendants(child, into);
        }
    }

    fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        self.with(node, |element| selector.matches(element))
            .unwrap_or(false)
    }

    fn parse(selector: &str) -> Option<Selector> {
        let parsed = Selector::parse(selector);
        if parsed.is_none() {
            debug!("unsupported selector {}", selector);
        }
        parsed
    }
}

/// Markup stripped of tags.
fn strip_tags(markup: &str) -> String {
    let mut text = String::with_capacity(markup.len());
    let mut in_tag = false;
    for ch in markup.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    text
}

impl Dom for MemoryDom {
    type Node = NodeId;

    fn body(&self) -> Option<NodeId> {
        Some(BODY)
    }

    fn head(&self) -> Option<NodeId> {
        Some(HEAD)
    }

    fn query_all(&self, scope: Option<&NodeId>, selector: &str) -> Vec<NodeId> {
        let Some(selector) = Self::parse(selector) else {
            return Vec::new();
        };
        let mut candidates = Vec::new();
        match scope {
            Some(scope) => self.descendants(*scope, &mut candidates),
            None => {
                candidates.push(ROOT);
                self.descendants(ROOT, &mut candidates);
            }
        }
        candidates
            .into_iter()
            .filter(|node| self.matches(*node, &selector))
            .collect()
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        let mut candidates = vec![ROOT];
        self.descendants(ROOT, &mut candidates);
        candidates.into_iter().find(|node| {
            self.with(*node, |element| element.attribute("id").as_deref() == Some(id))
                .unwrap_or(false)
        })
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.with(*node, |element| element.parent).flatten()
    }

    fn closest(&self, node: &NodeId, selector: &str) -> Option<NodeId> {
        let selector = Self::parse(selector)?;
        self.ancestry(*node)
            .into_iter()
            .find(|candidate| self.matches(*candidate, &selector))
    }

    fn contains(&self, ancestor: &NodeId, node: &NodeId) -> bool {
        self.ancestry(*node).contains(ancestor)
    }

    fn is_attached(&self, node: &NodeId) -> bool {
        self.ancestry(*node).last() == Some(&ROOT)
    }

    fn create_element(&self, tag: &str) -> Result<NodeId, DomError> {
        Ok(self.push(Element::new(tag)))
    }

    fn append_child(&self, parent: &NodeId, child: &NodeId) -> Result<(), DomError> {
        self.exists(*parent)?;
        self.exists(*child)?;
        if self.ancestry(*parent).contains(child) {
            return Err(DomError::Host("cannot append an ancestor".to_string()));
        }
        self.link(*parent, *child);
        Ok(())
    }

    fn remove(&self, node: &NodeId) {
        self.unlink(*node);
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.with(*node, |element| element.attribute(name)).flatten()
    }

    fn set_attribute(&self, node: &NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.exists(*node)?;
        self.write_attribute(*node, name, value);
        Ok(())
    }

    fn remove_attribute(&self, node: &NodeId, name: &str) -> Result<(), DomError> {
        self.exists(*node)?;
        self.with_mut(*node, |element| {
            if name == "class" {
                element.classes.clear();
            } else {
                element.attributes.retain(|(key, _)| key != name);
            }
        });
        Ok(())
    }

    fn has_class(&self, node: &NodeId, class: &str) -> bool {
        self.with(*node, |element| element.has_class(class))
            .unwrap_or(false)
    }

    fn add_class(&self, node: &NodeId, class: &str) -> Result<(), DomError> {
        self.exists(*node)?;
        self.with_mut(*node, |element| {
            if !element.has_class(class) {
                element.classes.push(class.to_string());
            }
        });
        Ok(())
    }

    fn remove_class(&self, node: &NodeId, class: &str) -> Result<(), DomError> {
        self.exists(*node)?;
        self.with_mut(*node, |element| element.classes.retain(|c| c != class));
        Ok(())
    }

    fn style(&self, node: &NodeId, property: &str) -> String {
        self.with(*node, |element| {
            element
                .styles
                .iter()
                .find(|(key, _)| key == property)
                .map(|(_, value)| value.clone())
        })
        .flatten()
        .unwrap_or_default()
    }

    fn set_style(&self, node: &NodeId, property: &str, value: &str) -> Result<(), DomError> {
        self.exists(*node)?;
        self.with_mut(*node, |element| {
            element.styles.retain(|(key, _)| key != property);
            if !value.is_empty() {
                element
                    .styles
                    .push((property.to_string(), value.to_string()));
            }
        });
        Ok(())
    }

    fn inner_html(&self, node: &NodeId) -> String {
        let own = self
            .with(*node, |element| element.content.clone())
            .unwrap_or_default();
        self.children(*node).iter().fold(own, |mut html, child| {
            html.push_str(&self.outer_html(*child));
            html
        })
    }

    fn set_inner_html(&self, node: &NodeId, html: &str) {
        for child in self.children(*node) {
            self.unlink(child);
        }
        self.with_mut(*node, |element| element.content = html.to_string());
    }

    fn text(&self, node: &NodeId) -> String {
        let own = self
            .with(*node, |element| strip_tags(&element.content))
            .unwrap_or_default();
        self.children(*node)
            .iter()
            .fold(own, |mut text, child| {
                text.push_str(&self.text(child));
                text
            })
    }

    fn set_text(&self, node: &NodeId, text: &str) {
        self.set_inner_html(node, text);
    }

    fn value(&self, node: &NodeId) -> Option<String> {
        self.with(*node, |element| element.value.clone()).flatten()
    }

    fn is_checked(&self, node: &NodeId) -> bool {
        self.with(*node, |element| element.checked).unwrap_or(false)
    }

    fn offset_height(&self, node: &NodeId) -> f64 {
        self.with(*node, |element| element.offset_height)
            .unwrap_or_default()
    }

    fn bounding_rect(&self, node: &NodeId) -> Rect {
        self.with(*node, |element| element.rect).unwrap_or_default()
    }

    fn listen(
        &self,
        target: &NodeId,
        event: &str,
        handler: EventHandler<NodeId>,
    ) -> Result<ListenerId, DomError> {
        self.exists(*target)?;
        Ok(self.register(Target::Node(*target), event, handler))
    }

    fn listen_document(
        &self,
        event: &str,
        handler: EventHandler<NodeId>,
    ) -> Result<ListenerId, DomError> {
        Ok(self.register(Target::Document, event, handler))
    }

    fn listen_window(
        &self,
        event: &str,
        handler: EventHandler<NodeId>,
    ) -> Result<ListenerId, DomError> {
        Ok(self.register(Target::Window, event, handler))
    }

    fn unlisten(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|listener| listener.id != id);
    }

    fn supports_intersection(&self) -> bool {
        self.intersection.get()
    }

    fn observe_intersections(
        &self,
        options: &ObserverOptions,
        targets: &[NodeId],
        handler: IntersectionHandler<NodeId>,
    ) -> Result<ObserverId, DomError> {
        if !self.supports_intersection() {
            return Err(DomError::Missing("IntersectionObserver"));
        }
        let id = ObserverId(self.next_id());
        self.observers.borrow_mut().push(Observer {
            id,
            options: options.clone(),
            targets: targets.to_vec(),
            handler: Rc::new(RefCell::new(handler)),
        });
        Ok(id)
    }

    fn disconnect(&self, id: ObserverId) {
        self.observers.borrow_mut().retain(|observer| observer.id != id);
    }
}

impl MemoryDom {
    fn register(&self, target: Target, event: &str, handler: EventHandler<NodeId>) -> ListenerId {
        let id = ListenerId(self.next_id());
        self.listeners.borrow_mut().push(Listener {
            id,
            target,
            event: event.to_string(),
            handler: Rc::new(RefCell::new(handler)),
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn events_bubble_to_document_until_stopped() {
        let dom = MemoryDom::new();
        let section = dom.element(BODY, "section", &[("class", "c-section")]);
        let button = dom.element(section, "button", &[("type", "button")]);
        let seen = Rc::new(RefCell::new(Vec::new()));

        for (target, label) in [(Target::Node(section), "section"), (Target::Document, "document")] {
            let seen = Rc::clone(&seen);
            let handler: EventHandler<NodeId> = Box::new(move |_| seen.borrow_mut().push(label));
            match target {
                Target::Node(node) => dom.listen(&node, "click", handler).unwrap(),
                _ => dom.listen_document("click", handler).unwrap(),
            };
        }
        dom.click(button);
        assert_eq!(*seen.borrow(), ["section", "document"]);

        dom.listen(&button, "click", Box::new(|event| event.stop_propagation()))
            .unwrap();
        dom.click(button);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn queries_follow_document_order_and_exclude_scope() {
        let dom = MemoryDom::new();
        let form = dom.element(BODY, "form", &[("class", "c-form needs-validation")]);
        let name = dom.element(form, "input", &[("id", "contact-name")]);
        let message = dom.element(form, "textarea", &[("id", "contact-message")]);

        assert_eq!(dom.query_all(Some(&form), "input, textarea, select"), [name, message]);
        assert_eq!(dom.query_all(None, ".needs-validation, .c-form"), [form]);
        assert!(dom.query_all(Some(&form), ".c-form").is_empty());
        assert_eq!(dom.element_by_id("contact-message"), Some(message));
        assert_eq!(dom.closest(&name, "form"), Some(form));
    }

    #[test]
    fn removed_nodes_are_detached() {
        let dom = MemoryDom::new();
        let toast = dom.element(BODY, "div", &[("role", "alert")]);
        let close = dom.element(toast, "button", &[]);
        assert!(dom.is_attached(&close));
        dom.remove(&toast);
        assert!(!dom.is_attached(&close));
        assert!(dom.children(BODY).is_empty());
    }

    #[test]
    fn controls_hold_values_and_text_strips_markup() {
        let dom = MemoryDom::new();
        let input = dom.element(BODY, "input", &[("value", "  Anna ")]);
        let div = dom.element(BODY, "div", &[]);
        assert_eq!(dom.value(&input).as_deref(), Some("  Anna "));
        assert_eq!(dom.value(&div), None);

        dom.set_inner_html(&div, "<span class=\"spinner\"></span>Wird gesendet...");
        assert_eq!(dom.text(&div), "Wird gesendet...");
    }

    #[test]
    fn inner_html_serializes_child_elements() {
        let dom = MemoryDom::new();
        let button = dom.element(BODY, "button", &[("type", "submit"), ("class", "btn")]);
        dom.set_inner_html(&button, "Senden");
        let ripple = dom.create_element("span").unwrap();
        dom.set_attribute(&ripple, "class", "ripple").unwrap();
        dom.append_child(&button, &ripple).unwrap();

        assert_eq!(dom.inner_html(&button), "Senden<span class=\"ripple\"></span>");
        assert_eq!(dom.text(&button), "Senden");
        dom.remove(&ripple);
        assert_eq!(dom.inner_html(&button), "Senden");
    }
}
