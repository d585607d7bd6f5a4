//! Host abstractions every page behavior is written against.
//!
//! The browser implementation lives in [`crate::web`]; [`crate::headless`]
//! provides an in-memory tree and a virtual clock with the same contract.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::config::Config;
use crate::error::DomError;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Host-independent view of a dispatched event.
#[derive(Debug)]
pub struct DomEvent<N> {
    pub kind: String,
    pub target: Option<N>,
    pub key: Option<String>,
    pub client_x: f64,
    pub client_y: f64,
    pub ctrl_key: bool,
    pub meta_key: bool,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
}

impl<N> DomEvent<N> {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            target: None,
            key: None,
            client_x: 0.0,
            client_y: 0.0,
            ctrl_key: false,
            meta_key: false,
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
        }
    }

    pub fn with_target(mut self, target: N) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_pointer(mut self, x: f64, y: f64) -> Self {
        self.client_x = x;
        self.client_y = y;
        self
    }

    pub fn with_modifiers(mut self, ctrl: bool, meta: bool) -> Self {
        self.ctrl_key = ctrl;
        self.meta_key = meta;
        self
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }
}

pub type EventHandler<N> = Box<dyn FnMut(&DomEvent<N>)>;

#[derive(Clone, Debug, PartialEq)]
pub struct ObserverOptions {
    pub root_margin: String,
    pub threshold: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Intersection<N> {
    pub target: N,
    pub is_intersecting: bool,
}

/// Receives one batch of entries and returns the targets to stop observing.
pub type IntersectionHandler<N> = Box<dyn FnMut(&[Intersection<N>]) -> Vec<N>>;

/// The element tree of the current document.
pub trait Dom: 'static {
    type Node: Clone + PartialEq + fmt::Debug + 'static;

    fn body(&self) -> Option<Self::Node>;
    fn head(&self) -> Option<Self::Node>;

    fn query(&self, scope: Option<&Self::Node>, selector: &str) -> Option<Self::Node> {
        self.query_all(scope, selector).into_iter().next()
    }
    fn query_all(&self, scope: Option<&Self::Node>, selector: &str) -> Vec<Self::Node>;
    fn element_by_id(&self, id: &str) -> Option<Self::Node>;
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
    /// Nearest inclusive ancestor matching `selector`.
    fn closest(&self, node: &Self::Node, selector: &str) -> Option<Self::Node>;
    /// Inclusive: a node contains itself.
    fn contains(&self, ancestor: &Self::Node, node: &Self::Node) -> bool;
    fn is_attached(&self, node: &Self::Node) -> bool;

    fn create_element(&self, tag: &str) -> Result<Self::Node, DomError>;
    fn append_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), DomError>;
    fn remove(&self, node: &Self::Node);

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
    fn has_attribute(&self, node: &Self::Node, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }
    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<(), DomError>;
    fn remove_attribute(&self, node: &Self::Node, name: &str) -> Result<(), DomError>;

    fn has_class(&self, node: &Self::Node, class: &str) -> bool;
    fn add_class(&self, node: &Self::Node, class: &str) -> Result<(), DomError>;
    fn remove_class(&self, node: &Self::Node, class: &str) -> Result<(), DomError>;

    fn style(&self, node: &Self::Node, property: &str) -> String;
    /// An empty value clears the property.
    fn set_style(&self, node: &Self::Node, property: &str, value: &str) -> Result<(), DomError>;
    fn set_css_text(&self, node: &Self::Node, css: &str) -> Result<(), DomError> {
        for declaration in css.split(';') {
            if let Some((property, value)) = declaration.split_once(':') {
                let property = property.trim();
                if !property.is_empty() {
                    self.set_style(node, property, value.trim())?;
                }
            }
        }
        Ok(())
    }

    fn inner_html(&self, node: &Self::Node) -> String;
    fn set_inner_html(&self, node: &Self::Node, html: &str);
    fn text(&self, node: &Self::Node) -> String;
    fn set_text(&self, node: &Self::Node, text: &str);

    /// Current value of a form control, `None` for other elements.
    fn value(&self, node: &Self::Node) -> Option<String>;
    fn is_checked(&self, node: &Self::Node) -> bool;

    fn offset_height(&self, node: &Self::Node) -> f64;
    fn bounding_rect(&self, node: &Self::Node) -> Rect;

    fn listen(
        &self,
        target: &Self::Node,
        event: &str,
        handler: EventHandler<Self::Node>,
    ) -> Result<ListenerId, DomError>;
    fn listen_document(
        &self,
        event: &str,
        handler: EventHandler<Self::Node>,
    ) -> Result<ListenerId, DomError>;
    fn listen_window(
        &self,
        event: &str,
        handler: EventHandler<Self::Node>,
    ) -> Result<ListenerId, DomError>;
    fn unlisten(&self, id: ListenerId);

    fn supports_intersection(&self) -> bool;
    fn observe_intersections(
        &self,
        options: &ObserverOptions,
        targets: &[Self::Node],
        handler: IntersectionHandler<Self::Node>,
    ) -> Result<ObserverId, DomError>;
    fn disconnect(&self, id: ObserverId);
}

/// Deferred work on the host event loop. Times are milliseconds.
pub trait Scheduler {
    fn now(&self) -> f64;
    fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> TimerId;
    fn clear_timeout(&self, id: TimerId);
    fn next_frame(&self, callback: Box<dyn FnOnce()>) {
        self.set_timeout(0, callback);
    }
    fn sleep(&self, delay_ms: u32) -> LocalBoxFuture<'static, ()>;
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

/// Window-level state: geometry, scrolling and location.
pub trait Viewport {
    fn inner_width(&self) -> f64;
    fn scroll_y(&self) -> f64;
    fn scroll_to(&self, top: f64);
    fn pathname(&self) -> String;
    fn push_hash(&self, hash: &str);
    fn navigate(&self, href: &str);
}

/// Everything a component needs from its host, shared by reference.
pub struct Page<D: Dom> {
    pub dom: Rc<D>,
    pub scheduler: Rc<dyn Scheduler>,
    pub viewport: Rc<dyn Viewport>,
    pub config: Rc<Config>,
}

impl<D: Dom> Clone for Page<D> {
    fn clone(&self) -> Self {
        Self {
            dom: Rc::clone(&self.dom),
            scheduler: Rc::clone(&self.scheduler),
            viewport: Rc::clone(&self.viewport),
            config: Rc::clone(&self.config),
        }
    }
}

impl<D: Dom> Page<D> {
    pub fn new(
        dom: Rc<D>,
        scheduler: Rc<dyn Scheduler>,
        viewport: Rc<dyn Viewport>,
        config: Config,
    ) -> Self {
        Self {
            dom,
            scheduler,
            viewport,
            config: Rc::new(config),
        }
    }

    /// Height of the fixed header, or the configured fallback.
    pub fn header_height(&self) -> f64 {
        self.dom
            .query(None, &self.config.selectors.header)
            .map(|header| self.dom.offset_height(&header))
            .unwrap_or(self.config.scroll_offset)
    }
}

/// Listener and observer registrations owned by one component.
#[derive(Debug, Default)]
pub struct Bindings {
    listeners: RefCell<Vec<ListenerId>>,
    observers: RefCell<Vec<ObserverId>>,
}

impl Bindings {
    pub fn listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().push(id);
    }

    pub fn observer(&self, id: ObserverId) {
        self.observers.borrow_mut().push(id);
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len() + self.observers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn release<D: Dom>(&self, dom: &D) {
        for id in self.listeners.take() {
            dom.unlisten(id);
        }
        for id in self.observers.take() {
            dom.disconnect(id);
        }
    }
}
