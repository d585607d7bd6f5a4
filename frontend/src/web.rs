//! Browser host backed by `web-sys`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use gloo_timers::callback::Timeout;
use gloo_timers::future::TimeoutFuture;
use js_sys::{Array, Reflect};
use log::{debug, info, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, Event, EventTarget, HtmlElement, HtmlInputElement, HtmlSelectElement,
    HtmlTextAreaElement, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit, KeyboardEvent, MouseEvent, ScrollBehavior, ScrollToOptions, Window,
};

use crate::app::App;
use crate::config::{Config, CONFIG_ELEMENT_ID};
use crate::error::DomError;
use crate::host::{
    Dom, DomEvent, EventHandler, Intersection, IntersectionHandler, ListenerId, ObserverId,
    ObserverOptions, Page, Rect, Scheduler, TimerId, Viewport,
};

/// Set on `window` once the behaviors are loaded.
const GLOBAL_MARKER: &str = "__app";

thread_local! {
    static APP: RefCell<Option<Rc<App<WebDom>>>> = RefCell::new(None);
}

struct Registered {
    target: EventTarget,
    event: String,
    closure: Closure<dyn FnMut(Event)>,
}

struct Observed {
    observer: IntersectionObserver,
    _closure: Closure<dyn FnMut(Array, IntersectionObserver)>,
}

pub struct WebDom {
    window: Window,
    document: Document,
    listeners: RefCell<HashMap<ListenerId, Registered>>,
    observers: RefCell<HashMap<ObserverId, Observed>>,
    next_id: Cell<u64>,
}

impl WebDom {
    pub fn new(window: Window, document: Document) -> Self {
        Self {
            window,
            document,
            listeners: RefCell::new(HashMap::new()),
            observers: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn register(
        &self,
        target: EventTarget,
        event: &str,
        mut handler: EventHandler<Element>,
    ) -> Result<ListenerId, DomError> {
        let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let translated = translate(&event);
            handler(&translated);
            if translated.default_prevented() {
                event.prevent_default();
            }
            if translated.propagation_stopped() {
                event.stop_propagation();
            }
        });
        target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
        let id = ListenerId(self.next_id());
        self.listeners.borrow_mut().insert(
            id,
            Registered {
                target,
                event: event.to_string(),
                closure,
            },
        );
        Ok(id)
    }

    fn html(node: &Element) -> Option<&HtmlElement> {
        node.dyn_ref::<HtmlElement>()
    }
}

fn translate(event: &Event) -> DomEvent<Element> {
    let mut translated = DomEvent::new(event.type_());
    if let Some(target) = event.target().and_then(|t| t.dyn_into::<Element>().ok()) {
        translated = translated.with_target(target);
    }
    if let Some(keyboard) = event.dyn_ref::<KeyboardEvent>() {
        translated = translated.with_key(keyboard.key());
    }
    if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
        translated = translated
            .with_pointer(f64::from(mouse.client_x()), f64::from(mouse.client_y()))
            .with_modifiers(mouse.ctrl_key(), mouse.meta_key());
    }
    translated
}

fn collect(list: Result<web_sys::NodeList, JsValue>, selector: &str) -> Vec<Element> {
    match list {
        Ok(list) => (0..list.length())
            .filter_map(|index| list.get(index))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect(),
        Err(err) => {
            warn!("invalid selector {}: {:?}", selector, err);
            Vec::new()
        }
    }
}

impl Dom for WebDom {
    type Node = Element;

    fn body(&self) -> Option<Element> {
        self.document.body().map(Into::into)
    }

    fn head(&self) -> Option<Element> {
        self.document.head().map(Into::into)
    }

    fn query(&self, scope: Option<&Element>, selector: &str) -> Option<Element> {
        let found = match scope {
            Some(scope) => scope.query_selector(selector),
            None => self.document.query_selector(selector),
        };
        found.unwrap_or_else(|err| {
            warn!("invalid selector {}: {:?}", selector, err);
            None
        })
    }

    fn query_all(&self, scope: Option<&Element>, selector: &str) -> Vec<Element> {
        let list = match scope {
            Some(scope) => scope.query_selector_all(selector),
            None => self.document.query_selector_all(selector),
        };
        collect(list, selector)
    }

    fn element_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn parent(&self, node: &Element) -> Option<Element> {
        node.parent_element()
    }

    fn closest(&self, node: &Element, selector: &str) -> Option<Element> {
        node.closest(selector).ok().flatten()
    }

    fn contains(&self, ancestor: &Element, node: &Element) -> bool {
        ancestor.contains(Some(node))
    }

    fn is_attached(&self, node: &Element) -> bool {
        node.is_connected()
    }

    fn create_element(&self, tag: &str) -> Result<Element, DomError> {
        Ok(self.document.create_element(tag)?)
    }

    fn append_child(&self, parent: &Element, child: &Element) -> Result<(), DomError> {
        parent.append_child(child)?;
        Ok(())
    }

    fn remove(&self, node: &Element) {
        node.remove();
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn has_attribute(&self, node: &Element, name: &str) -> bool {
        node.has_attribute(name)
    }

    fn set_attribute(&self, node: &Element, name: &str, value: &str) -> Result<(), DomError> {
        Ok(node.set_attribute(name, value)?)
    }

    fn remove_attribute(&self, node: &Element, name: &str) -> Result<(), DomError> {
        Ok(node.remove_attribute(name)?)
    }

    fn has_class(&self, node: &Element, class: &str) -> bool {
        node.class_list().contains(class)
    }

    fn add_class(&self, node: &Element, class: &str) -> Result<(), DomError> {
        Ok(node.class_list().add_1(class)?)
    }

    fn remove_class(&self, node: &Element, class: &str) -> Result<(), DomError> {
        Ok(node.class_list().remove_1(class)?)
    }

    fn style(&self, node: &Element, property: &str) -> String {
        Self::html(node)
            .and_then(|html| html.style().get_property_value(property).ok())
            .unwrap_or_default()
    }

    fn set_style(&self, node: &Element, property: &str, value: &str) -> Result<(), DomError> {
        let Some(html) = Self::html(node) else {
            return Ok(());
        };
        let style = html.style();
        if value.is_empty() {
            style.remove_property(property)?;
        } else {
            style.set_property(property, value)?;
        }
        Ok(())
    }

    fn set_css_text(&self, node: &Element, css: &str) -> Result<(), DomError> {
        if let Some(html) = Self::html(node) {
            html.style().set_css_text(css);
        }
        Ok(())
    }

    fn inner_html(&self, node: &Element) -> String {
        node.inner_html()
    }

    fn set_inner_html(&self, node: &Element, html: &str) {
        node.set_inner_html(html);
    }

    fn text(&self, node: &Element) -> String {
        node.text_content().unwrap_or_default()
    }

    fn set_text(&self, node: &Element, text: &str) {
        node.set_text_content(Some(text));
    }

    fn value(&self, node: &Element) -> Option<String> {
        if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
            Some(input.value())
        } else if let Some(area) = node.dyn_ref::<HtmlTextAreaElement>() {
            Some(area.value())
        } else {
            node.dyn_ref::<HtmlSelectElement>().map(|select| select.value())
        }
    }

    fn is_checked(&self, node: &Element) -> bool {
        node.dyn_ref::<HtmlInputElement>()
            .is_some_and(|input| input.checked())
    }

    fn offset_height(&self, node: &Element) -> f64 {
        Self::html(node).map_or(0.0, |html| f64::from(html.offset_height()))
    }

    fn bounding_rect(&self, node: &Element) -> Rect {
        let rect = node.get_bounding_client_rect();
        Rect {
            top: rect.top(),
            left: rect.left(),
            width: rect.width(),
            height: rect.height(),
        }
    }

    fn listen(
        &self,
        target: &Element,
        event: &str,
        handler: EventHandler<Element>,
    ) -> Result<ListenerId, DomError> {
        self.register(target.clone().into(), event, handler)
    }

    fn listen_document(
        &self,
        event: &str,
        handler: EventHandler<Element>,
    ) -> Result<ListenerId, DomError> {
        self.register(self.document.clone().into(), event, handler)
    }

    fn listen_window(
        &self,
        event: &str,
        handler: EventHandler<Element>,
    ) -> Result<ListenerId, DomError> {
        self.register(self.window.clone().into(), event, handler)
    }

    fn unlisten(&self, id: ListenerId) {
        let Some(registered) = self.listeners.borrow_mut().remove(&id) else {
            return;
        };
        let removed = registered.target.remove_event_listener_with_callback(
            &registered.event,
            registered.closure.as_ref().unchecked_ref(),
        );
        if let Err(err) = removed {
            warn!("could not remove {} listener: {:?}", registered.event, err);
        }
    }

    fn supports_intersection(&self) -> bool {
        Reflect::has(&self.window, &JsValue::from_str("IntersectionObserver")).unwrap_or(false)
    }

    fn observe_intersections(
        &self,
        options: &ObserverOptions,
        targets: &[Element],
        mut handler: IntersectionHandler<Element>,
    ) -> Result<ObserverId, DomError> {
        let closure = Closure::<dyn FnMut(Array, IntersectionObserver)>::new(
            move |entries: Array, observer: IntersectionObserver| {
                let batch: Vec<Intersection<Element>> = entries
                    .iter()
                    .filter_map(|entry| entry.dyn_into::<IntersectionObserverEntry>().ok())
                    .map(|entry| Intersection {
                        target: entry.target(),
                        is_intersecting: entry.is_intersecting(),
                    })
                    .collect();
                for finished in handler(&batch) {
                    observer.unobserve(&finished);
                }
            },
        );
        let init = IntersectionObserverInit::new();
        init.set_root_margin(&options.root_margin);
        init.set_threshold(&JsValue::from_f64(options.threshold));
        let observer =
            IntersectionObserver::new_with_options(closure.as_ref().unchecked_ref(), &init)?;
        for target in targets {
            observer.observe(target);
        }
        let id = ObserverId(self.next_id());
        self.observers.borrow_mut().insert(
            id,
            Observed {
                observer,
                _closure: closure,
            },
        );
        Ok(id)
    }

    fn disconnect(&self, id: ObserverId) {
        if let Some(observed) = self.observers.borrow_mut().remove(&id) {
            observed.observer.disconnect();
        }
    }
}

/// `setTimeout`/`requestAnimationFrame` through gloo-timers.
pub struct WebScheduler {
    window: Window,
    next_id: Cell<u64>,
    /// Timers not yet fired. Dropping a `Timeout` clears it.
    pending: Rc<RefCell<HashMap<TimerId, Timeout>>>,
}

impl WebScheduler {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            next_id: Cell::new(1),
            pending: Rc::new(RefCell::new(HashMap::new())),
        }
    }
}

impl Scheduler for WebScheduler {
    fn now(&self) -> f64 {
        js_sys::Date::now()
    }

    fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> TimerId {
        let id = TimerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let pending = Rc::clone(&self.pending);
        let timeout = Timeout::new(delay_ms, move || {
            let fired = pending.borrow_mut().remove(&id);
            callback();
            drop(fired);
        });
        self.pending.borrow_mut().insert(id, timeout);
        id
    }

    fn clear_timeout(&self, id: TimerId) {
        let cleared = self.pending.borrow_mut().remove(&id);
        drop(cleared);
    }

    fn next_frame(&self, callback: Box<dyn FnOnce()>) {
        let frame = Closure::once_into_js(move || callback());
        if let Err(err) = self.window.request_animation_frame(frame.unchecked_ref()) {
            warn!("animation frame unavailable: {:?}", err);
        }
    }

    fn sleep(&self, delay_ms: u32) -> LocalBoxFuture<'static, ()> {
        TimeoutFuture::new(delay_ms).boxed_local()
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}

pub struct WebViewport {
    window: Window,
}

impl WebViewport {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl Viewport for WebViewport {
    fn inner_width(&self) -> f64 {
        self.window
            .inner_width()
            .ok()
            .and_then(|width| width.as_f64())
            .unwrap_or_default()
    }

    fn scroll_y(&self) -> f64 {
        self.window.scroll_y().unwrap_or_default()
    }

    fn scroll_to(&self, top: f64) {
        let options = ScrollToOptions::new();
        options.set_top(top);
        options.set_behavior(ScrollBehavior::Smooth);
        self.window.scroll_to_with_scroll_to_options(&options);
    }

    fn pathname(&self) -> String {
        self.window.location().pathname().unwrap_or_else(|_| "/".to_string())
    }

    fn push_hash(&self, hash: &str) {
        let pushed = self
            .window
            .history()
            .and_then(|history| history.push_state_with_url(&JsValue::NULL, "", Some(hash)));
        if let Err(err) = pushed {
            debug!("history unavailable: {:?}", err);
        }
    }

    fn navigate(&self, href: &str) {
        if let Err(err) = self.window.location().set_href(href) {
            warn!("navigation to {} failed: {:?}", href, err);
        }
    }
}

fn load_config(document: &Document) -> Config {
    let Some(raw) = document
        .get_element_by_id(CONFIG_ELEMENT_ID)
        .and_then(|element| element.text_content())
    else {
        return Config::default();
    };
    match Config::from_json(&raw) {
        Ok(config) => {
            debug!("loaded page configuration");
            config
        }
        Err(err) => {
            warn!("ignoring page configuration: {}", err);
            Config::default()
        }
    }
}

/// The running application, if `boot` has created one.
pub fn app() -> Option<Rc<App<WebDom>>> {
    APP.with(|slot| slot.borrow().clone())
}

/// Creates the application once per page and initializes it when the document is ready.
pub fn boot() -> Result<(), DomError> {
    let window = web_sys::window().ok_or(DomError::Missing("window"))?;
    let marker = JsValue::from_str(GLOBAL_MARKER);
    if Reflect::has(&window, &marker)? {
        info!("page behaviors already loaded");
        if let Some(app) = app() {
            app.init();
        }
        return Ok(());
    }
    Reflect::set(&window, &marker, &JsValue::TRUE)?;

    let document = window.document().ok_or(DomError::Missing("document"))?;
    let page = Page::new(
        Rc::new(WebDom::new(window.clone(), document.clone())),
        Rc::new(WebScheduler::new(window.clone())),
        Rc::new(WebViewport::new(window)),
        load_config(&document),
    );
    let app = Rc::new(App::new(page));
    APP.with(|slot| *slot.borrow_mut() = Some(Rc::clone(&app)));

    if document.ready_state() == "loading" {
        let ready = Closure::once_into_js(move || app.init());
        document.add_event_listener_with_callback("DOMContentLoaded", ready.unchecked_ref())?;
    } else {
        app.init();
    }
    Ok(())
}
