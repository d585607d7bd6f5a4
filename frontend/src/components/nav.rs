use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{debug, warn};

use crate::components::{Attach, Component};
use crate::error::DomError;
use crate::host::{Bindings, Dom, Page};
use crate::util::Throttle;

const OPEN_CLASS: &str = "is-open";
const NO_SCROLL_CLASS: &str = "u-no-scroll";
const OPEN_LIST_HEIGHT: &str = "calc(100vh - var(--header-h))";

struct MenuParts<N> {
    nav: N,
    toggle: N,
    list: Option<N>,
}

/// Mobile navigation toggle.
pub struct BurgerMenu<D: Dom> {
    page: Page<D>,
    parts: RefCell<Option<MenuParts<D::Node>>>,
    open: Cell<bool>,
    resize: Throttle,
    bindings: Bindings,
}

impl<D: Dom> BurgerMenu<D> {
    pub fn new(page: Page<D>) -> Self {
        let resize = Throttle::new(page.config.timing.resize_throttle_ms);
        Self {
            page,
            parts: RefCell::new(None),
            open: Cell::new(false),
            resize,
            bindings: Bindings::default(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.get()
    }

    pub fn toggle(&self) {
        if self.is_open() {
            self.close();
        } else {
            self.open();
        }
    }

    pub fn open(&self) {
        self.open.set(true);
        if let Err(err) = self.render(true) {
            warn!("could not open navigation: {}", err);
        }
    }

    pub fn close(&self) {
        self.open.set(false);
        if let Err(err) = self.render(false) {
            warn!("could not close navigation: {}", err);
        }
    }

    fn render(&self, open: bool) -> Result<(), DomError> {
        let parts = self.parts.borrow();
        let Some(parts) = parts.as_ref() else {
            return Ok(());
        };
        let dom = &self.page.dom;
        let body = dom.body();
        if open {
            dom.add_class(&parts.nav, OPEN_CLASS)?;
            if let Some(body) = &body {
                dom.add_class(body, NO_SCROLL_CLASS)?;
            }
        } else {
            dom.remove_class(&parts.nav, OPEN_CLASS)?;
            if let Some(body) = &body {
                dom.remove_class(body, NO_SCROLL_CLASS)?;
            }
        }
        dom.set_attribute(&parts.toggle, "aria-expanded", if open { "true" } else { "false" })?;
        if let Some(list) = &parts.list {
            dom.set_style(list, "height", if open { OPEN_LIST_HEIGHT } else { "" })?;
        }
        Ok(())
    }

    fn is_outside(&self, target: Option<&D::Node>) -> bool {
        let parts = self.parts.borrow();
        let (Some(parts), Some(target)) = (parts.as_ref(), target) else {
            return true;
        };
        let dom = &self.page.dom;
        !dom.contains(&parts.nav, target) && !dom.contains(&parts.toggle, target)
    }
}

impl<D: Dom> Component for BurgerMenu<D> {
    fn name(&self) -> &'static str {
        "burger-menu"
    }

    fn attach(self: Rc<Self>) -> Result<Attach, DomError> {
        let dom = &self.page.dom;
        let selectors = &self.page.config.selectors;
        let (Some(nav), Some(toggle)) = (
            dom.query(None, &selectors.nav),
            dom.query(None, &selectors.nav_toggle),
        ) else {
            return Ok(Attach::Skipped);
        };
        let list = dom
            .query(Some(&nav), "ul")
            .or_else(|| dom.query(None, &selectors.nav_list));

        let weak = Rc::downgrade(&self);
        let id = dom.listen(
            &toggle,
            "click",
            Box::new(move |event| {
                event.prevent_default();
                if let Some(this) = weak.upgrade() {
                    this.toggle();
                }
            }),
        )?;
        self.bindings.listener(id);

        let weak = Rc::downgrade(&self);
        let id = dom.listen_document(
            "keydown",
            Box::new(move |event| {
                let Some(this) = weak.upgrade() else { return };
                if this.is_open() && event.key.as_deref() == Some("Escape") {
                    this.close();
                }
            }),
        )?;
        self.bindings.listener(id);

        let weak = Rc::downgrade(&self);
        let id = dom.listen_document(
            "click",
            Box::new(move |event| {
                let Some(this) = weak.upgrade() else { return };
                if this.is_open() && this.is_outside(event.target.as_ref()) {
                    this.close();
                }
            }),
        )?;
        self.bindings.listener(id);

        if let Some(list) = &list {
            for link in dom.query_all(Some(list), &selectors.nav_link) {
                let weak = Rc::downgrade(&self);
                let id = dom.listen(
                    &link,
                    "click",
                    Box::new(move |_| {
                        if let Some(this) = weak.upgrade() {
                            this.close();
                        }
                    }),
                )?;
                self.bindings.listener(id);
            }
        }

        let weak = Rc::downgrade(&self);
        let id = dom.listen_window(
            "resize",
            Box::new(move |_| {
                let Some(this) = weak.upgrade() else { return };
                if !this.resize.ready(this.page.scheduler.now()) {
                    return;
                }
                if this.page.viewport.inner_width() >= this.page.config.mobile_breakpoint {
                    this.close();
                }
            }),
        )?;
        self.bindings.listener(id);

        *self.parts.borrow_mut() = Some(MenuParts { nav, toggle, list });
        Ok(Attach::Active)
    }

    fn detach(&self) {
        self.bindings.release(&*self.page.dom);
        self.close();
        self.parts.borrow_mut().take();
    }
}

const INDEX_PATH: &str = "/index.html";

/// Path part of a nav link, with the site root spelled as `/index.html`.
pub fn link_path(href: &str) -> &str {
    let path = href.split('#').next().unwrap_or_default();
    if path.is_empty() || path == "/" {
        INDEX_PATH
    } else {
        path
    }
}

pub fn is_current_link(pathname: &str, href: &str) -> bool {
    let current = if pathname == "/" { INDEX_PATH } else { pathname };
    let link = link_path(href);
    current == link || (link != INDEX_PATH && current.ends_with(link))
}

/// Marks the nav links that point at the current page.
pub struct ActiveMenu<D: Dom> {
    page: Page<D>,
    marked: RefCell<Vec<D::Node>>,
}

impl<D: Dom> ActiveMenu<D> {
    pub fn new(page: Page<D>) -> Self {
        Self {
            page,
            marked: RefCell::new(Vec::new()),
        }
    }

    fn unmark(&self, link: &D::Node) -> Result<(), DomError> {
        let dom = &self.page.dom;
        dom.remove_attribute(link, "aria-current")?;
        dom.remove_class(link, "active")
    }
}

impl<D: Dom> Component for ActiveMenu<D> {
    fn name(&self) -> &'static str {
        "active-menu"
    }

    fn attach(self: Rc<Self>) -> Result<Attach, DomError> {
        let dom = &self.page.dom;
        let links = dom.query_all(None, &self.page.config.selectors.nav_link);
        if links.is_empty() {
            return Ok(Attach::Skipped);
        }
        let pathname = self.page.viewport.pathname();
        let mut marked = self.marked.borrow_mut();
        for link in links {
            self.unmark(&link)?;
            let Some(href) = dom.attribute(&link, "href") else {
                continue;
            };
            if is_current_link(&pathname, &href) {
                dom.set_attribute(&link, "aria-current", "page")?;
                dom.add_class(&link, "active")?;
                marked.push(link);
            }
        }
        debug!("{} nav links match {}", marked.len(), pathname);
        Ok(Attach::Active)
    }

    fn detach(&self) {
        for link in self.marked.take() {
            if let Err(err) = self.unmark(&link) {
                warn!("could not clear active link: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_and_empty_paths_mean_index() {
        assert_eq!(link_path(""), INDEX_PATH);
        assert_eq!(link_path("/"), INDEX_PATH);
        assert_eq!(link_path("#kontakt"), INDEX_PATH);
        assert_eq!(link_path("/leistungen.html#preise"), "/leistungen.html");
    }

    #[test]
    fn current_link_matching() {
        assert!(is_current_link("/", "/index.html"));
        assert!(is_current_link("/", "/"));
        assert!(is_current_link("/index.html", "#top"));
        assert!(is_current_link("/de/leistungen.html", "leistungen.html"));
        assert!(!is_current_link("/de/leistungen.html", "/index.html"));
        assert!(!is_current_link("/kontakt.html", "/leistungen.html"));
    }
}
