use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, warn};

use crate::components::{Attach, Component};
use crate::error::DomError;
use crate::host::{Bindings, Dom, Intersection, ObserverOptions, Page};
use crate::util::hash_target;

const ACTIVE_CLASS: &str = "active";

/// Animated jumps to in-page anchors, offset by the fixed header.
pub struct SmoothScroll<D: Dom> {
    page: Page<D>,
    bindings: Bindings,
}

impl<D: Dom> SmoothScroll<D> {
    pub fn new(page: Page<D>) -> Self {
        Self {
            page,
            bindings: Bindings::default(),
        }
    }

    /// Scrolls to the element with `id`; false when there is none.
    pub fn scroll_to_target(&self, id: &str) -> bool {
        let Some(target) = self.page.dom.element_by_id(id) else {
            return false;
        };
        let top = self.page.dom.bounding_rect(&target).top + self.page.viewport.scroll_y()
            - self.page.header_height();
        self.page.viewport.scroll_to(top);
        self.page.viewport.push_hash(&format!("#{}", id));
        true
    }
}

impl<D: Dom> Component for SmoothScroll<D> {
    fn name(&self) -> &'static str {
        "smooth-scroll"
    }

    fn attach(self: Rc<Self>) -> Result<Attach, DomError> {
        let dom = &self.page.dom;
        for link in dom.query_all(None, &self.page.config.selectors.hash_link) {
            let Some(id) = dom
                .attribute(&link, "href")
                .as_deref()
                .and_then(hash_target)
                .map(str::to_string)
            else {
                continue;
            };
            let weak = Rc::downgrade(&self);
            let handle = dom.listen(
                &link,
                "click",
                Box::new(move |event| {
                    let Some(this) = weak.upgrade() else { return };
                    if this.scroll_to_target(&id) {
                        event.prevent_default();
                    }
                }),
            )?;
            self.bindings.listener(handle);
        }
        if self.bindings.is_empty() {
            return Ok(Attach::Skipped);
        }
        Ok(Attach::Active)
    }

    fn detach(&self) {
        self.bindings.release(&*self.page.dom);
    }
}

/// Root margin that shrinks the viewport by the header at the top and by
/// `bottom_percent` of its height at the bottom.
pub fn spy_root_margin(header_height: f64, bottom_percent: f64) -> String {
    format!("-{}px 0px -{}% 0px", header_height, bottom_percent)
}

/// Highlights the nav link of the section currently in view.
pub struct ScrollSpy<D: Dom> {
    page: Page<D>,
    pairs: RefCell<Vec<(D::Node, D::Node)>>,
    bindings: Bindings,
}

impl<D: Dom> ScrollSpy<D> {
    pub fn new(page: Page<D>) -> Self {
        Self {
            page,
            pairs: RefCell::new(Vec::new()),
            bindings: Bindings::default(),
        }
    }

    /// Each intersecting section activates its links and deactivates all others.
    pub fn apply(&self, entries: &[Intersection<D::Node>]) -> Result<(), DomError> {
        let dom = &self.page.dom;
        let pairs = self.pairs.borrow();
        for entry in entries.iter().filter(|entry| entry.is_intersecting) {
            for (link, section) in pairs.iter() {
                if *section == entry.target {
                    dom.add_class(link, ACTIVE_CLASS)?;
                } else {
                    dom.remove_class(link, ACTIVE_CLASS)?;
                }
            }
        }
        Ok(())
    }
}

impl<D: Dom> Component for ScrollSpy<D> {
    fn name(&self) -> &'static str {
        "scroll-spy"
    }

    fn attach(self: Rc<Self>) -> Result<Attach, DomError> {
        let dom = &self.page.dom;
        let mut pairs = Vec::new();
        let mut sections: Vec<D::Node> = Vec::new();
        for link in dom.query_all(None, &self.page.config.selectors.hash_link) {
            let href = dom.attribute(&link, "href");
            let Some(section) = href
                .as_deref()
                .and_then(hash_target)
                .and_then(|id| dom.element_by_id(id))
            else {
                continue;
            };
            if !sections.contains(&section) {
                sections.push(section.clone());
            }
            pairs.push((link, section));
        }
        if sections.is_empty() || !dom.supports_intersection() {
            return Ok(Attach::Skipped);
        }
        *self.pairs.borrow_mut() = pairs;

        let options = ObserverOptions {
            root_margin: spy_root_margin(
                self.page.header_height(),
                self.page.config.spy_bottom_margin_percent,
            ),
            threshold: 0.0,
        };
        let weak = Rc::downgrade(&self);
        let id = dom.observe_intersections(
            &options,
            &sections,
            Box::new(move |entries| {
                if let Some(this) = weak.upgrade() {
                    if let Err(err) = this.apply(entries) {
                        warn!("scroll-spy update failed: {}", err);
                    }
                }
                Vec::new()
            }),
        )?;
        self.bindings.observer(id);
        debug!("scroll-spy observing {} sections", sections.len());
        Ok(Attach::Active)
    }

    fn detach(&self) {
        self.bindings.release(&*self.page.dom);
        self.pairs.borrow_mut().clear();
    }
}
