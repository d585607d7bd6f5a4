use std::rc::Rc;

use log::warn;

use crate::components::{Attach, Component};
use crate::error::DomError;
use crate::host::{Bindings, Dom, DomEvent, Page, Rect};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ripple {
    pub size: f64,
    pub x: f64,
    pub y: f64,
}

/// A circle covering the element, centered on the pointer.
pub fn ripple_geometry(rect: Rect, client_x: f64, client_y: f64) -> Ripple {
    let size = rect.width.max(rect.height);
    Ripple {
        size,
        x: client_x - rect.left - size / 2.0,
        y: client_y - rect.top - size / 2.0,
    }
}

/// Click ripples on buttons and hover lift on cards.
pub struct MicroInteractions<D: Dom> {
    page: Page<D>,
    bindings: Bindings,
}

impl<D: Dom> MicroInteractions<D> {
    pub fn new(page: Page<D>) -> Self {
        Self {
            page,
            bindings: Bindings::default(),
        }
    }

    pub fn ripple(&self, button: &D::Node, event: &DomEvent<D::Node>) -> Result<D::Node, DomError> {
        let dom = &self.page.dom;
        let geometry = ripple_geometry(dom.bounding_rect(button), event.client_x, event.client_y);
        let ripple = dom.create_element("span")?;
        dom.set_css_text(
            &ripple,
            &format!(
                "position:absolute;width:{size}px;height:{size}px;border-radius:50%;\
                 background:rgba(255,255,255,0.6);left:{x}px;top:{y}px;pointer-events:none;\
                 transform:scale(0);animation:ripple 0.6s ease-out;",
                size = geometry.size,
                x = geometry.x,
                y = geometry.y,
            ),
        )?;
        dom.set_style(button, "position", "relative")?;
        dom.set_style(button, "overflow", "hidden")?;
        dom.append_child(button, &ripple)?;

        let dom = Rc::clone(dom);
        let expired = ripple.clone();
        self.page.scheduler.set_timeout(
            self.page.config.timing.ripple_ms,
            Box::new(move || dom.remove(&expired)),
        );
        Ok(ripple)
    }

    fn lift(&self, card: &D::Node, raised: bool) -> Result<(), DomError> {
        let dom = &self.page.dom;
        if raised {
            dom.set_style(card, "transition", "all 0.3s ease-out")?;
            dom.set_style(card, "transform", "translateY(-8px) scale(1.02)")
        } else {
            dom.set_style(card, "transform", "translateY(0) scale(1)")
        }
    }
}

impl<D: Dom> Component for MicroInteractions<D> {
    fn name(&self) -> &'static str {
        "micro-interactions"
    }

    fn attach(self: Rc<Self>) -> Result<Attach, DomError> {
        let dom = &self.page.dom;
        let selectors = &self.page.config.selectors;

        for button in dom.query_all(None, &selectors.ripple) {
            let weak = Rc::downgrade(&self);
            let target = button.clone();
            let id = dom.listen(
                &button,
                "click",
                Box::new(move |event| {
                    let Some(this) = weak.upgrade() else { return };
                    if let Err(err) = this.ripple(&target, event) {
                        warn!("ripple failed: {}", err);
                    }
                }),
            )?;
            self.bindings.listener(id);
        }

        for card in dom.query_all(None, &selectors.hover_card) {
            for (event, raised) in [("mouseenter", true), ("mouseleave", false)] {
                let weak = Rc::downgrade(&self);
                let target = card.clone();
                let id = dom.listen(
                    &card,
                    event,
                    Box::new(move |_| {
                        let Some(this) = weak.upgrade() else { return };
                        if let Err(err) = this.lift(&target, raised) {
                            warn!("hover effect failed: {}", err);
                        }
                    }),
                )?;
                self.bindings.listener(id);
            }
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
