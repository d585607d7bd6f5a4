use std::rc::Rc;

use log::{debug, warn};

use crate::components::{Attach, Component};
use crate::error::DomError;
use crate::host::{Bindings, Dom, ObserverOptions, Page};

/// One-shot fade-and-rise entrance for content scrolled into view.
pub struct RevealAnimations<D: Dom> {
    page: Page<D>,
    bindings: Bindings,
}

impl<D: Dom> RevealAnimations<D> {
    pub fn new(page: Page<D>) -> Self {
        Self {
            page,
            bindings: Bindings::default(),
        }
    }

    pub fn reveal(&self, element: &D::Node) -> Result<(), DomError> {
        let dom = &self.page.dom;
        dom.set_style(element, "opacity", "0")?;
        dom.set_style(element, "transform", "translateY(30px)")?;

        let seconds = f64::from(self.page.config.timing.reveal_duration_ms) / 1000.0;
        let transition = format!(
            "opacity {s}s ease-out, transform {s}s ease-out",
            s = seconds
        );
        let dom = Rc::clone(dom);
        let element = element.clone();
        self.page.scheduler.next_frame(Box::new(move || {
            let applied = dom
                .set_style(&element, "transition", &transition)
                .and_then(|_| dom.set_style(&element, "opacity", "1"))
                .and_then(|_| dom.set_style(&element, "transform", "translateY(0)"));
            if let Err(err) = applied {
                warn!("reveal transition failed: {}", err);
            }
        }));
        Ok(())
    }
}

impl<D: Dom> Component for RevealAnimations<D> {
    fn name(&self) -> &'static str {
        "reveal-animations"
    }

    fn attach(self: Rc<Self>) -> Result<Attach, DomError> {
        let dom = &self.page.dom;
        if !dom.supports_intersection() {
            return Ok(Attach::Skipped);
        }
        let elements = dom.query_all(None, &self.page.config.selectors.reveal);
        if elements.is_empty() {
            return Ok(Attach::Skipped);
        }
        let options = ObserverOptions {
            root_margin: "0px".to_string(),
            threshold: self.page.config.reveal_threshold,
        };
        let weak = Rc::downgrade(&self);
        let id = dom.observe_intersections(
            &options,
            &elements,
            Box::new(move |entries| {
                let Some(this) = weak.upgrade() else {
                    return Vec::new();
                };
                entries
                    .iter()
                    .filter(|entry| entry.is_intersecting)
                    .map(|entry| {
                        if let Err(err) = this.reveal(&entry.target) {
                            warn!("reveal failed: {}", err);
                        }
                        entry.target.clone()
                    })
                    .collect()
            }),
        )?;
        self.bindings.observer(id);
        debug!("observing {} elements for reveal", elements.len());
        Ok(Attach::Active)
    }

    fn detach(&self) {
        self.bindings.release(&*self.page.dom);
    }
}
