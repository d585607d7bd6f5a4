use std::rc::Rc;

use log::warn;

use crate::components::{Attach, Component};
use crate::error::DomError;
use crate::host::{Bindings, Dom, Page};

pub const FALLBACK_IMAGE: &str = "data:image/svg+xml,%3Csvg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 200 200\"%3E%3Crect fill=\"%23f0f0f0\" width=\"200\" height=\"200\"/%3E%3Ctext x=\"50%25\" y=\"50%25\" font-family=\"sans-serif\" font-size=\"16\" fill=\"%23999\" text-anchor=\"middle\" dy=\".3em\"%3EBild%3C/text%3E%3C/svg%3E";
const FALLBACK_MARKER: &str = "data-fallback-applied";

/// Responsive classes, lazy loading and a placeholder for broken images.
pub struct ImageManager<D: Dom> {
    page: Page<D>,
    bindings: Bindings,
}

impl<D: Dom> ImageManager<D> {
    pub fn new(page: Page<D>) -> Self {
        Self {
            page,
            bindings: Bindings::default(),
        }
    }

    fn is_logo(&self, image: &D::Node) -> bool {
        let dom = &self.page.dom;
        dom.closest(image, ".c-logo").is_some() || dom.has_class(image, "c-logo__img")
    }

    fn prepare(&self, image: &D::Node) -> Result<(), DomError> {
        let dom = &self.page.dom;
        if !dom.has_class(image, "img-fluid") {
            dom.add_class(image, "img-fluid")?;
        }
        let eager = self.is_logo(image) || dom.has_attribute(image, "data-critical");
        if !dom.has_attribute(image, "loading") && !eager {
            dom.set_attribute(image, "loading", "lazy")?;
        }
        Ok(())
    }

    /// Swaps in the placeholder once per image.
    pub fn apply_fallback(&self, image: &D::Node) -> Result<(), DomError> {
        let dom = &self.page.dom;
        if dom.has_attribute(image, FALLBACK_MARKER) {
            return Ok(());
        }
        dom.set_attribute(image, FALLBACK_MARKER, "true")?;
        dom.set_attribute(image, "src", FALLBACK_IMAGE)?;
        dom.set_style(image, "object-fit", "contain")?;
        if self.is_logo(image) {
            dom.set_style(image, "max-height", "40px")?;
        }
        Ok(())
    }
}

impl<D: Dom> Component for ImageManager<D> {
    fn name(&self) -> &'static str {
        "images"
    }

    fn attach(self: Rc<Self>) -> Result<Attach, DomError> {
        let dom = &self.page.dom;
        let images = dom.query_all(None, "img");
        if images.is_empty() {
            return Ok(Attach::Skipped);
        }
        for image in images {
            self.prepare(&image)?;
            let weak = Rc::downgrade(&self);
            let target = image.clone();
            let id = dom.listen(
                &image,
                "error",
                Box::new(move |_| {
                    let Some(this) = weak.upgrade() else { return };
                    if let Err(err) = this.apply_fallback(&target) {
                        warn!("image fallback failed: {}", err);
                    }
                }),
            )?;
            self.bindings.listener(id);
        }
        Ok(Attach::Active)
    }

    fn detach(&self) {
        self.bindings.release(&*self.page.dom);
    }
}
