use std::cell::RefCell;
use std::rc::Rc;

use log::warn;

use crate::components::{Attach, Component};
use crate::error::DomError;
use crate::host::{Bindings, Dom, Page};

pub const MODAL_ID: &str = "privacy-modal";
const OPEN_CLASS: &str = "is-open";
const PRIVACY_PAGE: &str = "privacy.html";

/// Privacy notice shown in place of navigating to the privacy page.
pub struct PrivacyModal<D: Dom> {
    page: Page<D>,
    modal: RefCell<Option<D::Node>>,
    bindings: Bindings,
}

impl<D: Dom> PrivacyModal<D> {
    pub fn new(page: Page<D>) -> Self {
        Self {
            page,
            modal: RefCell::new(None),
            bindings: Bindings::default(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.modal
            .borrow()
            .as_ref()
            .is_some_and(|modal| self.page.dom.has_class(modal, OPEN_CLASS))
    }

    pub fn open(self: &Rc<Self>) -> Result<(), DomError> {
        let modal = self.ensure_modal()?;
        let dom = &self.page.dom;
        dom.add_class(&modal, OPEN_CLASS)?;
        if let Some(body) = dom.body() {
            dom.set_style(&body, "overflow", "hidden")?;
        }
        Ok(())
    }

    pub fn close(&self) -> Result<(), DomError> {
        let dom = &self.page.dom;
        if let Some(modal) = self.modal.borrow().as_ref() {
            dom.remove_class(modal, OPEN_CLASS)?;
        }
        if let Some(body) = dom.body() {
            dom.set_style(&body, "overflow", "")?;
        }
        Ok(())
    }

    fn close_logged(&self) {
        if let Err(err) = self.close() {
            warn!("could not close privacy notice: {}", err);
        }
    }

    /// Uses the page's own `#privacy-modal` when present, else builds one.
    fn ensure_modal(self: &Rc<Self>) -> Result<D::Node, DomError> {
        if let Some(modal) = self.modal.borrow().as_ref() {
            return Ok(modal.clone());
        }
        let dom = &self.page.dom;
        let modal = match dom.element_by_id(MODAL_ID) {
            Some(existing) => existing,
            None => self.build()?,
        };

        if let Some(close) = dom.query(Some(&modal), ".c-modal__close") {
            let weak = Rc::downgrade(self);
            let id = dom.listen(
                &close,
                "click",
                Box::new(move |_| {
                    if let Some(this) = weak.upgrade() {
                        this.close_logged();
                    }
                }),
            )?;
            self.bindings.listener(id);
        }

        let weak = Rc::downgrade(self);
        let backdrop = modal.clone();
        let id = dom.listen(
            &modal,
            "click",
            Box::new(move |event| {
                let Some(this) = weak.upgrade() else { return };
                if event.target.as_ref() == Some(&backdrop) {
                    this.close_logged();
                }
            }),
        )?;
        self.bindings.listener(id);

        let weak = Rc::downgrade(self);
        let id = dom.listen_document(
            "keydown",
            Box::new(move |event| {
                let Some(this) = weak.upgrade() else { return };
                if event.key.as_deref() == Some("Escape") && this.is_open() {
                    this.close_logged();
                }
            }),
        )?;
        self.bindings.listener(id);

        *self.modal.borrow_mut() = Some(modal.clone());
        Ok(modal)
    }

    fn build(&self) -> Result<D::Node, DomError> {
        let dom = &self.page.dom;
        let body = dom.body().ok_or(DomError::Missing("body"))?;

        let modal = dom.create_element("div")?;
        dom.set_attribute(&modal, "id", MODAL_ID)?;
        dom.set_attribute(&modal, "class", "c-modal")?;

        let content = dom.create_element("div")?;
        dom.set_attribute(&content, "class", "c-modal__content")?;

        let close = dom.create_element("button")?;
        dom.set_attribute(&close, "class", "c-modal__close")?;
        dom.set_attribute(&close, "aria-label", &self.page.config.messages.close_label)?;
        dom.set_inner_html(&close, "&times;");

        let heading = dom.create_element("h2")?;
        dom.set_text(&heading, "Datenschutzerklärung");

        let text = dom.create_element("p")?;
        dom.set_inner_html(
            &text,
            "Ihre Privatsphäre ist uns wichtig. Für vollständige Informationen besuchen Sie bitte unsere <a href=\"privacy.html\" target=\"_blank\">Datenschutzseite</a>.",
        );

        dom.append_child(&content, &close)?;
        dom.append_child(&content, &heading)?;
        dom.append_child(&content, &text)?;
        dom.append_child(&modal, &content)?;
        dom.append_child(&body, &modal)?;
        Ok(modal)
    }
}

impl<D: Dom> Component for PrivacyModal<D> {
    fn name(&self) -> &'static str {
        "privacy-modal"
    }

    fn attach(self: Rc<Self>) -> Result<Attach, DomError> {
        let dom = &self.page.dom;
        for link in dom.query_all(None, &self.page.config.selectors.privacy_link) {
            let leads_to_privacy = dom
                .attribute(&link, "href")
                .is_some_and(|href| href.contains(PRIVACY_PAGE));
            if !leads_to_privacy {
                continue;
            }
            let weak = Rc::downgrade(&self);
            let id = dom.listen(
                &link,
                "click",
                Box::new(move |event| {
                    if event.ctrl_key || event.meta_key {
                        return;
                    }
                    event.prevent_default();
                    if let Some(this) = weak.upgrade() {
                        if let Err(err) = this.open() {
                            warn!("could not open privacy notice: {}", err);
                        }
                    }
                }),
            )?;
            self.bindings.listener(id);
        }
        if self.bindings.is_empty() {
            return Ok(Attach::Skipped);
        }
        Ok(Attach::Active)
    }

    fn detach(&self) {
        self.close_logged();
        self.bindings.release(&*self.page.dom);
        self.modal.borrow_mut().take();
    }
}
