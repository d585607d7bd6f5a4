use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::{debug, warn};

use crate::error::DomError;
use crate::host::{Dom, ListenerId, Page};
use crate::util::escape_html;

pub const CONTAINER_ID: &str = "toast-container";
const CONTAINER_STYLE: &str = "position:fixed;top:20px;right:20px;z-index:9999;max-width:350px;";
const TOAST_STYLE: &str = "margin-bottom:10px;animation:slideInRight 0.3s ease-out;";
const EXIT_ANIMATION: &str = "slideOutRight 0.3s ease-out";
const DISMISSED_ATTR: &str = "data-dismissed";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Severity {
    #[default]
    Info,
    Success,
    Danger,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Danger => "danger",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Toast notifications in one lazily created container.
pub struct Notifier<D: Dom> {
    page: Page<D>,
    container: RefCell<Option<D::Node>>,
    close_listeners: RefCell<Vec<(D::Node, ListenerId)>>,
}

impl<D: Dom> Notifier<D> {
    pub fn new(page: Page<D>) -> Self {
        Self {
            page,
            container: RefCell::new(None),
            close_listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn container(&self) -> Option<D::Node> {
        self.container.borrow().clone()
    }

    fn ensure_container(&self) -> Result<D::Node, DomError> {
        if let Some(container) = self.container.borrow().as_ref() {
            return Ok(container.clone());
        }
        let dom = &self.page.dom;
        let body = dom.body().ok_or(DomError::Missing("body"))?;
        let container = dom.create_element("div")?;
        dom.set_attribute(&container, "id", CONTAINER_ID)?;
        dom.set_css_text(&container, CONTAINER_STYLE)?;
        dom.append_child(&body, &container)?;
        *self.container.borrow_mut() = Some(container.clone());
        Ok(container)
    }

    pub fn show(self: &Rc<Self>, message: &str, severity: Severity) -> Result<D::Node, DomError> {
        let container = self.ensure_container()?;
        let dom = &self.page.dom;

        let toast = dom.create_element("div")?;
        dom.set_attribute(
            &toast,
            "class",
            &format!("alert alert-{} alert-dismissible fade show", severity),
        )?;
        dom.set_attribute(&toast, "role", "alert")?;
        dom.set_css_text(&toast, TOAST_STYLE)?;
        dom.set_inner_html(&toast, &escape_html(message));

        let close = dom.create_element("button")?;
        dom.set_attribute(&close, "type", "button")?;
        dom.set_attribute(&close, "class", "btn-close")?;
        dom.set_attribute(&close, "aria-label", &self.page.config.messages.close_label)?;
        dom.append_child(&toast, &close)?;

        let weak = Rc::downgrade(self);
        let target = toast.clone();
        let listener = dom.listen(
            &close,
            "click",
            Box::new(move |_| {
                if let Some(this) = weak.upgrade() {
                    this.dismiss(&target);
                }
            }),
        )?;
        self.close_listeners
            .borrow_mut()
            .push((toast.clone(), listener));

        dom.append_child(&container, &toast)?;

        let this = Rc::clone(self);
        let target = toast.clone();
        self.page.scheduler.set_timeout(
            self.page.config.timing.toast_lifetime_ms,
            Box::new(move || this.dismiss(&target)),
        );
        debug!("showing {} notification", severity);
        Ok(toast)
    }

    /// Plays the exit animation, then detaches the toast. Repeated calls are no-ops.
    pub fn dismiss(self: &Rc<Self>, toast: &D::Node) {
        let dom = &self.page.dom;
        if dom.has_attribute(toast, DISMISSED_ATTR) {
            return;
        }
        if let Err(err) = dom.set_attribute(toast, DISMISSED_ATTR, "true") {
            warn!("could not mark notification dismissed: {}", err);
        }
        if let Err(err) = dom.set_style(toast, "animation", EXIT_ANIMATION) {
            warn!("could not start notification exit animation: {}", err);
        }

        let this = Rc::clone(self);
        let target = toast.clone();
        self.page.scheduler.set_timeout(
            self.page.config.timing.toast_exit_ms,
            Box::new(move || this.detach_toast(&target)),
        );
    }

    fn detach_toast(&self, toast: &D::Node) {
        let dom = &self.page.dom;
        if dom.is_attached(toast) {
            dom.remove(toast);
        }
        let mut listeners = self.close_listeners.borrow_mut();
        if let Some(index) = listeners.iter().position(|(node, _)| node == toast) {
            let (_, id) = listeners.swap_remove(index);
            dom.unlisten(id);
        }
    }
}
