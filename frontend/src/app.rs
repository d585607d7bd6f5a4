use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{debug, info, warn};

use crate::components::effects::MicroInteractions;
use crate::components::images::ImageManager;
use crate::components::modal::PrivacyModal;
use crate::components::nav::{ActiveMenu, BurgerMenu};
use crate::components::notification::Notifier;
use crate::components::reveal::RevealAnimations;
use crate::components::scroll::{ScrollSpy, SmoothScroll};
use crate::components::{Attach, Component};
use crate::error::DomError;
use crate::forms::controller::{FormController, SimulatedSubmitter, Submitter};
use crate::forms::rules::RuleSet;
use crate::host::{Dom, Page};

pub const STYLESHEET: &str = "@keyframes slideInRight{from{transform:translateX(100%);opacity:0}to{transform:translateX(0);opacity:1}}\
@keyframes slideOutRight{from{transform:translateX(0);opacity:1}to{transform:translateX(100%);opacity:0}}\
@keyframes ripple{to{transform:scale(4);opacity:0}}";

/// The page's behaviors, attached once in a fixed order.
pub struct App<D: Dom> {
    page: Page<D>,
    notifier: Rc<Notifier<D>>,
    submitter: Rc<dyn Submitter>,
    components: RefCell<Vec<Rc<dyn Component>>>,
    forms: RefCell<Vec<Rc<FormController<D>>>>,
    initialized: Cell<bool>,
}

impl<D: Dom> App<D> {
    pub fn new(page: Page<D>) -> Self {
        let submitter = Rc::new(SimulatedSubmitter::new(
            Rc::clone(&page.scheduler),
            page.config.timing.submit_latency_ms,
        ));
        Self::with_submitter(page, submitter)
    }

    pub fn with_submitter(page: Page<D>, submitter: Rc<dyn Submitter>) -> Self {
        let notifier = Rc::new(Notifier::new(page.clone()));
        Self {
            page,
            notifier,
            submitter,
            components: RefCell::new(Vec::new()),
            forms: RefCell::new(Vec::new()),
            initialized: Cell::new(false),
        }
    }

    pub fn notifier(&self) -> Rc<Notifier<D>> {
        Rc::clone(&self.notifier)
    }

    pub fn forms(&self) -> Vec<Rc<FormController<D>>> {
        self.forms.borrow().clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    /// Attaches every behavior; later calls are no-ops.
    pub fn init(&self) {
        if self.initialized.replace(true) {
            debug!("page behaviors already initialized");
            return;
        }
        let page = &self.page;
        let components: Vec<Rc<dyn Component>> = vec![
            Rc::new(BurgerMenu::new(page.clone())),
            Rc::new(SmoothScroll::new(page.clone())),
            Rc::new(ActiveMenu::new(page.clone())),
            Rc::new(ScrollSpy::new(page.clone())),
            Rc::new(ImageManager::new(page.clone())),
            Rc::new(RevealAnimations::new(page.clone())),
            Rc::new(MicroInteractions::new(page.clone())),
            Rc::new(PrivacyModal::new(page.clone())),
        ];
        for component in components {
            self.activate(component);
        }
        self.attach_forms();

        if let Err(err) = self.install_stylesheet() {
            warn!("could not install keyframes: {}", err);
        }
        info!(
            "page behaviors initialized ({} active)",
            self.components.borrow().len()
        );
    }

    /// Detaches every active behavior.
    pub fn shutdown(&self) {
        for component in self.components.take() {
            component.detach();
        }
        self.forms.borrow_mut().clear();
        debug!("page behaviors detached");
    }

    fn attach_forms(&self) {
        let page = &self.page;
        let rules = match RuleSet::from_config(&page.config.rules) {
            Ok(rules) => Rc::new(rules),
            Err(err) => {
                warn!("form validation disabled: {}", err);
                return;
            }
        };
        for form in page.dom.query_all(None, &page.config.selectors.form) {
            let controller = Rc::new(FormController::new(
                page.clone(),
                form,
                Rc::clone(&rules),
                Rc::clone(&self.notifier),
                Rc::clone(&self.submitter),
            ));
            if self.activate(controller.clone()) {
                self.forms.borrow_mut().push(controller);
            }
        }
    }

    /// A failing component is logged and left out; the others still attach.
    fn activate(&self, component: Rc<dyn Component>) -> bool {
        let name = component.name();
        match Rc::clone(&component).attach() {
            Ok(Attach::Active) => {
                debug!("{} attached", name);
                self.components.borrow_mut().push(component);
                true
            }
            Ok(Attach::Skipped) => {
                debug!("{} skipped: elements not on this page", name);
                false
            }
            Err(err) => {
                warn!("{} failed to attach: {}", name, err);
                component.detach();
                false
            }
        }
    }

    fn install_stylesheet(&self) -> Result<(), DomError> {
        let dom = &self.page.dom;
        let head = dom.head().ok_or(DomError::Missing("head"))?;
        let style = dom.create_element("style")?;
        dom.set_text(&style, STYLESHEET);
        dom.append_child(&head, &style)
    }
}
