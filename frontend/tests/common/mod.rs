#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use marketing_frontend::forms::controller::{FormPayload, Submitter};
use marketing_frontend::headless::{ManualScheduler, MemoryDom, NodeId, RecordingViewport};
use marketing_frontend::{Config, Dom, Page, Scheduler, SubmitError};

/// A page on the in-memory host with a virtual clock.
pub struct Harness {
    pub dom: Rc<MemoryDom>,
    pub clock: Rc<ManualScheduler>,
    pub viewport: Rc<RecordingViewport>,
    pub page: Page<MemoryDom>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let dom = Rc::new(MemoryDom::new());
        let clock = Rc::new(ManualScheduler::new());
        let viewport = Rc::new(RecordingViewport::default());
        let page = Page::new(
            Rc::clone(&dom),
            clock.clone() as Rc<dyn Scheduler>,
            viewport.clone() as Rc<dyn marketing_frontend::Viewport>,
            config,
        );
        Self {
            dom,
            clock,
            viewport,
            page,
        }
    }

    pub fn body(&self) -> NodeId {
        self.dom.body_node()
    }

    /// Children of `parent` carrying `class`.
    pub fn children_with_class(&self, parent: NodeId, class: &str) -> Vec<NodeId> {
        self.dom
            .children(parent)
            .into_iter()
            .filter(|child| self.dom.has_class(child, class))
            .collect()
    }
}

/// The contact form markup, one group per field.
pub struct ContactForm {
    pub form: NodeId,
    pub name: NodeId,
    pub email: NodeId,
    pub phone: NodeId,
    pub message: NodeId,
    pub privacy: NodeId,
    pub submit: NodeId,
}

impl ContactForm {
    pub fn build(dom: &MemoryDom) -> Self {
        let section = dom.element(dom.body_node(), "section", &[("id", "kontakt")]);
        let form = dom.element(
            section,
            "form",
            &[("class", "c-form needs-validation"), ("novalidate", "")],
        );
        let field = |tag: &str, attributes: &[(&str, &str)]| {
            let group = dom.element(form, "div", &[("class", "c-form__group")]);
            dom.element(group, tag, attributes)
        };
        let name = field(
            "input",
            &[("id", "contact-name"), ("class", "c-form__input"), ("required", "")],
        );
        let email = field(
            "input",
            &[("id", "contact-email"), ("type", "email"), ("required", "")],
        );
        let phone = field("input", &[("id", "contact-phone"), ("type", "tel")]);
        let message = field("textarea", &[("id", "contact-message"), ("required", "")]);
        let privacy = field(
            "input",
            &[("id", "contact-privacy"), ("type", "checkbox"), ("required", "")],
        );
        let submit = dom.element(form, "button", &[("type", "submit"), ("class", "btn")]);
        dom.set_inner_html(&submit, "Nachricht senden");
        Self {
            form,
            name,
            email,
            phone,
            message,
            privacy,
            submit,
        }
    }

    pub fn fill_valid(&self, dom: &MemoryDom) {
        dom.set_value(self.name, "Anna Müller");
        dom.set_value(self.email, "anna@example.de");
        dom.set_value(self.phone, "+49 30 1234567");
        dom.set_value(self.message, "Ich interessiere mich für ein Angebot.");
        dom.set_checked(self.privacy, true);
    }

    pub fn fields(&self) -> [NodeId; 5] {
        [self.name, self.email, self.phone, self.message, self.privacy]
    }

    pub fn submit(&self, dom: &MemoryDom) {
        dom.fire(self.form, "submit");
    }
}

/// Submitter that records payloads and resolves after a virtual delay.
pub struct CountingSubmitter {
    scheduler: Rc<dyn Scheduler>,
    latency_ms: u32,
    fail: Cell<bool>,
    payloads: RefCell<Vec<FormPayload>>,
}

impl CountingSubmitter {
    pub fn new(scheduler: Rc<dyn Scheduler>, latency_ms: u32) -> Self {
        Self {
            scheduler,
            latency_ms,
            fail: Cell::new(false),
            payloads: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(self) -> Self {
        self.fail.set(true);
        self
    }

    pub fn calls(&self) -> usize {
        self.payloads.borrow().len()
    }

    pub fn last_payload(&self) -> Option<FormPayload> {
        self.payloads.borrow().last().cloned()
    }
}

impl Submitter for CountingSubmitter {
    fn submit(&self, payload: FormPayload) -> LocalBoxFuture<'static, Result<(), SubmitError>> {
        self.payloads.borrow_mut().push(payload);
        let delay = self.scheduler.sleep(self.latency_ms);
        let fail = self.fail.get();
        async move {
            delay.await;
            if fail {
                Err(SubmitError::Rejected("503 Service Unavailable".to_string()))
            } else {
                Ok(())
            }
        }
        .boxed_local()
    }
}
