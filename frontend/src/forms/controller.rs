use std::cell::RefCell;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use log::{debug, info, warn};

use crate::components::notification::{Notifier, Severity};
use crate::components::{Attach, Component};
use crate::error::{DomError, SubmitError};
use crate::forms::rules::RuleSet;
use crate::forms::validator::{FieldValidator, FIELD_SELECTOR};
use crate::host::{Bindings, Dom, Page, Scheduler};
use crate::util::Debouncer;

const SUBMIT_SELECTOR: &str = "[type=\"submit\"]";

/// Name/value pairs of the considered fields at submit time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormPayload {
    pub fields: Vec<(String, String)>,
}

/// The round-trip a valid form is handed to.
pub trait Submitter {
    fn submit(&self, payload: FormPayload) -> LocalBoxFuture<'static, Result<(), SubmitError>>;
}

/// Stands in for a network call: succeeds after a fixed latency.
pub struct SimulatedSubmitter {
    scheduler: Rc<dyn Scheduler>,
    latency_ms: u32,
}

impl SimulatedSubmitter {
    pub fn new(scheduler: Rc<dyn Scheduler>, latency_ms: u32) -> Self {
        Self {
            scheduler,
            latency_ms,
        }
    }
}

impl Submitter for SimulatedSubmitter {
    fn submit(&self, payload: FormPayload) -> LocalBoxFuture<'static, Result<(), SubmitError>> {
        let delay = self.scheduler.sleep(self.latency_ms);
        async move {
            delay.await;
            debug!("simulated submission of {} fields", payload.fields.len());
            Ok(())
        }
        .boxed_local()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormPhase {
    #[default]
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

impl FormPhase {
    pub fn accepts_submit(self) -> bool {
        self != FormPhase::Submitting
    }

    pub fn after_validation(valid: bool) -> Self {
        if valid {
            FormPhase::Submitting
        } else {
            FormPhase::Idle
        }
    }

    pub fn after_submission(result: &Result<(), SubmitError>) -> Self {
        match result {
            Ok(()) => FormPhase::Succeeded,
            Err(_) => FormPhase::Failed,
        }
    }
}

#[derive(Debug, Default)]
pub struct FormSession {
    pub phase: FormPhase,
    /// Set by the first submit attempt; enables live re-validation.
    pub validated_once: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A submission was already in flight.
    Ignored,
    /// At least one field failed validation.
    Rejected,
    Started,
}

struct SubmitControl<N> {
    node: N,
    label: String,
}

/// Returns the form to `Idle` however the submission ends.
struct PhaseReset<D: Dom>(Rc<FormController<D>>);

impl<D: Dom> Drop for PhaseReset<D> {
    fn drop(&mut self) {
        self.0.session.borrow_mut().phase = FormPhase::Idle;
    }
}

pub struct FormController<D: Dom> {
    page: Page<D>,
    form: D::Node,
    validator: FieldValidator<D>,
    notifier: Rc<Notifier<D>>,
    submitter: Rc<dyn Submitter>,
    session: RefCell<FormSession>,
    /// Submit control markup as rendered before any interaction.
    submit_label: RefCell<Option<(D::Node, String)>>,
    bindings: Bindings,
}

impl<D: Dom> FormController<D> {
    pub fn new(
        page: Page<D>,
        form: D::Node,
        rules: Rc<RuleSet>,
        notifier: Rc<Notifier<D>>,
        submitter: Rc<dyn Submitter>,
    ) -> Self {
        let validator = FieldValidator::new(Rc::clone(&page.dom), rules);
        Self {
            page,
            form,
            validator,
            notifier,
            submitter,
            session: RefCell::new(FormSession::default()),
            submit_label: RefCell::new(None),
            bindings: Bindings::default(),
        }
    }

    pub fn form(&self) -> &D::Node {
        &self.form
    }

    pub fn phase(&self) -> FormPhase {
        self.session.borrow().phase
    }

    pub fn validated_once(&self) -> bool {
        self.session.borrow().validated_once
    }

    pub fn validator(&self) -> &FieldValidator<D> {
        &self.validator
    }

    pub fn validate_form(&self) -> bool {
        match self.validator.validate_all(&self.form) {
            Ok(valid) => valid,
            Err(err) => {
                warn!("form validation failed: {}", err);
                false
            }
        }
    }

    pub fn handle_submit(self: &Rc<Self>) -> SubmitOutcome {
        {
            let mut session = self.session.borrow_mut();
            if !session.phase.accepts_submit() {
                debug!("submit ignored while a submission is in flight");
                return SubmitOutcome::Ignored;
            }
            session.validated_once = true;
            session.phase = FormPhase::Validating;
        }
        if let Err(err) = self.page.dom.add_class(&self.form, "was-validated") {
            warn!("could not mark form as validated: {}", err);
        }

        let valid = self.validate_form();
        self.set_phase(FormPhase::after_validation(valid));
        if !valid {
            self.notify(&self.page.config.messages.form_invalid, Severity::Danger);
            return SubmitOutcome::Rejected;
        }

        let control = self.begin_submitting();
        let operation = self.submitter.submit(self.payload());
        let this = Rc::clone(self);
        self.page.scheduler.spawn(
            async move {
                let _reset = PhaseReset(Rc::clone(&this));
                let result = operation.await;
                this.set_phase(FormPhase::after_submission(&result));
                match result {
                    Ok(()) => this.finish_success(),
                    Err(err) => this.finish_failure(err, control),
                }
            }
            .boxed_local(),
        );
        SubmitOutcome::Started
    }

    fn set_phase(&self, phase: FormPhase) {
        self.session.borrow_mut().phase = phase;
    }

    fn notify(&self, message: &str, severity: Severity) {
        if let Err(err) = self.notifier.show(message, severity) {
            warn!("could not show notification: {}", err);
        }
    }

    fn payload(&self) -> FormPayload {
        let dom = &self.page.dom;
        let fields = dom
            .query_all(Some(&self.form), FIELD_SELECTOR)
            .into_iter()
            .filter_map(|field| {
                let key = self.validator.identifier(&field)?;
                let value = self.validator.read(&field);
                let value = if self.validator.is_checkbox(&field) {
                    value.checked.to_string()
                } else {
                    value.value
                };
                Some((key, value))
            })
            .collect();
        FormPayload { fields }
    }

    fn begin_submitting(&self) -> Option<SubmitControl<D::Node>> {
        let dom = &self.page.dom;
        let node = dom.query(Some(&self.form), SUBMIT_SELECTOR)?;
        let label = match self.submit_label.borrow().as_ref() {
            Some((cached, label)) if *cached == node => label.clone(),
            _ => dom.inner_html(&node),
        };
        if let Err(err) = dom.set_attribute(&node, "disabled", "") {
            warn!("could not disable submit control: {}", err);
        }
        dom.set_inner_html(&node, &self.page.config.messages.submitting_label);
        Some(SubmitControl { node, label })
    }

    fn finish_success(&self) {
        info!("form submitted");
        self.notify(&self.page.config.messages.submit_success, Severity::Success);
        let viewport = Rc::clone(&self.page.viewport);
        let target = self.page.config.redirect_url.clone();
        self.page.scheduler.set_timeout(
            self.page.config.timing.redirect_delay_ms,
            Box::new(move || viewport.navigate(&target)),
        );
    }

    fn finish_failure(&self, err: SubmitError, control: Option<SubmitControl<D::Node>>) {
        warn!("form submission failed: {}", err);
        self.notify(&self.page.config.messages.submit_failure, Severity::Danger);
        if let Some(SubmitControl { node, label }) = control {
            let dom = &self.page.dom;
            if let Err(err) = dom.remove_attribute(&node, "disabled") {
                warn!("could not re-enable submit control: {}", err);
            }
            dom.set_inner_html(&node, &label);
        }
    }

    fn revalidate(&self, field: &D::Node) {
        if !self.validated_once() {
            return;
        }
        if let Err(err) = self.validator.validate(field) {
            warn!("field validation failed: {}", err);
        }
    }
}

impl<D: Dom> Component for FormController<D> {
    fn name(&self) -> &'static str {
        "form"
    }

    fn attach(self: Rc<Self>) -> Result<Attach, DomError> {
        let dom = &self.page.dom;

        // Captured before click ripples are appended to the control.
        *self.submit_label.borrow_mut() = dom
            .query(Some(&self.form), SUBMIT_SELECTOR)
            .map(|node| {
                let label = dom.inner_html(&node);
                (node, label)
            });

        let weak = Rc::downgrade(&self);
        let id = dom.listen(
            &self.form,
            "submit",
            Box::new(move |event| {
                event.prevent_default();
                event.stop_propagation();
                if let Some(this) = weak.upgrade() {
                    this.handle_submit();
                }
            }),
        )?;
        self.bindings.listener(id);

        for field in dom.query_all(Some(&self.form), FIELD_SELECTOR) {
            let weak = Rc::downgrade(&self);
            let target = field.clone();
            let id = dom.listen(
                &field,
                "blur",
                Box::new(move |_| {
                    if let Some(this) = weak.upgrade() {
                        this.revalidate(&target);
                    }
                }),
            )?;
            self.bindings.listener(id);

            let debouncer = Debouncer::new(
                Rc::clone(&self.page.scheduler),
                self.page.config.timing.input_debounce_ms,
            );
            let weak = Rc::downgrade(&self);
            let target = field.clone();
            let id = dom.listen(
                &field,
                "input",
                Box::new(move |_| {
                    let weak = weak.clone();
                    let target = target.clone();
                    debouncer.call(Box::new(move || {
                        if let Some(this) = weak.upgrade() {
                            this.revalidate(&target);
                        }
                    }));
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_is_gated_only_while_submitting() {
        assert!(FormPhase::Idle.accepts_submit());
        assert!(FormPhase::Succeeded.accepts_submit());
        assert!(FormPhase::Failed.accepts_submit());
        assert!(!FormPhase::Submitting.accepts_submit());
    }

    #[test]
    fn phase_transitions() {
        assert_eq!(FormPhase::after_validation(false), FormPhase::Idle);
        assert_eq!(FormPhase::after_validation(true), FormPhase::Submitting);
        assert_eq!(FormPhase::after_submission(&Ok(())), FormPhase::Succeeded);
        assert_eq!(
            FormPhase::after_submission(&Err(SubmitError::Interrupted)),
            FormPhase::Failed
        );
    }
}
