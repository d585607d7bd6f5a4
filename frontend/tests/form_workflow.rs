mod common;

use std::rc::Rc;

use common::{ContactForm, CountingSubmitter, Harness};
use marketing_frontend::components::notification::CONTAINER_ID;
use marketing_frontend::forms::controller::{FormPhase, Submitter, SubmitOutcome};
use marketing_frontend::headless::{MemoryDom, NodeId};
use marketing_frontend::{App, Dom};

struct Mounted {
    h: Harness,
    form: ContactForm,
    submitter: Rc<CountingSubmitter>,
    app: App<MemoryDom>,
}

fn mount(failing: bool) -> Mounted {
    let h = Harness::new();
    let form = ContactForm::build(&h.dom);
    let mut submitter = CountingSubmitter::new(h.clock.clone(), 800);
    if failing {
        submitter = submitter.failing();
    }
    let submitter = Rc::new(submitter);
    let app = App::with_submitter(h.page.clone(), submitter.clone() as Rc<dyn Submitter>);
    app.init();
    Mounted {
        h,
        form,
        submitter,
        app,
    }
}

fn toasts(h: &Harness) -> Vec<NodeId> {
    h.dom
        .element_by_id(CONTAINER_ID)
        .map(|container| h.dom.children(container))
        .unwrap_or_default()
}

fn error_slots(h: &Harness, field: NodeId) -> Vec<NodeId> {
    let group = h.dom.parent(&field).unwrap();
    h.dom.query_all(Some(&group), ".c-form__error, .invalid-feedback")
}

#[test]
fn empty_submit_marks_every_field_and_warns() {
    let Mounted {
        h,
        form,
        submitter,
        app: _app,
    } = mount(false);

    let event = h.dom.fire(form.form, "submit");
    assert!(event.default_prevented());
    assert!(h.dom.has_class(&form.form, "was-validated"));
    for field in form.fields() {
        assert!(h.dom.has_class(&field, "is-invalid"), "{:?}", field);
        assert!(h.dom.has_class(&field, "is-error"), "{:?}", field);
        let slots = error_slots(&h, field);
        assert_eq!(slots.len(), 1);
        assert_eq!(h.dom.style(&slots[0], "display"), "block");
        assert_eq!(h.dom.attribute(&slots[0], "role").as_deref(), Some("alert"));
    }

    let rules = &h.page.config.rules;
    let name_error = error_slots(&h, form.name)[0];
    assert!(h.dom.has_class(&name_error, "c-form__error"));
    assert_eq!(h.dom.text(&name_error), rules.name_message);
    let privacy_error = error_slots(&h, form.privacy)[0];
    assert!(h.dom.has_class(&privacy_error, "invalid-feedback"));
    assert_eq!(h.dom.text(&privacy_error), rules.privacy_message);

    assert_eq!(submitter.calls(), 0);
    let shown = toasts(&h);
    assert_eq!(shown.len(), 1);
    assert!(h.dom.has_class(&shown[0], "alert-danger"));
    assert!(h.dom.text(&shown[0]).contains(&h.page.config.messages.form_invalid));
}

#[test]
fn repeated_validation_reuses_error_elements() {
    let Mounted { h, form, app, submitter: _ } = mount(false);
    form.submit(&h.dom);
    form.submit(&h.dom);
    form.submit(&h.dom);

    for field in form.fields() {
        assert_eq!(error_slots(&h, field).len(), 1);
    }
    assert_eq!(app.forms()[0].phase(), FormPhase::Idle);
}

#[test]
fn fixing_a_field_clears_its_error_only() {
    let Mounted {
        h, form, app: _app, ..
    } = mount(false);
    form.submit(&h.dom);

    h.dom.set_value(form.email, "anna@example.de");
    h.dom.fire(form.email, "blur");

    assert!(!h.dom.has_class(&form.email, "is-invalid"));
    assert_eq!(h.dom.style(&error_slots(&h, form.email)[0], "display"), "none");
    assert!(h.dom.has_class(&form.name, "is-invalid"));
}

#[test]
fn valid_submission_follows_the_full_timeline() {
    let Mounted {
        h,
        form,
        submitter,
        app,
    } = mount(false);
    let controller = Rc::clone(&app.forms()[0]);
    form.fill_valid(&h.dom);

    form.submit(&h.dom);
    assert_eq!(controller.phase(), FormPhase::Submitting);
    assert!(h.dom.has_attribute(&form.submit, "disabled"));
    assert_eq!(
        h.dom.inner_html(&form.submit),
        h.page.config.messages.submitting_label
    );
    for field in form.fields() {
        assert!(!h.dom.has_class(&field, "is-invalid"));
    }

    h.clock.advance(799);
    assert!(toasts(&h).is_empty());

    h.clock.advance(1);
    let shown = toasts(&h);
    assert_eq!(shown.len(), 1);
    assert!(h.dom.has_class(&shown[0], "alert-success"));
    assert_eq!(controller.phase(), FormPhase::Idle);
    assert!(h.viewport.navigations().is_empty());

    h.clock.advance(1499);
    assert!(h.viewport.navigations().is_empty());
    h.clock.advance(1);
    assert_eq!(h.viewport.navigations(), ["thank_you.html"]);
    assert!(h.dom.has_attribute(&form.submit, "disabled"));

    let payload = submitter.last_payload().unwrap();
    assert!(payload
        .fields
        .contains(&("contact-name".to_string(), "Anna Müller".to_string())));
    assert!(payload
        .fields
        .contains(&("contact-privacy".to_string(), "true".to_string())));
}

#[test]
fn submit_during_flight_is_ignored() {
    let Mounted {
        h,
        form,
        submitter,
        app,
    } = mount(false);
    let controller = Rc::clone(&app.forms()[0]);
    form.fill_valid(&h.dom);

    assert_eq!(controller.handle_submit(), SubmitOutcome::Started);
    form.submit(&h.dom);
    assert_eq!(controller.handle_submit(), SubmitOutcome::Ignored);

    h.clock.advance(800);
    assert_eq!(submitter.calls(), 1);
    let successes: Vec<NodeId> = toasts(&h)
        .into_iter()
        .filter(|toast| h.dom.has_class(toast, "alert-success"))
        .collect();
    assert_eq!(successes.len(), 1);
}

#[test]
fn failed_submission_restores_the_submit_control() {
    let Mounted {
        h,
        form,
        submitter,
        app,
    } = mount(true);
    let controller = Rc::clone(&app.forms()[0]);
    form.fill_valid(&h.dom);

    form.submit(&h.dom);
    h.clock.advance(800);

    let shown = toasts(&h);
    assert_eq!(shown.len(), 1);
    assert!(h.dom.has_class(&shown[0], "alert-danger"));
    assert!(h
        .dom
        .text(&shown[0])
        .contains(&h.page.config.messages.submit_failure));
    assert!(!h.dom.has_attribute(&form.submit, "disabled"));
    assert_eq!(h.dom.inner_html(&form.submit), "Nachricht senden");
    assert_eq!(controller.phase(), FormPhase::Idle);

    h.clock.advance(5000);
    assert!(h.viewport.navigations().is_empty());

    form.submit(&h.dom);
    assert_eq!(submitter.calls(), 2);
}

#[test]
fn typing_revalidates_after_the_debounce() {
    let Mounted {
        h, form, app: _app, ..
    } = mount(false);
    form.submit(&h.dom);
    assert!(h.dom.has_class(&form.name, "is-invalid"));

    h.dom.set_value(form.name, "An");
    h.dom.fire(form.name, "input");
    h.clock.advance(200);
    h.dom.set_value(form.name, "Anna");
    h.dom.fire(form.name, "input");

    h.clock.advance(299);
    assert!(h.dom.has_class(&form.name, "is-invalid"));
    h.clock.advance(1);
    assert!(!h.dom.has_class(&form.name, "is-invalid"));
    assert_eq!(h.dom.style(&error_slots(&h, form.name)[0], "display"), "none");
}

#[test]
fn untouched_form_stays_quiet_on_blur_and_input() {
    let Mounted {
        h, form, app: _app, ..
    } = mount(false);

    h.dom.set_value(form.name, "A");
    h.dom.fire(form.name, "blur");
    h.dom.fire(form.name, "input");
    h.clock.advance(300);

    assert!(!h.dom.has_class(&form.name, "is-invalid"));
    assert!(error_slots(&h, form.name).is_empty());
    assert!(toasts(&h).is_empty());
}

#[test]
fn consent_rule_applies_only_to_checkboxes() {
    let h = Harness::new();
    let form = h
        .dom
        .element(h.body(), "form", &[("class", "c-form needs-validation")]);
    let group = h.dom.element(form, "div", &[("class", "c-form__group")]);
    let message = h
        .dom
        .element(group, "textarea", &[("id", "contact-message"), ("required", "")]);
    let consent = h.dom.element(
        form,
        "input",
        &[("type", "hidden"), ("name", "privacy"), ("value", "accepted")],
    );
    h.dom
        .set_value(message, "Ich interessiere mich für ein Angebot.");
    let submitter = Rc::new(CountingSubmitter::new(h.clock.clone(), 800));
    let app = App::with_submitter(h.page.clone(), submitter.clone() as Rc<dyn Submitter>);
    app.init();

    assert_eq!(app.forms()[0].handle_submit(), SubmitOutcome::Started);
    assert!(!h.dom.has_class(&consent, "is-invalid"));
    let payload = submitter.last_payload().unwrap();
    assert!(payload
        .fields
        .contains(&("privacy".to_string(), "accepted".to_string())));
}

#[test]
fn failed_submission_restores_the_label_without_ripples() {
    let Mounted {
        h, form, app: _app, ..
    } = mount(true);
    form.fill_valid(&h.dom);

    h.dom.click(form.submit);
    assert_eq!(h.dom.children(form.submit).len(), 1);
    form.submit(&h.dom);
    h.clock.advance(800);

    assert!(!h.dom.has_attribute(&form.submit, "disabled"));
    assert_eq!(h.dom.inner_html(&form.submit), "Nachricht senden");
    h.clock.advance(600);
    assert_eq!(h.dom.inner_html(&form.submit), "Nachricht senden");
}

#[test]
fn checkbox_type_is_matched_case_insensitively_in_the_payload() {
    let h = Harness::new();
    let form = h
        .dom
        .element(h.body(), "form", &[("class", "c-form needs-validation")]);
    let group = h.dom.element(form, "div", &[("class", "c-form__group")]);
    h.dom.element(
        group,
        "input",
        &[("id", "contact-privacy"), ("type", "Checkbox"), ("required", ""), ("checked", "")],
    );
    let submitter = Rc::new(CountingSubmitter::new(h.clock.clone(), 800));
    let app = App::with_submitter(h.page.clone(), submitter.clone() as Rc<dyn Submitter>);
    app.init();

    assert_eq!(app.forms()[0].handle_submit(), SubmitOutcome::Started);
    assert_eq!(
        submitter.last_payload().unwrap().fields,
        [("contact-privacy".to_string(), "true".to_string())]
    );
}
