mod common;

use std::rc::Rc;

use common::Harness;
use marketing_frontend::components::notification::{Notifier, Severity, CONTAINER_ID};
use marketing_frontend::headless::MemoryDom;
use marketing_frontend::Dom;

fn notifier(h: &Harness) -> Rc<Notifier<MemoryDom>> {
    Rc::new(Notifier::new(h.page.clone()))
}

#[test]
fn toasts_share_one_container() {
    let h = Harness::new();
    let notifier = notifier(&h);
    assert!(notifier.container().is_none());

    let first = notifier.show("Gespeichert", Severity::Success).unwrap();
    let second = notifier.show("Hinweis", Severity::Info).unwrap();

    let container = h.dom.element_by_id(CONTAINER_ID).unwrap();
    assert_eq!(notifier.container(), Some(container));
    assert_eq!(h.dom.query_all(None, "#toast-container").len(), 1);
    assert_eq!(h.dom.children(container), [first, second]);
    assert_eq!(h.dom.style(&container, "position"), "fixed");
    assert_eq!(h.dom.style(&container, "z-index"), "9999");
    assert!(h.dom.has_class(&first, "alert-success"));
    assert!(h.dom.has_class(&second, "alert-info"));
}

#[test]
fn message_is_escaped_and_dismissible() {
    let h = Harness::new();
    let toast = notifier(&h)
        .show("<script>alert('x')</script> & Co", Severity::Danger)
        .unwrap();

    assert!(h
        .dom
        .inner_html(&toast)
        .starts_with("&lt;script&gt;alert(&#039;x&#039;)&lt;/script&gt; &amp; Co<button"));
    assert_eq!(
        h.dom.classes(toast),
        ["alert", "alert-danger", "alert-dismissible", "fade", "show"]
    );
    assert_eq!(h.dom.attribute(&toast, "role").as_deref(), Some("alert"));

    let close = h.dom.query(Some(&toast), ".btn-close").unwrap();
    assert_eq!(h.dom.attribute(&close, "type").as_deref(), Some("button"));
    assert_eq!(
        h.dom.attribute(&close, "aria-label").as_deref(),
        Some("Schließen")
    );
}

#[test]
fn toast_dismisses_itself_after_its_lifetime() {
    let h = Harness::new();
    let toast = notifier(&h).show("Danke", Severity::Success).unwrap();
    assert_eq!(h.dom.listener_count(), 1);

    h.clock.advance(4999);
    assert!(!h.dom.has_attribute(&toast, "data-dismissed"));

    h.clock.advance(1);
    assert_eq!(h.dom.style(&toast, "animation"), "slideOutRight 0.3s ease-out");
    assert!(h.dom.is_attached(&toast));

    h.clock.advance(299);
    assert!(h.dom.is_attached(&toast));
    h.clock.advance(1);
    assert!(!h.dom.is_attached(&toast));
    assert_eq!(h.dom.listener_count(), 0);
    assert_eq!(h.clock.pending_timers(), 0);
}

#[test]
fn close_button_dismisses_once() {
    let h = Harness::new();
    let notifier = notifier(&h);
    let toast = notifier.show("Fehler", Severity::Danger).unwrap();
    let close = h.dom.query(Some(&toast), ".btn-close").unwrap();

    h.dom.click(close);
    h.dom.click(close);
    notifier.dismiss(&toast);
    h.clock.advance(300);
    assert!(!h.dom.is_attached(&toast));

    // The lifetime timer still fires but finds the toast already gone.
    h.clock.advance(5000);
    assert_eq!(h.clock.pending_timers(), 0);
    assert!(h
        .dom
        .children(notifier.container().unwrap())
        .is_empty());
}

#[test]
fn toasts_expire_after_the_notifier_handle_is_dropped() {
    let h = Harness::new();
    let notifier = notifier(&h);
    let toast = notifier.show("Danke", Severity::Success).unwrap();
    let close = h.dom.query(Some(&toast), ".btn-close").unwrap();
    drop(notifier);

    h.dom.click(close);
    assert_eq!(h.dom.style(&toast, "animation"), "slideOutRight 0.3s ease-out");
    h.clock.advance(300);
    assert!(!h.dom.is_attached(&toast));

    let second = Rc::new(Notifier::new(h.page.clone()))
        .show("Hinweis", Severity::Info)
        .unwrap();
    h.clock.advance(5300);
    assert!(!h.dom.is_attached(&second));
    assert_eq!(h.dom.listener_count(), 0);
    assert_eq!(h.clock.pending_timers(), 0);
}
