use std::rc::Rc;

use crate::error::DomError;

pub mod effects;
pub mod images;
pub mod modal;
pub mod nav;
pub mod notification;
pub mod reveal;
pub mod scroll;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attach {
    Active,
    /// The elements the component works on are not on this page.
    Skipped,
}

/// One independent page behavior.
pub trait Component {
    fn name(&self) -> &'static str;
    fn attach(self: Rc<Self>) -> Result<Attach, DomError>;
    /// Releases listeners and observers registered by `attach`.
    fn detach(&self);
}
