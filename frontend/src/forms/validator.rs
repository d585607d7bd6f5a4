use std::rc::Rc;

use crate::error::DomError;
use crate::forms::rules::{FieldInput, FieldKind, FieldRule, RuleSet};
use crate::host::Dom;

pub const FIELD_SELECTOR: &str = "input, textarea, select";
pub const ERROR_SELECTOR: &str = ".c-form__error, .invalid-feedback";
const INVALID_CLASSES: [&str; 2] = ["is-invalid", "is-error"];

/// Applies the rule set to single fields and renders their error state.
pub struct FieldValidator<D: Dom> {
    dom: Rc<D>,
    rules: Rc<RuleSet>,
}

impl<D: Dom> FieldValidator<D> {
    pub fn new(dom: Rc<D>, rules: Rc<RuleSet>) -> Self {
        Self { dom, rules }
    }

    /// The id, or failing that the name, of a field.
    pub fn identifier(&self, field: &D::Node) -> Option<String> {
        ["id", "name"]
            .iter()
            .filter_map(|attr| self.dom.attribute(field, attr))
            .find(|value| !value.is_empty())
    }

    /// Untagged fields take no part in whole-form validation.
    pub fn is_considered(&self, field: &D::Node) -> bool {
        self.dom.has_attribute(field, "required") || self.identifier(field).is_some()
    }

    pub(crate) fn is_checkbox(&self, field: &D::Node) -> bool {
        self.dom
            .attribute(field, "type")
            .is_some_and(|kind| kind.eq_ignore_ascii_case("checkbox"))
    }

    pub fn kind_of(&self, field: &D::Node) -> Option<FieldKind> {
        let kind = self
            .identifier(field)
            .and_then(|identifier| self.rules.kind_of(&identifier));
        if !self.is_checkbox(field) {
            // Consent is only ever given through a checkbox.
            return kind.filter(|kind| *kind != FieldKind::Privacy);
        }
        // Checkboxes only carry the consent rule.
        match kind {
            Some(FieldKind::Privacy) => kind,
            None if self.dom.has_attribute(field, "required") => Some(FieldKind::Privacy),
            _ => None,
        }
    }

    pub fn read(&self, field: &D::Node) -> FieldInput {
        if self.is_checkbox(field) {
            FieldInput::checkbox(self.dom.is_checked(field))
        } else {
            FieldInput::text(&self.dom.value(field).unwrap_or_default())
        }
    }

    /// The rule a field currently violates, if any.
    pub fn violation(&self, field: &D::Node) -> Option<&FieldRule> {
        self.rules
            .evaluate(self.kind_of(field), &self.read(field))
            .err()
    }

    pub fn validate(&self, field: &D::Node) -> Result<bool, DomError> {
        let violation = self.violation(field);
        let error = self.error_slot(field)?;
        match violation {
            Some(rule) => {
                for class in INVALID_CLASSES {
                    self.dom.add_class(field, class)?;
                }
                if let Some(error) = error {
                    self.dom.set_text(&error, &rule.message);
                    self.dom.set_style(&error, "display", "block")?;
                }
                Ok(false)
            }
            None => {
                for class in INVALID_CLASSES {
                    self.dom.remove_class(field, class)?;
                }
                if let Some(error) = error {
                    self.dom.set_style(&error, "display", "none")?;
                }
                Ok(true)
            }
        }
    }

    /// Validates every considered field so that all errors get rendered.
    pub fn validate_all(&self, form: &D::Node) -> Result<bool, DomError> {
        let mut valid = true;
        for field in self.dom.query_all(Some(form), FIELD_SELECTOR) {
            if self.is_considered(&field) && !self.validate(&field)? {
                valid = false;
            }
        }
        Ok(valid)
    }

    /// Error element in the field's container, created on first use.
    fn error_slot(&self, field: &D::Node) -> Result<Option<D::Node>, DomError> {
        let Some(container) = self.dom.parent(field) else {
            return Ok(None);
        };
        if let Some(existing) = self.dom.query(Some(&container), ERROR_SELECTOR) {
            return Ok(Some(existing));
        }
        let slot = self.dom.create_element("div")?;
        let class = if self.dom.has_class(field, "c-form__input") {
            "c-form__error"
        } else {
            "invalid-feedback"
        };
        self.dom.add_class(&slot, class)?;
        self.dom.set_attribute(&slot, "role", "alert")?;
        self.dom.append_child(&container, &slot)?;
        Ok(Some(slot))
    }
}
