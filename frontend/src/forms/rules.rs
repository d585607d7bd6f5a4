use regex::Regex;

use crate::config::RuleConfig;
use crate::error::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Name,
    Email,
    Phone,
    Message,
    Privacy,
}

impl FieldKind {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "name" => Some(FieldKind::Name),
            "email" => Some(FieldKind::Email),
            "phone" => Some(FieldKind::Phone),
            "message" => Some(FieldKind::Message),
            "privacy" => Some(FieldKind::Privacy),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum Check {
    Pattern(Regex),
    /// Minimum length of the trimmed value, in characters.
    MinLength(usize),
    Checked,
}

#[derive(Debug)]
pub struct FieldRule {
    pub kind: FieldKind,
    pub check: Check,
    pub message: String,
}

impl FieldRule {
    pub fn passes(&self, input: &FieldInput) -> bool {
        match &self.check {
            Check::Pattern(pattern) => pattern.is_match(&input.value),
            Check::MinLength(min) => input.value.chars().count() >= *min,
            Check::Checked => input.checked,
        }
    }
}

/// What a rule sees of a field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldInput {
    pub value: String,
    pub checked: bool,
}

impl FieldInput {
    pub fn text(raw: &str) -> Self {
        Self {
            value: raw.trim().to_string(),
            checked: false,
        }
    }

    pub fn checkbox(checked: bool) -> Self {
        Self {
            value: String::new(),
            checked,
        }
    }
}

#[derive(Debug)]
pub struct RuleSet {
    prefixes: Vec<String>,
    rules: Vec<FieldRule>,
}

impl RuleSet {
    pub fn from_config(config: &RuleConfig) -> Result<Self, ConfigError> {
        let pattern = |field: &'static str, raw: &str| {
            Regex::new(raw)
                .map(Check::Pattern)
                .map_err(|source| ConfigError::Pattern { field, source })
        };
        let rules = vec![
            FieldRule {
                kind: FieldKind::Name,
                check: pattern("name", &config.name_pattern)?,
                message: config.name_message.clone(),
            },
            FieldRule {
                kind: FieldKind::Email,
                check: pattern("email", &config.email_pattern)?,
                message: config.email_message.clone(),
            },
            FieldRule {
                kind: FieldKind::Phone,
                check: pattern("phone", &config.phone_pattern)?,
                message: config.phone_message.clone(),
            },
            FieldRule {
                kind: FieldKind::Message,
                check: Check::MinLength(config.message_min_length),
                message: config.message_message.clone(),
            },
            FieldRule {
                kind: FieldKind::Privacy,
                check: Check::Checked,
                message: config.privacy_message.clone(),
            },
        ];
        Ok(Self {
            prefixes: config.field_prefixes.clone(),
            rules,
        })
    }

    pub fn standard() -> Result<Self, ConfigError> {
        Self::from_config(&RuleConfig::default())
    }

    /// Kind of a field from its id or name, e.g. `contact-email` -> `Email`.
    pub fn kind_of(&self, identifier: &str) -> Option<FieldKind> {
        let key = self
            .prefixes
            .iter()
            .find_map(|prefix| identifier.strip_prefix(prefix.as_str()))
            .unwrap_or(identifier);
        FieldKind::from_key(key)
    }

    pub fn rule(&self, kind: FieldKind) -> Option<&FieldRule> {
        self.rules.iter().find(|rule| rule.kind == kind)
    }

    /// Fields without a known kind always pass.
    pub fn evaluate(&self, kind: Option<FieldKind>, input: &FieldInput) -> Result<(), &FieldRule> {
        match kind.and_then(|kind| self.rule(kind)) {
            Some(rule) if !rule.passes(input) => Err(rule),
            _ => Ok(()),
        }
    }
}
