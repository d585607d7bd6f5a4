use log::Level;
use serde::Deserialize;

use crate::error::ConfigError;

#[cfg(debug_assertions)]
pub fn log_level() -> Level {
    Level::Debug // Verbose console output while developing locally
}

#[cfg(not(debug_assertions))]
pub fn log_level() -> Level {
    Level::Info
}

/// Id of the optional `<script type="application/json">` block holding overrides.
pub const CONFIG_ELEMENT_ID: &str = "site-config";

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub selectors: Selectors,
    pub timing: Timing,
    pub messages: Messages,
    pub rules: RuleConfig,
    /// Viewport width at which the mobile menu is force-closed.
    pub mobile_breakpoint: f64,
    /// Header height used when the page has no header element.
    pub scroll_offset: f64,
    /// Share of the viewport, from the bottom, excluded from scroll-spy activation.
    pub spy_bottom_margin_percent: f64,
    pub reveal_threshold: f64,
    pub redirect_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            selectors: Selectors::default(),
            timing: Timing::default(),
            messages: Messages::default(),
            rules: RuleConfig::default(),
            mobile_breakpoint: 1024.0,
            scroll_offset: 80.0,
            spy_bottom_margin_percent: 60.0,
            reveal_threshold: 0.1,
            redirect_url: "thank_you.html".to_string(),
        }
    }
}

impl Config {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Selectors {
    pub header: String,
    pub nav: String,
    pub nav_toggle: String,
    pub nav_list: String,
    pub nav_link: String,
    pub hash_link: String,
    pub form: String,
    pub reveal: String,
    pub ripple: String,
    pub hover_card: String,
    pub privacy_link: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            header: ".l-header".to_string(),
            nav: ".c-nav".to_string(),
            nav_toggle: ".c-nav__toggle".to_string(),
            nav_list: ".c-nav__list".to_string(),
            nav_link: ".c-nav__link".to_string(),
            hash_link: "a[href^=\"#\"]".to_string(),
            form: ".needs-validation, .c-form".to_string(),
            reveal: ".card, .c-card, .c-hero, .c-button, .btn, h1, h2, h3, .c-section-title, .c-form, .needs-validation".to_string(),
            ripple: ".btn, .c-button, .c-nav__link".to_string(),
            hover_card: ".card, .c-card".to_string(),
            privacy_link: "a[href*=\"privacy\"], .c-form__link".to_string(),
        }
    }
}

/// Delays in milliseconds.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Timing {
    pub resize_throttle_ms: u32,
    pub input_debounce_ms: u32,
    pub submit_latency_ms: u32,
    pub redirect_delay_ms: u32,
    pub toast_lifetime_ms: u32,
    pub toast_exit_ms: u32,
    pub reveal_duration_ms: u32,
    pub ripple_ms: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            resize_throttle_ms: 200,
            input_debounce_ms: 300,
            submit_latency_ms: 800,
            redirect_delay_ms: 1500,
            toast_lifetime_ms: 5000,
            toast_exit_ms: 300,
            reveal_duration_ms: 800,
            ripple_ms: 600,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Messages {
    pub form_invalid: String,
    pub submit_success: String,
    pub submit_failure: String,
    pub submitting_label: String,
    pub close_label: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            form_invalid: "Bitte füllen Sie alle Pflichtfelder korrekt aus".to_string(),
            submit_success: "Vielen Dank! Ihre Nachricht wurde erfolgreich gesendet.".to_string(),
            submit_failure: "Fehler beim Senden. Bitte versuchen Sie es später erneut.".to_string(),
            submitting_label: "<span class=\"spinner-border spinner-border-sm me-2\" aria-hidden=\"true\"></span>Wird gesendet...".to_string(),
            close_label: "Schließen".to_string(),
        }
    }
}

/// Patterns and messages for the field rules.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuleConfig {
    pub field_prefixes: Vec<String>,
    pub name_pattern: String,
    pub name_message: String,
    pub email_pattern: String,
    pub email_message: String,
    pub phone_pattern: String,
    pub phone_message: String,
    pub message_min_length: usize,
    pub message_message: String,
    pub privacy_message: String,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            field_prefixes: vec!["contact-".to_string(), "form-".to_string()],
            name_pattern: r"^[a-zA-ZÀ-ÿ\s'\x{0400}-\x{04FF}\x{0370}-\x{03FF}]{2,50}$".to_string(),
            name_message: "Name muss 2-50 Zeichen lang sein und darf nur Buchstaben enthalten"
                .to_string(),
            email_pattern: r"^[^\s@]+@[^\s@]+\.[^\s@]+$".to_string(),
            email_message: "Bitte geben Sie eine gültige E-Mail-Adresse ein".to_string(),
            phone_pattern: r"^[0-9\s+()\-]{10,20}$".to_string(),
            phone_message: "Telefonnummer muss 10-20 Zeichen lang sein".to_string(),
            message_min_length: 10,
            message_message: "Nachricht muss mindestens 10 Zeichen lang sein".to_string(),
            privacy_message: "Bitte akzeptieren Sie die Datenschutzerklärung".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let config = Config::from_json(
            r#"{"redirect_url": "/danke.html", "timing": {"submit_latency_ms": 50}}"#,
        )
        .unwrap();
        assert_eq!(config.redirect_url, "/danke.html");
        assert_eq!(config.timing.submit_latency_ms, 50);
        assert_eq!(config.timing.redirect_delay_ms, 1500);
        assert_eq!(config.selectors, Selectors::default());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            Config::from_json("{redirect_url"),
            Err(ConfigError::Json(_))
        ));
    }
}
