//! Locating and filling a one-time-code input on a page.
//!
//! The page is abstracted as a [`FillTarget`]: a snapshot of its input
//! fields plus a setter. Candidate fields are chosen by an ordered list of
//! [`FieldStrategy`]s; the first strategy that matches a visible field wins,
//! and within it the first matching field in document order.
//!
//! # Example
//!
//! ```
//! use mail_otp::autofill::{find_otp_field, InputField};
//!
//! let fields = vec![
//!     InputField::new("password").named("pw"),
//!     InputField::new("tel").named("otp-input"),
//! ];
//!
//! let (index, strategy) = find_otp_field(&fields).unwrap();
//! assert_eq!(index, 1);
//! assert_eq!(strategy.label, "telephone input");
//! ```

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// An input element as seen on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputField {
    /// The `type` attribute, as written.
    pub input_type: String,
    /// The `maxlength` attribute.
    pub max_length: Option<u32>,
    /// The `inputmode` attribute.
    pub input_mode: Option<String>,
    /// The `name` attribute.
    pub name: String,
    /// The `id` attribute.
    pub id: String,
    /// Whether the element is rendered with a non-zero size.
    pub visible: bool,
}

impl InputField {
    /// A visible field of the given type with no other attributes.
    #[must_use]
    pub fn new(input_type: impl Into<String>) -> Self {
        Self {
            input_type: input_type.into(),
            visible: true,
            ..Self::default()
        }
    }

    /// Sets `maxlength`.
    #[must_use]
    pub fn max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Sets `inputmode`.
    #[must_use]
    pub fn input_mode(mut self, mode: impl Into<String>) -> Self {
        self.input_mode = Some(mode.into());
        self
    }

    /// Sets `name`.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets `id`.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Marks the field hidden.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    fn is_type(&self, input_type: &str) -> bool {
        self.input_type.eq_ignore_ascii_case(input_type)
    }

    fn name_or_id_contains(&self, needle: &str) -> bool {
        self.name.to_ascii_lowercase().contains(needle)
            || self.id.to_ascii_lowercase().contains(needle)
    }
}

/// A named predicate over input fields.
#[derive(Debug, Clone, Copy)]
pub struct FieldStrategy {
    /// Short description used in logs.
    pub label: &'static str,
    /// Returns `true` if the field is a match for this strategy.
    pub matches: fn(&InputField) -> bool,
}

/// Strategies in priority order.
///
/// Attribute matching ignores ASCII case throughout: `type` and `inputmode`
/// values, and the `name`/`id` substring checks, so `id="OTP-box"` matches
/// the `otp` strategy.
pub static STRATEGIES: [FieldStrategy; 9] = [
    FieldStrategy {
        label: "text input with maxlength 6",
        matches: |f| f.is_type("text") && f.max_length == Some(6),
    },
    FieldStrategy {
        label: "number input with maxlength 6",
        matches: |f| f.is_type("number") && f.max_length == Some(6),
    },
    FieldStrategy {
        label: "numeric text input",
        matches: |f| {
            f.is_type("text")
                && f
                    .input_mode
                    .as_deref()
                    .is_some_and(|m| m.eq_ignore_ascii_case("numeric"))
        },
    },
    FieldStrategy {
        label: "telephone input",
        matches: |f| f.is_type("tel"),
    },
    FieldStrategy {
        label: "name or id contains otp",
        matches: |f| f.name_or_id_contains("otp"),
    },
    FieldStrategy {
        label: "name or id contains code",
        matches: |f| f.name_or_id_contains("code"),
    },
    FieldStrategy {
        label: "name or id contains pin",
        matches: |f| f.name_or_id_contains("pin"),
    },
    FieldStrategy {
        label: "name or id contains verification",
        matches: |f| f.name_or_id_contains("verification"),
    },
    FieldStrategy {
        label: "password input",
        matches: |f| f.is_type("password"),
    },
];

/// Returns the index of the most likely code field and the strategy that chose it.
#[must_use]
pub fn find_otp_field(fields: &[InputField]) -> Option<(usize, &'static FieldStrategy)> {
    STRATEGIES.iter().find_map(|strategy| {
        fields
            .iter()
            .position(|f| f.visible && (strategy.matches)(f))
            .map(|index| (index, strategy))
    })
}

/// The page refused a value.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct FillError(pub String);

/// A page whose input fields can be read and written.
pub trait FillTarget {
    /// Snapshot of the page's input fields in document order.
    fn fields(&self) -> Vec<InputField>;

    /// Current value of field `index`.
    fn value(&self, index: usize) -> String;

    /// Sets field `index` to `value`, notifying the page as user input would.
    ///
    /// # Errors
    ///
    /// Returns [`FillError`] if the page rejects the write.
    fn set_value(&mut self, index: usize, value: &str) -> Result<(), FillError>;
}

/// Result of an autofill attempt, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FillOutcome {
    /// Whether the field now holds the code.
    pub success: bool,
    /// What happened.
    pub message: String,
}

impl FillOutcome {
    fn new(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            message: message.into(),
        }
    }
}

/// Finds the code field on `target` and writes `code` into it.
///
/// Succeeds if the field afterwards holds exactly `code`, or its previous
/// value followed by `code`.
pub fn fill_code<T: FillTarget + ?Sized>(target: &mut T, code: &str) -> FillOutcome {
    let fields = target.fields();
    let Some((index, strategy)) = find_otp_field(&fields) else {
        return FillOutcome::new(false, "No OTP input field found");
    };
    debug!(index, strategy = strategy.label, "Selected code field");

    let old_value = target.value(index);
    if let Err(e) = target.set_value(index, code) {
        return FillOutcome::new(false, e.to_string());
    }

    let new_value = target.value(index);
    if new_value == code || new_value == format!("{old_value}{code}") {
        FillOutcome::new(true, "OTP filled successfully")
    } else {
        FillOutcome::new(false, "Could not set OTP (website may have prevented it)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePage {
        fields: Vec<InputField>,
        values: Vec<String>,
        mode: WriteMode,
    }

    enum WriteMode {
        Accept,
        Ignore,
        Reject,
    }

    impl FakePage {
        fn new(fields: Vec<InputField>, mode: WriteMode) -> Self {
            let values = vec![String::new(); fields.len()];
            Self {
                fields,
                values,
                mode,
            }
        }
    }

    impl FillTarget for FakePage {
        fn fields(&self) -> Vec<InputField> {
            self.fields.clone()
        }

        fn value(&self, index: usize) -> String {
            self.values[index].clone()
        }

        fn set_value(&mut self, index: usize, value: &str) -> Result<(), FillError> {
            match self.mode {
                WriteMode::Accept => {
                    self.values[index] = value.to_string();
                    Ok(())
                }
                WriteMode::Ignore => Ok(()),
                WriteMode::Reject => Err(FillError("field is read-only".into())),
            }
        }
    }

    #[test]
    fn test_strategy_priority() {
        let fields = vec![
            InputField::new("password"),
            InputField::new("text").named("verification_code"),
            InputField::new("text").max_length(6),
        ];
        let (index, strategy) = find_otp_field(&fields).unwrap();
        assert_eq!(index, 2);
        assert_eq!(strategy.label, "text input with maxlength 6");
    }

    #[test]
    fn test_hidden_fields_are_skipped() {
        let fields = vec![
            InputField::new("text").max_length(6).hidden(),
            InputField::new("text").with_id("OTP-box"),
        ];
        let (index, strategy) = find_otp_field(&fields).unwrap();
        assert_eq!(index, 1);
        assert_eq!(strategy.label, "name or id contains otp");
    }

    #[test]
    fn test_name_and_id_match_ignores_case() {
        let fields = vec![
            InputField::new("text").named("PinEntry"),
            InputField::new("text").with_id("Verification_Field"),
        ];
        let (index, strategy) = find_otp_field(&fields).unwrap();
        assert_eq!(index, 0);
        assert_eq!(strategy.label, "name or id contains pin");

        let (index, strategy) = find_otp_field(&fields[1..]).unwrap();
        assert_eq!(index, 0);
        assert_eq!(strategy.label, "name or id contains verification");
    }

    #[test]
    fn test_numeric_inputmode() {
        let fields = vec![
            InputField::new("email"),
            InputField::new("text").input_mode("numeric"),
        ];
        assert_eq!(find_otp_field(&fields).unwrap().0, 1);
    }

    #[test]
    fn test_password_is_last_resort() {
        let fields = vec![InputField::new("email"), InputField::new("password")];
        let (index, strategy) = find_otp_field(&fields).unwrap();
        assert_eq!(index, 1);
        assert_eq!(strategy.label, "password input");
    }

    #[test]
    fn test_no_field() {
        let mut page = FakePage::new(vec![InputField::new("email")], WriteMode::Accept);
        let outcome = fill_code(&mut page, "482910");
        assert!(!outcome.success);
        assert_eq!(outcome.message, "No OTP input field found");
    }

    #[test]
    fn test_fill_success() {
        let mut page = FakePage::new(vec![InputField::new("tel")], WriteMode::Accept);
        let outcome = fill_code(&mut page, "482910");
        assert_eq!(outcome, FillOutcome::new(true, "OTP filled successfully"));
        assert_eq!(page.values[0], "482910");
    }

    #[test]
    fn test_fill_prevented_by_page() {
        let mut page = FakePage::new(vec![InputField::new("tel")], WriteMode::Ignore);
        let outcome = fill_code(&mut page, "482910");
        assert!(!outcome.success);
        assert!(outcome.message.contains("website may have prevented it"));
    }

    #[test]
    fn test_fill_rejected() {
        let mut page = FakePage::new(vec![InputField::new("tel")], WriteMode::Reject);
        let outcome = fill_code(&mut page, "482910");
        assert_eq!(outcome, FillOutcome::new(false, "field is read-only"));
    }

    #[test]
    fn test_outcome_serializes() {
        let json = serde_json::to_string(&FillOutcome::new(true, "ok")).unwrap();
        assert_eq!(json, r#"{"success":true,"message":"ok"}"#);
    }
}
