//! Example: Fill a code into an in-memory page.
//!
//! Shows how field selection picks the most likely OTP input and how the
//! outcome is reported when a page ignores the write.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example autofill_page
//! ```

use mail_otp::autofill::{fill_code, find_otp_field, FillError, FillTarget, InputField};

/// A page that stores values and optionally ignores writes.
struct Page {
    fields: Vec<InputField>,
    values: Vec<String>,
    frozen: bool,
}

impl Page {
    fn new(fields: Vec<InputField>) -> Self {
        let values = vec![String::new(); fields.len()];
        Self {
            fields,
            values,
            frozen: false,
        }
    }
}

impl FillTarget for Page {
    fn fields(&self) -> Vec<InputField> {
        self.fields.clone()
    }

    fn value(&self, index: usize) -> String {
        self.values.get(index).cloned().unwrap_or_default()
    }

    fn set_value(&mut self, index: usize, value: &str) -> Result<(), FillError> {
        let slot = self
            .values
            .get_mut(index)
            .ok_or_else(|| FillError(format!("no field at index {index}")))?;
        if !self.frozen {
            *slot = value.to_string();
        }
        Ok(())
    }
}

fn main() {
    tracing_subscriber::fmt().with_env_filter("mail_otp=debug").init();

    let fields = vec![
        InputField::new("email").named("username"),
        InputField::new("password").named("password"),
        InputField::new("text").named("mfa_code").max_length(6).hidden(),
        InputField::new("text").with_id("otp").input_mode("numeric"),
    ];

    if let Some((index, strategy)) = find_otp_field(&fields) {
        println!("Selected field {index} via '{}'", strategy.label);
    }

    let mut page = Page::new(fields.clone());
    let outcome = fill_code(&mut page, "482910");
    println!("{}: {}", outcome.success, outcome.message);

    let mut frozen = Page::new(fields);
    frozen.frozen = true;
    let outcome = fill_code(&mut frozen, "482910");
    println!("{}: {}", outcome.success, outcome.message);

    let mut empty = Page::new(vec![InputField::new("search")]);
    let outcome = fill_code(&mut empty, "482910");
    println!("{}: {}", outcome.success, outcome.message);
}
