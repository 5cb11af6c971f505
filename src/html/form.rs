//! Form introspection: the controls a browser would submit, editable before posting.

use scraper::ElementRef;
use url::Url;

use super::document::{CONTROLS, option_value, options_of};

const NON_SUBMITTING_INPUT_TYPES: &[&str] = &["submit", "button", "image", "reset", "file"];

/// A `<form>` with its successful controls in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    action: Option<String>,
    method: String,
    fields: Vec<(String, String)>,
}

impl Form {
    /// Collects what `form` would submit if sent unchanged.
    ///
    /// Disabled and unnamed controls are skipped, as are buttons and file
    /// inputs. Unchecked checkboxes and radios contribute nothing; checked
    /// ones without a value submit `on`.
    pub(super) fn from_element(form: &ElementRef<'_>) -> Self {
        let action = form.value().attr("action").map(str::to_string);
        let method = form.value().attr("method").unwrap_or("get").to_ascii_uppercase();

        let mut fields = Vec::new();
        for control in form.select(&CONTROLS) {
            let element = control.value();
            let Some(name) = element.attr("name") else {
                continue;
            };
            if element.attr("disabled").is_some() {
                continue;
            }

            match element.name() {
                "input" => {
                    let kind = element.attr("type").unwrap_or("text").to_ascii_lowercase();
                    if NON_SUBMITTING_INPUT_TYPES.contains(&kind.as_str()) {
                        continue;
                    }
                    if matches!(kind.as_str(), "checkbox" | "radio") {
                        if element.attr("checked").is_some() {
                            let value = element.attr("value").unwrap_or("on");
                            fields.push((name.to_string(), value.to_string()));
                        }
                        continue;
                    }
                    let value = element.attr("value").unwrap_or("");
                    fields.push((name.to_string(), value.to_string()));
                }
                "select" => {
                    let options: Vec<(String, bool)> = options_of(control)
                        .map(|option| {
                            (option_value(&option), option.value().attr("selected").is_some())
                        })
                        .collect();
                    let mut selected = options
                        .iter()
                        .filter(|(_, is_selected)| *is_selected)
                        .map(|(value, _)| value);
                    if element.attr("multiple").is_some() {
                        fields.extend(selected.map(|value| (name.to_string(), value.clone())));
                    } else if let Some(value) = selected
                        .next()
                        .or_else(|| options.first().map(|(value, _)| value))
                    {
                        fields.push((name.to_string(), value.clone()));
                    }
                }
                "textarea" => {
                    fields.push((name.to_string(), control.text().collect()));
                }
                _ => {}
            }
        }

        Self {
            action,
            method,
            fields,
        }
    }

    /// Raw `action` attribute, if present.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Uppercase HTTP method; `GET` when the form does not say.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Name/value pairs that would be submitted, in document order.
    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// All values submitted under `name`.
    #[must_use]
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// Replaces the first value submitted under `name`, or appends one.
    pub fn set_field(&mut self, name: &str, value: &str) {
        match self.fields.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.fields.push((name.to_string(), value.to_string())),
        }
    }

    /// Drops every value submitted under `name`.
    pub fn remove_field(&mut self, name: &str) {
        self.fields.retain(|(key, _)| key != name);
    }

    /// Appends a value, keeping earlier ones under the same name.
    pub fn push_field(&mut self, name: &str, value: &str) {
        self.fields.push((name.to_string(), value.to_string()));
    }

    /// Resolves the action against the page the form came from.
    ///
    /// An empty or missing action submits back to `page_url`.
    ///
    /// # Errors
    ///
    /// Returns the parse error when the action cannot be joined onto `page_url`.
    pub fn action_url(&self, page_url: &Url) -> Result<Url, url::ParseError> {
        match self.action.as_deref().map(str::trim) {
            None | Some("") => Ok(page_url.clone()),
            Some(action) => page_url.join(action),
        }
    }
}
