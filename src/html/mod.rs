//! HTML querying for the phpMyAdmin pages the backup workflow walks through.
//!
//! The workflow only needs a handful of lookups: a field by its `id`, a link
//! inside a navigation element, the options of a multi-select, and the form
//! enclosing a given control. [`HtmlDocument`] names exactly those lookups;
//! [`Document`] answers them from an html5ever tree via `scraper`.

mod document;
mod form;

use scraper::Selector;

pub use document::Document;
pub use form::Form;

/// A form control located by [`HtmlDocument::find_field_by_id`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Lowercase tag name (`input`, `select`, `textarea`).
    pub tag: String,
    /// `name` attribute, if any.
    pub name: Option<String>,
    /// `value` attribute, if any.
    pub value: Option<String>,
}

/// Queries the workflow runs against a fetched page.
pub trait HtmlDocument {
    /// Whether the raw page contains `needle` anywhere.
    fn contains_text(&self, needle: &str) -> bool;

    /// Looks up a form control by its `id` attribute.
    fn find_field_by_id(&self, id: &str) -> Option<Field>;

    /// Returns an attribute of the element whose `id` is `id`.
    fn attribute_by_id(&self, id: &str, attribute: &str) -> Option<String>;

    /// Returns the `href` of the first `<a>` inside the element with id
    /// `container_id` whose `href` contains `needle`.
    fn find_link_containing(&self, container_id: &str, needle: &str) -> Option<String>;

    /// Returns the option values of the `<select>` named `name`, in document order.
    fn read_multiselect_options(&self, name: &str) -> Vec<String>;

    /// Returns the form enclosing the control whose `name` or `id` is `key`.
    fn form_containing_field(&self, key: &str) -> Option<Form>;
}

/// Compiles a CSS selector at static init; panics on invalid selector.
pub(crate) fn compile_static_selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid static selector '{css}': {e:?}"))
}
