//! [`HtmlDocument`] backed by an html5ever tree.

use std::sync::LazyLock;

use scraper::element_ref::Select;
use scraper::{ElementRef, Html, Selector};

use super::{Field, Form, HtmlDocument, compile_static_selector};

static ELEMENTS_WITH_ID: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("[id]"));
pub(super) static CONTROLS: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("input, select, textarea"));
static LINKS: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("a[href]"));
static NAMED_SELECTS: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("select[name]"));
static OPTIONS: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("option"));

/// A fetched page, parsed the way a browser would.
///
/// [`HtmlDocument::contains_text`] searches the page as received; every
/// other query walks the parsed tree, so markup inside comments or scripts
/// never matches.
///
/// The tree is not `Send`; parse, query and drop it between awaits.
#[derive(Debug)]
pub struct Document {
    raw: String,
    html: Html,
}

impl Document {
    /// Parses `html` as a full document.
    #[must_use]
    pub fn parse(html: impl Into<String>) -> Self {
        let raw = html.into();
        let html = Html::parse_document(&raw);
        Self { raw, html }
    }

    /// The page as received.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn element_by_id(&self, id: &str) -> Option<ElementRef<'_>> {
        self.html
            .select(&ELEMENTS_WITH_ID)
            .find(|element| element.value().id() == Some(id))
    }

    fn control_matching(&self, predicate: impl Fn(&ElementRef<'_>) -> bool) -> Option<ElementRef<'_>> {
        self.html.select(&CONTROLS).find(|element| predicate(element))
    }
}

/// An option's `value` attribute, falling back to its trimmed text.
pub(super) fn option_value(option: &ElementRef<'_>) -> String {
    match option.value().attr("value") {
        Some(value) => value.to_string(),
        None => option.text().collect::<String>().trim().to_string(),
    }
}

/// Every `<option>` under `select`, in document order.
pub(super) fn options_of(select: ElementRef<'_>) -> Select<'_, 'static> {
    select.select(&OPTIONS)
}

impl HtmlDocument for Document {
    fn contains_text(&self, needle: &str) -> bool {
        self.raw.contains(needle)
    }

    fn find_field_by_id(&self, id: &str) -> Option<Field> {
        self.control_matching(|element| element.value().id() == Some(id))
            .map(|element| Field {
                tag: element.value().name().to_string(),
                name: element.value().attr("name").map(str::to_string),
                value: element.value().attr("value").map(str::to_string),
            })
    }

    fn attribute_by_id(&self, id: &str, attribute: &str) -> Option<String> {
        self.element_by_id(id)?
            .value()
            .attr(attribute)
            .map(str::to_string)
    }

    fn find_link_containing(&self, container_id: &str, needle: &str) -> Option<String> {
        self.element_by_id(container_id)?
            .select(&LINKS)
            .filter_map(|link| link.value().attr("href"))
            .find(|href| href.contains(needle))
            .map(str::to_string)
    }

    fn read_multiselect_options(&self, name: &str) -> Vec<String> {
        self.html
            .select(&NAMED_SELECTS)
            .find(|select| select.value().attr("name") == Some(name))
            .map(|select| options_of(select).map(|option| option_value(&option)).collect())
            .unwrap_or_default()
    }

    fn form_containing_field(&self, key: &str) -> Option<Form> {
        let control = self.control_matching(|element| {
            element.value().attr("name") == Some(key) || element.value().id() == Some(key)
        })?;
        let form = control
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|element| element.value().name() == "form")?;
        Some(Form::from_element(&form))
    }
}
