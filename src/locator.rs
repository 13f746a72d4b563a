use std::fmt;

use serde::{Deserialize, Serialize};

/// How an element is located in the page.
///
/// Locators are resolved once at the driver boundary: everything that is not
/// a CSS selector is lowered to an XPath query before it reaches the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorStrategy {
    Id,
    Css,
    XPath,
    Text,
}

/// A tagged element locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub strategy: LocatorStrategy,
    pub value: String,
}

/// Query form understood by the driver: either a CSS selector or an XPath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedQuery {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn id(value: impl Into<String>) -> Self {
        Self {
            strategy: LocatorStrategy::Id,
            value: value.into(),
        }
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self {
            strategy: LocatorStrategy::Css,
            value: value.into(),
        }
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self {
            strategy: LocatorStrategy::XPath,
            value: value.into(),
        }
    }

    /// Locate the element whose own text contains `value`.
    ///
    /// Matches on `text()` rather than the full descendant string: a
    /// string-value match would satisfy every ancestor up to `<html>`, and
    /// the driver acts on the first match in document order.
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            strategy: LocatorStrategy::Text,
            value: value.into(),
        }
    }

    /// Append a relative XPath suffix to an XPath locator.
    ///
    /// Used for row sub-fields: the row base locator plus a per-field path.
    pub fn join(&self, suffix: &str) -> Locator {
        Locator::xpath(format!("{}{}", self.resolve().xpath_or_self(), suffix))
    }

    pub fn resolve(&self) -> ResolvedQuery {
        match self.strategy {
            LocatorStrategy::Css => ResolvedQuery::Css(self.value.clone()),
            LocatorStrategy::XPath => ResolvedQuery::XPath(self.value.clone()),
            LocatorStrategy::Id => ResolvedQuery::XPath(format!(
                "//*[@id={}]",
                xpath_literal(&self.value)
            )),
            LocatorStrategy::Text => ResolvedQuery::XPath(format!(
                "//*[contains(normalize-space(text()), {})]",
                xpath_literal(&self.value)
            )),
        }
    }
}

/// Quote a string as an XPath literal. XPath 1.0 has no escape syntax, so a
/// value containing `'` becomes a `concat()` of quoted pieces.
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    let parts: Vec<String> = value.split('\'').map(|part| format!("'{part}'")).collect();
    format!("concat({})", parts.join(r#", "'", "#))
}

impl ResolvedQuery {
    fn xpath_or_self(&self) -> &str {
        match self {
            ResolvedQuery::Css(v) | ResolvedQuery::XPath(v) => v,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.strategy {
            LocatorStrategy::Id => "id",
            LocatorStrategy::Css => "css",
            LocatorStrategy::XPath => "xpath",
            LocatorStrategy::Text => "text",
        };
        write!(f, "{kind}={}", self.value)
    }
}

/// An XPath with an `{index}` placeholder, instantiated per row.
#[derive(Debug, Clone)]
pub struct LocatorTemplate {
    template: String,
}

impl LocatorTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Materialize the locator for a 1-based row index.
    pub fn at(&self, index: usize) -> Locator {
        self.with(&index.to_string())
    }

    /// Materialize the locator with an arbitrary value in the slot
    /// (a reference year, a tab id).
    pub fn with(&self, value: &str) -> Locator {
        Locator::xpath(self.template.replace("{index}", value))
    }
}
