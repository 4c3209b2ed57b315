//! Selector rules
//!
//! A rule binds a CSS selector to an extraction function. Rules run in the
//! order they were declared; within a rule, matches are visited in document
//! order.

use std::fmt;

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::error::{Result, ScrapeError};
use crate::fetch::Page;
use crate::model::Policy;
use crate::parse::clean_texts;

/// A node matched by a rule, with the page it came from.
#[derive(Clone, Copy)]
pub struct Matched<'a> {
    element: ElementRef<'a>,
    page: &'a Page,
}

impl<'a> Matched<'a> {
    pub fn new(element: ElementRef<'a>, page: &'a Page) -> Self {
        Self { element, page }
    }

    pub fn element(&self) -> ElementRef<'a> {
        self.element
    }

    pub fn page(&self) -> &'a Page {
        self.page
    }

    /// All descendant text, trimmed
    pub fn text(&self) -> String {
        self.element.text().collect::<String>().trim().to_string()
    }

    /// Descendant text nodes, trimmed, without blanks or bare separators
    pub fn texts(&self) -> Vec<String> {
        clean_texts(self.element.text())
    }

    /// First non-blank text node directly under this element
    pub fn own_text(&self) -> Option<String> {
        self.element
            .children()
            .filter_map(|node| node.value().as_text())
            .map(|text| text.trim())
            .find(|text| !text.is_empty())
            .map(String::from)
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// First descendant matching `css`
    pub fn child(&self, css: &str) -> Option<Matched<'a>> {
        let selector = child_selector(css)?;
        let element = self.element.select(&selector).next()?;
        Some(Matched::new(element, self.page))
    }

    /// Every descendant matching `css`, in document order
    pub fn children(&self, css: &str) -> Vec<Matched<'a>> {
        let Some(selector) = child_selector(css) else {
            return vec![];
        };
        self.element
            .select(&selector)
            .map(|element| Matched::new(element, self.page))
            .collect()
    }

    /// Direct child elements with tag `name`, in order
    pub fn child_elements(&self, name: &str) -> Vec<Matched<'a>> {
        self.element
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name().eq_ignore_ascii_case(name))
            .map(|element| Matched::new(element, self.page))
            .collect()
    }

    pub fn child_text(&self, css: &str) -> Option<String> {
        self.child(css).map(|m| m.text())
    }

    /// Trimmed text of every descendant matching `css`, blanks dropped
    pub fn child_texts(&self, css: &str) -> Vec<String> {
        self.children(css)
            .iter()
            .map(Matched::text)
            .filter(|text| !text.is_empty())
            .collect()
    }

    pub fn child_attr(&self, css: &str, name: &str) -> Option<String> {
        self.child(css)?.attr(name).map(String::from)
    }

    pub fn absolute_url(&self, href: &str) -> Option<String> {
        self.page.absolute_url(href)
    }
}

fn child_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!(selector = css, error = %e, "invalid child selector");
            None
        }
    }
}

type ExtractFn<T> = dyn Fn(&Matched<'_>) -> Vec<T> + Send + Sync;

/// Pattern → extraction function binding.
pub struct Rule<T> {
    css: String,
    selector: Selector,
    policy: Policy,
    extract: Box<ExtractFn<T>>,
}

impl<T> Rule<T> {
    /// Fails when `css` is not a valid selector.
    pub fn new<F>(css: &str, extract: F) -> Result<Self>
    where
        F: Fn(&Matched<'_>) -> Vec<T> + Send + Sync + 'static,
    {
        let selector = Selector::parse(css).map_err(|e| ScrapeError::Selector {
            selector: css.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            css: css.to_string(),
            selector,
            policy: Policy::default(),
            extract: Box::new(extract),
        })
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn css(&self) -> &str {
        &self.css
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }
}

impl<T> fmt::Debug for Rule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("css", &self.css)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// An ordered, immutable list of rules.
#[derive(Debug)]
pub struct RuleSet<T> {
    rules: Vec<Rule<T>>,
}

impl<T> RuleSet<T> {
    pub fn new(rules: Vec<Rule<T>>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule against `document`, handing each output to `sink`
    /// together with the rule that produced it and that rule's position.
    pub fn evaluate<F>(&self, page: &Page, document: &Html, mut sink: F)
    where
        F: FnMut(usize, &Rule<T>, T),
    {
        for (index, rule) in self.rules.iter().enumerate() {
            for element in document.select(&rule.selector) {
                for output in (rule.extract)(&Matched::new(element, page)) {
                    sink(index, rule, output);
                }
            }
        }
    }

    /// All outputs of all rules, in evaluation order
    pub fn collect(&self, page: &Page) -> Vec<T> {
        let document = page.document();
        let mut outputs = Vec::new();
        self.evaluate(page, &document, |_, _, output| outputs.push(output));
        outputs
    }
}
