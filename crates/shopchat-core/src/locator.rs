//! Locating the reference element the floating anchor tracks.
//!
//! The original behavior walked the live page with a prioritized list of
//! heuristics. Here the capability is injectable: production hosts can hand
//! over an explicit rectangle, supply heuristic criteria resolved against a
//! [`PageProbe`], or opt out entirely — so the heuristics are testable
//! without a real page tree.

use crate::anchor::{ElementRect, Viewport};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Candidates examined in the manual-traversal fallback are capped; the page
/// may be arbitrarily large, the traversal may not be.
const MAX_CANDIDATES: usize = 32;

/// A candidate element surfaced by the host page.
#[derive(Debug, Clone, Default)]
pub struct PageElement {
    pub rect: ElementRect,
    pub attributes: HashMap<String, String>,
    pub text: String,
    pub classes: Vec<String>,
}

/// Read-only window into the host page tree.
///
/// The engine only measures; it never mutates the page.
pub trait PageProbe: Send + Sync {
    fn viewport(&self) -> Viewport;

    /// Targeted lookup by attribute equality.
    fn find_by_attribute(&self, name: &str, value: &str) -> Option<ElementRect>;

    /// Targeted lookup by visible text content.
    fn find_by_text(&self, needle: &str) -> Option<ElementRect>;

    /// Targeted lookup by class name.
    fn find_by_class(&self, class: &str) -> Option<ElementRect>;

    /// Bounded candidate set for manual traversal when every targeted lookup
    /// comes up empty.
    fn candidates(&self) -> Vec<PageElement>;

    /// Whether this host delivers [`LayoutSignal::ReferenceAppeared`] when an
    /// element materializes after initial layout. Hosts that cannot are
    /// covered by the tracker's bounded polling instead.
    ///
    /// [`LayoutSignal::ReferenceAppeared`]: crate::LayoutSignal::ReferenceAppeared
    fn notifies_appearance(&self) -> bool {
        false
    }
}

/// One step of the heuristic lookup, tried in order.
#[derive(Debug, Clone)]
pub enum LocatorHint {
    Attribute { name: String, value: String },
    Text(String),
    Class(String),
}

/// How the tracker finds the reference element.
pub enum AnchorLocator {
    /// Caller supplies the rectangle directly.
    Explicit(ElementRect),
    /// Prioritized structural/semantic lookup against the page.
    Heuristic(Vec<LocatorHint>),
    /// No reference element; static fallback offsets apply.
    None,
}

impl AnchorLocator {
    /// Heuristics for the storefront's primary action control (the login
    /// button): attribute first, then text, then class.
    pub fn primary_action() -> Self {
        AnchorLocator::Heuristic(vec![
            LocatorHint::Attribute {
                name: "data-role".to_string(),
                value: "primary-action".to_string(),
            },
            LocatorHint::Text("sign in".to_string()),
            LocatorHint::Class("account-button".to_string()),
        ])
    }

    /// Resolve the reference element against the page, if any.
    pub fn resolve(&self, probe: &dyn PageProbe) -> Option<ElementRect> {
        match self {
            AnchorLocator::Explicit(rect) => Some(*rect),
            AnchorLocator::None => None,
            AnchorLocator::Heuristic(hints) => {
                for hint in hints {
                    let found = match hint {
                        LocatorHint::Attribute { name, value } => {
                            probe.find_by_attribute(name, value)
                        }
                        LocatorHint::Text(needle) => probe.find_by_text(needle),
                        LocatorHint::Class(class) => probe.find_by_class(class),
                    };
                    if let Some(rect) = found {
                        trace!(target: "shopchat::locator", "Reference resolved via {:?}", hint);
                        return Some(rect);
                    }
                }

                // Targeted lookups failed; walk the bounded candidate set.
                for element in probe.candidates().iter().take(MAX_CANDIDATES) {
                    if hints.iter().any(|hint| element_matches(element, hint)) {
                        trace!(target: "shopchat::locator", "Reference resolved via traversal");
                        return Some(element.rect);
                    }
                }

                debug!(target: "shopchat::locator", "No reference element located");
                None
            }
        }
    }
}

fn element_matches(element: &PageElement, hint: &LocatorHint) -> bool {
    match hint {
        LocatorHint::Attribute { name, value } => {
            element.attributes.get(name).is_some_and(|v| v == value)
        }
        LocatorHint::Text(needle) => text_matches(&element.text, needle),
        LocatorHint::Class(class) => element.classes.iter().any(|c| c == class),
    }
}

/// Case- and whitespace-insensitive containment for text hints, so
/// "Sign&nbsp;In" and "sign  in" both match.
fn text_matches(haystack: &str, needle: &str) -> bool {
    static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

    let haystack = WHITESPACE.replace_all(haystack.trim(), " ").to_lowercase();
    let needle = WHITESPACE.replace_all(needle.trim(), " ").to_lowercase();
    if needle.is_empty() {
        return false;
    }
    haystack.contains(&needle)
}
