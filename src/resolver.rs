//! TargetResolver — binds a step's target descriptor to something on the
//! live page.
//!
//! Resolution never fails. A selector that matches nothing degrades to a
//! centered, whole-screen presentation so the tour keeps going without its
//! spotlight. Resolution is repeated every time a step is presented because
//! the page changes underneath the tour.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock, RwLock};

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::tour::model::TargetDescriptor;

/// Opaque reference to a rendered element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ElementHandle(pub String);

/// Read-only view of the live UI tree.
pub trait PageOracle: Send + Sync {
    /// First element matching `selector`, if any.
    fn query(&self, selector: &str) -> Option<ElementHandle>;
}

/// Where a step will actually be presented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedAnchor {
    Element {
        selector: String,
        handle: ElementHandle,
    },
    WholeScreen,
    /// The selector matched nothing; presented centered instead.
    Degraded { selector: String },
}

/// Renderer target used for centered presentation.
pub const WHOLE_SCREEN_TARGET: &str = "body";

impl ResolvedAnchor {
    pub fn is_whole_screen(&self) -> bool {
        !matches!(self, Self::Element { .. })
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Target string handed to the overlay renderer.
    pub fn render_target(&self) -> &str {
        match self {
            Self::Element { selector, .. } => selector,
            Self::WholeScreen | Self::Degraded { .. } => WHOLE_SCREEN_TARGET,
        }
    }
}

pub struct TargetResolver {
    page: Arc<dyn PageOracle>,
}

impl TargetResolver {
    pub fn new(page: Arc<dyn PageOracle>) -> Self {
        Self { page }
    }

    pub fn resolve(&self, descriptor: &TargetDescriptor) -> ResolvedAnchor {
        match descriptor {
            TargetDescriptor::WholeScreen => ResolvedAnchor::WholeScreen,
            TargetDescriptor::Selector(selector) => match self.page.query(selector) {
                Some(handle) => ResolvedAnchor::Element {
                    selector: selector.clone(),
                    handle,
                },
                None => {
                    debug!(selector = %selector, "Tour target not on page, presenting centered");
                    ResolvedAnchor::Degraded {
                        selector: selector.clone(),
                    }
                }
            },
        }
    }
}

// ── Static page ─────────────────────────────────────────────────────

/// An element in a `StaticPage`.
#[derive(Debug, Clone, Default)]
pub struct PageElement {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: BTreeMap<String, String>,
}

impl PageElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    /// Shorthand for `[data-tour="<name>"]` anchors.
    pub fn tour_anchor(tag: &str, name: &str) -> Self {
        Self::new(tag).with_attr("data-tour", name)
    }
}

/// In-memory page with a small selector engine.
///
/// Supports compound selectors built from `tag`, `#id`, `.class`, `[attr]`
/// and `[attr=value]` (quoted or bare), and comma-separated lists of those.
/// Combinators and pseudo-classes never match.
#[derive(Default)]
pub struct StaticPage {
    elements: RwLock<Vec<(ElementHandle, PageElement)>>,
    next_id: RwLock<u64>,
}

impl StaticPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element, returning its handle.
    pub fn insert(&self, element: PageElement) -> ElementHandle {
        let id = match self.next_id.write() {
            Ok(mut next) => {
                *next += 1;
                *next
            }
            Err(_) => 0,
        };
        let handle = ElementHandle(format!("{}-{id}", element.tag));
        if let Ok(mut elements) = self.elements.write() {
            elements.push((handle.clone(), element));
        }
        handle
    }

    /// Remove an element. Returns whether it was present.
    pub fn remove(&self, handle: &ElementHandle) -> bool {
        let Ok(mut elements) = self.elements.write() else {
            return false;
        };
        let before = elements.len();
        elements.retain(|(h, _)| h != handle);
        elements.len() != before
    }

    pub fn len(&self) -> usize {
        self.elements.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PageOracle for StaticPage {
    fn query(&self, selector: &str) -> Option<ElementHandle> {
        let alternatives: Vec<Vec<SimpleSelector>> = selector
            .split(',')
            .filter_map(|part| {
                let parsed = parse_compound(part.trim());
                if parsed.is_none() {
                    debug!(selector = %part.trim(), "Unsupported selector");
                }
                parsed
            })
            .collect();

        let elements = self.elements.read().ok()?;
        elements
            .iter()
            .find(|(_, el)| {
                alternatives
                    .iter()
                    .any(|compound| compound.iter().all(|s| s.matches(el)))
            })
            .map(|(handle, _)| handle.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SimpleSelector {
    Tag(String),
    Id(String),
    Class(String),
    Attr { name: String, value: Option<String> },
}

impl SimpleSelector {
    fn matches(&self, el: &PageElement) -> bool {
        match self {
            Self::Tag(tag) => el.tag.eq_ignore_ascii_case(tag),
            Self::Id(id) => el.id.as_deref() == Some(id.as_str()),
            Self::Class(class) => el.classes.iter().any(|c| c == class),
            Self::Attr { name, value } => match (el.attrs.get(name), value) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
                (None, _) => false,
            },
        }
    }
}

static SELECTOR_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?:(?P<tag>[A-Za-z][\w-]*)|#(?P<id>[\w-]+)|\.(?P<class>[\w-]+)|\[\s*(?P<attr>[\w-]+)\s*(?:=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<bare>[\w-]+))\s*)?\])"#,
    )
    .expect("selector token pattern is valid")
});

/// Parse a compound selector. `None` for empty input or unsupported syntax.
fn parse_compound(input: &str) -> Option<Vec<SimpleSelector>> {
    let mut rest = input;
    let mut parts = Vec::new();

    while !rest.is_empty() {
        let caps = SELECTOR_TOKEN.captures(rest)?;
        let whole = caps.get(0)?;
        // A type selector is only valid in leading position.
        if let Some(tag) = caps.name("tag") {
            if !parts.is_empty() {
                return None;
            }
            parts.push(SimpleSelector::Tag(tag.as_str().to_string()));
        } else if let Some(id) = caps.name("id") {
            parts.push(SimpleSelector::Id(id.as_str().to_string()));
        } else if let Some(class) = caps.name("class") {
            parts.push(SimpleSelector::Class(class.as_str().to_string()));
        } else if let Some(attr) = caps.name("attr") {
            let value = caps
                .name("dq")
                .or_else(|| caps.name("sq"))
                .or_else(|| caps.name("bare"))
                .map(|m| m.as_str().to_string());
            parts.push(SimpleSelector::Attr {
                name: attr.as_str().to_string(),
                value,
            });
        }
        rest = &rest[whole.end()..];
    }

    if parts.is_empty() { None } else { Some(parts) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> StaticPage {
        let page = StaticPage::new();
        page.insert(PageElement::new("nav").with_id("sidebar").with_class("menu"));
        page.insert(PageElement::tour_anchor("button", "new-project").with_class("primary"));
        page
    }

    #[test]
    fn parses_compound_selectors() {
        assert_eq!(
            parse_compound("button.primary[data-tour=\"x\"]"),
            Some(vec![
                SimpleSelector::Tag("button".to_string()),
                SimpleSelector::Class("primary".to_string()),
                SimpleSelector::Attr {
                    name: "data-tour".to_string(),
                    value: Some("x".to_string()),
                },
            ])
        );
        assert_eq!(
            parse_compound("[disabled]"),
            Some(vec![SimpleSelector::Attr {
                name: "disabled".to_string(),
                value: None,
            }])
        );
    }

    #[test]
    fn rejects_unsupported_syntax() {
        assert!(parse_compound("").is_none());
        assert!(parse_compound("nav > a").is_none());
        assert!(parse_compound("a:hover").is_none());
        assert!(parse_compound(".menu nav").is_none());
    }

    #[test]
    fn static_page_queries() {
        let page = page();
        assert!(page.query("#sidebar").is_some());
        assert!(page.query("nav.menu").is_some());
        assert!(page.query("[data-tour=\"new-project\"]").is_some());
        assert!(page.query("[data-tour='new-project']").is_some());
        assert!(page.query("[data-tour=new-project]").is_some());
        assert!(page.query("#missing, .primary").is_some());
        assert!(page.query("#missing").is_none());
        assert!(page.query("div#sidebar").is_none());
    }

    #[test]
    fn whole_screen_always_resolves() {
        let resolver = TargetResolver::new(Arc::new(StaticPage::new()));
        let anchor = resolver.resolve(&TargetDescriptor::WholeScreen);
        assert_eq!(anchor, ResolvedAnchor::WholeScreen);
        assert_eq!(anchor.render_target(), WHOLE_SCREEN_TARGET);
    }

    #[test]
    fn missing_selector_degrades_to_whole_screen() {
        let resolver = TargetResolver::new(Arc::new(page()));
        let anchor = resolver.resolve(&"#nope".into());
        assert!(anchor.is_degraded());
        assert!(anchor.is_whole_screen());
        assert_eq!(anchor.render_target(), WHOLE_SCREEN_TARGET);
    }

    #[test]
    fn resolution_tracks_page_changes() {
        let page = Arc::new(StaticPage::new());
        let resolver = TargetResolver::new(Arc::clone(&page) as Arc<dyn PageOracle>);
        let target: TargetDescriptor = "#late".into();

        assert!(resolver.resolve(&target).is_degraded());

        let handle = page.insert(PageElement::new("div").with_id("late"));
        let anchor = resolver.resolve(&target);
        assert_eq!(anchor.render_target(), "#late");
        assert!(!anchor.is_whole_screen());

        assert!(page.remove(&handle));
        assert!(resolver.resolve(&target).is_degraded());
    }
}
