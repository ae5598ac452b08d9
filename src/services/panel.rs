//! Announcement panel locator.
//!
//! The home page markup is not stable, so the panel is found with an ordered
//! cascade of heuristics. The first heuristic that yields an element wins.

use scraper::{ElementRef, Html, Selector};

use crate::models::SourceConfig;

type Heuristic = for<'d> fn(&PanelLocator, &'d Html) -> Option<ElementRef<'d>>;

/// Finds the "recent announcements" panel in a parsed home page.
#[derive(Debug, Clone)]
pub struct PanelLocator {
    heading: String,
    panel_id: String,
}

impl PanelLocator {
    pub fn new(heading: impl Into<String>, panel_id: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            panel_id: panel_id.into(),
        }
    }

    pub fn from_config(source: &SourceConfig) -> Self {
        Self::new(&source.panel_heading, &source.panel_id)
    }

    /// Run the cascade: heading inside a panel, then the well-known id,
    /// then the parent of any text mentioning the heading phrase.
    pub fn locate<'d>(&self, document: &'d Html) -> Option<ElementRef<'d>> {
        let cascade: [(&str, Heuristic); 3] = [
            ("panel heading", Self::by_panel_heading),
            ("panel id", Self::by_panel_id),
            ("heading text", Self::by_heading_text),
        ];

        cascade.iter().find_map(|(name, heuristic)| {
            let found = heuristic(self, document);
            if found.is_some() {
                log::debug!("Panel located by {name}");
            }
            found
        })
    }

    /// A `div.panel` containing an h1-h3 whose text includes the phrase.
    pub fn by_panel_heading<'d>(&self, document: &'d Html) -> Option<ElementRef<'d>> {
        let panel_sel = Selector::parse("div.panel").ok()?;
        let heading_sel = Selector::parse("h1, h2, h3").ok()?;

        document.select(&panel_sel).find(|panel| {
            panel.select(&heading_sel).any(|heading| {
                let text: String = heading.text().collect();
                text.contains(&self.heading)
            })
        })
    }

    /// The `div` carrying the stable panel id.
    pub fn by_panel_id<'d>(&self, document: &'d Html) -> Option<ElementRef<'d>> {
        let div_sel = Selector::parse("div").ok()?;
        document
            .select(&div_sel)
            .find(|div| div.value().id() == Some(self.panel_id.as_str()))
    }

    /// Parent element of the first text node containing the phrase.
    pub fn by_heading_text<'d>(&self, document: &'d Html) -> Option<ElementRef<'d>> {
        document.tree.root().descendants().find_map(|node| {
            let text = node.value().as_text()?;
            if !text.contains(self.heading.as_str()) {
                return None;
            }
            node.parent().and_then(ElementRef::wrap)
        })
    }
}

impl Default for PanelLocator {
    fn default() -> Self {
        Self::from_config(&SourceConfig::default())
    }
}
