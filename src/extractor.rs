use ego_tree::iter::Edge;
use html5ever::driver::{self, ParseOpts};
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use scraper::{Html, Node};
use tracing::debug;

use crate::favicon::{best_favicon, FaviconCandidate};
use crate::NormalizedMetadata;

/// One step of a document-order walk over parsed HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagEvent<'a> {
    Open {
        name: &'a str,
        attrs: Vec<(&'a str, &'a str)>,
    },
    Text(&'a str),
    Close {
        name: &'a str,
    },
}

/// Lazily walk `document` front to back, yielding open/text/close events.
///
/// The tree comes from html5ever's error-recovering parser, so broken
/// markup still produces a well-nested event sequence.
pub fn tag_events(document: &Html) -> impl Iterator<Item = TagEvent<'_>> {
    document
        .tree
        .root()
        .traverse()
        .filter_map(|edge| match edge {
            Edge::Open(node) => match node.value() {
                Node::Element(element) => Some(TagEvent::Open {
                    name: element.name(),
                    attrs: element.attrs().collect(),
                }),
                Node::Text(text) => Some(TagEvent::Text(&**text)),
                _ => None,
            },
            Edge::Close(node) => match node.value() {
                Node::Element(element) => Some(TagEvent::Close {
                    name: element.name(),
                }),
                _ => None,
            },
        })
}

fn attr<'a>(attrs: &[(&'a str, &'a str)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, value)| *value)
}

/// Metadata and icon candidates gathered from one page.
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub metadata: NormalizedMetadata,
    pub favicon_candidates: Vec<FaviconCandidate>,
}

impl ParsedPage {
    /// Ranked favicon, falling back to the first icon link seen.
    pub fn best_favicon(&self) -> String {
        best_favicon(&self.favicon_candidates, &self.metadata.favicon)
    }
}

/// State reducer over [`TagEvent`]s.
///
/// Open Graph properties always overwrite; Twitter Card and plain
/// `description` tags only fill fields that are still empty, and the
/// `<title>` text is used only when nothing else supplied a title.
#[derive(Debug, Default)]
pub struct MetaTagParser {
    metadata: NormalizedMetadata,
    in_title: bool,
    title_text: String,
    favicon_candidates: Vec<FaviconCandidate>,
}

impl MetaTagParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, event: TagEvent<'_>) {
        match event {
            TagEvent::Open { name, attrs } => self.handle_start(name, &attrs),
            TagEvent::Text(text) => {
                if self.in_title {
                    self.title_text.push_str(text);
                }
            }
            TagEvent::Close { name } => self.handle_end(name),
        }
    }

    pub fn feed_all<'a>(&mut self, events: impl IntoIterator<Item = TagEvent<'a>>) {
        for event in events {
            self.feed(event);
        }
    }

    pub fn finish(self) -> ParsedPage {
        ParsedPage {
            metadata: self.metadata,
            favicon_candidates: self.favicon_candidates,
        }
    }

    fn handle_start(&mut self, name: &str, attrs: &[(&str, &str)]) {
        if name.eq_ignore_ascii_case("title") {
            self.in_title = true;
            self.title_text.clear();
        } else if name.eq_ignore_ascii_case("link") {
            self.handle_link(attrs);
        } else if name.eq_ignore_ascii_case("meta") {
            self.handle_meta(attrs);
        }
    }

    fn handle_end(&mut self, name: &str) {
        if !name.eq_ignore_ascii_case("title") {
            return;
        }
        self.in_title = false;
        if self.metadata.title.is_empty() {
            self.metadata.title = self.title_text.trim().to_string();
        }
    }

    fn handle_link(&mut self, attrs: &[(&str, &str)]) {
        let rel = attr(attrs, "rel").unwrap_or_default();
        let href = attr(attrs, "href").unwrap_or_default();
        if rel.is_empty() || href.is_empty() || !rel.to_ascii_lowercase().contains("icon") {
            return;
        }

        let candidate = FaviconCandidate::from_link(
            href,
            rel,
            attr(attrs, "sizes").unwrap_or_default(),
            attr(attrs, "type").unwrap_or_default(),
        );
        debug!(href = %candidate.href, size = candidate.size, priority = candidate.priority, "Found favicon candidate");
        self.favicon_candidates.push(candidate);

        if self.metadata.favicon.is_empty() {
            self.metadata.favicon = href.to_string();
        }
    }

    fn handle_meta(&mut self, attrs: &[(&str, &str)]) {
        let content = attr(attrs, "content").unwrap_or_default();
        if content.is_empty() {
            return;
        }

        if let Some(property) = attr(attrs, "property") {
            let field = match property {
                "og:title" => Some(&mut self.metadata.title),
                "og:description" => Some(&mut self.metadata.description),
                "og:image" => Some(&mut self.metadata.image),
                "og:url" => Some(&mut self.metadata.url),
                "og:site_name" => Some(&mut self.metadata.site_name),
                "og:type" => Some(&mut self.metadata.kind),
                _ => None,
            };
            if let Some(field) = field {
                *field = content.to_string();
            }
        }

        if let Some(name) = attr(attrs, "name") {
            let field = match name {
                "twitter:title" => Some(&mut self.metadata.title),
                "twitter:description" | "description" => Some(&mut self.metadata.description),
                "twitter:image" => Some(&mut self.metadata.image),
                _ => None,
            };
            if let Some(field) = field.filter(|field| field.is_empty()) {
                *field = content.to_string();
            }
        }
    }
}

/// Metadata extractor, responsible for extracting preview information from webpage content
#[derive(Clone, Default)]
pub struct MetadataExtractor;

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, html: &str) -> ParsedPage {
        let document = parse_document(html);
        let mut parser = MetaTagParser::new();
        parser.feed_all(tag_events(&document));
        let page = parser.finish();

        debug!(
            title = %page.metadata.title,
            image = %page.metadata.image,
            favicon_candidates = page.favicon_candidates.len(),
            "Basic metadata extraction results"
        );
        page
    }
}

/// Parse with scripting disabled so `<noscript>` children become real
/// elements instead of one raw text node.
fn parse_document(html: &str) -> Html {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            scripting_enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };
    driver::parse_document(Html::new_document(), opts).one(html)
}

/// Plain text of an HTML fragment, markup removed and entities decoded.
pub fn strip_markup(fragment: &str) -> String {
    Html::parse_fragment(fragment)
        .root_element()
        .text()
        .collect::<String>()
        .trim()
        .to_string()
}
