use crate::result::ImageCandidate;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp", ".gif", ".bmp", ".svg"];
pub const MAX_CONTEXT_CHARS: usize = 200;

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));
static IMAGE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("static selector"));

const SKIPPED_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Links and images found on one page.
#[derive(Debug, Default)]
pub struct PageExtraction {
    /// Same-host links, deduplicated, at most `max_links_per_level`.
    pub links: Vec<Url>,
    pub images: Vec<ImageCandidate>,
    /// Same-host links discarded by the per-page cap.
    pub links_over_cap: usize,
    /// Links and images dropped because their URL could not be resolved.
    pub unresolved: usize,
}

#[derive(Debug, Clone)]
pub struct Extractor {
    max_links_per_level: usize,
}

impl Extractor {
    pub fn new(max_links_per_level: usize) -> Self {
        Self {
            max_links_per_level,
        }
    }

    pub fn extract(&self, html: &str, page_url: &Url) -> PageExtraction {
        let document = Html::parse_document(html);
        let mut extraction = PageExtraction::default();

        let mut links = self.extract_links(&document, page_url, &mut extraction.unresolved);
        if links.len() > self.max_links_per_level {
            extraction.links_over_cap = links.len() - self.max_links_per_level;
            links.truncate(self.max_links_per_level);
        }
        extraction.links = links;
        extraction.images = extract_images(&document, page_url, &mut extraction.unresolved);

        debug!(
            "Extracted {} links ({} over cap) and {} images from {}",
            extraction.links.len(),
            extraction.links_over_cap,
            extraction.images.len(),
            page_url
        );
        extraction
    }

    fn extract_links(&self, document: &Html, page_url: &Url, unresolved: &mut usize) -> Vec<Url> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for element in document.select(&LINK_SELECTOR) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            if is_non_navigational(href) {
                continue;
            }

            let Ok(mut url) = page_url.join(href) else {
                debug!("Dropping unresolvable link '{}' on {}", href, page_url);
                *unresolved += 1;
                continue;
            };
            url.set_fragment(None);

            if !is_http(&url) || !is_same_host(&url, page_url) || is_image_path(&url) {
                continue;
            }
            if url == *page_url {
                continue;
            }
            if seen.insert(url.to_string()) {
                links.push(url);
            }
        }

        links
    }
}

fn is_non_navigational(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    href.is_empty()
        || href.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

pub fn is_same_host(url: &Url, base: &Url) -> bool {
    url.host_str().map(|h| h.to_ascii_lowercase()) == base.host_str().map(|h| h.to_ascii_lowercase())
        && url.port_or_known_default() == base.port_or_known_default()
}

fn is_image_path(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

fn is_data_image(src: &str) -> bool {
    src.get(..11)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:image/"))
}

fn extract_images(document: &Html, page_url: &Url, unresolved: &mut usize) -> Vec<ImageCandidate> {
    let mut seen = HashSet::new();
    let mut images = Vec::new();

    for img in document.select(&IMAGE_SELECTOR) {
        let attrs = img.value();
        let Some(src) = ["src", "data-src"]
            .iter()
            .filter_map(|name| attrs.attr(name))
            .map(str::trim)
            .find(|s| !s.is_empty())
        else {
            continue;
        };

        let source_url = if is_data_image(src) {
            src.to_string()
        } else {
            let Ok(resolved) = page_url.join(src) else {
                debug!("Dropping unresolvable image '{}' on {}", src, page_url);
                *unresolved += 1;
                continue;
            };
            if !is_http(&resolved) || !is_image_path(&resolved) {
                continue;
            }
            resolved.to_string()
        };

        if !seen.insert(source_url.clone()) {
            continue;
        }

        let candidate = ImageCandidate::new(source_url, page_url.to_string())
            .with_alt(attrs.attr("alt").unwrap_or("").trim())
            .with_title(attrs.attr("title").unwrap_or("").trim())
            .with_dimensions(
                attrs.attr("width").and_then(parse_dimension),
                attrs.attr("height").and_then(parse_dimension),
            )
            .with_context(surrounding_context(&img));
        images.push(candidate);
    }

    images
}

/// Parses a declared `width`/`height` attribute such as `640` or `640px`.
pub fn parse_dimension(value: &str) -> Option<u32> {
    let value = value.trim();
    let value = value.strip_suffix("px").unwrap_or(value).trim();
    value.parse::<u32>().ok()
}

/// Visible text around an image: its parent's text, then the text of the
/// parent's following and preceding sibling elements, nearest first.
fn surrounding_context(img: &ElementRef) -> String {
    let Some(parent) = img.parent().and_then(ElementRef::wrap) else {
        return String::new();
    };

    let mut raw = String::new();
    collect_visible_text(&parent, &mut raw);

    let siblings = parent
        .next_siblings()
        .chain(parent.prev_siblings())
        .filter_map(ElementRef::wrap);
    for sibling in siblings {
        if collapse_whitespace(&raw).chars().count() >= MAX_CONTEXT_CHARS {
            break;
        }
        collect_visible_text(&sibling, &mut raw);
    }

    collapse_whitespace(&raw)
        .chars()
        .take(MAX_CONTEXT_CHARS)
        .collect()
}

fn collect_visible_text(element: &ElementRef, out: &mut String) {
    if SKIPPED_TEXT_ELEMENTS.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_element) = ElementRef::wrap(child) {
            collect_visible_text(&child_element, out);
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
