//! Google News sitemap generation.
//!
//! # Format
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9" xmlns:news="..." ...>
//!   <url>
//!     <loc>https://example.com/2024/05/story</loc>
//!     <news:news>
//!       <news:title>Story</news:title>
//!       <news:publication_date>2024-05-10</news:publication_date>
//!       <news:publication>
//!         <news:name>Daily Planet</news:name>
//!         <news:language>en</news:language>
//!       </news:publication>
//!     </news:news>
//!   </url>
//! </urlset>
//! ```
//!
//! The document is rendered into memory in full before it is returned, so a
//! failure never yields a truncated sitemap.

use crate::article::{Article, PublisherMetadata};
use crate::error::{NewsmapError, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::borrow::Cow;
use std::io::Write;

pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
pub const NEWS_NS: &str = "http://www.google.com/schemas/sitemap-news/0.9";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const SCHEMA_LOCATION: &str = "http://www.sitemaps.org/schemas/sitemap/0.9 \
http://www.sitemaps.org/schemas/sitemap/0.9/sitemap.xsd \
http://www.google.com/schemas/sitemap-news/0.9 \
http://www.google.com/schemas/sitemap-news/0.9/sitemap-news.xsd";

const DATE_FORMAT: &str = "%Y-%m-%d";

fn build_err(e: impl std::fmt::Display) -> NewsmapError {
    NewsmapError::Build(e.to_string())
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Render `articles` as a Google News sitemap, one `<url>` per article in
/// input order. The articles are expected to be pre-filtered.
pub fn build(articles: &[Article], publisher: &PublisherMetadata) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::with_capacity(4096), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(build_err)?;

    let urlset = BytesStart::new("urlset").with_attributes([
        ("xmlns", SITEMAP_NS),
        ("xmlns:news", NEWS_NS),
        ("xmlns:xsi", XSI_NS),
        ("xsi:schemaLocation", SCHEMA_LOCATION),
    ]);
    writer
        .write_event(Event::Start(urlset))
        .map_err(build_err)?;

    for article in articles {
        write_url(&mut writer, article, publisher)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("urlset")))
        .map_err(build_err)?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    String::from_utf8(bytes).map_err(build_err)
}

fn write_url<W: Write>(
    writer: &mut Writer<W>,
    article: &Article,
    publisher: &PublisherMetadata,
) -> Result<()> {
    open(writer, "url")?;
    text_element(writer, "loc", &article.permalink)?;

    open(writer, "news:news")?;
    text_element(writer, "news:title", &article.title)?;
    text_element(
        writer,
        "news:publication_date",
        &article.publish_date.format(DATE_FORMAT).to_string(),
    )?;

    open(writer, "news:publication")?;
    text_element(writer, "news:name", &publisher.name)?;
    text_element(writer, "news:language", &publisher.language)?;
    close(writer, "news:publication")?;

    close(writer, "news:news")?;
    close(writer, "url")
}

fn open<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(build_err)
}

fn close<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<()> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(build_err)
}

fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    open(writer, name)?;
    // BytesText::new escapes markup characters but not control characters.
    writer
        .write_event(Event::Text(BytesText::new(&strip_invalid_chars(text))))
        .map_err(build_err)?;
    close(writer, name)
}

/// Drop characters outside the XML 1.0 `Char` production (C0 controls other
/// than tab, LF and CR, and U+FFFE / U+FFFF).
fn strip_invalid_chars(text: &str) -> Cow<'_, str> {
    let is_valid = |c: char| {
        matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && !matches!(c, '\u{FFFE}' | '\u{FFFF}'))
    };
    if text.chars().all(is_valid) {
        return Cow::Borrowed(text);
    }
    tracing::warn!(text = %text.escape_debug(), "dropping characters not allowed in XML");
    Cow::Owned(text.chars().filter(|&c| is_valid(c)).collect())
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// One `<url>` entry as found in a rendered sitemap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitemapEntry {
    pub loc: String,
    pub title: String,
    pub publication_date: String,
    pub publication_name: String,
    pub language: String,
}

/// Parse a rendered sitemap back into its entries, in document order.
///
/// Used to inspect cached documents; fails with `NewsmapError::Build` when the
/// document is not well-formed or the root is not `<urlset>`.
pub fn read_entries(xml: &str) -> Result<Vec<SitemapEntry>> {
    let mut reader = Reader::from_str(xml);
    let mut entries = Vec::new();
    let mut current: Option<SitemapEntry> = None;
    let mut text = String::new();
    let mut depth = 0usize;
    let mut saw_root = false;

    loop {
        match reader.read_event().map_err(build_err)? {
            Event::Start(e) => {
                if depth == 0 {
                    if e.name().as_ref() != b"urlset" {
                        return Err(NewsmapError::Build(format!(
                            "unexpected root element <{}>",
                            String::from_utf8_lossy(e.name().as_ref())
                        )));
                    }
                    saw_root = true;
                }
                depth += 1;
                text.clear();
                if e.name().as_ref() == b"url" {
                    current = Some(SitemapEntry::default());
                }
            }
            Event::Empty(e) => {
                if depth == 0 && e.name().as_ref() == b"urlset" {
                    saw_root = true;
                }
            }
            Event::Text(t) => text.push_str(&String::from_utf8_lossy(&t)),
            Event::GeneralRef(r) => {
                let name = String::from_utf8_lossy(&r).into_owned();
                text.push_str(&resolve_entity(&name)?);
            }
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                let value = std::mem::take(&mut text);
                match e.name().as_ref() {
                    b"url" => {
                        if let Some(entry) = current.take() {
                            entries.push(entry);
                        }
                    }
                    name => {
                        if let Some(entry) = current.as_mut() {
                            match name {
                                b"loc" => entry.loc = value,
                                b"news:title" => entry.title = value,
                                b"news:publication_date" => entry.publication_date = value,
                                b"news:name" => entry.publication_name = value,
                                b"news:language" => entry.language = value,
                                _ => {}
                            }
                        }
                    }
                }
            }
            Event::Eof => {
                if depth != 0 {
                    return Err(NewsmapError::Build("unexpected end of document".into()));
                }
                break;
            }
            _ => {}
        }
    }

    if !saw_root {
        return Err(NewsmapError::Build("missing <urlset> root".into()));
    }
    Ok(entries)
}

fn resolve_entity(name: &str) -> Result<String> {
    let resolved = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok()
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok()
            } else {
                None
            };
            return code
                .and_then(char::from_u32)
                .map(String::from)
                .ok_or_else(|| NewsmapError::Build(format!("unknown entity &{name};")));
        }
    };
    Ok(resolved.to_string())
}
