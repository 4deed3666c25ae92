//! News sitemap rendering.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9" xmlns:news="http://www.google.com/schemas/sitemap-news/0.9">
//!   <url>
//!     <loc>https://example.com/a</loc>
//!     <news:news>
//!       <news:publication>
//!         <news:name>AS CLUB</news:name>
//!         <news:language>pt</news:language>
//!       </news:publication>
//!       <news:publication_date>2024-05-10T10:00:00.000Z</news:publication_date>
//!       <news:title>Jogo terminou 3-2</news:title>
//!     </news:news>
//!   </url>
//! </urlset>
//! ```

use std::io::Write;

use chrono::SecondsFormat;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::Result;
use crate::filter::FeedItem;

pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
pub const NEWS_NS: &str = "http://www.google.com/schemas/sitemap-news/0.9";

pub const DEFAULT_PUBLICATION_NAME: &str = "AS CLUB";
pub const DEFAULT_LANGUAGE: &str = "pt";

/// Publication metadata repeated in every `news:publication` block.
#[derive(Debug, Clone)]
pub struct Publication {
    pub name: String,
    pub language: String,
}

impl Default for Publication {
    fn default() -> Self {
        Self {
            name: DEFAULT_PUBLICATION_NAME.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// Write `<name>text</name>`. The text is escaped by quick-xml in a single
/// pass over `& < > " '`.
pub(crate) fn write_text_element<W: Write>(w: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(&sanitize_text(text))))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Strip characters XML 1.0 does not allow: C0 controls except tab, LF, CR.
pub(crate) fn sanitize_text(input: &str) -> String {
    input
        .chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || c >= '\u{20}')
        .collect()
}

/// ISO-8601 UTC instant with millisecond precision, e.g. `2024-05-10T10:00:00.000Z`.
pub fn format_publication_date(item: &FeedItem) -> String {
    item.date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Render the complete sitemap document as UTF-8 bytes.
pub fn render(items: &[FeedItem], publication: &Publication) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut urlset = BytesStart::new("urlset");
    urlset.push_attribute(("xmlns", SITEMAP_NS));
    urlset.push_attribute(("xmlns:news", NEWS_NS));
    writer.write_event(Event::Start(urlset))?;

    for item in items {
        writer.write_event(Event::Start(BytesStart::new("url")))?;
        write_text_element(&mut writer, "loc", &item.url)?;

        writer.write_event(Event::Start(BytesStart::new("news:news")))?;
        writer.write_event(Event::Start(BytesStart::new("news:publication")))?;
        write_text_element(&mut writer, "news:name", &publication.name)?;
        write_text_element(&mut writer, "news:language", &publication.language)?;
        writer.write_event(Event::End(BytesEnd::new("news:publication")))?;
        write_text_element(&mut writer, "news:publication_date", &format_publication_date(item))?;
        write_text_element(&mut writer, "news:title", &item.title)?;
        writer.write_event(Event::End(BytesEnd::new("news:news")))?;

        writer.write_event(Event::End(BytesEnd::new("url")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("urlset")))?;

    let mut out = writer.into_inner();
    out.push(b'\n');
    Ok(out)
}
