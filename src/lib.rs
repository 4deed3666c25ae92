//! news-sitemap - turn a recent RSS/Atom feed into a Google News sitemap.
//!
//! The pipeline is linear: acquire the feed ([`source`]), parse it into a
//! generic tree ([`tree`]), extract candidates ([`feed`]), keep the last 48
//! hours capped at 1000 URLs ([`filter`]) and render the sitemap
//! ([`sitemap`]). [`scrape`] produces the local feed from the news listing
//! page when no upstream feed exists.

pub mod error;
pub mod feed;
pub mod filter;
pub mod output;
pub mod scrape;
pub mod sitemap;
pub mod source;
pub mod tree;

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::info;

pub use error::{Error, Result};
use filter::FeedItem;
use sitemap::Publication;
use source::FeedSource;

/// Default local feed produced by `scrape`.
pub const DEFAULT_INPUT: &str = "rss.xml";
/// Default sitemap location.
pub const DEFAULT_OUTPUT: &str = "news-sitemap.xml";

/// Parse a feed document and keep the items eligible at `now`.
pub fn recent_items(feed_xml: &str, now: DateTime<Utc>) -> Result<Vec<FeedItem>> {
    let tree = tree::parse(feed_xml)?;
    let candidates = feed::extract_candidates(&tree);
    info!("feed has {} candidate items", candidates.len());
    Ok(filter::select_recent(candidates, now))
}

/// Run the whole pipeline and write the sitemap. Returns the URL count.
///
/// The output file is only touched once every earlier stage succeeded.
pub fn generate(source: &FeedSource, output: &Path, publication: &Publication) -> Result<usize> {
    let feed_xml = source.read()?;
    let items = recent_items(&feed_xml, Utc::now())?;
    let xml = sitemap::render(&items, publication)?;
    output::write_atomic(output, &xml)?;
    info!("wrote {} URLs to {}", items.len(), output.display());
    Ok(items.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::fs;

    fn rss_feed(items: &[(&str, &str, DateTime<Utc>)]) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\"><channel><title>t</title>");
        for (title, link, date) in items {
            xml.push_str(&format!(
                "<item><title>{}</title><link>{}</link><pubDate>{}</pubDate></item>",
                title,
                link,
                date.to_rfc2822()
            ));
        }
        xml.push_str("</channel></rss>");
        xml
    }

    #[test]
    fn test_sample_scenario() {
        let now = Utc::now();
        let feed = rss_feed(&[
            ("Jogo terminou 3-2", "https://example.com/a", now - Duration::hours(2)),
            ("Antigo", "https://example.com/b", now - Duration::hours(72)),
        ]);

        let items = recent_items(&feed, now).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Jogo terminou 3-2");
        assert_eq!(items[0].url, "https://example.com/a");
        assert!(now - items[0].date <= Duration::hours(2) + Duration::seconds(1));
    }

    #[test]
    fn test_entity_titles_are_escaped_once() {
        let now = Utc::now();
        let feed = rss_feed(&[("Tom &amp; Jerry&nbsp;hoje", "https://example.com/t?a=1&amp;b=2", now)]);

        let items = recent_items(&feed, now).unwrap();
        assert_eq!(items[0].title, "Tom & Jerry\u{a0}hoje");
        assert_eq!(items[0].url, "https://example.com/t?a=1&b=2");

        let xml = String::from_utf8(sitemap::render(&items, &Publication::default()).unwrap()).unwrap();
        assert!(xml.contains("<news:title>Tom &amp; Jerry\u{a0}hoje</news:title>"));
        assert!(xml.contains("<loc>https://example.com/t?a=1&amp;b=2</loc>"));
        assert!(!xml.contains("&amp;amp;"));
    }

    #[test]
    fn test_generate_from_local_feed() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join(DEFAULT_INPUT);
        let output = dir.path().join(DEFAULT_OUTPUT);
        let now = Utc::now();
        fs::write(
            &input,
            rss_feed(&[
                ("Um", "https://example.com/1", now - Duration::hours(1)),
                ("Dois", "https://example.com/2", now - Duration::hours(3)),
            ]),
        )
        .unwrap();

        let count = generate(&FeedSource::local(&input), &output, &Publication::default()).unwrap();

        assert_eq!(count, 2);
        let xml = fs::read_to_string(&output).unwrap();
        assert_eq!(xml.matches("<url>").count(), 2);
        assert!(xml.find("https://example.com/1").unwrap() < xml.find("https://example.com/2").unwrap());
    }

    #[test]
    fn test_all_stale_yields_empty_urlset() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join(DEFAULT_INPUT);
        let output = dir.path().join(DEFAULT_OUTPUT);
        fs::write(
            &input,
            rss_feed(&[("Velho", "https://example.com/old", Utc::now() - Duration::days(5))]),
        )
        .unwrap();

        let count = generate(&FeedSource::local(&input), &output, &Publication::default()).unwrap();

        assert_eq!(count, 0);
        let xml = fs::read_to_string(&output).unwrap();
        assert!(xml.contains("<urlset"));
        assert!(xml.contains("</urlset>"));
        assert!(!xml.contains("<url>"));
    }

    #[test]
    fn test_missing_input_leaves_output_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join(DEFAULT_OUTPUT);
        fs::write(&output, "previous").unwrap();

        let err = generate(
            &FeedSource::local(dir.path().join(DEFAULT_INPUT)),
            &output,
            &Publication::default(),
        )
        .unwrap_err();

        assert!(matches!(err, Error::MissingInput { .. }));
        assert_eq!(fs::read_to_string(&output).unwrap(), "previous");
    }

    #[test]
    fn test_malformed_feed_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join(DEFAULT_INPUT);
        let output = dir.path().join(DEFAULT_OUTPUT);
        fs::write(&input, "<rss><channel><item></channel></rss>").unwrap();

        let err = generate(&FeedSource::local(&input), &output, &Publication::default()).unwrap_err();

        assert!(matches!(err, Error::Parse(_)));
        assert!(!output.exists());
    }

    #[test]
    fn test_scraped_feed_feeds_sitemap() {
        let now = Utc::now();
        let articles = vec![scrape::ScrapedArticle {
            title: "Bolsa & juros".into(),
            link: "https://www.asclub.pt/noticias/bolsa".into(),
            description: "Bolsa & juros".into(),
            published: now - Duration::hours(5),
        }];
        let rss = String::from_utf8(scrape::render_rss(&articles, now).unwrap()).unwrap();

        let items = recent_items(&rss, now).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Bolsa & juros");
        assert_eq!(items[0].url, "https://www.asclub.pt/noticias/bolsa");
        assert_eq!(items[0].date.timestamp(), articles[0].published.timestamp());
    }
}
