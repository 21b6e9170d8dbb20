//! `sitemap.xml` generation.
//!
//! | url                          | priority | changefreq |
//! |------------------------------|----------|------------|
//! | site root                    | 1.0      | weekly     |
//! | docs root (`base_path`)      | 0.9      | weekly     |
//! | version index                | 0.8      | weekly     |
//! | document                     | 0.7      | monthly    |

use std::io;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::manifest::Manifest;
use crate::slug::slug_path;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

struct UrlEntry {
    loc: String,
    changefreq: &'static str,
    priority: &'static str,
}

/// Render the sitemap for every version and document in `manifest`.
pub fn render_sitemap(site_url: &str, base_path: &str, manifest: &Manifest) -> io::Result<String> {
    let site_url = site_url.trim_end_matches('/');
    let docs_root = format!("{site_url}{base_path}");

    let mut entries = vec![
        UrlEntry {
            loc: format!("{site_url}/"),
            changefreq: "weekly",
            priority: "1.0",
        },
        UrlEntry {
            loc: docs_root.clone(),
            changefreq: "weekly",
            priority: "0.9",
        },
    ];

    for version in &manifest.versions {
        entries.push(UrlEntry {
            loc: format!("{docs_root}/{version}"),
            changefreq: "weekly",
            priority: "0.8",
        });
        let prefix = format!("{version}/");
        for doc in manifest
            .docs
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(_, doc)| doc)
        {
            entries.push(UrlEntry {
                loc: format!("{docs_root}/{version}/{}", slug_path(&doc.slug)),
                changefreq: "monthly",
                priority: "0.7",
            });
        }
    }

    let lastmod = manifest.generated_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(
        BytesStart::new("urlset").with_attributes([("xmlns", SITEMAP_NS)]),
    ))?;

    for entry in &entries {
        writer.write_event(Event::Start(BytesStart::new("url")))?;
        write_text(&mut writer, "loc", &entry.loc)?;
        write_text(&mut writer, "lastmod", &lastmod)?;
        write_text(&mut writer, "changefreq", entry.changefreq)?;
        write_text(&mut writer, "priority", entry.priority)?;
        writer.write_event(Event::End(BytesEnd::new("url")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("urlset")))?;
    String::from_utf8(writer.into_inner()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn write_text(writer: &mut Writer<Vec<u8>>, tag: &str, text: &str) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocMeta;

    fn doc(slug: &[&str]) -> DocMeta {
        DocMeta {
            slug: slug.iter().map(|&s| s.to_owned()).collect(),
            source_path: String::new(),
            title: String::new(),
            description: None,
            order: None,
            keywords: Vec::new(),
            headings: Vec::new(),
            landing: false,
            clickable: true,
        }
    }

    #[test]
    fn test_sitemap_urls_and_priorities() {
        let mut manifest = Manifest {
            versions: vec!["v1".to_owned()],
            ..Manifest::default()
        };
        manifest
            .docs
            .insert("v1/guides/setup".to_owned(), doc(&["guides", "setup"]));
        manifest.docs.insert("v10/other".to_owned(), doc(&["other"]));

        let xml = render_sitemap("https://example.com/", "/docs", &manifest).unwrap();

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#));
        assert!(xml.contains("<loc>https://example.com/</loc>"));
        assert!(xml.contains("<loc>https://example.com/docs</loc>"));
        assert!(xml.contains("<loc>https://example.com/docs/v1</loc>"));
        assert!(xml.contains("<loc>https://example.com/docs/v1/guides/setup</loc>"));
        assert!(!xml.contains("v10/other"));
        assert_eq!(xml.matches("<url>").count(), 4);
        assert_eq!(xml.matches("<priority>0.7</priority>").count(), 1);
        assert_eq!(xml.matches("<changefreq>monthly</changefreq>").count(), 1);
        assert!(xml.contains("<lastmod>1970-01-01T00:00:00Z</lastmod>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let mut manifest = Manifest {
            versions: vec!["v1".to_owned()],
            ..Manifest::default()
        };
        manifest.docs.insert("v1/a&b".to_owned(), doc(&["a&b"]));

        let xml = render_sitemap("https://example.com", "/docs", &manifest).unwrap();

        assert!(xml.contains("<loc>https://example.com/docs/v1/a&amp;b</loc>"));
    }
}
