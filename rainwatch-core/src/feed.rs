//! Atom rendering of the latest result.

use chrono::{DateTime, SecondsFormat, Utc};

/// Static parts of the published feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMeta {
    pub title: String,
    pub spot_name: String,
    pub uri: String,
}

/// Renders a single-entry Atom document whose summary is `text`.
pub fn render_feed(meta: &FeedMeta, now: DateTime<Utc>, text: &str) -> String {
    let updated = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    let title = escape(&meta.title);
    let spot = escape(&meta.spot_name);
    let uri = escape(&meta.uri);
    let text = escape(text);

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>{title}</title>
  <id>{uri}</id>
  <link rel="self" href="{uri}"/>
  <updated>{updated}</updated>
  <author><name>{uri}</name></author>
  <entry>
    <title>{spot}</title>
    <id>{uri}</id>
    <link rel="self" href="{uri}"/>
    <updated>{updated}</updated>
    <summary type="text">{text}</summary>
  </entry>
</feed>
"#
    )
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta() -> FeedMeta {
        FeedMeta {
            title: "Rain watch (updated 10:00 - 22:00)".into(),
            spot_name: "Shinjuku".into(),
            uri: "https://example.com/weather?a=1&b=2".into(),
        }
    }

    #[test]
    fn renders_entry_with_summary() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 3, 4, 5).unwrap();
        let xml = render_feed(&meta(), now, "currently weak rain falling");

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<summary type=\"text\">currently weak rain falling</summary>"));
        assert!(xml.contains("<updated>2026-06-01T03:04:05Z</updated>"));
        assert!(xml.contains("<title>Shinjuku</title>"));
    }

    #[test]
    fn escapes_markup() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let xml = render_feed(&meta(), now, "<b>rain</b> & \"wind\"");

        assert!(xml.contains("href=\"https://example.com/weather?a=1&amp;b=2\""));
        assert!(xml.contains("&lt;b&gt;rain&lt;/b&gt; &amp; &quot;wind&quot;"));
        assert!(!xml.contains("<b>"));
    }
}
