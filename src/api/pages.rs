//! HTML rendering for the landing and admin pages

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Write;

use crate::models::{NewVisit, Visit};

const LANDING_STYLE: &str = r#"
        body { font-family: Arial, sans-serif; margin: 40px; }
        .info { background: #f0f8ff; padding: 20px; border-radius: 8px; }
        .ip { font-size: 24px; font-weight: bold; color: #0066cc; }
"#;

const ADMIN_STYLE: &str = r#"
        body { font-family: Arial, sans-serif; margin: 20px; }
        table { border-collapse: collapse; width: 100%; }
        th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
        th { background-color: #f2f2f2; }
        .count { background: #e8f5e8; padding: 10px; border-radius: 4px; }
"#;

/// Escape text for use in HTML element content and quoted attributes
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn landing(visit: &NewVisit) -> String {
    let mut optional = String::new();
    if let Some(referer) = &visit.referer {
        let _ = write!(
            optional,
            "\n        <p><strong>Referer:</strong> {}</p>",
            escape(referer)
        );
    }
    if let Some(host) = &visit.remote_host {
        let _ = write!(
            optional,
            "\n        <p><strong>Hostname:</strong> {}</p>",
            escape(host)
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>IP Detection Service</title>
    <meta charset="utf-8">
    <style>{style}</style>
</head>
<body>
    <div class="info">
        <h2>IP Detection Service</h2>
        <p class="ip">Your IP: {ip}</p>
        <p><strong>Timestamp:</strong> {ts}</p>
        <p><strong>User Agent:</strong> {ua}</p>{optional}
    </div>
    <p><a href="/raw">View Raw Data</a></p>
</body>
</html>
"#,
        style = LANDING_STYLE,
        ip = escape(visit.ip.as_deref().unwrap_or("Unknown")),
        ts = timestamp(&visit.ts),
        ua = escape(visit.user_agent.as_deref().unwrap_or("Unknown")),
        optional = optional,
    )
}

pub fn admin(visits: &[Visit]) -> String {
    let mut rows = String::new();
    for visit in visits {
        let cells = [
            Some(timestamp(&visit.ts)),
            visit.ip.clone(),
            visit.x_forwarded_for.clone(),
            visit.user_agent.clone(),
            visit.referer.clone(),
            visit.remote_host.clone(),
        ];

        rows.push_str("\n            <tr>");
        for cell in cells {
            let _ = write!(rows, "<td>{}</td>", escape(cell.as_deref().unwrap_or("")));
        }
        rows.push_str("</tr>");
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Admin - Recent Visits</title>
    <meta charset="utf-8">
    <style>{style}</style>
</head>
<body>
    <h2>Recent Visits</h2>
    <div class="count">Total visits: {total}</div>
    <br>
    <table>
        <thead>
            <tr><th>Timestamp</th><th>IP</th><th>X-Forwarded-For</th><th>User Agent</th><th>Referer</th><th>Hostname</th></tr>
        </thead>
        <tbody>{rows}
        </tbody>
    </table>
</body>
</html>
"#,
        style = ADMIN_STYLE,
        total = visits.len(),
        rows = rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#x27;y&#x27;&lt;/script&gt;"
        );
        assert_eq!(escape("plain text"), "plain text");
    }

    #[test]
    fn test_landing_escapes_visitor_values() {
        let visit = NewVisit {
            ts: Utc::now(),
            ip: Some("203.0.113.1".to_string()),
            x_forwarded_for: None,
            headers: BTreeMap::new(),
            user_agent: Some("<img src=x onerror=alert(1)>".to_string()),
            referer: None,
            remote_host: Some("host.example.net".to_string()),
        };

        let html = landing(&visit);
        assert!(html.contains("Your IP: 203.0.113.1"));
        assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;"));
        assert!(!html.contains("<img"));
        assert!(html.contains("<strong>Hostname:</strong> host.example.net"));
        assert!(!html.contains("Referer:"));
    }

    #[test]
    fn test_landing_unknown_ip() {
        let visit = NewVisit {
            ts: Utc::now(),
            ip: None,
            x_forwarded_for: None,
            headers: BTreeMap::new(),
            user_agent: None,
            referer: None,
            remote_host: None,
        };

        let html = landing(&visit);
        assert!(html.contains("Your IP: Unknown"));
        assert!(html.contains("<strong>User Agent:</strong> Unknown"));
    }

    #[test]
    fn test_admin_table() {
        let visits = vec![Visit {
            id: 1,
            ts: Utc::now(),
            ip: Some("198.51.100.2".to_string()),
            x_forwarded_for: Some("198.51.100.2, 10.0.0.1".to_string()),
            headers: None,
            user_agent: Some("Mozilla/5.0".to_string()),
            referer: Some("https://a.example/?q=<b>".to_string()),
            remote_host: None,
        }];

        let html = admin(&visits);
        assert!(html.contains("Total visits: 1"));
        assert!(html.contains("<td>198.51.100.2</td>"));
        assert!(html.contains("<td>https://a.example/?q=&lt;b&gt;</td>"));
        assert_eq!(html.matches("<tr>").count(), 2);
    }
}
