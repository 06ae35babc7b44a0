//! HTML bodies, recipient parsing and attachment size policy for outbound mail.

use askama::Template;
use regex::Regex;
use service_core::error::AppError;
use std::sync::OnceLock;

use crate::config::MailConfig;
use crate::models::{AttachmentRecord, LineItem};
use crate::services::derived::round2;

const EMAIL_PATTERN: &str = r"^[^\s@,;<>]+@[^\s@,;<>]+\.[^\s@,;<>]+$";
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();

pub fn is_valid_email(address: &str) -> bool {
    EMAIL_RE
        .get_or_init(|| Regex::new(EMAIL_PATTERN).ok())
        .as_ref()
        .map_or(false, |re| re.is_match(address))
}

pub fn parse_recipient(raw: &str) -> Result<String, AppError> {
    let address = raw.trim();
    if address.is_empty() {
        return Err(AppError::bad_request("Recipient email is required"));
    }
    if !is_valid_email(address) {
        return Err(AppError::bad_request(format!(
            "Invalid recipient email address: {}",
            address
        )));
    }
    Ok(address.to_string())
}

/// Splits a comma separated CC list. Blank entries are dropped; any
/// malformed address rejects the whole list.
pub fn parse_cc(raw: Option<&str>) -> Result<Vec<String>, AppError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    let mut cc = Vec::new();
    for part in raw.split(',') {
        let address = part.trim();
        if address.is_empty() {
            continue;
        }
        if !is_valid_email(address) {
            return Err(AppError::bad_request(format!(
                "Invalid CC email address: {}",
                address
            )));
        }
        cc.push(address.to_string());
    }
    Ok(cc)
}

pub fn size_mb(bytes: u64) -> f64 {
    round2(bytes as f64 / BYTES_PER_MB)
}

/// An uploaded file as the attachment policy sees it.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub name: String,
    pub size_bytes: u64,
    pub file_url: String,
}

/// Marks each file as sent or skipped against the configured size limit.
pub fn plan_attachments(files: &[StagedFile], limits: &MailConfig) -> Vec<AttachmentRecord> {
    let limit = limits.max_attachment_bytes();
    let max_mb = limits.max_attachment_mb;
    files
        .iter()
        .map(|file| {
            let mb = size_mb(file.size_bytes);
            let fits = file.size_bytes <= limit;
            AttachmentRecord {
                name: file.name.clone(),
                size_mb: mb,
                sent: fits,
                skip_reason: (!fits)
                    .then(|| format!("File size ({} MB) exceeds {} MB limit", mb, max_mb)),
                file_url: file.file_url.clone(),
            }
        })
        .collect()
}

#[derive(Template)]
#[template(path = "mail/tds.html")]
struct TdsTemplate<'a> {
    content: String,
    skipped: Vec<&'a AttachmentRecord>,
}

/// Body of a TDS mail. Files that were not attached are listed by name.
pub fn tds_body(content: &str, attachments: &[AttachmentRecord]) -> askama::Result<String> {
    TdsTemplate {
        content: plain_text(content),
        skipped: attachments.iter().filter(|a| !a.sent).collect(),
    }
    .render()
}

pub fn shop_drawing_subject(subject: &str, site_name: &str) -> String {
    format!("{} - {}", subject.trim(), site_name)
}

struct DrawingRow<'a> {
    sno: &'a str,
    category: &'a str,
    description: &'a str,
    quantity: f64,
    units: &'a str,
    status: &'static str,
}

#[derive(Template)]
#[template(path = "mail/shop_drawing.html")]
struct ShopDrawingTemplate<'a> {
    content: String,
    site_name: &'a str,
    rows: Vec<DrawingRow<'a>>,
}

pub fn shop_drawing_body(
    content: &str,
    site_name: &str,
    items: &[&LineItem],
) -> askama::Result<String> {
    ShopDrawingTemplate {
        content: plain_text(content),
        site_name,
        rows: items
            .iter()
            .map(|item| DrawingRow {
                sno: &item.sno,
                category: &item.category,
                description: &item.item_description,
                quantity: item.quantity,
                units: &item.units,
                status: item.shop_drawing.map_or("-", |s| s.as_str()),
            })
            .collect(),
    }
    .render()
}

fn plain_text(content: &str) -> String {
    content.replace("\r\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApprovalStatus, NewLineItem};

    #[test]
    fn cc_list_is_split_and_validated() {
        let cc = parse_cc(Some(" a@x.com, ,b@y.org ")).unwrap();
        assert_eq!(cc, vec!["a@x.com", "b@y.org"]);
        assert!(parse_cc(None).unwrap().is_empty());

        let err = parse_cc(Some("a@x.com, nope")).unwrap_err();
        assert!(err.to_string().contains("nope"));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn recipient_is_required() {
        assert!(parse_recipient("  ").is_err());
        assert!(parse_recipient("vendor@").is_err());
        assert_eq!(parse_recipient(" vendor@acme.in ").unwrap(), "vendor@acme.in");
    }

    #[test]
    fn oversized_files_are_skipped_with_reason() {
        let files = vec![
            StagedFile {
                name: "small.pdf".into(),
                size_bytes: 1024 * 1024,
                file_url: "/uploads/tds/a.pdf".into(),
            },
            StagedFile {
                name: "huge.pdf".into(),
                size_bytes: 30 * 1024 * 1024,
                file_url: "/uploads/tds/b.pdf".into(),
            },
        ];
        let plan = plan_attachments(&files, &MailConfig { max_attachment_mb: 25 });
        assert!(plan[0].sent);
        assert_eq!(plan[0].size_mb, 1.0);
        assert!(plan[0].skip_reason.is_none());
        assert!(!plan[1].sent);
        assert_eq!(
            plan[1].skip_reason.as_deref(),
            Some("File size (30 MB) exceeds 25 MB limit")
        );
    }

    #[test]
    fn tds_body_escapes_content_and_lists_skipped_files() {
        let records = plan_attachments(
            &[StagedFile {
                name: "drawings<1>.dwg".into(),
                size_bytes: 26 * 1024 * 1024,
                file_url: "/uploads/tds/c.dwg".into(),
            }],
            &MailConfig { max_attachment_mb: 25 },
        );
        let html = tds_body("Dear team,\r\nPlease <review>", &records).unwrap();
        assert!(html.contains("Dear team,<br/>Please &lt;review&gt;"), "{}", html);
        assert!(html.contains("1 file(s) were too large"));
        assert!(html.contains("<li>drawings&lt;1&gt;.dwg (26 MB)</li>"), "{}", html);
        assert!(html.contains("automated email from the Materials Tracking System"));

        let clean = tds_body("All attached", &[]).unwrap();
        assert!(!clean.contains("too large"));
    }

    #[test]
    fn shop_drawing_body_lists_items() {
        let mut item = LineItem::new(NewLineItem {
            site_name: "Villa".into(),
            sno: "4".into(),
            category: "Joinery".into(),
            item_description: "Teak door <main>".into(),
            quantity: 3.0,
            units: "nos".into(),
            rate: 1.0,
            ..Default::default()
        });
        let html = shop_drawing_body("Please approve", "Villa & Co", &[&item]).unwrap();
        assert!(html.contains("<h3>Site: Villa &amp; Co</h3>"), "{}", html);
        assert!(html.contains("<td>Teak door &lt;main&gt;</td>"), "{}", html);
        assert!(html.contains("<td>3 nos</td>"));
        assert!(html.contains("<td>-</td>"));

        item.shop_drawing = Some(ApprovalStatus::Submitted);
        let html = shop_drawing_body("Please approve", "Villa", &[&item]).unwrap();
        assert!(html.contains("<td>Submitted</td>"), "{}", html);
        assert_eq!(shop_drawing_subject(" Drawings ", "Villa"), "Drawings - Villa");
    }
}
