mod common;

use axum::http::{Method, StatusCode};
use common::{line_item_body, Part, TestApp};
use serde_json::json;

async fn item_with_material(app: &TestApp, site: &str, description: &str) -> String {
    let mut body = line_item_body(site, description, 10.0, 100.0);
    body["materials"] = json!([{ "materialId": "m1", "name": "Waterproofing", "unit": "kg" }]);
    let item = app.create_line_item(body).await;
    item["_id"].as_str().unwrap().to_string()
}

fn pdf(name: &'static str, size: usize) -> Part<'static> {
    Part::File {
        field: "files",
        file_name: name,
        content_type: "application/pdf",
        data: vec![b'%'; size],
    }
}

#[tokio::test]
async fn tds_mail_skips_oversized_attachments() {
    let app = TestApp::spawn().await;
    let id = item_with_material(&app, "Villa", "Terrace").await;

    let response = app
        .multipart(
            &format!("/api/line-items/{}/materials/m1/tds-mail", id),
            vec![
                Part::Text("to", "consultant@example.com"),
                Part::Text("cc", "pm@example.com, site@example.com"),
                Part::Text("subject", "TDS - Waterproofing"),
                Part::Text("content", "Please find the data sheets.\nRegards"),
                pdf("small.pdf", 2048),
                pdf("huge.pdf", 1024 * 1024 + 512 * 1024),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["message"], "TDS email sent successfully");
    assert_eq!(response.body["attachmentsSent"], 1);
    assert_eq!(response.body["attachmentsSkipped"], 1);
    assert_eq!(response.body["messageId"], "<mock-1@localhost>");

    let skipped = &response.body["attachments"][1];
    assert_eq!(skipped["name"], "huge.pdf");
    assert_eq!(skipped["sent"], false);
    assert_eq!(skipped["skipReason"], "File size (1.5 MB) exceeds 1 MB limit");
    let kept = skipped["fileUrl"].as_str().unwrap();
    assert!(kept.starts_with("/uploads/tds/"));
    assert!(app
        .uploads
        .path()
        .join(kept.trim_start_matches("/uploads/"))
        .exists());

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].cc, vec!["pm@example.com", "site@example.com"]);
    assert_eq!(sent[0].attachments.len(), 1);
    assert!(sent[0].html.contains("huge.pdf"));

    let item = app.get(&format!("/api/line-items/{}", id)).await;
    let material = &item.body["materials"][0];
    assert_eq!(material["tdsStatus"], "Submitted");
    assert_eq!(material["tdsMailHistory"].as_array().unwrap().len(), 1);
    assert_eq!(material["tdsMailHistory"][0]["subject"], "TDS - Waterproofing");
}

#[tokio::test]
async fn tds_mail_validates_recipients_and_material() {
    let app = TestApp::spawn().await;
    let id = item_with_material(&app, "Villa", "Terrace").await;
    let uri = format!("/api/line-items/{}/materials/m1/tds-mail", id);

    let bad_cc = app
        .multipart(
            &uri,
            vec![
                Part::Text("to", "consultant@example.com"),
                Part::Text("cc", "pm@example.com, not-an-email"),
                Part::Text("subject", "TDS"),
            ],
        )
        .await;
    assert_eq!(bad_cc.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_cc.body["error"], "Invalid CC email address: not-an-email");

    let no_to = app
        .multipart(&uri, vec![Part::Text("subject", "TDS")])
        .await;
    assert_eq!(no_to.status, StatusCode::BAD_REQUEST);

    let unknown_material = app
        .multipart(
            &format!("/api/line-items/{}/materials/zzz/tds-mail", id),
            vec![
                Part::Text("to", "consultant@example.com"),
                Part::Text("subject", "TDS"),
            ],
        )
        .await;
    assert_eq!(unknown_material.status, StatusCode::NOT_FOUND);
    assert_eq!(app.mailer.send_count(), 0);
}

#[tokio::test]
async fn shop_drawings_are_sent_per_site() {
    let app = TestApp::spawn().await;
    let villa_a = item_with_material(&app, "Villa", "Kitchen").await;
    let villa_b = item_with_material(&app, "Villa", "Bath").await;
    let annex = item_with_material(&app, "Annex", "Lobby").await;

    let response = app
        .json(
            Method::POST,
            "/api/shop-drawing/mail",
            json!({
                "lineItemIds": [villa_a, villa_b, annex, villa_a, "unknown-id"],
                "to": "architect@example.com",
                "cc": "pm@example.com",
                "subject": "Shop drawings",
                "content": "For approval"
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["groups"], 2);
    assert_eq!(response.body["sent"], 2);
    assert_eq!(response.body["failed"], 0);
    assert_eq!(response.body["skipped"], 1);
    assert_eq!(response.body["updated"], 3);

    let subjects: Vec<String> = app.mailer.sent().into_iter().map(|m| m.subject).collect();
    assert_eq!(subjects, vec!["Shop drawings - Annex", "Shop drawings - Villa"]);

    let item = app.get(&format!("/api/line-items/{}", villa_b)).await;
    assert_eq!(item.body["shopDrawing"], "Submitted");
    assert_eq!(item.body["shopDrawingMail"]["subject"], "Shop drawings - Villa");
    assert_eq!(item.body["shopDrawingMail"]["cc"], json!(["pm@example.com"]));
}

#[tokio::test]
async fn failed_group_does_not_stop_other_groups() {
    let app = TestApp::spawn().await;
    let villa = item_with_material(&app, "Villa", "Kitchen").await;
    let annex = item_with_material(&app, "Annex", "Lobby").await;
    app.mailer.fail_when_subject_contains("Villa");

    let response = app
        .json(
            Method::POST,
            "/api/shop-drawing/mail",
            json!({
                "lineItemIds": [villa, annex],
                "to": "architect@example.com",
                "cc": [],
                "subject": "Drawings",
                "content": ""
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["sent"], 1);
    assert_eq!(response.body["failed"], 1);
    assert_eq!(response.body["updated"], 1);

    let results = response.body["results"].as_array().unwrap();
    let failed = results.iter().find(|r| r["siteName"] == "Villa").unwrap();
    assert_eq!(failed["success"], false);
    assert!(failed["error"].is_string());

    let villa_item = app.get(&format!("/api/line-items/{}", villa)).await;
    assert!(villa_item.body["shopDrawingMail"].is_null());
    let annex_item = app.get(&format!("/api/line-items/{}", annex)).await;
    assert_eq!(annex_item.body["shopDrawing"], "Submitted");
}

#[tokio::test]
async fn shop_drawing_request_is_validated() {
    let app = TestApp::spawn().await;

    let no_ids = app
        .json(
            Method::POST,
            "/api/shop-drawing/mail",
            json!({ "lineItemIds": [], "to": "a@example.com", "subject": "S" }),
        )
        .await;
    assert_eq!(no_ids.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_ids.body["error"], "lineItemIds are required");

    let bad_cc = app
        .json(
            Method::POST,
            "/api/shop-drawing/mail",
            json!({ "lineItemIds": ["x"], "to": "a@example.com", "cc": ["bad"], "subject": "S" }),
        )
        .await;
    assert_eq!(bad_cc.status, StatusCode::BAD_REQUEST);

    let no_subject = app
        .json(
            Method::POST,
            "/api/shop-drawing/mail",
            json!({ "lineItemIds": ["x"], "to": "a@example.com", "subject": " " }),
        )
        .await;
    assert_eq!(no_subject.body["error"], "Subject is required");
}
