use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::mail::{ShopDrawingRequest, TdsMailOutcome};

/// CC arrives either as a comma separated string or as a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CcField {
    List(Vec<String>),
    Text(String),
}

impl CcField {
    fn into_list(self) -> Vec<String> {
        match self {
            CcField::List(list) => list,
            CcField::Text(text) => vec![text],
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShopDrawingMailRequest {
    #[serde(default)]
    pub line_item_ids: Vec<String>,
    #[serde(default)]
    pub to: String,
    pub cc: Option<CcField>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub content: String,
}

impl From<ShopDrawingMailRequest> for ShopDrawingRequest {
    fn from(req: ShopDrawingMailRequest) -> Self {
        ShopDrawingRequest {
            line_item_ids: req.line_item_ids,
            to: req.to,
            cc: req.cc.map(CcField::into_list).unwrap_or_default(),
            subject: req.subject,
            content: req.content,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TdsMailResponse {
    pub message: String,
    #[serde(flatten)]
    pub outcome: TdsMailOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cc_accepts_string_or_list() {
        let from_text: ShopDrawingMailRequest = serde_json::from_value(json!({
            "lineItemIds": ["a"], "to": "pm@example.com", "cc": "a@x.com, b@x.com",
            "subject": "Drawings", "content": "Please review"
        }))
        .unwrap();
        assert_eq!(ShopDrawingRequest::from(from_text).cc, vec!["a@x.com, b@x.com"]);

        let from_list: ShopDrawingMailRequest = serde_json::from_value(json!({
            "lineItemIds": ["a"], "to": "pm@example.com", "cc": ["a@x.com", "b@x.com"],
            "subject": "Drawings", "content": ""
        }))
        .unwrap();
        assert_eq!(ShopDrawingRequest::from(from_list).cc.len(), 2);
    }
}
