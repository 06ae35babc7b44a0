//! TDS and shop-drawing mail flows: compose, send, then record on the line items.

use chrono::Utc;
use serde::Serialize;
use service_core::error::AppError;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::config::MailConfig;
use crate::models::{ApprovalStatus, AttachmentRecord, LineItem, ShopDrawingMail, TdsMailRecord};
use crate::services::compose::{self, StagedFile};
use crate::services::line_items::LineItemService;
use crate::services::mailer::{MailAttachment, Mailer, OutgoingMail};
use crate::services::metrics;
use crate::services::storage::{self, Storage, UploadedFile};

#[derive(Debug)]
pub struct TdsMailRequest {
    pub to: String,
    pub cc: Option<String>,
    pub subject: String,
    pub content: String,
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TdsMailOutcome {
    pub message_id: Option<String>,
    pub attachments_sent: usize,
    pub attachments_skipped: usize,
    pub attachments: Vec<AttachmentRecord>,
}

#[derive(Debug)]
pub struct ShopDrawingRequest {
    pub line_item_ids: Vec<String>,
    pub to: String,
    pub cc: Vec<String>,
    pub subject: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResult {
    pub site_name: String,
    pub line_item_ids: Vec<String>,
    pub success: bool,
    pub message_id: Option<String>,
    pub updated: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopDrawingOutcome {
    pub groups: usize,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    pub updated: usize,
    pub results: Vec<GroupResult>,
}

#[derive(Clone)]
pub struct MailService {
    line_items: LineItemService,
    storage: Arc<dyn Storage>,
    mailer: Arc<dyn Mailer>,
    limits: MailConfig,
}

impl MailService {
    pub fn new(
        line_items: LineItemService,
        storage: Arc<dyn Storage>,
        mailer: Arc<dyn Mailer>,
        limits: MailConfig,
    ) -> Self {
        Self {
            line_items,
            storage,
            mailer,
            limits,
        }
    }

    pub fn mail_enabled(&self) -> bool {
        self.mailer.is_enabled()
    }

    /// Sends the technical data sheets for one material. Every file is kept
    /// under `tds/`; only those within the size limit are attached.
    pub async fn send_tds(
        &self,
        line_item_id: &str,
        material_id: &str,
        request: TdsMailRequest,
    ) -> Result<TdsMailOutcome, AppError> {
        let to = compose::parse_recipient(&request.to)?;
        let cc = compose::parse_cc(request.cc.as_deref())?;
        let subject = required_subject(&request.subject)?;

        let item = self.line_items.get(line_item_id).await?;
        if !item.materials.iter().any(|m| m.material_id == material_id) {
            return Err(AppError::not_found("Material"));
        }

        let mut staged = Vec::with_capacity(request.files.len());
        for file in &request.files {
            let key = storage::new_key(Some("tds"), &file.file_name);
            self.storage.upload(&key, file.data.clone()).await?;
            staged.push(StagedFile {
                name: file.file_name.clone(),
                size_bytes: file.size(),
                file_url: storage::public_url(&key),
            });
        }

        let attachments = compose::plan_attachments(&staged, &self.limits);
        let html = compose::tds_body(&request.content, &attachments).map_err(render_error)?;
        let mail = OutgoingMail {
            to: to.clone(),
            cc: cc.clone(),
            subject: subject.clone(),
            html,
            attachments: request
                .files
                .into_iter()
                .zip(attachments.iter())
                .filter(|(_, record)| record.sent)
                .map(|(file, _)| MailAttachment {
                    file_name: file.file_name,
                    content_type: file.content_type,
                    data: file.data,
                })
                .collect(),
        };

        let sent = self.mailer.send(&mail).await;
        metrics::record_mail("tds", sent.is_ok());
        let sent = sent.map_err(|e| {
            tracing::error!(line_item_id = %line_item_id, material_id = %material_id, "TDS mail failed: {}", e);
            AppError::from(e)
        })?;

        let attachments_sent = attachments.iter().filter(|a| a.sent).count();
        let outcome = TdsMailOutcome {
            message_id: sent.message_id.clone(),
            attachments_sent,
            attachments_skipped: attachments.len() - attachments_sent,
            attachments: attachments.clone(),
        };

        self.line_items
            .record_tds_mail(
                line_item_id,
                material_id,
                TdsMailRecord {
                    to,
                    cc,
                    subject,
                    message_id: sent.message_id,
                    attachments,
                    sent_at: Utc::now(),
                },
            )
            .await?;

        tracing::info!(
            line_item_id = %line_item_id,
            material_id = %material_id,
            attachments_sent = outcome.attachments_sent,
            attachments_skipped = outcome.attachments_skipped,
            "TDS mail sent"
        );
        Ok(outcome)
    }

    /// One mail per site. A failed group is reported and the remaining
    /// groups are still sent.
    pub async fn send_shop_drawings(
        &self,
        request: ShopDrawingRequest,
    ) -> Result<ShopDrawingOutcome, AppError> {
        let to = compose::parse_recipient(&request.to)?;
        let cc = compose::parse_cc(Some(request.cc.join(",").as_str()))?;
        let subject = required_subject(&request.subject)?;

        let ids: Vec<String> = request
            .line_item_ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if ids.is_empty() {
            return Err(AppError::bad_request("lineItemIds are required"));
        }

        let items = self.line_items.store().find_by_ids(&ids).await?;
        let mut outcome = ShopDrawingOutcome {
            skipped: ids.len().saturating_sub(items.len()),
            ..Default::default()
        };

        let mut groups: BTreeMap<String, Vec<LineItem>> = BTreeMap::new();
        for item in items {
            groups.entry(item.site_name.clone()).or_default().push(item);
        }
        outcome.groups = groups.len();

        for (site_name, site_items) in groups {
            let html = {
                let refs: Vec<&LineItem> = site_items.iter().collect();
                compose::shop_drawing_body(&request.content, &site_name, &refs)
                    .map_err(render_error)?
            };
            let group_subject = compose::shop_drawing_subject(&subject, &site_name);
            let mail = OutgoingMail {
                to: to.clone(),
                cc: cc.clone(),
                subject: group_subject.clone(),
                html,
                attachments: Vec::new(),
            };
            let line_item_ids: Vec<String> = site_items.iter().map(|i| i.id.clone()).collect();

            let sent = self.mailer.send(&mail).await;
            metrics::record_mail("shop_drawing", sent.is_ok());
            let sent = match sent {
                Ok(sent) => sent,
                Err(e) => {
                    tracing::error!(site_name = %site_name, items = line_item_ids.len(), "Shop drawing mail failed: {}", e);
                    outcome.failed += 1;
                    outcome.results.push(GroupResult {
                        site_name,
                        line_item_ids,
                        success: false,
                        message_id: None,
                        updated: 0,
                        error: Some(e.to_string()),
                    });
                    continue;
                }
            };
            outcome.sent += 1;

            let snapshot = ShopDrawingMail {
                to: to.clone(),
                cc: cc.clone(),
                subject: group_subject,
                message_id: sent.message_id.clone(),
                sent_at: Utc::now(),
            };
            let mut updated = 0;
            for mut item in site_items {
                let id = item.id.clone();
                item.shop_drawing_mail = Some(snapshot.clone());
                if matches!(item.shop_drawing, None | Some(ApprovalStatus::Pending)) {
                    item.shop_drawing = Some(ApprovalStatus::Submitted);
                }
                match self.line_items.persist(item).await {
                    Ok(_) => updated += 1,
                    Err(e) => {
                        tracing::error!(line_item_id = %id, "Failed to record shop drawing mail: {}", e)
                    }
                }
            }
            outcome.updated += updated;
            tracing::info!(site_name = %site_name, updated, "Shop drawing mail sent");
            outcome.results.push(GroupResult {
                site_name,
                line_item_ids,
                success: true,
                message_id: sent.message_id,
                updated,
                error: None,
            });
        }

        Ok(outcome)
    }
}

fn render_error(err: askama::Error) -> AppError {
    tracing::error!("Failed to render mail body: {}", err);
    AppError::InternalError(anyhow::anyhow!("Failed to render mail body: {}", err))
}

fn required_subject(subject: &str) -> Result<String, AppError> {
    let subject = subject.trim();
    if subject.is_empty() {
        return Err(AppError::bad_request("Subject is required"));
    }
    Ok(subject.to_string())
}
