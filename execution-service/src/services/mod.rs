pub mod compose;
pub mod database;
pub mod derived;
pub mod import;
pub mod line_items;
pub mod mail;
pub mod mailer;
pub mod materials;
pub mod memory;
pub mod metrics;
pub mod reporting;
pub mod storage;
pub mod store;
pub mod tracker;

pub use database::MongoDb;
pub use line_items::{LineItemService, PhotoLimits};
pub use mail::MailService;
pub use mailer::{Mailer, MockMailer, SmtpMailer};
pub use materials::MaterialService;
pub use memory::InMemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use storage::{LocalStorage, Storage};
pub use store::{LineItemStore, MaterialStore};
