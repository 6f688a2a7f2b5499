pub mod attachment;
pub mod case;

pub use attachment::{attachment_url, format_upload_date, Attachment};
pub use case::GenericCase;
