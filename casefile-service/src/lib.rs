pub mod attachment;
pub mod dao;

pub use attachment::{AttachmentService, GridFsAttachmentService, TransientFile};
pub use dao::{EntityDao, SimpleEntityDao};
