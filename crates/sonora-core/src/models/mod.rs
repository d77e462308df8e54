pub mod payload;
pub mod policy;
pub mod upload;

pub use payload::{FileInfo, FilePayload};
pub use policy::AcceptancePolicy;
pub use upload::{UploadId, UploadOutcome, UploadPhase};
