//! Application services.

mod admission;

pub use admission::{AdmittedUpload, UploadAdmissionService};
