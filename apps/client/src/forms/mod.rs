// Form state containers: typed text fields per form kind plus the job-seeker
// attachment slots. Mutated on every edit, validated once at submit time.

pub mod attachments;
pub mod fields;

pub use attachments::{Attachment, AttachmentSet};
pub use fields::{FieldFormState, FieldSpec, FormKind};
