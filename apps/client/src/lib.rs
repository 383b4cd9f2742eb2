//! Client-side orchestration for the job matching service: form state,
//! payload building, submission and visualization loading.

pub mod config;
pub mod errors;
pub mod forms;
pub mod models;
pub mod payload;
pub mod service_client;
pub mod submission;
pub mod visualization;

pub use errors::{ClientError, SubmitError, ValidationError};
pub use forms::{Attachment, AttachmentSet, FieldFormState, FormKind};
pub use payload::{EndpointKind, Payload};
pub use service_client::{MatchingServiceClient, ServiceEndpoints};
pub use submission::{SubmissionClient, SubmissionOutcome};
pub use visualization::{VisualizationLoader, VisualizationViewState};
