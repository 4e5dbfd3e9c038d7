//! # Collaborators
//!
//! Traits for everything the pipeline talks to outside its own process, with
//! local or in-memory implementations for development and tests.

pub mod alignment;
pub mod errors;
pub mod storage;
pub mod synthesis;
pub mod upload;
pub mod voice;
pub mod webhook;

pub use alignment::{AlignmentService, EstimatedAlignmentService, UnavailableAlignmentService};
pub use errors::{CollaboratorError, CollaboratorResult};
pub use storage::{InMemoryMetadataStore, LocalFileStorage, MetadataStore};
pub use synthesis::{MockSpeechSynthesizer, SpeechSynthesizer, SynthesizedAudio};
pub use upload::{AudioUploader, DisabledUploader, InMemoryUploader, UploadReceipt, UploadRequest};
pub use voice::{LocalVoiceReferenceService, VoiceReferenceService};
pub use webhook::{HttpWebhookNotifier, WebhookDelivery, WebhookNotifier};
