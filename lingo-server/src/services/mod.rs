//! Services behind the HTTP handlers

pub mod openai_client;
pub mod phrase_generation;
pub mod stats;
pub mod tutor;

pub use openai_client::OpenAiClient;
pub use tutor::TutorService;
