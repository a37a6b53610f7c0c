pub mod calendar;
pub mod gemini;
pub mod gmail;
pub mod google_auth;
pub mod groq;
pub mod http;
pub mod trello;

pub use calendar::CalendarClient;
pub use gemini::GeminiClient;
pub use gmail::GmailClient;
pub use google_auth::{
    AuthorizationRequest, ClientSecrets, CredentialState, GoogleAuthManager, StoredCredential,
    TokenCache, GOOGLE_SCOPES,
};
pub use groq::{GroqClient, SseAccumulator};
pub use http::build_client;
pub use trello::TrelloClient;
