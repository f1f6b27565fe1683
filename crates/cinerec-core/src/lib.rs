pub mod api;
pub mod config;
pub mod controller;
pub mod credentials;
pub mod error;
pub mod history;
pub mod logging;
pub mod movie;
pub mod view;

// Re-export main types for convenience
pub use api::{classify, ApiOutcome, Call, HttpTransport, RawResponse, Transport};
pub use config::Config;
pub use controller::{Controller, Reply};
pub use credentials::{auth_header, CredentialStore, Credentials, FileCredentialStore, MemoryCredentialStore};
pub use error::ClientError;
pub use history::{HistoryKind, HistoryRow};
pub use movie::{render_movies, MovieCard, MovieList};
pub use view::{AuthModal, Severity, StatusLine, UiMode, ViewState};
