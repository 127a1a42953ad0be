pub mod credentials;
pub mod http;
pub mod traits;

pub use credentials::TokenGate;
pub use http::HttpSubmitter;
pub use traits::{AuthGate, BoxError, StaticGate, SubmissionReceipt, Submitter};
