pub mod api;
pub mod poller;
pub mod resilient;
pub mod transport;

pub use api::ApiClient;
pub use poller::{JobPoller, PollOptions, PollSession, PollState};
pub use resilient::{Backoff, RequestKey, RequestOptions, ResilientClient};
pub use transport::HttpTransport;
