pub mod http_client;
pub mod protocol;

pub use http_client::{HttpClient, HttpClientConfig};
pub use protocol::{ApiRequest, ApiResponse, ApplyIncrementsRequest, PROTOCOL_VERSION};
