pub mod rate_limit;
pub mod response_headers;

pub use rate_limit::{client_identity, rate_limit_middleware, Admission};
pub use response_headers::add_response_headers;
