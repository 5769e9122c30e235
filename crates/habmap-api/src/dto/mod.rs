mod request;
mod response;

pub use request::LayerQuery;
pub use response::{DocumentResponse, HealthResponse, LayerListResponse, VectorHealth};
