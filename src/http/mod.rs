//! HTTP types and the API Gateway compatibility shim.

pub mod compat;
mod request;
mod response;

pub use compat::{adapt, finish, ApiGatewayEvent, ApiGatewayResponse};
pub use request::{GatewayRequest, Method};
pub use response::{ResponseError, ResponseWriter, StatusCode};
