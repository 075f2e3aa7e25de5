pub mod app_error;
pub mod clock;
pub mod isolation;
pub mod jwt;
pub mod ports;
pub mod tenant_context;
pub mod use_cases;
