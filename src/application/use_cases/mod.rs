pub mod billing;
pub mod gateway_factory;
pub mod plans;
pub mod subscription;
