//! Shared test doubles: in-memory repositories, gateway/notifier mocks,
//! factories, a fixed clock and an HTTP-level app harness.

pub mod clock;
pub mod factories;
pub mod gateway_mocks;
pub mod http;
pub mod mocks;
