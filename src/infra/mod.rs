pub mod app;
pub mod billing_event_worker;
pub mod config;
pub mod db;
pub mod dummy_gateway;
pub mod expiry_sweep;
pub mod razorpay_gateway;
pub mod setup;
