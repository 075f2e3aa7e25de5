pub mod billing_event;
pub mod invoice;
pub mod payment;
pub mod subscription;
pub mod subscription_plan;
pub mod tenant;
