pub mod subscription;
pub mod subscription_plan;
pub mod user;
