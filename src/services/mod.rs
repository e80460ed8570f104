pub mod chat;
pub mod location;
pub mod metrics;
pub mod pipeline;
pub mod weatherapi;
