pub mod action;
pub mod factory;
pub mod handle;
pub mod manager;
pub mod queue;
pub mod support;
pub mod transaction;
