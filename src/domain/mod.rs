pub mod command;
pub mod device;
pub mod settings;
pub mod specs;
pub mod state;
