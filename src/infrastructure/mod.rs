pub mod bluetooth;
pub mod logging;
pub mod loopback;
pub mod socket;
pub mod transport;
