pub mod pebble;
pub mod pinetime;
pub mod test;
