//! Core runtime components of the bridge:
//!
//! - line decoding (`decoder`)
//! - the thermistor model (`thermistor`)
//! - the wire payload (`message`)
//! - the serial line source (`serial`)
//! - the orchestrating loop (`bridge`)

pub mod bridge;
pub mod decoder;
pub mod message;
pub mod serial;
pub mod thermistor;
