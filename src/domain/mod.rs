// Domain types and the ports the core talks to. Concrete implementations live in `adapters`.

pub mod model;
pub mod ports;
