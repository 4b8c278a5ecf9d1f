//! Application lifecycle: startup wiring, server mode, shutdown draining

pub mod lifetime;
pub mod modes;
