//! Route handlers, one module per API area.

pub mod game;
pub mod util;
