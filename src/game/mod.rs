//! Game state: the per-user document, the client-side state machine that
//! mutates it, and the validated sync payload that carries it to the store.

pub mod curriculum;
pub mod patch;
pub mod session;
pub mod state;
