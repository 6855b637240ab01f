pub mod control;
pub mod cycle;
pub mod follow;
pub mod gate;
pub mod scheduler;
pub mod store;
