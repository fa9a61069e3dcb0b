pub mod authorization;
pub mod intent;
pub mod memory;
pub mod session;
pub mod turn;
