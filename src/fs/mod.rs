pub mod locking;

pub use locking::RunLock;
