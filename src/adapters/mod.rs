// Adapters layer: concrete implementations backed by external tools.

pub mod command;
pub mod lftp;
pub mod rsync;
pub mod ssh;
