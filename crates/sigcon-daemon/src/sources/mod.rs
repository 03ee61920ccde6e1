pub mod spool;

pub use spool::SpoolFeed;
