pub mod completion;
pub mod config;
pub mod estimate;
pub mod flatten;
pub mod init;
pub mod tree;
