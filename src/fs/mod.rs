pub mod dump;
pub mod file_ops;
pub mod locks;
pub mod open_file;
