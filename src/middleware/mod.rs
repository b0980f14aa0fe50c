pub mod logger;
pub mod recovery;
