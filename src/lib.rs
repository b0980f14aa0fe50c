pub use context::Context;
pub use engine::{Engine, Scope};
pub use handler::Handler;
pub use request::Request;
pub use response_writer::ResponseWriter;
pub use router::Method;
pub use server::{Server, Service};
pub use status::Status;

pub mod context;
pub mod engine;
pub mod handler;
pub mod middleware;
mod path;
pub mod request;
pub mod response_writer;
pub mod router;
pub mod server;
pub mod status;
#[cfg(test)]
mod test_utils;
mod trie;
