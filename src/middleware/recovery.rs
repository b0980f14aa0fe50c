use tracing::error;

use crate::{context::Context, handler::Handler, status::Status};

/// Catches an error from the downstream chain and answers a plain 500.
/// Install it before anything that can fail; the serving process never
/// terminates for a single bad request.
pub fn new() -> impl Handler {
    |c: &mut Context| -> anyhow::Result<()> {
        if let Err(err) = c.advance() {
            error!(error = ?err, "recovered handler fault");
            c.fail(Status::InternalServerError, "Internal Server Error");
        }
        Ok(())
    }
}
