use std::time::Instant;

use tracing::info;

use crate::{context::Context, handler::Handler};

/// Logs one line per request with the final status and elapsed time.
pub fn new() -> impl Handler {
    |c: &mut Context| -> anyhow::Result<()> {
        let start = Instant::now();
        let method = c.method().to_owned();
        let path = c.path().to_owned();

        c.advance()?;

        info!(
            %method,
            %path,
            status = c.status_code().unwrap_or(200),
            elapsed = ?start.elapsed(),
            "request served"
        );
        Ok(())
    }
}
