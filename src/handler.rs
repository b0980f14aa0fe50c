use crate::context::Context;

/// A chain handler: one middleware or route endpoint.
///
/// Handlers run sequentially within a request. A middleware calls
/// [`Context::advance`] to hand control to its successor and regains it
/// when that returns; an endpoint just writes a response. Returning an
/// error aborts the rest of the chain and is answered with a 500 by the
/// nearest recovery middleware (or the dispatcher as a last resort).
pub trait Handler: Send + Sync {
    fn handle(&self, c: &mut Context) -> anyhow::Result<()>;
}

impl<T> Handler for T
where
    T: Fn(&mut Context) -> anyhow::Result<()> + Send + Sync,
{
    fn handle(&self, c: &mut Context) -> anyhow::Result<()> {
        self(c)
    }
}

#[cfg(test)]
pub fn noop_handler() -> impl Handler {
    |_: &mut Context| -> anyhow::Result<()> { Ok(()) }
}
