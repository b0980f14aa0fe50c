use std::{collections::HashMap, sync::Arc};

use serde::Serialize;

use crate::{
    handler::Handler, request::Request, response_writer::ResponseWriter, status::Status,
};

/// Per-request execution state: the request, the response under
/// construction, the resolved path parameters and the handler chain
/// (middleware in registration order, endpoint last) with a cursor.
///
/// Created by the engine for one request and discarded afterwards; never
/// shared or reused across requests.
pub struct Context {
    request: Request,
    writer: ResponseWriter,
    params: HashMap<String, String>,
    chain: Vec<Arc<dyn Handler>>,
    cursor: usize,
}

impl Context {
    pub(crate) fn new(
        request: Request,
        params: HashMap<String, String>,
        chain: Vec<Arc<dyn Handler>>,
    ) -> Self {
        Self {
            request,
            writer: ResponseWriter::new_empty(),
            params,
            chain,
            cursor: 0,
        }
    }

    /// Runs the next handler in the chain, if any.
    ///
    /// Exactly one handler is consumed per call: the cursor moves past it
    /// before it runs, so a middleware doing work on both sides of an
    /// `advance()` call never causes its successors to run twice — the
    /// kick-off loop in [`run`](Self::run) only ever sees the cursor
    /// already past whatever the middleware drove.
    pub fn advance(&mut self) -> anyhow::Result<()> {
        let Some(handler) = self.chain.get(self.cursor).map(Arc::clone) else {
            return Ok(());
        };
        self.cursor += 1;
        handler.handle(self)
    }

    /// Drives the whole chain from the front. Called once per request by
    /// the engine; an error aborts the remaining handlers.
    pub(crate) fn run(&mut self) -> anyhow::Result<()> {
        while self.cursor < self.chain.len() {
            self.advance()?;
        }
        Ok(())
    }

    pub(crate) fn into_writer(self) -> ResponseWriter {
        self.writer
    }

    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
    // request side
    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn method(&self) -> &str {
        self.request.get_http_method()
    }

    pub fn path(&self) -> &str {
        self.request.get_path()
    }

    /// The value a `:name` or `*name` pattern segment matched for this
    /// request.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(|v| v.as_str())
    }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.request.get_query(key)
    }

    pub fn post_form(&self, key: &str) -> Option<&str> {
        self.request.get_form_value(key)
    }

    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
    // response side
    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

    pub fn set_status(&mut self, status: Status) {
        self.writer.set_status(status);
    }

    /// Sets a raw numeric status code for codes outside [`Status`].
    pub fn set_status_code(&mut self, code: u16) {
        self.writer.set_status_code(code);
    }

    pub fn status_code(&self) -> Option<u16> {
        self.writer.get_status_code()
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.writer.set_header(key.into(), value.into());
    }

    pub fn string(&mut self, status: Status, body: impl Into<String>) {
        self.writer.set_status(status);
        self.writer
            .set_body(body.into().into_bytes(), "text/plain;charset=utf-8");
    }

    pub fn html(&mut self, status: Status, body: impl Into<String>) {
        self.writer.set_status(status);
        self.writer
            .set_body(body.into().into_bytes(), "text/html;charset=utf-8");
    }

    pub fn data(&mut self, status: Status, body: Vec<u8>, content_type: &str) {
        self.writer.set_status(status);
        self.writer.set_body(body, content_type);
    }

    pub fn json(&mut self, status: Status, value: &impl Serialize) -> anyhow::Result<()> {
        let body = serde_json::to_vec(value)?;
        self.writer.set_status(status);
        self.writer.set_body(body, "application/json;charset=utf-8");
        Ok(())
    }

    /// Error response shorthand used by the recovery middleware and the
    /// not-found fallback.
    pub fn fail(&mut self, status: Status, body: &str) {
        self.string(status, body);
    }
}
