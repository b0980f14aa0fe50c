use std::{collections::HashMap, sync::Arc};

use tracing::error;

use crate::{
    context::Context,
    handler::Handler,
    request::Request,
    response_writer::ResponseWriter,
    router::{Method, Router},
    server::Service,
    status::Status,
};

struct Group {
    prefix: String,
    middlewares: Vec<Arc<dyn Handler>>,
}

/// Route registrations plus prefix-scoped middleware.
///
/// Everything is registered before serving starts; afterwards the engine
/// is shared immutably with the connection threads.
pub struct Engine {
    router: Router,
    groups: Vec<Group>,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            groups: vec![],
        }
    }

    /// Registers a handler under the full pattern, prefix included.
    pub fn register(
        &mut self,
        method: Method,
        pattern: impl Into<String>,
        handler: impl Handler + 'static,
    ) {
        self.router
            .add_route(method, &pattern.into(), Arc::new(handler));
    }

    /// Attaches middleware to every request whose path starts with
    /// `prefix`. Middleware runs in registration order, before the route
    /// handler.
    pub fn add_middleware(&mut self, prefix: impl Into<String>, handler: impl Handler + 'static) {
        let prefix = prefix.into();
        let handler: Arc<dyn Handler> = Arc::new(handler);
        if let Some(group) = self.groups.iter_mut().find(|g| g.prefix == prefix) {
            group.middlewares.push(handler);
        } else {
            self.groups.push(Group {
                prefix,
                middlewares: vec![handler],
            });
        }
    }

    /// Middleware for every request.
    pub fn wrap(&mut self, handler: impl Handler + 'static) {
        self.add_middleware("", handler);
    }

    pub fn scope(&mut self, prefix: impl Into<String>) -> Scope<'_> {
        Scope {
            engine: self,
            prefix: prefix.into(),
        }
    }

    pub fn get(&mut self, pattern: impl Into<String>, handler: impl Handler + 'static) {
        self.register(Method::Get, pattern, handler);
    }

    pub fn post(&mut self, pattern: impl Into<String>, handler: impl Handler + 'static) {
        self.register(Method::Post, pattern, handler);
    }

    pub fn put(&mut self, pattern: impl Into<String>, handler: impl Handler + 'static) {
        self.register(Method::Put, pattern, handler);
    }

    pub fn delete(&mut self, pattern: impl Into<String>, handler: impl Handler + 'static) {
        self.register(Method::Delete, pattern, handler);
    }

    /// Dispatches one request: resolves the route, assembles the chain
    /// (applicable middleware, then the handler or the not-found
    /// fallback) and drives it to completion.
    pub fn dispatch(&self, request: Request) -> ResponseWriter {
        let Ok(method) = Method::try_from(request.get_http_method()) else {
            let mut w = ResponseWriter::new_empty();
            w.set_status(Status::BadRequest);
            return w;
        };
        let path = request.get_path().to_owned();

        let mut chain: Vec<Arc<dyn Handler>> = self
            .groups
            .iter()
            .filter(|g| path.starts_with(&g.prefix))
            .flat_map(|g| g.middlewares.iter().cloned())
            .collect();

        let mut params = HashMap::new();
        match self.router.resolve(method, &path) {
            Some(m) => {
                params = m.params;
                match m.handler {
                    Some(handler) => chain.push(Arc::clone(handler)),
                    // A trie hit without a table entry; answer like a miss.
                    None => chain.push(Arc::new(not_found)),
                }
            }
            None => chain.push(Arc::new(not_found)),
        }

        let mut c = Context::new(request, params, chain);
        if let Err(err) = c.run() {
            // Only reached when no recovery middleware is installed.
            error!(?err, "handler chain failed");
            c.fail(Status::InternalServerError, "Internal Server Error");
        }
        c.into_writer()
    }
}

impl Service for Engine {
    fn serve(&self, request: Request) -> ResponseWriter {
        self.dispatch(request)
    }
}

fn not_found(c: &mut Context) -> anyhow::Result<()> {
    let path = c.path().to_owned();
    c.string(Status::NotFound, format!("404 NOT FOUND: {}\n", path));
    Ok(())
}

/// A registration view with a path prefix, mirroring nested route groups:
/// `engine.scope("/api")` then `api.get("/items", ..)` registers
/// `/api/items`, and `api.wrap(..)` attaches middleware to `/api`.
pub struct Scope<'e> {
    engine: &'e mut Engine,
    prefix: String,
}

impl Scope<'_> {
    pub fn scope(&mut self, prefix: &str) -> Scope<'_> {
        Scope {
            engine: &mut *self.engine,
            prefix: format!("{}{}", self.prefix, prefix),
        }
    }

    pub fn wrap(&mut self, handler: impl Handler + 'static) {
        self.engine.add_middleware(self.prefix.clone(), handler);
    }

    pub fn register(&mut self, method: Method, path: &str, handler: impl Handler + 'static) {
        self.engine
            .register(method, format!("{}{}", self.prefix, path), handler);
    }

    pub fn get(&mut self, path: &str, handler: impl Handler + 'static) {
        self.register(Method::Get, path, handler);
    }

    pub fn post(&mut self, path: &str, handler: impl Handler + 'static) {
        self.register(Method::Post, path, handler);
    }

    pub fn put(&mut self, path: &str, handler: impl Handler + 'static) {
        self.register(Method::Put, path, handler);
    }

    pub fn delete(&mut self, path: &str, handler: impl Handler + 'static) {
        self.register(Method::Delete, path, handler);
    }
}
