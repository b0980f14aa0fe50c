use std::{collections::HashMap, sync::Arc};

use strum_macros::Display;

use crate::{handler::Handler, path::parse_path, trie::Node};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl TryFrom<&str> for Method {
    type Error = ();
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "get" => Ok(Method::Get),
            "post" => Ok(Method::Post),
            "put" => Ok(Method::Put),
            "delete" => Ok(Method::Delete),
            _ => Err(()),
        }
    }
}

/// A successful route resolution.
///
/// `handler` is looked up separately from the trie match and can in
/// principle be absent; the dispatcher answers not-found in that case.
pub struct RouteMatch<'a> {
    pub pattern: &'a str,
    pub params: HashMap<String, String>,
    pub handler: Option<&'a Arc<dyn Handler>>,
}

/// One trie per HTTP method plus the pattern-to-handler table.
///
/// Built once at startup; read-only while serving, so concurrent request
/// threads share it without synchronization.
pub struct Router {
    tries: HashMap<Method, Node>,
    routes: HashMap<String, Arc<dyn Handler>>,
}

fn route_key(method: Method, pattern: &str) -> String {
    format!("{}-{}", method, pattern)
}

impl Router {
    pub fn new() -> Self {
        Self {
            tries: HashMap::new(),
            routes: HashMap::new(),
        }
    }

    /// Registers a handler for a method + pattern pair. Re-registering the
    /// same pair silently replaces the earlier entry, in the trie and in
    /// the table alike.
    pub fn add_route(&mut self, method: Method, pattern: &str, handler: Arc<dyn Handler>) {
        let parts = parse_path(pattern);
        self.tries
            .entry(method)
            .or_default()
            .insert(pattern, &parts, 0);
        self.routes.insert(route_key(method, pattern), handler);
    }

    /// Resolves a concrete request path to the pattern that matches it and
    /// the parameter bindings it produces. No trie for the method and no
    /// matching pattern both come back as `None`.
    pub fn resolve(&self, method: Method, path: &str) -> Option<RouteMatch<'_>> {
        let trie = self.tries.get(&method)?;
        let parts = parse_path(path);
        let node = trie.search(&parts, 0)?;
        let pattern = node.pattern()?;
        Some(RouteMatch {
            pattern,
            params: bind_params(pattern, &parts),
            handler: self.routes.get(&route_key(method, pattern)),
        })
    }
}

/// Walks the matched pattern and the request segments in lockstep. `:name`
/// binds the request segment at its position, `*name` binds the remaining
/// segments joined by `/` and stops. A bare `:` or `*` binds nothing.
fn bind_params(pattern: &str, request_parts: &[&str]) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for (idx, part) in parse_path(pattern).into_iter().enumerate() {
        if let Some(name) = part.strip_prefix(':') {
            if !name.is_empty() {
                params.insert(name.to_owned(), request_parts[idx].to_owned());
            }
        } else if let Some(name) = part.strip_prefix('*') {
            if !name.is_empty() {
                params.insert(name.to_owned(), request_parts[idx..].join("/"));
            }
            break;
        }
    }
    params
}
