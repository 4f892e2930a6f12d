use jsonptr::Pointer;
use jsonptr::resolve::Resolve;
use serde_json::Value;
use tracing::debug;

/// Maximum number of `$ref` hops followed by [`SpecResolver::resolve_schema`].
pub const MAX_REF_DEPTH: usize = 8;

/// Resolves document-local `$ref` pointers inside an OpenAPI document.
///
/// Only references starting at the document root (`#/...`) are followed.
/// External or broken references are returned untouched: callers always get
/// a node back, never an error.
#[derive(Debug, Clone, Copy)]
pub struct SpecResolver<'doc> {
    document: &'doc Value,
}

impl<'doc> SpecResolver<'doc> {
    /// Creates a resolver bound to the given document.
    pub fn new(document: &'doc Value) -> Self {
        Self { document }
    }

    /// Follows a single `$ref` hop.
    ///
    /// Returns the target node when `node` is a reference object whose pointer
    /// resolves inside the document, `node` itself otherwise.
    pub fn resolve_ref<'node>(&self, node: &'node Value) -> &'node Value
    where
        'doc: 'node,
    {
        let Some(reference) = node.get("$ref").and_then(Value::as_str) else {
            return node;
        };
        let Some(pointer) = reference.strip_prefix('#') else {
            return node;
        };
        if !pointer.starts_with('/') {
            return node;
        }

        let Ok(ptr) = Pointer::parse(pointer) else {
            debug!(%reference, "invalid reference pointer");
            return node;
        };

        match self.document.resolve(ptr) {
            Ok(target) => target,
            Err(error) => {
                debug!(%reference, %error, "unresolved reference");
                node
            }
        }
    }

    /// Follows `$ref` hops until a concrete node is reached.
    ///
    /// Stops after [`MAX_REF_DEPTH`] hops and returns the last node reached,
    /// so reference cycles terminate with a partially resolved node.
    pub fn resolve_schema<'node>(&self, node: &'node Value) -> &'node Value
    where
        'doc: 'node,
    {
        let mut current = node;
        for _ in 0..MAX_REF_DEPTH {
            let next = self.resolve_ref(current);
            if std::ptr::eq(next, current) {
                return current;
            }
            current = next;
        }
        current
    }
}
