//! Eager-load paths

use crate::metadata::NavigationEdge;

/// A dotted include path resolved into the edges it walks
///
/// Built by [`ModelRegistry::resolve_include`](crate::metadata::ModelRegistry::resolve_include).
/// `"lines.product"` on `Order` becomes `[Order.lines, OrderLine.product]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInclude {
    /// Path as written by the caller
    pub path: String,
    /// Edges in walk order, starting at the root type
    pub edges: Vec<NavigationEdge>,
}

impl ResolvedInclude {
    /// Type reached at the end of the path
    pub fn leaf_type(&self) -> Option<&'static str> {
        self.edges.last().map(|edge| edge.target_type)
    }
}
