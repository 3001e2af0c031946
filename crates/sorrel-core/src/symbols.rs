//! Helpers for the `::`-qualified symbol naming convention.

pub fn is_namespaced_symbol(name: &str) -> bool {
    name.contains("::")
}

/// The namespace part of a qualified name, `None` for plain symbols.
pub fn symbol_namespace(name: &str) -> Option<&str> {
    name.rsplit_once("::").map(|(ns, _)| ns)
}

/// The local part of a name, the whole name when unqualified.
pub fn symbol_name(name: &str) -> &str {
    name.rsplit_once("::").map(|(_, local)| local).unwrap_or(name)
}
