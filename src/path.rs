/// Splits a path or pattern into its non-empty `/`-delimited segments.
///
/// A `*` segment consumes the rest of the path, so nothing after it is
/// ever considered; the sequence stops right after it.
pub fn parse_path(path: &str) -> Vec<&str> {
    let mut parts = vec![];
    for part in path.split('/') {
        if part.is_empty() {
            continue;
        }
        parts.push(part);
        if part.starts_with('*') {
            break;
        }
    }
    parts
}
