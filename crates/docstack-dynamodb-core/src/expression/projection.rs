//! Projection-expression compilation.

use super::placeholder::PlaceholderTable;

/// Join the aliased attribute paths with `, `. `None` selects every attribute.
pub fn compile_projection<S: AsRef<str>>(
    fields: &[S],
    table: &mut PlaceholderTable,
) -> Option<String> {
    if fields.is_empty() {
        return None;
    }
    let paths: Vec<String> = fields
        .iter()
        .map(|f| table.alias_for(f.as_ref()))
        .collect();
    Some(paths.join(", "))
}
