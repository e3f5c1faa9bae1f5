//! Hierarchical column naming.
//!
//! A field's column is the underscore-join of its ancestors' names followed
//! by its own name. Repeater items add an iteration segment at load time
//! (`faq_0_question`) which never reaches the physical schema: the item's
//! values live in the `faq_question` JSON column.

/// Separator between name segments.
pub const SEPARATOR: char = '_';

/// Joins an ancestor-name chain and a field name into a column name.
///
/// # Examples
///
/// ```
/// use acf_tables_core::join_column;
///
/// assert_eq!(join_column(&[], "title"), "title");
/// assert_eq!(join_column(&["faq".to_string()], "question"), "faq_question");
/// ```
pub fn join_column(prefix: &[String], name: &str) -> String {
    let mut column = String::new();
    for segment in prefix {
        column.push_str(segment);
        column.push(SEPARATOR);
    }
    column.push_str(name);
    column
}

/// Qualifies `name` with `parent_column` unless it already carries that
/// prefix.
///
/// Hosts pass nested fields either by their declared name (`question`) or
/// by an already-qualified runtime name (`faq_question`); both resolve to
/// the same column.
///
/// # Examples
///
/// ```
/// use acf_tables_core::qualify;
///
/// assert_eq!(qualify("faq", "question"), "faq_question");
/// assert_eq!(qualify("faq", "faq_question"), "faq_question");
/// assert_eq!(qualify("faq", "faq_0_question"), "faq_0_question");
/// ```
pub fn qualify(parent_column: &str, name: &str) -> String {
    match name.strip_prefix(parent_column) {
        Some(rest) if rest.starts_with(SEPARATOR) => name.to_string(),
        _ => format!("{parent_column}{SEPARATOR}{name}"),
    }
}

/// Splits a repeater item's runtime column (`faq_2_question`) into its
/// iteration index and item name, given the repeater's column (`faq`).
///
/// Returns `None` when the column does not follow that shape.
///
/// # Examples
///
/// ```
/// use acf_tables_core::split_repeater_item;
///
/// assert_eq!(split_repeater_item("faq_2_question", "faq"), Some((2, "question")));
/// assert_eq!(split_repeater_item("faq_0_long_answer", "faq"), Some((0, "long_answer")));
/// assert_eq!(split_repeater_item("faq_question", "faq"), None);
/// ```
pub fn split_repeater_item<'a>(column: &'a str, repeater_column: &str) -> Option<(usize, &'a str)> {
    let rest = column
        .strip_prefix(repeater_column)?
        .strip_prefix(SEPARATOR)?;
    let (iteration, item) = rest.split_once(SEPARATOR)?;
    let iteration = iteration.parse().ok()?;
    if item.is_empty() {
        return None;
    }
    Some((iteration, item))
}

/// Formats the row identifier stored in repeater entries.
pub fn row_id(index: usize) -> String {
    format!("row-{index}")
}

/// Parses a repeater row identifier (`row-3`) back into its index.
pub fn parse_row_id(id: &str) -> Option<usize> {
    id.strip_prefix("row-")?.parse().ok()
}
