//! Identifier construction for partition objects.
//!
//! `PostgreSQL` truncates identifiers longer than 63 characters, which
//! would silently collide generated names. Everything the engine creates
//! (child tables, triggers, trigger functions, constraints) goes through
//! [`check_name_length`], which truncates the base name so the suffix
//! always survives intact. Table partitions reserve two extra characters
//! for the `_p` separator, leaving 61 for base plus suffix.

/// Maximum `PostgreSQL` identifier length
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Base + suffix budget for child table names (the `_p` separator takes two)
const MAX_TABLE_PARTITION_LEN: usize = 61;

/// Truncate `object_name` so the final identifier fits `PostgreSQL`'s limit
///
/// For table partitions the result is `<base>_p<suffix>`; for other
/// objects the suffix (if any) is appended directly. The suffix is never
/// truncated, only the base.
pub fn check_name_length(object_name: &str, suffix: Option<&str>, table_partition: bool) -> String {
    let suffix = suffix.unwrap_or("");
    if table_partition {
        let base = truncate_chars(object_name, MAX_TABLE_PARTITION_LEN.saturating_sub(chars(suffix)));
        format!("{base}_p{suffix}")
    } else if suffix.is_empty() {
        truncate_chars(object_name, MAX_IDENTIFIER_LEN).to_string()
    } else {
        let base = truncate_chars(object_name, MAX_IDENTIFIER_LEN.saturating_sub(chars(suffix)));
        format!("{base}{suffix}")
    }
}

/// Split `schema.table` into its two parts
///
/// Returns `None` when the name is not schema-qualified. Only the first
/// dot splits; partition suffixes never contain dots.
pub fn split_qualified(name: &str) -> Option<(&str, &str)> {
    let (schema, table) = name.split_once('.')?;
    if schema.is_empty() || table.is_empty() {
        return None;
    }
    Some((schema, table))
}

/// Schema-qualified child table name for a suffix: `schema.parent_p<suffix>`
pub fn child_table(schema: &str, parent: &str, suffix: &str) -> String {
    format!("{schema}.{}", check_name_length(parent, Some(suffix), true))
}

/// Routing trigger name for a parent table
pub fn trigger_name(parent: &str) -> String {
    check_name_length(&format!("{parent}_part_trig"), None, false)
}

/// Routing trigger function name for a parent table
pub fn trigger_function_name(parent: &str) -> String {
    check_name_length(&format!("{parent}_part_trig_func"), None, false)
}

/// Bound check constraint name for a child table
pub fn bound_check_name(child: &str) -> String {
    check_name_length(&format!("{child}_partition_check"), None, false)
}

/// Pruning constraint name for a column on a child table
pub fn column_constraint_name(child: &str, column: &str) -> String {
    check_name_length(&format!("gkconstr_{child}_{column}"), None, false)
}

/// Extract the partition suffix from a child table name
///
/// The suffix is everything after the last `_p`. Returns `None` for
/// names that carry no suffix.
pub fn partition_suffix(child: &str) -> Option<&str> {
    let unqualified = child.rsplit('.').next().unwrap_or(child);
    let idx = unqualified.rfind("_p")?;
    let suffix = &unqualified[idx + 2..];
    if suffix.is_empty() {
        None
    } else {
        Some(suffix)
    }
}

fn chars(s: &str) -> usize {
    s.chars().count()
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_names_untouched() {
        assert_eq!(
            check_name_length("events", Some("2024_01_01"), true),
            "events_p2024_01_01"
        );
        assert_eq!(check_name_length("events_part_trig", None, false), "events_part_trig");
    }

    #[test]
    fn test_table_partition_truncation() {
        let long = "a".repeat(80);
        let name = check_name_length(&long, Some("2024_01_01"), true);
        assert_eq!(name.chars().count(), MAX_TABLE_PARTITION_LEN + 2);
        assert!(name.ends_with("_p2024_01_01"));
    }

    #[test]
    fn test_object_truncation_keeps_suffix() {
        let long = "b".repeat(70);
        let name = check_name_length(&long, Some("_partition_check"), false);
        assert_eq!(name.chars().count(), MAX_IDENTIFIER_LEN);
        assert!(name.ends_with("_partition_check"));

        let bare = check_name_length(&long, None, false);
        assert_eq!(bare.chars().count(), MAX_IDENTIFIER_LEN);
    }

    #[test]
    fn test_split_qualified() {
        assert_eq!(split_qualified("public.events"), Some(("public", "events")));
        assert_eq!(split_qualified("events"), None);
        assert_eq!(split_qualified(".events"), None);
        assert_eq!(split_qualified("public."), None);
    }

    #[test]
    fn test_child_table() {
        assert_eq!(
            child_table("public", "events", "2024_01_01"),
            "public.events_p2024_01_01"
        );
    }

    #[test]
    fn test_partition_suffix() {
        assert_eq!(partition_suffix("public.events_p2024_01_01"), Some("2024_01_01"));
        assert_eq!(partition_suffix("events_p90000"), Some("90000"));
        // Last _p wins even when the table name itself contains one
        assert_eq!(partition_suffix("public.api_plog_p2024q3"), Some("2024q3"));
        assert_eq!(partition_suffix("public.events"), None);
    }

    #[test]
    fn test_trigger_names() {
        assert_eq!(trigger_name("events"), "events_part_trig");
        assert_eq!(trigger_function_name("events"), "events_part_trig_func");
        let long = "c".repeat(70);
        assert_eq!(trigger_name(&long).chars().count(), MAX_IDENTIFIER_LEN);
    }
}
