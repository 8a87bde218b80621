use serde_json::{Map, Value};

use crate::error::StoreError;

/// Get a required column value from a row, returning CorruptRow on failure.
pub fn get<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    row.get(idx).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: e.to_string(),
    })
}

/// Get an optional column value.
pub fn get_opt<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<Option<T>, StoreError> {
    row.get(idx).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: e.to_string(),
    })
}

/// Get an INTEGER-backed boolean column.
pub fn get_bool(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<bool, StoreError> {
    let raw: i64 = get(row, idx, table, column)?;
    Ok(raw != 0)
}

/// Parse an optional TEXT column holding a JSON object.
pub fn parse_json_map(
    raw: Option<String>,
    table: &'static str,
    column: &'static str,
) -> Result<Option<Map<String, Value>>, StoreError> {
    match raw {
        None => Ok(None),
        Some(s) => match serde_json::from_str::<Value>(&s) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) => Err(StoreError::CorruptRow {
                table,
                column,
                detail: "expected JSON object".into(),
            }),
            Err(e) => Err(StoreError::CorruptRow {
                table,
                column,
                detail: format!("invalid JSON: {e}"),
            }),
        },
    }
}

/// Parse a string into an enum, returning CorruptRow on failure.
pub fn parse_enum<T: std::str::FromStr>(
    raw: &str,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    raw.parse().map_err(|_| StoreError::CorruptRow {
        table,
        column,
        detail: format!("unknown variant: {raw}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use focus_core::domain::TaskStatus;

    #[test]
    fn parse_enum_success() {
        let status: TaskStatus = parse_enum("in_progress", "tasks", "status").unwrap();
        assert_eq!(status, TaskStatus::InProgress);
    }

    #[test]
    fn parse_enum_failure() {
        let result: Result<TaskStatus, _> = parse_enum("INVALID", "tasks", "status");
        assert!(matches!(
            result,
            Err(StoreError::CorruptRow { table: "tasks", column: "status", .. })
        ));
    }

    #[test]
    fn parse_json_map_object() {
        let parsed = parse_json_map(Some(r#"{"title":"x"}"#.into()), "actions", "changes").unwrap();
        assert_eq!(parsed.unwrap()["title"], "x");
    }

    #[test]
    fn parse_json_map_none() {
        assert!(parse_json_map(None, "actions", "changes").unwrap().is_none());
    }

    #[test]
    fn parse_json_map_rejects_non_object() {
        let result = parse_json_map(Some("[1,2]".into()), "actions", "changes");
        assert!(matches!(result, Err(StoreError::CorruptRow { .. })));
    }

    #[test]
    fn parse_json_map_rejects_garbage() {
        let result = parse_json_map(Some("not json".into()), "actions", "metadata");
        assert!(matches!(
            result,
            Err(StoreError::CorruptRow { table: "actions", column: "metadata", .. })
        ));
    }
}
