//! Placeholder translation.
//!
//! Templates and fragments are written with `?` markers; Postgres expects
//! numbered `$1, $2, ...`. Translation is purely textual: every `?` is a
//! parameter, including one inside a caller-supplied fragment.

/// Rewrite each `?` to `$n`, numbering left to right from 1.
pub fn translate(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut idx = 0usize;
    for ch in sql.chars() {
        if ch == '?' {
            idx += 1;
            out.push('$');
            out.push_str(&idx.to_string());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Number of `?` markers in `sql`.
pub fn count(sql: &str) -> usize {
    sql.matches('?').count()
}

/// `n` comma-separated markers: `?, ?, ?`.
pub(crate) fn markers(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_left_to_right() {
        assert_eq!(
            translate("UPDATE t SET a = ?, b = ? WHERE id = ?"),
            "UPDATE t SET a = $1, b = $2 WHERE id = $3"
        );
    }

    #[test]
    fn passes_through_sql_without_markers() {
        assert_eq!(translate("SELECT 1"), "SELECT 1");
    }

    #[test]
    fn handles_double_digit_indices() {
        let sql = markers(11);
        assert_eq!(count(&sql), 11);
        assert!(translate(&sql).ends_with("$10, $11"));
    }

    #[test]
    fn translated_sql_has_no_markers_left() {
        let sql = "INSERT INTO t (a, b, id) VALUES (?, ?, ?)";
        let translated = translate(sql);
        assert_eq!(count(&translated), 0);
        assert_eq!(translated.matches('$').count(), count(sql));
    }
}
