/// Generated SQL is opaque text to the rest of the system; this is the one
/// place that inspects it, and only to reject anything that isn't a pure read.
pub fn is_read_only(sql: &str) -> bool {
    let trimmed = sql.trim_start();
    let trimmed = trimmed.trim_start_matches(|c: char| c == '(' || c.is_whitespace());
    let lower = trimmed.to_ascii_lowercase();
    lower.starts_with("select") || lower.starts_with("with")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_select_and_with() {
        assert!(is_read_only("SELECT * FROM customers"));
        assert!(is_read_only("  with cte as (select 1) select * from cte"));
    }

    #[test]
    fn rejects_mutations() {
        assert!(!is_read_only("DELETE FROM customers"));
        assert!(!is_read_only("INSERT INTO customers VALUES (1)"));
        assert!(!is_read_only("DROP TABLE customers"));
        assert!(!is_read_only("UPDATE customers SET name = 'x'"));
    }
}
