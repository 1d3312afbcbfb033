use nlsql_core::types::{StepOutcome, StepResult};

const MAX_PREVIEW_ROWS: usize = 5;

/// Renders prior step results compactly for injection into the SQL-generation
/// prompt: a scalar shows inline, a table shows its header plus the first few
/// rows and a total row count.
pub fn format_prior_results(results: &[StepResult]) -> String {
    if results.is_empty() {
        return "none".to_string();
    }
    let mut out = String::new();
    for result in results {
        if !result.success {
            continue;
        }
        out.push_str(&format!("step {}: ", result.step_number));
        match &result.outcome {
            Some(StepOutcome::Value { result_value }) => {
                out.push_str(result_value);
                out.push('\n');
            }
            Some(StepOutcome::Rows { result_data }) => {
                if let Some(first) = result_data.first() {
                    let header: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
                    out.push_str(&format!("columns [{}]\n", header.join(", ")));
                    for row in result_data.iter().take(MAX_PREVIEW_ROWS) {
                        out.push_str(&format!("  {row:?}\n"));
                    }
                    out.push_str(&format!("  ({} rows total)\n", result_data.len()));
                } else {
                    out.push_str("(0 rows)\n");
                }
            }
            None => out.push_str("(no data)\n"),
        }
    }
    if out.is_empty() {
        "none".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlsql_core::types::StepOutcome;
    use serde_json::json;

    #[test]
    fn formats_scalar_inline() {
        let result = StepResult::succeeded(1, "SELECT 1".into(), StepOutcome::Value { result_value: "42".into() }, 1);
        let text = format_prior_results(&[result]);
        assert!(text.contains("step 1: 42"));
    }

    #[test]
    fn formats_rows_with_preview_and_count() {
        let rows: Vec<_> = (0..10)
            .map(|i| json!({"id": i}).as_object().unwrap().clone())
            .collect();
        let result = StepResult::succeeded(1, "SELECT id FROM t".into(), StepOutcome::Rows { result_data: rows }, 1);
        let text = format_prior_results(&[result]);
        assert!(text.contains("(10 rows total)"));
    }

    #[test]
    fn empty_results_is_none() {
        assert_eq!(format_prior_results(&[]), "none");
    }
}
