//! Strict parsing of the model's reply into a [`WritePlan`]
//!
//! All fields are required and unknown fields are rejected by the plan
//! types themselves. On top of that every write must be a non-empty
//! rectangular grid of scalar cells.

use crate::PlannerError;
use serde_json::Value;
use sheetplan_core::WritePlan;

/// Parse `raw` and check it belongs to `expected_job_id`.
pub fn parse_plan(raw: &str, expected_job_id: &str) -> Result<WritePlan, PlannerError> {
    let body = strip_code_fence(raw);
    let plan: WritePlan =
        serde_json::from_str(body).map_err(|e| PlannerError::Schema(e.to_string()))?;

    if plan.job_id != expected_job_id {
        return Err(PlannerError::JobMismatch {
            expected: expected_job_id.to_string(),
            found: plan.job_id,
        });
    }

    for (i, write) in plan.writes.iter().enumerate() {
        if write.range.trim().is_empty() {
            return Err(PlannerError::Schema(format!("write #{} has an empty range", i)));
        }
        let Some(width) = write.values.first().map(Vec::len) else {
            return Err(PlannerError::Schema(format!(
                "write #{} ({}) has no rows",
                i, write.range
            )));
        };
        if width == 0 {
            return Err(PlannerError::Schema(format!(
                "write #{} ({}) has an empty row",
                i, write.range
            )));
        }
        if write.values.iter().any(|row| row.len() != width) {
            return Err(PlannerError::Schema(format!(
                "write #{} ({}) is not rectangular",
                i, write.range
            )));
        }
        if let Some((r, c, _)) = write
            .cells()
            .find(|(_, _, v)| matches!(v, Value::Array(_) | Value::Object(_)))
        {
            return Err(PlannerError::Schema(format!(
                "write #{} ({}) has a non-scalar cell at row {}, col {}",
                i,
                write.range,
                r + 1,
                c + 1
            )));
        }
    }

    Ok(plan)
}

/// Remove one surrounding Markdown code fence, if present.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    match inner.split_once('\n') {
        Some((info, body)) if !info.trim_start().starts_with('{') => body.trim(),
        _ => inner.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan_json(writes: Value) -> String {
        json!({
            "job_id": "J1",
            "version": "1.0.0",
            "writes": writes,
            "computed": {"panels_needed": 6, "supports": 4, "area_m2": 72.0, "fixing_points": 58},
            "notes": "ok"
        })
        .to_string()
    }

    #[test]
    fn test_parses_valid_plan() {
        let plan = parse_plan(
            &plan_json(json!([{"range": "EPS_100!B7:C7", "values": [["ACME", 12]]}])),
            "J1",
        )
        .unwrap();
        assert_eq!(plan.writes.len(), 1);
        assert_eq!(plan.total_cells(), 2);
        assert_eq!(plan.computed.panels_needed, 6.0);
    }

    #[test]
    fn test_accepts_fenced_reply() {
        let fenced = format!("```json\n{}\n```", plan_json(json!([])));
        assert!(parse_plan(&fenced, "J1").is_ok());
        let bare_fence = format!("```{}```", plan_json(json!([])));
        assert!(parse_plan(&bare_fence, "J1").is_ok());
    }

    #[test]
    fn test_rejects_unknown_and_missing_fields() {
        let mut extra: Value = serde_json::from_str(&plan_json(json!([]))).unwrap();
        extra["confidence"] = json!(0.9);
        assert!(matches!(
            parse_plan(&extra.to_string(), "J1"),
            Err(PlannerError::Schema(_))
        ));

        let mut missing: Value = serde_json::from_str(&plan_json(json!([]))).unwrap();
        missing.as_object_mut().unwrap().remove("notes");
        assert!(parse_plan(&missing.to_string(), "J1").is_err());

        let nested_extra = plan_json(json!([{"range": "A1", "values": [[1]], "note": "x"}]));
        assert!(parse_plan(&nested_extra, "J1").is_err());
    }

    #[test]
    fn test_rejects_wrong_job() {
        let err = parse_plan(&plan_json(json!([])), "J2").unwrap_err();
        assert!(matches!(err, PlannerError::JobMismatch { .. }));
    }

    #[test]
    fn test_rejects_bad_grids() {
        for writes in [
            json!([{"range": "A1", "values": []}]),
            json!([{"range": "A1", "values": [[]]}]),
            json!([{"range": "A1:B2", "values": [[1, 2], [3]]}]),
            json!([{"range": "A1", "values": [[{"formula": "=1"}]]}]),
            json!([{"range": "A1", "values": [[[1]]]}]),
            json!([{"range": " ", "values": [[1]]}]),
        ] {
            assert!(
                matches!(parse_plan(&plan_json(writes.clone()), "J1"), Err(PlannerError::Schema(_))),
                "accepted {}",
                writes
            );
        }
    }

    #[test]
    fn test_not_json_at_all() {
        assert!(matches!(
            parse_plan("Sure! Here is your plan.", "J1"),
            Err(PlannerError::Schema(_))
        ));
    }
}
