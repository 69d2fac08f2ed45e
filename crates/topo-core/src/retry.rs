// ── Validation retry policy ──
//
// Recovers from one documented failure shape: a 400 error envelope whose
// constraint violations target the `fields` query parameter. Anything else
// is handed back untouched.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use topo_api::ErrorEnvelope;

use crate::fields::FieldExclusionSet;

const BAD_REQUEST: i64 = 400;
const FIELDS_PATH: &str = "fields";

/// Captures the quoted field name at the start of a violation message,
/// e.g. `'test' is not a valid property for type 'SOFTWARE_COMPONENT'`.
static REJECTED_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*'([^']+)'").unwrap_or_else(|e| unreachable!("invalid pattern: {e}"))
});

/// Field names the platform rejected in a response body.
///
/// Returns `None` when the body is not a 400 envelope with at least one
/// `fields` violation. Violations on other paths are ignored.
pub fn rejected_fields(body: &str) -> Option<Vec<String>> {
    let envelope = ErrorEnvelope::parse(body)?;
    if envelope.error.code != BAD_REQUEST {
        return None;
    }

    let fields: Vec<String> = envelope
        .error
        .constraint_violations
        .iter()
        .filter(|v| v.path == FIELDS_PATH)
        .filter_map(|v| REJECTED_FIELD.captures(&v.message))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
        .collect();

    (!fields.is_empty()).then_some(fields)
}

/// Decide whether a failed listing can be retried with fewer fields.
///
/// Every newly rejected field found in the response is added to `excluded`
/// in one pass. Returns `Ok` with the added names when at least one is new,
/// which calls for exactly one retry. Otherwise the original error comes
/// back unchanged; fields already excluded never trigger another attempt.
pub fn narrow_on_rejection(
    type_id: &str,
    err: topo_api::Error,
    excluded: &mut FieldExclusionSet,
) -> Result<Vec<String>, topo_api::Error> {
    let Some(rejected) = err.response_body().and_then(rejected_fields) else {
        return Err(err);
    };

    let added: Vec<String> = rejected
        .into_iter()
        .filter(|field| excluded.insert(field.clone()))
        .collect();

    if added.is_empty() {
        debug!(type_id, "rejected fields already excluded; giving up");
        return Err(err);
    }

    debug!(type_id, ?added, "excluding rejected fields");
    Ok(added)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn rejection(fields: &[&str]) -> String {
        let violations: Vec<serde_json::Value> = fields
            .iter()
            .map(|f| {
                serde_json::json!({
                    "path": "fields",
                    "message": format!("'{f}' is not a valid property for type 'HOST'"),
                    "parameterLocation": "QUERY",
                    "location": null
                })
            })
            .collect();
        serde_json::json!({
            "error": {
                "code": 400,
                "message": "Constraints violated.",
                "constraintViolations": violations
            }
        })
        .to_string()
    }

    fn response(status: u16, body: String) -> topo_api::Error {
        topo_api::Error::Response { status, body }
    }

    #[test]
    fn extracts_quoted_field_names() {
        assert_eq!(
            rejected_fields(&rejection(&["badField", "toRelationships.isSiteOf"])),
            Some(vec!["badField".to_owned(), "toRelationships.isSiteOf".to_owned()])
        );
    }

    #[test]
    fn ignores_other_shapes() {
        assert_eq!(rejected_fields("not json"), None);
        assert_eq!(
            rejected_fields(r#"{"error":{"code":404,"message":"x","constraintViolations":[
                {"path":"fields","message":"'a' is bad"}]}}"#),
            None
        );
        assert_eq!(
            rejected_fields(r#"{"error":{"code":400,"message":"x","constraintViolations":[
                {"path":"entitySelector","message":"'type' is bad"}]}}"#),
            None
        );
        assert_eq!(
            rejected_fields(r#"{"error":{"code":400,"message":"x","constraintViolations":[
                {"path":"fields","message":"no quotes here"}]}}"#),
            None
        );
    }

    #[test]
    fn unrelated_violations_next_to_field_ones_are_ignored() {
        let body = r#"{"error":{"code":400,"message":"x","constraintViolations":[
            {"path":"pageSize","message":"'pageSize' must be positive"},
            {"path":"fields","message":"'badField' is not valid"}]}}"#;
        assert_eq!(rejected_fields(body), Some(vec!["badField".to_owned()]));
    }

    #[test]
    fn collects_all_new_fields_in_one_pass() {
        let mut excluded = FieldExclusionSet::new();
        let added =
            narrow_on_rejection("HOST", response(400, rejection(&["a", "b"])), &mut excluded)
                .unwrap();
        assert_eq!(added, vec!["a", "b"]);
        assert!(excluded.contains("a") && excluded.contains("b"));
    }

    #[test]
    fn known_fields_do_not_retry() {
        let mut excluded = FieldExclusionSet::new();
        excluded.insert("a");
        let err = narrow_on_rejection("HOST", response(400, rejection(&["a"])), &mut excluded)
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(excluded.len(), 1);
    }

    #[test]
    fn partially_known_fields_still_retry() {
        let mut excluded = FieldExclusionSet::new();
        excluded.insert("a");
        let added =
            narrow_on_rejection("HOST", response(400, rejection(&["a", "c"])), &mut excluded)
                .unwrap();
        assert_eq!(added, vec!["c"]);
        assert_eq!(excluded.len(), 2);
    }

    #[test]
    fn non_response_errors_pass_through() {
        let mut excluded = FieldExclusionSet::new();
        let err = narrow_on_rejection("HOST", topo_api::Error::InvalidApiToken, &mut excluded)
            .unwrap_err();
        assert!(matches!(err, topo_api::Error::InvalidApiToken));
        assert!(excluded.is_empty());
    }
}
