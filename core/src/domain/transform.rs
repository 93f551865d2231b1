/// Marker substring the update paths rewrite wherever it occurs in a payload.
pub const UPDATE_MARKER: &str = "test_load";

/// Replacement for [`UPDATE_MARKER`]. Must not contain the marker itself:
/// the same rewrite runs both against cached entries and inside the durable
/// `REPLACE(...)` statement, and a queued intent may land on a payload that
/// was already rewritten through the cache path.
pub const UPDATE_APPLIED: &str = "test_done";

/// Apply the rewrite rule to a serialized payload. Safe under repetition.
pub fn apply_rewrite(payload: &str) -> String {
    payload.replace(UPDATE_MARKER, UPDATE_APPLIED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_every_occurrence() {
        let rewritten = apply_rewrite("test_load and again test_load");
        assert_eq!(rewritten, "test_done and again test_done");
    }

    #[test]
    fn rewrite_is_idempotent() {
        let once = apply_rewrite("{\"kind\":\"test_load\",\"n\":1}");
        let twice = apply_rewrite(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn applied_form_does_not_reintroduce_the_marker() {
        assert!(!UPDATE_APPLIED.contains(UPDATE_MARKER));
    }

    #[test]
    fn leaves_unmarked_payloads_alone() {
        assert_eq!(apply_rewrite("nothing to see"), "nothing to see");
    }
}
