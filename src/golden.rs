//! Comparison of scan results with expected ("golden") JSON files.
//!
//! Package and dependency uids carry a random `uuid` qualifier, so both
//! sides are normalized before comparing.

use std::path::Path;

use serde_json::Value;

use crate::error::{Result, ScanError};
use crate::models::purl;

/// Environment variable that turns every check into a regeneration.
pub const REGEN_ENV: &str = "PKGSCAN_REGEN_TEST_FIXTURES";

/// How uid `uuid` qualifiers are neutralized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UuidMode {
    /// Remove the qualifier, leaving the plain purl.
    #[default]
    Strip,
    /// Replace the uuid by a fixed placeholder on both sides.
    Mask,
}

#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Keep and compare `headers`.
    pub check_headers: bool,
    pub uuid_mode: UuidMode,
    /// Write the actual results to the expected file instead of comparing.
    pub regen: bool,
}

impl CheckOptions {
    /// Options with `regen` also enabled by the environment.
    pub fn from_env() -> Self {
        Self {
            regen: regen_requested(),
            ..Default::default()
        }
    }
}

pub fn regen_requested() -> bool {
    std::env::var(REGEN_ENV).is_ok_and(|v| !v.is_empty() && v != "0")
}

const UID_KEYS: &[&str] = &["package_uid", "dependency_uid", "for_package_uid"];

/// Neutralize every uid in a scan result, recursively.
pub fn normalize_uids(value: &mut Value, mode: UuidMode) {
    let fix = |uid: &str| match mode {
        UuidMode::Strip => purl::strip_uuid(uid),
        UuidMode::Mask => purl::mask_uuid(uid),
    };

    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if UID_KEYS.contains(&key.as_str()) {
                    if let Value::String(uid) = child {
                        *uid = fix(uid.as_str());
                    }
                } else if key == "for_packages" {
                    if let Value::Array(uids) = child {
                        for uid in uids.iter_mut() {
                            if let Value::String(s) = uid {
                                *s = fix(s.as_str());
                            }
                        }
                    }
                } else {
                    normalize_uids(child, mode);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                normalize_uids(item, mode);
            }
        }
        _ => {}
    }
}

/// Prepare a scan result for comparison.
pub fn prepare(mut results: Value, options: &CheckOptions) -> Value {
    if !options.check_headers {
        if let Value::Object(map) = &mut results {
            map.remove("headers");
        }
    }
    normalize_uids(&mut results, options.uuid_mode);
    results
}

/// Pretty JSON with sorted keys and a trailing newline.
pub fn to_golden_text(value: &Value) -> Result<String> {
    let mut text = serde_json::to_string_pretty(&sort_keys(value))?;
    text.push('\n');
    Ok(text)
}

/// Copy of `value` with every object's keys in sorted order.
fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Compare `actual` scan results with the JSON stored at `expected_path`.
///
/// Returns `GoldenMismatch` with a line diff when they differ. In
/// regeneration mode the expected file is overwritten and the check passes.
pub fn check_json_scan(expected_path: &Path, actual: Value, options: &CheckOptions) -> Result<()> {
    let actual = prepare(actual, options);

    if options.regen {
        if let Some(parent) = expected_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(expected_path, to_golden_text(&actual)?)?;
        tracing::info!(path = %expected_path.display(), "regenerated expected results");
        return Ok(());
    }

    let content = std::fs::read_to_string(expected_path)?;
    let expected: Value = serde_json::from_str(&content)
        .map_err(|e| ScanError::parse(expected_path.display(), e))?;
    let expected = prepare(expected, options);

    if expected == actual {
        return Ok(());
    }

    let expected_text = to_golden_text(&expected)?;
    let actual_text = to_golden_text(&actual)?;
    let diff = diffy::create_patch(&expected_text, &actual_text).to_string();
    Err(ScanError::GoldenMismatch {
        expected: expected_path.display().to_string(),
        diff,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const UUID_A: &str = "0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0";
    const UUID_B: &str = "11111111-2222-4333-8444-555555555555";

    fn results(uuid: &str) -> Value {
        json!({
            "headers": [{"tool_name": "pkgscan", "start_timestamp": uuid}],
            "packages": [{"purl": "pkg:bower/a@1", "package_uid": format!("pkg:bower/a@1?uuid={uuid}")}],
            "dependencies": [{
                "purl": "pkg:bower/b",
                "dependency_uid": format!("pkg:bower/b?uuid={uuid}"),
                "for_package_uid": format!("pkg:bower/a@1?uuid={uuid}")
            }],
            "files": [{"path": "x/bower.json", "for_packages": [format!("pkg:bower/a@1?uuid={uuid}")]}]
        })
    }

    #[test]
    fn stripping_removes_headers_and_uuids() {
        let prepared = prepare(results(UUID_A), &CheckOptions::default());
        assert!(prepared.get("headers").is_none());
        assert_eq!(prepared["packages"][0]["package_uid"], "pkg:bower/a@1");
        assert_eq!(prepared["dependencies"][0]["for_package_uid"], "pkg:bower/a@1");
        assert_eq!(prepared["files"][0]["for_packages"][0], "pkg:bower/a@1");
        assert_eq!(prepared["packages"][0]["purl"], "pkg:bower/a@1");
    }

    #[test]
    fn stripping_is_idempotent() {
        let once = prepare(results(UUID_A), &CheckOptions::default());
        let twice = prepare(once.clone(), &CheckOptions::default());
        assert_eq!(once, twice);
    }

    #[test]
    fn different_uuids_compare_equal() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().join("expected.json");
        std::fs::write(&expected, results(UUID_A).to_string()).unwrap();

        for mode in [UuidMode::Strip, UuidMode::Mask] {
            let options = CheckOptions {
                uuid_mode: mode,
                ..Default::default()
            };
            check_json_scan(&expected, results(UUID_B), &options).unwrap();
        }
    }

    #[test]
    fn mismatch_reports_a_diff() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().join("expected.json");
        std::fs::write(&expected, results(UUID_A).to_string()).unwrap();

        let mut actual = results(UUID_A);
        actual["packages"][0]["purl"] = json!("pkg:bower/a@2");
        match check_json_scan(&expected, actual, &CheckOptions::default()) {
            Err(ScanError::GoldenMismatch { diff, .. }) => {
                assert!(diff.contains("-      \"purl\": \"pkg:bower/a@1\""));
                assert!(diff.contains("+      \"purl\": \"pkg:bower/a@2\""));
            }
            other => panic!("expected a mismatch, got {other:?}"),
        }
    }

    #[test]
    fn regen_writes_expected_file() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().join("nested/expected.json");
        let options = CheckOptions {
            regen: true,
            ..Default::default()
        };
        check_json_scan(&expected, results(UUID_A), &options).unwrap();

        let written = std::fs::read_to_string(&expected).unwrap();
        assert!(!written.contains(UUID_A));
        check_json_scan(&expected, results(UUID_B), &CheckOptions::default()).unwrap();
    }

    #[test]
    fn golden_text_sorts_nested_keys() {
        let value = json!({"zeta": {"b": 1, "a": 2}, "alpha": [{"y": 1, "x": 2}]});
        let text = to_golden_text(&value).unwrap();
        let order: Vec<usize> = ["\"alpha\"", "\"x\"", "\"y\"", "\"zeta\"", "\"a\"", "\"b\""]
            .iter()
            .map(|key| text.find(key).unwrap())
            .collect();
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(order, sorted);
        assert!(text.ends_with('\n'));
    }
}
