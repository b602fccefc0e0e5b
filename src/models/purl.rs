//! Package URL helpers: building purl strings and package/dependency uids.
//!
//! A uid is a purl with an extra `uuid` qualifier, which keeps it readable
//! while making it unique across several packages with the same purl.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use packageurl::PackageUrl;
use regex::Regex;

/// Components of a purl. Only `package_type` and `name` are required.
#[derive(Debug, Clone, Copy, Default)]
pub struct PurlParts<'a> {
    pub package_type: Option<&'a str>,
    pub namespace: Option<&'a str>,
    pub name: Option<&'a str>,
    pub version: Option<&'a str>,
    pub qualifiers: Option<&'a BTreeMap<String, String>>,
    pub subpath: Option<&'a str>,
}

/// Build a canonical purl string, or `None` when type or name is missing
/// or rejected.
pub fn build(parts: PurlParts<'_>) -> Option<String> {
    let package_type = parts.package_type.filter(|t| !t.is_empty())?;
    let name = parts.name.filter(|n| !n.is_empty())?;

    let mut purl = match PackageUrl::new(package_type, name) {
        Ok(purl) => purl,
        Err(e) => {
            tracing::debug!(package_type, name, error = %e, "cannot build purl");
            return None;
        }
    };

    if let Some(namespace) = parts.namespace.filter(|n| !n.is_empty()) {
        purl.with_namespace(namespace);
    }
    if let Some(version) = parts.version.filter(|v| !v.is_empty()) {
        purl.with_version(version);
    }
    // Rejected qualifiers and subpaths are left out of the purl
    if let Some(qualifiers) = parts.qualifiers {
        for (key, value) in qualifiers {
            if let Err(e) = purl.add_qualifier(key.as_str(), value.as_str()) {
                tracing::debug!(name, qualifier = %key, error = %e, "qualifier dropped from purl");
            }
        }
    }
    if let Some(subpath) = parts.subpath.filter(|s| !s.is_empty()) {
        if let Err(e) = purl.with_subpath(subpath) {
            tracing::debug!(name, subpath, error = %e, "subpath dropped from purl");
        }
    }

    Some(purl.to_string())
}

/// Shortcut for the common `pkg:<type>/<name>[@<version>]` case.
pub fn simple(package_type: &str, name: &str, version: Option<&str>) -> Option<String> {
    build(PurlParts {
        package_type: Some(package_type),
        name: Some(name),
        version,
        ..Default::default()
    })
}

/// Return a uid for `purl`: the purl with a fresh random `uuid` qualifier.
pub fn with_uuid(purl: &str) -> String {
    with_given_uuid(purl, &uuid::Uuid::new_v4().to_string())
}

fn with_given_uuid(purl: &str, uuid: &str) -> String {
    let (head, subpath) = match purl.split_once('#') {
        Some((head, subpath)) => (head, Some(subpath)),
        None => (purl, None),
    };
    let sep = if head.contains('?') { '&' } else { '?' };
    let mut uid = format!("{head}{sep}uuid={uuid}");
    if let Some(subpath) = subpath {
        uid.push('#');
        uid.push_str(subpath);
    }
    uid
}

static UUID_QUALIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([?&])uuid=[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}(&?)")
        .unwrap()
});

/// Remove the `uuid` qualifier from a uid, giving back the plain purl.
///
/// Strings without a uuid qualifier are returned unchanged.
pub fn strip_uuid(uid: &str) -> String {
    UUID_QUALIFIER_RE
        .replace(uid, |caps: &regex::Captures<'_>| {
            let lead = &caps[1];
            let trail = &caps[2];
            match (lead, trail) {
                // `?uuid=...&rest` keeps the `?` for the rest
                ("?", "&") => "?".to_string(),
                // `&uuid=...&rest` keeps one `&`
                ("&", "&") => "&".to_string(),
                _ => String::new(),
            }
        })
        .into_owned()
}

/// Replace the uuid of a uid by a fixed placeholder.
pub fn mask_uuid(uid: &str) -> String {
    let plain = strip_uuid(uid);
    if plain == uid {
        return plain;
    }
    with_given_uuid(&plain, "00000000-0000-0000-0000-000000000000")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_simple_purl() {
        assert_eq!(
            simple("cargo", "serde", Some("1.0.0")).as_deref(),
            Some("pkg:cargo/serde@1.0.0")
        );
        assert_eq!(simple("bower", "jquery", None).as_deref(), Some("pkg:bower/jquery"));
    }

    #[test]
    fn missing_name_has_no_purl() {
        let parts = PurlParts {
            package_type: Some("cargo"),
            ..Default::default()
        };
        assert!(build(parts).is_none());
        assert!(simple("cargo", "", None).is_none());
    }

    #[test]
    fn rejected_components_are_left_out() {
        let mut qualifiers = BTreeMap::new();
        qualifiers.insert("1bad".to_string(), "x".to_string());
        qualifiers.insert("extension".to_string(), "tar.gz".to_string());
        let parts = PurlParts {
            package_type: Some("pypi"),
            name: Some("foo"),
            version: Some("1.0"),
            qualifiers: Some(&qualifiers),
            subpath: Some("src/../etc"),
            ..Default::default()
        };
        assert_eq!(build(parts).as_deref(), Some("pkg:pypi/foo@1.0?extension=tar.gz"));
    }

    #[test]
    fn uid_round_trips_to_purl() {
        let uid = with_uuid("pkg:cargo/serde@1.0.0");
        assert!(uid.starts_with("pkg:cargo/serde@1.0.0?uuid="));
        assert_eq!(strip_uuid(&uid), "pkg:cargo/serde@1.0.0");
    }

    #[test]
    fn uid_keeps_other_qualifiers_and_subpath() {
        let uid = with_given_uuid(
            "pkg:pypi/foo@1.0?extension=tar.gz#src/foo",
            "0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0",
        );
        assert_eq!(
            uid,
            "pkg:pypi/foo@1.0?extension=tar.gz&uuid=0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0#src/foo"
        );
        assert_eq!(strip_uuid(&uid), "pkg:pypi/foo@1.0?extension=tar.gz#src/foo");
    }

    #[test]
    fn strip_keeps_following_qualifiers() {
        let uid = "pkg:a/b?uuid=0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0&z=1";
        assert_eq!(strip_uuid(uid), "pkg:a/b?z=1");
    }

    #[test]
    fn mask_is_stable() {
        let a = mask_uuid(&with_uuid("pkg:bower/x"));
        let b = mask_uuid(&with_uuid("pkg:bower/x"));
        assert_eq!(a, b);
        assert_eq!(mask_uuid("pkg:bower/x"), "pkg:bower/x");
    }

    proptest::proptest! {
        #[test]
        fn strip_is_idempotent(name in "[a-z][a-z0-9-]{0,12}", version in "[0-9]\\.[0-9]{1,3}") {
            let purl = format!("pkg:cargo/{name}@{version}");
            let once = strip_uuid(&with_uuid(&purl));
            proptest::prop_assert_eq!(&once, &purl);
            proptest::prop_assert_eq!(strip_uuid(&once), purl);
        }
    }
}
