use once_cell::sync::Lazy;
use regex::Regex;

static PERSON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<name>[^(<]+)\s?(?P<email><[^>]+>)?").unwrap());

static EMAIL_ONLY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?P<email><[^>]+>)").unwrap());

/// Split a `Name <email>` person string into its name and email.
///
/// Accepts `Name <email>`, `Name` and `<email>`.
pub fn parse_person(person: &str) -> (Option<String>, Option<String>) {
    let (name, email) = match PERSON_RE.captures(person) {
        Some(caps) => (
            caps.name("name").map(|m| m.as_str()),
            caps.name("email").map(|m| m.as_str()),
        ),
        None => (
            None,
            EMAIL_ONLY_RE
                .captures(person)
                .and_then(|caps| caps.name("email"))
                .map(|m| m.as_str()),
        ),
    };

    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);
    let email = email
        .map(|e| e.trim_matches(['<', '>', ' ']))
        .filter(|e| !e.is_empty())
        .map(str::to_string);

    (name, email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_email() {
        assert_eq!(
            parse_person("Barney Rubble <b@rubble.com>"),
            (Some("Barney Rubble".into()), Some("b@rubble.com".into()))
        );
    }

    #[test]
    fn name_only() {
        assert_eq!(parse_person("Barney Rubble"), (Some("Barney Rubble".into()), None));
    }

    #[test]
    fn email_only() {
        assert_eq!(parse_person("<b@rubble.com>"), (None, Some("b@rubble.com".into())));
    }

    #[test]
    fn parenthesized_url_is_not_part_of_name() {
        let (name, email) = parse_person("Jane Doe (https://jane.example)");
        assert_eq!(name.as_deref(), Some("Jane Doe"));
        assert_eq!(email, None);
    }

    proptest::proptest! {
        #[test]
        fn never_panics(s in "\\PC{0,40}") {
            let _ = parse_person(&s);
        }
    }
}
