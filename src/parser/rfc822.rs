use std::collections::HashMap;

/// Headers and body of an RFC 822 style metadata file (`PKG-INFO`,
/// `METADATA`).
#[derive(Debug, Clone, Default)]
pub struct Rfc822Metadata {
    headers: HashMap<String, Vec<String>>,
    pub body: String,
}

impl Rfc822Metadata {
    /// First non-empty value of a header. Header names are case-insensitive.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of a repeatable header, in file order.
    pub fn all(&self, name: &str) -> &[String] {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Parse headers up to the first blank line; the rest is the body.
///
/// Continuation lines (starting with a space or tab) extend the previous
/// header with a newline, which keeps multi-line `Description` headers
/// readable. Empty values are dropped.
pub fn parse(content: &str) -> Rfc822Metadata {
    let mut metadata = Rfc822Metadata::default();
    let mut current: Option<(String, String)> = None;
    let mut body_lines: Vec<&str> = Vec::new();
    let mut in_headers = true;

    for line in content.lines() {
        if !in_headers {
            body_lines.push(line);
            continue;
        }

        if line.trim().is_empty() {
            flush(&mut metadata, current.take());
            in_headers = false;
            continue;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some((_, value)) = current.as_mut() {
                value.push('\n');
                value.push_str(continuation_text(line));
            }
            continue;
        }

        flush(&mut metadata, current.take());
        if let Some((name, value)) = line.split_once(':') {
            current = Some((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }
    flush(&mut metadata, current.take());

    metadata.body = body_lines.join("\n").trim_end().to_string();
    metadata
}

fn continuation_text(line: &str) -> &str {
    // setuptools indents description lines with 8 spaces and a pipe
    let text = line.trim_start();
    text.strip_prefix("| ")
        .or_else(|| text.strip_prefix('|'))
        .unwrap_or(text)
}

fn flush(metadata: &mut Rfc822Metadata, header: Option<(String, String)>) {
    if let Some((name, value)) = header {
        let value = value.trim_end();
        if !value.is_empty() {
            metadata
                .headers
                .entry(name)
                .or_default()
                .push(value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PKG_INFO: &str = "Metadata-Version: 2.1
Name: sample
Version: 1.2.0
Summary: A sample project
Classifier: Programming Language :: Python :: 3
Classifier: License :: OSI Approved :: MIT License
Keywords: sample,demo
Author:

Long description
spanning lines.
";

    #[test]
    fn reads_headers_and_body() {
        let meta = parse(PKG_INFO);
        assert_eq!(meta.first("name"), Some("sample"));
        assert_eq!(meta.first("Version"), Some("1.2.0"));
        assert_eq!(meta.all("classifier").len(), 2);
        assert_eq!(meta.first("author"), None);
        assert_eq!(meta.body, "Long description\nspanning lines.");
    }

    #[test]
    fn folds_continuation_lines() {
        let meta = parse("Name: x\nDescription: first\n        |second\n        | third\n");
        assert_eq!(meta.first("description"), Some("first\nsecond\nthird"));
        assert!(meta.body.is_empty());
    }

    proptest::proptest! {
        #[test]
        fn never_panics(s in "\\PC{0,200}") {
            let _ = parse(&s);
        }
    }
}
