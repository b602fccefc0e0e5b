//! License normalization from declared license strings to license keys.
//!
//! This is a lookup of well-known license names and SPDX ids, applied to
//! each operand of a simple `OR`/`AND`/`WITH` expression. Anything that is
//! not recognized becomes `unknown-license-reference`.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

pub const UNKNOWN: &str = "unknown";
pub const UNKNOWN_REFERENCE: &str = "unknown-license-reference";

static ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("mit", "mit"),
        ("mit license", "mit"),
        ("the mit license", "mit"),
        ("expat", "mit"),
        ("apache-2.0", "apache-2.0"),
        ("apache 2.0", "apache-2.0"),
        ("apache-2", "apache-2.0"),
        ("apache 2", "apache-2.0"),
        ("apache2", "apache-2.0"),
        ("asl 2.0", "apache-2.0"),
        ("apache license 2.0", "apache-2.0"),
        ("apache license, version 2.0", "apache-2.0"),
        ("apache license version 2.0", "apache-2.0"),
        ("apache software license", "apache-2.0"),
        ("apache-1.1", "apache-1.1"),
        ("bsd", "bsd-new"),
        ("bsd license", "bsd-new"),
        ("new bsd", "bsd-new"),
        ("new bsd license", "bsd-new"),
        ("modified bsd", "bsd-new"),
        ("bsd-3-clause", "bsd-new"),
        ("bsd 3-clause", "bsd-new"),
        ("bsd-2-clause", "bsd-simplified"),
        ("bsd 2-clause", "bsd-simplified"),
        ("simplified bsd", "bsd-simplified"),
        ("freebsd", "bsd-simplified"),
        ("0bsd", "bsd-zero"),
        ("isc", "isc"),
        ("isc license", "isc"),
        ("isc license (iscl)", "isc"),
        ("gpl", "gpl-1.0-plus"),
        ("gplv2", "gpl-2.0"),
        ("gpl-2.0", "gpl-2.0"),
        ("gpl-2.0-only", "gpl-2.0"),
        ("gpl-2.0+", "gpl-2.0-plus"),
        ("gpl-2.0-or-later", "gpl-2.0-plus"),
        ("gplv2+", "gpl-2.0-plus"),
        ("gnu general public license v2 (gplv2)", "gpl-2.0"),
        ("gnu general public license v2 or later (gplv2+)", "gpl-2.0-plus"),
        ("gplv3", "gpl-3.0"),
        ("gpl-3.0", "gpl-3.0"),
        ("gpl-3.0-only", "gpl-3.0"),
        ("gpl-3.0+", "gpl-3.0-plus"),
        ("gpl-3.0-or-later", "gpl-3.0-plus"),
        ("gplv3+", "gpl-3.0-plus"),
        ("gnu general public license v3 (gplv3)", "gpl-3.0"),
        ("gnu general public license v3 or later (gplv3+)", "gpl-3.0-plus"),
        ("lgpl", "lgpl-2.0-plus"),
        ("lgpl-2.1", "lgpl-2.1"),
        ("lgpl-2.1-only", "lgpl-2.1"),
        ("lgpl-2.1+", "lgpl-2.1-plus"),
        ("lgpl-2.1-or-later", "lgpl-2.1-plus"),
        ("lgpl-3.0", "lgpl-3.0"),
        ("lgpl-3.0-only", "lgpl-3.0"),
        ("lgpl-3.0+", "lgpl-3.0-plus"),
        ("lgpl-3.0-or-later", "lgpl-3.0-plus"),
        ("agpl-3.0", "agpl-3.0"),
        ("agpl-3.0-only", "agpl-3.0"),
        ("agpl-3.0-or-later", "agpl-3.0-plus"),
        ("mpl-2.0", "mpl-2.0"),
        ("mozilla public license 2.0 (mpl 2.0)", "mpl-2.0"),
        ("epl-1.0", "epl-1.0"),
        ("epl-2.0", "epl-2.0"),
        ("zlib", "zlib"),
        ("zlib/libpng license", "zlib"),
        ("unlicense", "unlicense"),
        ("the unlicense (unlicense)", "unlicense"),
        ("cc0", "cc0-1.0"),
        ("cc0-1.0", "cc0-1.0"),
        ("cc-by-4.0", "cc-by-4.0"),
        ("public domain", "public-domain"),
        ("psf", "python"),
        ("psf-2.0", "python"),
        ("python software foundation license", "python"),
        ("bsl-1.0", "boost-1.0"),
        ("boost software license 1.0 (bsl-1.0)", "boost-1.0"),
        ("wtfpl", "wtfpl-2.0"),
        ("artistic-2.0", "artistic-2.0"),
        ("unicode-dfs-2016", "unicode-dfs-2016"),
        ("llvm-exception", "llvm-exception"),
        ("classpath-exception-2.0", "classpath-exception-2.0"),
    ]
    .into_iter()
    .collect()
});

static OPERATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+(or|and|with)\s+|\s*/\s*|[()]").unwrap());

fn canonical_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn lookup(text: &str) -> Option<&'static str> {
    ALIASES.get(canonical_text(text).as_str()).copied()
}

/// Return a license expression for a declared license string, or `None`
/// when nothing in it is recognized.
///
/// The whole string is looked up first, so that multi-word names such as
/// `Apache License, Version 2.0` are not split on their punctuation.
/// Pieces with no operator between them, like `MIT (see LICENSE file)`,
/// are joined with `AND`.
pub fn normalize_license(declared: &str) -> Option<String> {
    let declared = declared.trim();
    if declared.is_empty() {
        return None;
    }
    if let Some(key) = lookup(declared) {
        return Some(key.to_string());
    }
    if declared.contains("://") && !declared.contains(char::is_whitespace) {
        // license URL, judged by its last path segment
        return declared
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .and_then(lookup)
            .map(str::to_string);
    }

    let tokens = tokenize(declared);
    let mut recognized = false;
    let expression = render_group(&mut tokens.iter(), false, &mut recognized);
    expression
        .filter(|_| recognized)
        .map(|(expression, _)| expression)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Operand(&'a str),
    Operator(&'static str),
    Open,
    Close,
}

fn tokenize(declared: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut last = 0;
    for m in OPERATOR_RE.find_iter(declared) {
        push_operand(&mut tokens, &declared[last..m.start()]);
        tokens.push(match m.as_str().trim().to_lowercase().as_str() {
            "(" => Token::Open,
            ")" => Token::Close,
            "and" => Token::Operator(" AND "),
            "with" => Token::Operator(" WITH "),
            _ => Token::Operator(" OR "),
        });
        last = m.end();
    }
    push_operand(&mut tokens, &declared[last..]);
    tokens
}

fn push_operand<'a>(tokens: &mut Vec<Token<'a>>, text: &'a str) {
    let text = text.trim();
    if !text.is_empty() {
        tokens.push(Token::Operand(text));
    }
}

/// Render tokens up to the closing parenthesis of a nested group, or to
/// the end. Returns the expression and how many operands it joins.
///
/// An operator is only written between two operands; dangling and
/// repeated operators are dropped.
fn render_group(
    tokens: &mut std::slice::Iter<'_, Token<'_>>,
    nested: bool,
    recognized: &mut bool,
) -> Option<(String, usize)> {
    let mut expression = String::new();
    let mut operands = 0;
    let mut operator: Option<&'static str> = None;

    while let Some(token) = tokens.next() {
        let operand = match *token {
            Token::Close if nested => break,
            // unbalanced
            Token::Close => continue,
            Token::Operator(op) => {
                if operands > 0 && operator.is_none() {
                    operator = Some(op);
                }
                continue;
            }
            Token::Open => match render_group(tokens, true, recognized) {
                Some((inner, 1)) => inner,
                Some((inner, _)) => format!("({inner})"),
                None => continue,
            },
            Token::Operand(text) => match lookup(text) {
                Some(key) => {
                    *recognized = true;
                    key.to_string()
                }
                None => UNKNOWN_REFERENCE.to_string(),
            },
        };

        if operands > 0 {
            expression.push_str(operator.take().unwrap_or(" AND "));
        }
        expression.push_str(&operand);
        operands += 1;
    }

    (operands > 0).then_some((expression, operands))
}

/// Combine several license expressions with `AND`, dropping duplicates and
/// keeping the first-seen order. Compound expressions are parenthesized.
pub fn combine_expressions<S: AsRef<str>>(expressions: &[S]) -> Option<String> {
    let mut unique: Vec<&str> = Vec::new();
    for expr in expressions {
        let expr = expr.as_ref().trim();
        if !expr.is_empty() && !unique.contains(&expr) {
            unique.push(expr);
        }
    }

    match unique.len() {
        0 => None,
        1 => Some(unique[0].to_string()),
        _ => Some(
            unique
                .iter()
                .map(|e| {
                    if e.contains(' ') && !(e.starts_with('(') && e.ends_with(')')) {
                        format!("({e})")
                    } else {
                        e.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(" AND "),
        ),
    }
}
