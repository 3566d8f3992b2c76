// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stylesheets and a small parser for them.
//!
//! The accepted syntax is a subset of CSS: `/* comments */`, comma-separated
//! selector lists, and `name: value [!important];` declarations. Names
//! starting with `--` declare named values that other declarations can
//! reference with `var(--name)`.

use std::sync::Arc;

use smol_str::SmolStr;

use super::property::StyleOrigin;
use super::selector::Selector;
use super::value::ParsedValue;
use crate::error::StyleError;

/// One `name: value` pair.
#[derive(Clone, Debug, PartialEq)]
pub struct Declaration {
    /// Property or named-value name.
    pub property: SmolStr,
    /// Declared value.
    pub value: ParsedValue,
    /// Whether the declaration was marked `!important`.
    pub important: bool,
}

/// A selector with its declarations.
///
/// A rule written with a selector list is split into one [`Rule`] per
/// selector; the split rules share their declarations.
#[derive(Clone, Debug)]
pub struct Rule {
    /// The selector.
    pub selector: Selector,
    /// The declarations, in source order.
    pub declarations: Arc<[Declaration]>,
}

/// An ordered list of rules from one origin.
#[derive(Clone, Debug)]
pub struct Stylesheet {
    /// Precedence tier of every rule in the sheet.
    pub origin: StyleOrigin,
    /// Rules in source order.
    pub rules: Vec<Rule>,
}

impl Stylesheet {
    /// Parses stylesheet text.
    pub fn parse(origin: StyleOrigin, text: &str) -> Result<Self, StyleError> {
        let text = strip_comments(text);
        let mut rules = Vec::new();
        let mut rest = text.as_str();
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            let open = rest
                .find('{')
                .ok_or_else(|| StyleError::Parse(format!("expected '{{' after {rest:?}")))?;
            let close = rest[open..]
                .find('}')
                .map(|i| open + i)
                .ok_or_else(|| StyleError::Parse("unterminated rule block".into()))?;
            let declarations: Arc<[Declaration]> =
                parse_declarations(&rest[open + 1..close])?.into();
            for part in rest[..open].split(',') {
                rules.push(Rule {
                    selector: Selector::parse(part.trim())?,
                    declarations: declarations.clone(),
                });
            }
            rest = &rest[close + 1..];
        }
        Ok(Self { origin, rules })
    }
}

/// Parses a declaration block body, as used for inline styles.
pub fn parse_declarations(text: &str) -> Result<Vec<Declaration>, StyleError> {
    let mut out = Vec::new();
    for decl in strip_comments(text).split(';') {
        let decl = decl.trim();
        if decl.is_empty() {
            continue;
        }
        let (name, value) = decl
            .split_once(':')
            .ok_or_else(|| StyleError::Parse(format!("expected ':' in {decl:?}")))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(StyleError::Parse(format!("missing property name in {decl:?}")));
        }
        let value = value.trim();
        let (value, important) = match value.strip_suffix("!important") {
            Some(v) => (v.trim_end(), true),
            None => (value, false),
        };
        if value.is_empty() {
            return Err(StyleError::Parse(format!("missing value for {name}")));
        }
        out.push(Declaration {
            property: SmolStr::new(name),
            value: ParsedValue::parse(value),
            important,
        });
    }
    Ok(out)
}

fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rules_and_selector_lists() {
        let sheet = Stylesheet::parse(
            StyleOrigin::Author,
            "/* base */ .a, .b:hover { opacity: 0.5; fill: red !important }\n leaf { --accent: #00f; }",
        )
        .unwrap();
        assert_eq!(sheet.rules.len(), 3);
        assert!(Arc::ptr_eq(
            &sheet.rules[0].declarations,
            &sheet.rules[1].declarations
        ));
        let decls = &sheet.rules[0].declarations;
        assert_eq!(decls[0].property, "opacity");
        assert!(decls[1].important);
        assert_eq!(sheet.rules[2].declarations[0].property, "--accent");
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(Stylesheet::parse(StyleOrigin::Author, ".a { opacity 1 }").is_err());
        assert!(Stylesheet::parse(StyleOrigin::Author, ".a { opacity: 1 ").is_err());
        assert!(Stylesheet::parse(StyleOrigin::Author, "{ opacity: 1 }").is_err());
    }

    #[test]
    fn inline_declarations() {
        let decls = parse_declarations("fill: #fff; padding: 1px 2px;").unwrap();
        assert_eq!(decls.len(), 2);
        assert!(matches!(decls[1].value, ParsedValue::List(_)));
    }
}
