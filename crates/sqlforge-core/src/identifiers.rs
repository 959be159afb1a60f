//! Textual SQL identifier quoting.
//!
//! Identifiers reach the compiler as free-form strings: bare column names,
//! `table.column` pairs, `table.*`, function calls such as `COUNT(id)` and
//! aliased forms such as `t.name AS label`. [`classify`] recognizes each shape
//! separately and [`quote_identifier`] quotes the identifier parts of the
//! recognized shapes. Anything unrecognized is returned unchanged so that raw
//! SQL fragments keep working.

use std::sync::OnceLock;

use regex::Regex;

/// The recognized shapes of an identifier string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierShape<'a> {
    /// `*` or the empty string
    Wildcard,
    /// `name`
    Bare(&'a str),
    /// `schema.table.column` (every segment is quoted)
    Dotted(&'a str),
    /// `table.*`
    TableWildcard(&'a str),
    /// `FUNC(args)` (only `args` is quoted, recursively)
    Function { name: &'a str, args: &'a str },
    /// `expr AS alias`
    Aliased { expr: &'a str, alias: &'a str },
    /// Anything else; passed through unchanged
    Unrecognized(&'a str),
}

fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn bare_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r"^[\w-]+$")
}

fn dotted_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r"^[\w-]+\.[^ \*]*$")
}

fn table_wildcard_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r"^([\w-]+)\.\*$")
}

fn function_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r"^([\w-]+)\((.*)\)$")
}

fn alias_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r"(?i)^([\w-]+(?:\.[\w\s-]+|\(.*\))*)\s+AS\s*([\w-]+)$")
}

fn matches(re: Option<&Regex>, text: &str) -> bool {
    re.is_some_and(|re| re.is_match(text))
}

/// Classify an identifier string. The input is trimmed first.
pub fn classify(identifier: &str) -> IdentifierShape<'_> {
    let ident = identifier.trim();
    if ident.is_empty() || ident == "*" {
        return IdentifierShape::Wildcard;
    }
    if matches(bare_re(), ident) {
        return IdentifierShape::Bare(ident);
    }
    if matches(dotted_re(), ident) {
        return IdentifierShape::Dotted(ident);
    }
    if let Some(caps) = table_wildcard_re().and_then(|re| re.captures(ident)) {
        if let Some(table) = caps.get(1) {
            return IdentifierShape::TableWildcard(table.as_str());
        }
    }
    if let Some(caps) = function_re().and_then(|re| re.captures(ident)) {
        if let (Some(name), Some(args)) = (caps.get(1), caps.get(2)) {
            return IdentifierShape::Function {
                name: name.as_str(),
                args: args.as_str(),
            };
        }
    }
    if let Some(caps) = alias_re().and_then(|re| re.captures(ident)) {
        if let (Some(expr), Some(alias)) = (caps.get(1), caps.get(2)) {
            return IdentifierShape::Aliased {
                expr: expr.as_str(),
                alias: alias.as_str(),
            };
        }
    }
    IdentifierShape::Unrecognized(ident)
}

/// Quote an identifier string with the given open/close quote characters.
///
/// # Examples
///
/// ```
/// use sqlforge_core::quote_identifier;
///
/// assert_eq!(quote_identifier("t.name AS alias", '`', '`'), "`t`.`name` AS `alias`");
/// assert_eq!(quote_identifier("COUNT(id)", '`', '`'), "COUNT(`id`)");
/// assert_eq!(quote_identifier("*", '`', '`'), "*");
/// ```
pub fn quote_identifier(identifier: &str, open: char, close: char) -> String {
    match classify(identifier) {
        IdentifierShape::Wildcard => identifier.trim().to_string(),
        IdentifierShape::Bare(name) => format!("{open}{name}{close}"),
        IdentifierShape::Dotted(path) => {
            let joined = path
                .split('.')
                .collect::<Vec<_>>()
                .join(&format!("{close}.{open}"));
            format!("{open}{joined}{close}")
        }
        IdentifierShape::TableWildcard(table) => format!("{open}{table}{close}.*"),
        IdentifierShape::Function { name, args } => {
            format!("{}({})", name, quote_identifier(args, open, close))
        }
        IdentifierShape::Aliased { expr, alias } => format!(
            "{} AS {}",
            quote_identifier(expr, open, close),
            quote_identifier(alias, open, close)
        ),
        IdentifierShape::Unrecognized(raw) => {
            tracing::trace!(identifier = raw, "identifier left unquoted");
            raw.to_string()
        }
    }
}

/// Quote a single name segment, doubling any embedded closing quote.
///
/// Unlike [`quote_identifier`] this does not interpret dots or parentheses;
/// use it for names that are known to be one identifier.
pub fn quote_name(name: &str, open: char, close: char) -> String {
    let escaped = name.replace(close, &format!("{close}{close}"));
    format!("{open}{escaped}{close}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> String {
        quote_identifier(s, '`', '`')
    }

    #[test]
    fn test_classify_shapes() {
        assert_eq!(classify("  * "), IdentifierShape::Wildcard);
        assert_eq!(classify(""), IdentifierShape::Wildcard);
        assert_eq!(classify("title"), IdentifierShape::Bare("title"));
        assert_eq!(classify("a.b"), IdentifierShape::Dotted("a.b"));
        assert_eq!(classify("a.*"), IdentifierShape::TableWildcard("a"));
        assert_eq!(
            classify("COUNT(id)"),
            IdentifierShape::Function {
                name: "COUNT",
                args: "id"
            }
        );
        assert_eq!(
            classify("t.name as label"),
            IdentifierShape::Aliased {
                expr: "t.name",
                alias: "label"
            }
        );
        assert_eq!(
            classify("a + b"),
            IdentifierShape::Unrecognized("a + b")
        );
    }

    #[test]
    fn test_quote_bare_and_dotted() {
        assert_eq!(q("foo"), "`foo`");
        assert_eq!(q(" foo "), "`foo`");
        assert_eq!(q("my-col"), "`my-col`");
        assert_eq!(q("t.foo"), "`t`.`foo`");
        assert_eq!(q("s.t.foo"), "`s`.`t`.`foo`");
        assert_eq!(quote_identifier("t.foo", '"', '"'), "\"t\".\"foo\"");
    }

    #[test]
    fn test_quote_table_wildcard() {
        assert_eq!(q("t.*"), "`t`.*");
        assert_eq!(q("*"), "*");
    }

    #[test]
    fn test_quote_function_args_only() {
        assert_eq!(q("COUNT(id)"), "COUNT(`id`)");
        assert_eq!(q("COUNT(*)"), "COUNT(*)");
        assert_eq!(q("LOWER(t.name)"), "LOWER(`t`.`name`)");
    }

    #[test]
    fn test_quote_alias() {
        assert_eq!(q("t.name AS alias"), "`t`.`name` AS `alias`");
        assert_eq!(q("name as n"), "`name` AS `n`");
        assert_eq!(q("COUNT(id) AS total"), "COUNT(`id`) AS `total`");
    }

    #[test]
    fn test_unrecognized_passes_through() {
        assert_eq!(q("a + b"), "a + b");
        assert_eq!(q("CASE WHEN x THEN 1 END"), "CASE WHEN x THEN 1 END");
    }

    #[test]
    fn test_quote_name_escapes() {
        assert_eq!(quote_name("user`name", '`', '`'), "`user``name`");
        assert_eq!(quote_name("a.b", '"', '"'), "\"a.b\"");
    }
}
