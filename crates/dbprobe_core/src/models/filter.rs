//! Name filtering for catalog, schema and table selection.
//!
//! Patterns use SQL `LIKE` syntax: `%` matches any run of characters, `_`
//! matches exactly one, and a backslash escapes the next character. Matching
//! is case-sensitive, like PostgreSQL's `LIKE`.

use crate::models::config::IntrospectionConfig;
use crate::models::schema::TableId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyOne,
    AnyRun,
}

/// A compiled SQL `LIKE` pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    raw: String,
    tokens: Vec<Token>,
}

impl NamePattern {
    /// Compile a pattern.
    pub fn new(pattern: impl Into<String>) -> Self {
        let raw = pattern.into();
        let mut tokens = Vec::with_capacity(raw.len());
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            let token = match c {
                '%' => Token::AnyRun,
                '_' => Token::AnyOne,
                '\\' => Token::Literal(chars.next().unwrap_or('\\')),
                other => Token::Literal(other),
            };
            // consecutive `%` are equivalent to one
            if token == Token::AnyRun && tokens.last() == Some(&Token::AnyRun) {
                continue;
            }
            tokens.push(token);
        }
        Self { raw, tokens }
    }

    /// The pattern text as given, suitable for pushing down into a `LIKE`.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the pattern matches every name.
    pub fn is_match_all(&self) -> bool {
        self.tokens == [Token::AnyRun]
    }

    /// Test a name against the pattern.
    pub fn matches(&self, name: &str) -> bool {
        let text: Vec<char> = name.chars().collect();
        let (mut t, mut p) = (0, 0);
        // last `%` seen: (pattern index, text index it was tried at)
        let mut backtrack: Option<(usize, usize)> = None;

        while t < text.len() {
            match self.tokens.get(p) {
                Some(Token::AnyRun) => {
                    backtrack = Some((p, t));
                    p += 1;
                }
                Some(Token::AnyOne) => {
                    p += 1;
                    t += 1;
                }
                Some(Token::Literal(c)) if *c == text[t] => {
                    p += 1;
                    t += 1;
                }
                _ => match backtrack {
                    Some((star_p, star_t)) => {
                        p = star_p + 1;
                        t = star_t + 1;
                        backtrack = Some((star_p, star_t + 1));
                    }
                    None => return false,
                },
            }
        }

        self.tokens[p..].iter().all(|token| *token == Token::AnyRun)
    }
}

/// Catalog, schema and table restrictions for a run.
///
/// An absent pattern places no restriction. A table whose catalog or schema
/// is unknown (e.g. SQLite has no catalogs) is not rejected by the
/// corresponding pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaFilter {
    /// Catalog pattern
    pub catalog: Option<NamePattern>,
    /// Schema pattern
    pub schema: Option<NamePattern>,
    /// Table pattern
    pub table: Option<NamePattern>,
}

impl SchemaFilter {
    /// A filter that accepts every table.
    pub fn all() -> Self {
        Self::default()
    }

    /// Build the filter from configured patterns.
    pub fn from_config(config: &IntrospectionConfig) -> Self {
        Self {
            catalog: config.catalog_pattern.as_deref().map(NamePattern::new),
            schema: config.schema_pattern.as_deref().map(NamePattern::new),
            table: config.table_pattern.as_deref().map(NamePattern::new),
        }
    }

    /// Restrict schemas.
    pub fn with_schema(mut self, pattern: &str) -> Self {
        self.schema = Some(NamePattern::new(pattern));
        self
    }

    /// Restrict tables.
    pub fn with_table(mut self, pattern: &str) -> Self {
        self.table = Some(NamePattern::new(pattern));
        self
    }

    /// Schema pattern text for drivers that push it into SQL, `%` if unset.
    pub fn schema_like(&self) -> &str {
        self.schema.as_ref().map_or("%", NamePattern::as_str)
    }

    /// Table pattern text for drivers that push it into SQL, `%` if unset.
    pub fn table_like(&self) -> &str {
        self.table.as_ref().map_or("%", NamePattern::as_str)
    }

    /// Test a table identity against every pattern.
    pub fn matches(&self, id: &TableId) -> bool {
        fn part_matches(pattern: &Option<NamePattern>, value: Option<&str>) -> bool {
            match (pattern, value) {
                (Some(pattern), Some(value)) => pattern.matches(value),
                _ => true,
            }
        }

        part_matches(&self.catalog, id.catalog.as_deref())
            && part_matches(&self.schema, id.schema.as_deref())
            && part_matches(&self.table, Some(&id.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_pattern() {
        let p = NamePattern::new("users");
        assert!(p.matches("users"));
        assert!(!p.matches("user"));
        assert!(!p.matches("Users"));
        assert!(!p.matches("users_archive"));
    }

    #[test]
    fn test_percent_matches_any_run() {
        let p = NamePattern::new("user%");
        assert!(p.matches("user"));
        assert!(p.matches("users"));
        assert!(p.matches("user_roles"));
        assert!(!p.matches("app_users"));

        let p = NamePattern::new("%_log%");
        assert!(p.matches("audit_log"));
        assert!(p.matches("x_logs_2024"));
        assert!(!p.matches("log"));
    }

    #[test]
    fn test_underscore_matches_one_char() {
        let p = NamePattern::new("t_");
        assert!(p.matches("t1"));
        assert!(!p.matches("t"));
        assert!(!p.matches("t12"));
    }

    #[test]
    fn test_backtracking_over_repeated_prefix() {
        let p = NamePattern::new("%ab%abc");
        assert!(p.matches("xxabyyabababc"));
        assert!(!p.matches("xxabyyababab"));
    }

    #[test]
    fn test_escaped_wildcards_are_literal() {
        let p = NamePattern::new(r"order\_items");
        assert!(p.matches("order_items"));
        assert!(!p.matches("orderXitems"));

        let p = NamePattern::new(r"100\%");
        assert!(p.matches("100%"));
        assert!(!p.matches("1000"));
    }

    #[test]
    fn test_match_all() {
        assert!(NamePattern::new("%").is_match_all());
        assert!(NamePattern::new("%%").is_match_all());
        assert!(NamePattern::new("%").matches(""));
        assert!(!NamePattern::new("a%").is_match_all());
    }

    #[test]
    fn test_filter_ignores_unknown_qualifiers() {
        let filter = SchemaFilter::all().with_schema("public");
        assert!(filter.matches(&TableId::new(None, Some("public".into()), "users")));
        assert!(!filter.matches(&TableId::new(None, Some("audit".into()), "users")));
        assert!(filter.matches(&TableId::named("users")));
    }

    #[test]
    fn test_filter_from_config() {
        let config = IntrospectionConfig::builder()
            .url("sqlite::memory:")
            .table_pattern("ord%")
            .build()
            .unwrap();
        let filter = SchemaFilter::from_config(&config);
        assert_eq!(filter.table_like(), "ord%");
        assert_eq!(filter.schema_like(), "%");
        assert!(filter.matches(&TableId::named("orders")));
        assert!(!filter.matches(&TableId::named("users")));
    }
}
