//! Translation of ignore rules into anchored regular expressions.
//!
//! A rule is lexed into [`Token`]s first, so user escapes (`\*`, `\!`, `\ `)
//! become literal tokens before any wildcard handling. The token stream is
//! then anchored and emitted as a single `^...$` expression.
//!
//! | rule fragment | expression |
//! |---|---|
//! | `*` | run of characters other than `/` and line-breaking whitespace |
//! | `**` | any run of characters, crossing separators |
//! | `/**/` | `/` or `/<anything>/` |
//! | `?` | exactly one character |
//! | `[!a-z]` | `[^a-z]` |
//! | leading `/` or `*/` | rooted, no any-depth prefix |
//! | trailing `/` | directory only, something must follow |
//! | trailing `/*` | direct children only |

use regex::Regex;

use crate::error::PatternError;

/// Matches any number of leading directories.
const ANY_PREFIX: &str = r"(?:[\S\s]+/)*";

/// Matches the node itself and everything under it.
const ANY_SUFFIX: &str = r"(?:/[\S\s]+)*";

/// Matches only entries strictly under the node.
const DIR_SUFFIX: &str = r"(?:/[\S\s]+)+";

/// A single `*`.
const WILDCARD: &str = r"[^\f\n\r\t\v\x{00A0}\x{2028}\x{2029}/]*";

/// `**` anywhere other than between separators.
const GLOBSTAR: &str = r"[\S\s]*";

/// `/**/`: zero or more intermediate segments.
const INNER_GLOBSTAR: &str = r"(?:/|/[\S\s]+/)";

/// A lexed piece of an ignore rule.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyChar,
    Star,
    Globstar,
    Separator,
    /// A bracket expression, already in regex syntax.
    Class(String),
}

/// A compiled ignore rule.
///
/// Owned by a [`PatternSet`]; immutable once compiled.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    inclusive: bool,
    source_order: usize,
    source: String,
}

impl Pattern {
    /// Returns `true` if `path` matches this rule.
    #[inline]
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Returns `true` for negated (`!`) rules, which re-include paths.
    #[inline]
    #[must_use]
    pub const fn is_inclusive(&self) -> bool {
        self.inclusive
    }

    /// Position of this rule within its [`PatternSet`].
    #[inline]
    #[must_use]
    pub const fn source_order(&self) -> usize {
        self.source_order
    }

    /// The rule as written, trimmed.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The compiled expression.
    #[inline]
    #[must_use]
    pub fn as_regex_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Compiles rule lines into [`Pattern`]s, optionally scoped to a subtree.
///
/// A compiler created with [`PatternCompiler::scoped`] anchors every rule
/// under its prefix, which is how rules from a nested ignore file apply only
/// to the directory that holds it.
///
/// # Examples
///
/// ```
/// use fs_ignore::PatternCompiler;
///
/// let compiler = PatternCompiler::new();
/// let pattern = compiler.compile("*.o")?.unwrap();
/// assert!(pattern.is_match("src/main.o"));
/// assert!(!pattern.is_inclusive());
///
/// assert!(compiler.compile("# comment")?.is_none());
/// # Ok::<(), fs_ignore::PatternError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct PatternCompiler {
    scope: String,
}

impl PatternCompiler {
    /// Creates a compiler for rules relative to the tree root.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a compiler whose rules are anchored under `prefix`.
    ///
    /// Leading and trailing separators on `prefix` are ignored.
    #[must_use]
    pub fn scoped(prefix: &str) -> Self {
        Self {
            scope: prefix.trim_matches('/').to_owned(),
        }
    }

    /// The directory this compiler anchors rules under; empty for the root.
    #[inline]
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Compiles one rule line.
    ///
    /// Returns `Ok(None)` for blank lines, comments, and rules that reduce to
    /// `/`, `*`, or `**` once the scope prefix is applied.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Compile`] if the translated expression is
    /// rejected, for example a reversed range in a bracket expression.
    pub fn compile(&self, line: &str) -> Result<Option<Pattern>, PatternError> {
        let rule = trim_rule(line);
        if rule.is_empty() || rule.starts_with('#') {
            return Ok(None);
        }

        let (inclusive, rule) = match rule.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, rule),
        };
        if matches!(rule, "" | "/") {
            return Ok(None);
        }

        let scoped;
        let rule = if self.scope.is_empty() {
            rule
        } else {
            scoped = format!("/{}/{}", self.scope, rule.trim_start_matches('/'));
            scoped.as_str()
        };
        // Only unscoped `*` and `**` are degenerate; under a scope they cover
        // the scoped directory.
        if matches!(rule, "*" | "**") {
            return Ok(None);
        }

        let Some(expr) = translate(rule) else {
            return Ok(None);
        };
        let source = trim_rule(line).to_owned();
        let regex = Regex::new(&expr).map_err(|err| PatternError::compile(source.clone(), err))?;
        tracing::trace!(rule = %source, expr = %regex.as_str(), inclusive, "compiled ignore rule");

        Ok(Some(Pattern {
            regex,
            inclusive,
            source_order: 0,
            source,
        }))
    }
}

/// An ordered sequence of [`Pattern`]s.
///
/// Insertion order is significant: when several rules match, the later one
/// decides. The set is never reordered.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Creates an empty set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `lines` relative to the tree root.
    ///
    /// # Errors
    ///
    /// Returns the first [`PatternError`] encountered.
    pub fn from_lines<I>(lines: I) -> Result<Self, PatternError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut set = Self::new();
        set.extend_lines(&PatternCompiler::new(), lines)?;
        Ok(set)
    }

    /// Compiles `lines` with `compiler` and appends the results.
    ///
    /// # Errors
    ///
    /// Returns the first [`PatternError`] encountered. Rules compiled before
    /// the failing one stay in the set.
    pub fn extend_lines<I>(&mut self, compiler: &PatternCompiler, lines: I) -> Result<(), PatternError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for line in lines {
            if let Some(pattern) = compiler.compile(line.as_ref())? {
                self.push(pattern);
            }
        }
        Ok(())
    }

    /// Appends `pattern`, assigning its [`source_order`](Pattern::source_order).
    pub fn push(&mut self, mut pattern: Pattern) {
        pattern.source_order = self.patterns.len();
        self.patterns.push(pattern);
    }

    /// Number of rules in the set.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns `true` if the set holds no rules.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Iterates the rules in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Pattern> {
        self.patterns.iter()
    }
}

impl<'a> IntoIterator for &'a PatternSet {
    type Item = &'a Pattern;
    type IntoIter = std::slice::Iter<'a, Pattern>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Trims surrounding whitespace but keeps a trailing escaped space (`foo\ `).
fn trim_rule(line: &str) -> &str {
    let start = line.trim_start();
    let trimmed = start.trim_end();
    let backslashes = trimmed.chars().rev().take_while(|&c| c == '\\').count();
    if backslashes % 2 == 1 {
        if let Some(space) = start[trimmed.len()..].chars().next() {
            return &start[..trimmed.len() + space.len_utf8()];
        }
    }
    trimmed
}

fn tokenize(rule: &str) -> Vec<Token> {
    let chars: Vec<char> = rule.chars().collect();
    let mut tokens = Vec::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                // A lone trailing backslash matches itself.
                tokens.push(Token::Literal(chars.get(i + 1).copied().unwrap_or('\\')));
                i += 2;
            }
            '*' => {
                let run = chars[i..].iter().take_while(|&&c| c == '*').count();
                tokens.push(if run == 1 { Token::Star } else { Token::Globstar });
                i += run;
            }
            '?' => {
                tokens.push(Token::AnyChar);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Separator);
                i += 1;
            }
            '[' => match parse_class(&chars[i..]) {
                Some((class, consumed)) => {
                    tokens.push(Token::Class(class));
                    i += consumed;
                }
                None => {
                    tokens.push(Token::Literal('['));
                    i += 1;
                }
            },
            c => {
                tokens.push(Token::Literal(c));
                i += 1;
            }
        }
    }
    tokens
}

/// Parses a bracket expression starting at `chars[0] == '['`.
///
/// Returns the regex class and the number of characters consumed, or `None`
/// if the bracket is never closed.
fn parse_class(chars: &[char]) -> Option<(String, usize)> {
    let mut class = String::from("[");
    let mut i = 1;
    if matches!(chars.get(i), Some('!' | '^')) {
        class.push('^');
        i += 1;
    }
    let body_start = i;
    loop {
        match *chars.get(i)? {
            // A `]` right after the opening bracket is a member, not the end.
            ']' if i > body_start => {
                class.push(']');
                return Some((class, i + 1));
            }
            '\\' => {
                let escaped = *chars.get(i + 1)?;
                push_escaped(&mut class, escaped);
                i += 2;
            }
            c @ ('[' | ']' | '&' | '~' | '^') => {
                class.push('\\');
                class.push(c);
                i += 1;
            }
            c => {
                class.push(c);
                i += 1;
            }
        }
    }
}

fn push_escaped(expr: &mut String, c: char) {
    let mut buf = [0u8; 4];
    expr.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

/// Turns a rule (polarity and scope already applied) into an expression.
///
/// Returns `None` if nothing is left to match after anchoring.
fn translate(rule: &str) -> Option<String> {
    let mut tokens = tokenize(rule);

    let rooted = match tokens.as_slice() {
        [Token::Separator, ..] => {
            tokens.remove(0);
            true
        }
        [Token::Star, Token::Separator, ..] => true,
        [Token::Globstar, Token::Separator, ..] => {
            tokens.drain(..2);
            false
        }
        _ => false,
    };

    let suffix = if tokens.last() == Some(&Token::Separator) {
        tokens.pop();
        DIR_SUFFIX
    } else if tokens.ends_with(&[Token::Separator, Token::Globstar]) {
        tokens.truncate(tokens.len() - 2);
        ANY_SUFFIX
    } else if tokens.ends_with(&[Token::Separator, Token::Star]) {
        ""
    } else {
        ANY_SUFFIX
    };

    if tokens.is_empty() {
        return None;
    }

    let mut expr = String::from("^");
    if !rooted {
        expr.push_str(ANY_PREFIX);
    }

    let mut rest = tokens.as_slice();
    while let Some((token, tail)) = rest.split_first() {
        if let [Token::Separator, Token::Globstar, Token::Separator, after @ ..] = rest {
            expr.push_str(INNER_GLOBSTAR);
            rest = after;
            continue;
        }
        match token {
            Token::Literal(c) => push_escaped(&mut expr, *c),
            Token::AnyChar => expr.push('.'),
            Token::Star => expr.push_str(WILDCARD),
            Token::Globstar => expr.push_str(GLOBSTAR),
            Token::Separator => expr.push('/'),
            Token::Class(class) => expr.push_str(class),
        }
        rest = tail;
    }

    expr.push_str(suffix);
    expr.push('$');
    Some(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: &str = WILDCARD;

    fn compile(line: &str) -> Pattern {
        PatternCompiler::new().compile(line).unwrap().unwrap()
    }

    fn expr(line: &str) -> String {
        compile(line).as_regex_str().to_owned()
    }

    #[test]
    fn test_blank_and_comment_lines() {
        let compiler = PatternCompiler::new();
        assert!(compiler.compile("").unwrap().is_none());
        assert!(compiler.compile("   \t").unwrap().is_none());
        assert!(compiler.compile("# a comment").unwrap().is_none());
        assert!(compiler.compile("  # indented comment").unwrap().is_none());
    }

    #[test]
    fn test_degenerate_rules_yield_nothing() {
        let compiler = PatternCompiler::new();
        for line in ["/", "*", "**", "!", "!*", "**/"] {
            assert!(compiler.compile(line).unwrap().is_none(), "{line}");
        }
    }

    #[test]
    fn test_polarity() {
        assert!(!compile("foo").is_inclusive());
        assert!(compile("!foo").is_inclusive());
        assert!(!compile(r"\!foo").is_inclusive());
    }

    #[test]
    fn test_plain_name_matches_at_any_depth() {
        insta::assert_snapshot!(expr("logs"), @r"^(?:[\S\s]+/)*logs(?:/[\S\s]+)*$");
        let pattern = compile("logs");
        assert!(pattern.is_match("logs"));
        assert!(pattern.is_match("a/b/logs"));
        assert!(pattern.is_match("logs/today.txt"));
        assert!(!pattern.is_match("mylogs"));
    }

    #[test]
    fn test_directory_only_rules() {
        insta::assert_snapshot!(expr("/lib/"), @r"^lib(?:/[\S\s]+)+$");
        insta::assert_snapshot!(expr("lib/"), @r"^(?:[\S\s]+/)*lib(?:/[\S\s]+)+$");

        let pattern = compile("lib/");
        assert!(pattern.is_match("lib/a.so"));
        assert!(pattern.is_match("x/lib/a.so"));
        assert!(!pattern.is_match("lib"));
    }

    #[test]
    fn test_leading_star_segment_is_rooted() {
        assert_eq!(expr("*/*.jpg"), format!(r"^{W}/{W}\.jpg(?:/[\S\s]+)*$"));
        assert_eq!(expr("/*.c"), format!(r"^{W}\.c(?:/[\S\s]+)*$"));
        assert!(!compile("*/*.jpg").is_match("a/b/c.jpg"));
        assert!(compile("*/*.jpg").is_match("a/c.jpg"));
    }

    #[test]
    fn test_trailing_star_segment_matches_direct_children() {
        assert_eq!(
            expr("/git-sample-3/foo/*"),
            format!(r"^git\-sample\-3/foo/{W}$")
        );
        let pattern = compile("/git-sample-3/foo/*");
        assert!(pattern.is_match("git-sample-3/foo/bar"));
        assert!(!pattern.is_match("git-sample-3/foo/bar/baz"));
    }

    #[test]
    fn test_globstars() {
        let pattern = compile("a/**/b");
        assert_eq!(pattern.as_regex_str(), r"^(?:[\S\s]+/)*a(?:/|/[\S\s]+/)b(?:/[\S\s]+)*$");
        assert!(pattern.is_match("a/b"));
        assert!(pattern.is_match("a/x/y/b"));
        assert!(!pattern.is_match("ab"));

        let leading = compile("**/foo");
        assert!(leading.is_match("foo"));
        assert!(leading.is_match("deep/er/foo"));

        let trailing = compile("build/**");
        assert!(trailing.is_match("build"));
        assert!(trailing.is_match("build/out/x.o"));

        let inner = compile("a**z");
        assert!(inner.is_match("a/b/c/z"));
    }

    #[test]
    fn test_star_stops_at_separator_and_whitespace() {
        let pattern = compile("/a*b");
        assert!(pattern.is_match("aXYZb"));
        assert!(!pattern.is_match("a/b"));
        assert!(!pattern.is_match("a\tb"));
        assert!(!pattern.is_match("a\u{00A0}b"));
        assert!(pattern.is_match("a b"));
    }

    #[test]
    fn test_question_mark_is_one_character() {
        let pattern = compile("/file?.txt");
        assert!(pattern.is_match("file1.txt"));
        assert!(!pattern.is_match("file.txt"));
        assert!(!pattern.is_match("file12.txt"));
    }

    #[test]
    fn test_escapes_are_literal() {
        let pattern = compile(r"/\*star\?.txt");
        assert!(pattern.is_match("*star?.txt"));
        assert!(!pattern.is_match("xstarx.txt"));

        let hash = compile(r"\#notacomment");
        assert!(hash.is_match("#notacomment"));

        let backslash = compile(r"/a\\b");
        assert!(backslash.is_match(r"a\b"));
    }

    #[test]
    fn test_trailing_escaped_space_survives_trim() {
        let pattern = compile("/trailing\\  ");
        assert_eq!(pattern.source(), "/trailing\\ ");
        assert!(pattern.is_match("trailing "));
        assert!(!pattern.is_match("trailing"));
    }

    #[test]
    fn test_regex_metacharacters_are_escaped() {
        let pattern = compile("/a+b(c).d");
        assert!(pattern.is_match("a+b(c).d"));
        assert!(!pattern.is_match("aab(c)xd"));
    }

    #[test]
    fn test_character_classes() {
        let pattern = compile("*.[oa]");
        assert!(pattern.is_match("lib.a"));
        assert!(pattern.is_match("x/main.o"));
        assert!(!pattern.is_match("main.c"));

        let negated = compile("/file[!0-9]");
        assert!(negated.is_match("filex"));
        assert!(!negated.is_match("file5"));

        let unclosed = compile("/a[b");
        assert!(unclosed.is_match("a[b"));
    }

    #[test]
    fn test_malformed_class_reports_line() {
        let err = PatternCompiler::new().compile("  [z-a]  ").unwrap_err();
        assert_eq!(err.line(), Some("[z-a]"));
    }

    #[test]
    fn test_scoped_compiler_anchors_rules() {
        let compiler = PatternCompiler::scoped("sub/dir/");
        assert_eq!(compiler.scope(), "sub/dir");

        let pattern = compiler.compile("*.tmp").unwrap().unwrap();
        assert!(pattern.is_match("sub/dir/x.tmp"));
        assert!(!pattern.is_match("x.tmp"));
        assert!(!pattern.is_match("other/sub/dir/x.tmp"));

        let rooted = compiler.compile("!/keep").unwrap().unwrap();
        assert!(rooted.is_inclusive());
        assert!(rooted.is_match("sub/dir/keep"));
    }

    #[test]
    fn test_scoped_star_covers_scope_directory() {
        let compiler = PatternCompiler::scoped("sub");
        let star = compiler.compile("*").unwrap().unwrap();
        assert_eq!(star.as_regex_str(), format!("^sub/{W}$"));
        assert!(star.is_match("sub/x.txt"));
        assert!(!star.is_match("x.txt"));

        let globstar = compiler.compile("**").unwrap().unwrap();
        assert!(globstar.is_match("sub/a/b.txt"));
        assert!(!globstar.is_match("other/b.txt"));

        assert!(compiler.compile("/").unwrap().is_none());
        assert!(compiler.compile("!").unwrap().is_none());
    }

    #[test]
    fn test_pattern_set_assigns_source_order() {
        let set = PatternSet::from_lines(["# header", "*.o", "", "!keep.o"]).unwrap();
        assert_eq!(set.len(), 2);
        let orders: Vec<_> = set.iter().map(Pattern::source_order).collect();
        assert_eq!(orders, vec![0, 1]);
        assert_eq!(set.iter().nth(1).map(Pattern::source), Some("!keep.o"));
    }
}
