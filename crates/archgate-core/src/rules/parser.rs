//! Recursive-descent parser for the rule DSL.
//!
//! ```text
//! rule no-domain-to-infra "Domain must not reach infrastructure":
//!     deny dependency
//!     when src.layer = "domain" and dst.layer = "infrastructure"
//!     severity error
//!     message "domain code must go through a port"
//! ```
//!
//! The parser never panics on input; every failure is an [`ArchError`] of
//! kind [`Parse`](crate::ErrorKind::Parse) carrying line and column.

use super::ast::{
    CompareOp, ExprAst, FieldAst, LiteralAst, OperandAst, RuleAst, RulesDocumentAst, Span,
    WhenAst,
};
use super::lexer::{tokenize, Tok, Token};
use super::types::{RuleAction, RuleTarget};
use crate::error::{ArchError, ArchResult};

/// Words that cannot be used as field names.
const KEYWORDS: &[&str] = &[
    "rule",
    "deny",
    "warn",
    "allow",
    "node",
    "nodes",
    "dependency",
    "dependencies",
    "within",
    "when",
    "and",
    "or",
    "not",
    "in",
    "matches",
    "true",
    "false",
    "severity",
    "message",
    "description",
];

/// Deepest expression nesting accepted, counting parentheses, `not` and
/// each `and`/`or` in a chain.
pub const MAX_EXPR_DEPTH: usize = 256;

/// Parser for rule documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct DslParser;

impl DslParser {
    /// Creates a parser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parses an anonymous document.
    ///
    /// # Errors
    ///
    /// Returns the first syntax error.
    pub fn parse(&self, text: &str) -> ArchResult<RulesDocumentAst> {
        Parser::new(tokenize(text)?, None).document()
    }

    /// Parses a document read from `file`. Errors and rules carry the name.
    ///
    /// # Errors
    ///
    /// Returns the first syntax error.
    pub fn parse_named(&self, text: &str, file: &str) -> ArchResult<RulesDocumentAst> {
        let tokens = tokenize(text).map_err(|e| e.with_file(file))?;
        Parser::new(tokens, Some(file.to_string()))
            .document()
            .map_err(|e| e.with_file(file))
    }
}

/// Parses DSL text with the default parser.
///
/// # Errors
///
/// Returns the first syntax error.
pub fn parse(text: &str) -> ArchResult<RulesDocumentAst> {
    DslParser::new().parse(text)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: Option<String>,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>, file: Option<String>) -> Self {
        Self {
            tokens,
            pos: 0,
            file,
            depth: 0,
        }
    }

    // ────────────────────────────────────────────
    // Token helpers
    // ────────────────────────────────────────────

    fn peek(&self) -> &Token {
        // tokenize always ends with Eof, and `bump` never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, offset: usize) -> &Tok {
        let i = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[i].tok
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at_keyword(&self, word: &str) -> bool {
        matches!(&self.peek().tok, Tok::Ident(s) if s == word)
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        if self.at_keyword(word) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if &self.peek().tok == tok {
            self.bump();
            true
        } else {
            false
        }
    }

    fn error_here(&self, expected: &str) -> ArchError {
        let token = self.peek();
        ArchError::parse(
            format!("expected {expected}, found {}", token.tok),
            token.span.line,
            token.span.column,
        )
    }

    /// Enters one nesting level; callers subtract from `depth` on the way out.
    fn descend(&mut self) -> ArchResult<()> {
        self.depth += 1;
        if self.depth > MAX_EXPR_DEPTH {
            let span = self.peek().span;
            return Err(ArchError::parse(
                format!("expression nested deeper than {MAX_EXPR_DEPTH} levels"),
                span.line,
                span.column,
            ));
        }
        Ok(())
    }

    fn expect(&mut self, tok: &Tok, expected: &str) -> ArchResult<Span> {
        let span = self.peek().span;
        if self.eat(tok) {
            Ok(span)
        } else {
            Err(self.error_here(expected))
        }
    }

    fn expect_keyword(&mut self, word: &str) -> ArchResult<Span> {
        let span = self.peek().span;
        if self.eat_keyword(word) {
            Ok(span)
        } else {
            Err(self.error_here(&format!("`{word}`")))
        }
    }

    fn expect_ident(&mut self, expected: &str) -> ArchResult<(String, Span)> {
        match self.peek().tok.clone() {
            Tok::Ident(s) => {
                let span = self.bump().span;
                Ok((s, span))
            }
            _ => Err(self.error_here(expected)),
        }
    }

    fn expect_string(&mut self, expected: &str) -> ArchResult<String> {
        match self.peek().tok.clone() {
            Tok::Str(s) => {
                self.bump();
                Ok(s)
            }
            _ => Err(self.error_here(expected)),
        }
    }

    // ────────────────────────────────────────────
    // Grammar
    // ────────────────────────────────────────────

    fn document(mut self) -> ArchResult<RulesDocumentAst> {
        let mut rules = Vec::new();
        while self.peek().tok != Tok::Eof {
            rules.push(self.rule()?);
            self.eat(&Tok::Semi);
        }
        Ok(RulesDocumentAst { rules })
    }

    fn rule(&mut self) -> ArchResult<RuleAst> {
        let span = self.expect_keyword("rule")?;
        let (id, _) = self.expect_ident("a rule id")?;
        let name = match self.peek().tok.clone() {
            Tok::Str(s) => {
                self.bump();
                Some(s)
            }
            _ => None,
        };
        self.expect(&Tok::Colon, "`:` after the rule header")?;

        let action = self.action()?;
        let target = self.target()?;

        let within = if self.eat_keyword("within") {
            Some(WhenAst::new(target, self.expr()?))
        } else {
            None
        };

        self.expect_keyword("when")?;
        let when = WhenAst::new(target, self.expr()?);

        let mut rule = RuleAst::new(id, action, when);
        rule.name = name;
        rule.within = within;
        rule.file.clone_from(&self.file);
        rule.span = span;

        loop {
            if self.eat_keyword("severity") {
                rule.severity = Some(self.expect_ident("a severity name")?);
            } else if self.eat_keyword("message") {
                rule.message = Some(self.expect_string("a message string")?);
            } else if self.eat_keyword("description") {
                rule.description = Some(self.expect_string("a description string")?);
            } else {
                break;
            }
        }

        match &self.peek().tok {
            Tok::Eof | Tok::Semi => Ok(rule),
            Tok::Ident(s) if s == "rule" => Ok(rule),
            _ => Err(self.error_here("`and`, `or`, a rule clause or the next rule")),
        }
    }

    fn action(&mut self) -> ArchResult<RuleAction> {
        let action = match &self.peek().tok {
            Tok::Ident(s) if s == "deny" => RuleAction::Deny,
            Tok::Ident(s) if s == "warn" => RuleAction::Warn,
            Tok::Ident(s) if s == "allow" => RuleAction::Allow,
            _ => return Err(self.error_here("`deny`, `warn` or `allow`")),
        };
        self.bump();
        Ok(action)
    }

    fn target(&mut self) -> ArchResult<RuleTarget> {
        let target = match &self.peek().tok {
            Tok::Ident(s) if s == "node" || s == "nodes" => RuleTarget::Node,
            Tok::Ident(s) if s == "dependency" || s == "dependencies" => RuleTarget::Dependency,
            _ => return Err(self.error_here("`node` or `dependency`")),
        };
        self.bump();
        Ok(target)
    }

    fn expr(&mut self) -> ArchResult<ExprAst> {
        let mut left = self.and_expr()?;
        let mut levels = 0;
        while self.eat_keyword("or") {
            self.descend()?;
            levels += 1;
            let right = self.and_expr()?;
            left = ExprAst::or(left, right);
        }
        self.depth -= levels;
        Ok(left)
    }

    fn and_expr(&mut self) -> ArchResult<ExprAst> {
        let mut left = self.unary()?;
        let mut levels = 0;
        while self.eat_keyword("and") {
            self.descend()?;
            levels += 1;
            let right = self.unary()?;
            left = ExprAst::and(left, right);
        }
        self.depth -= levels;
        Ok(left)
    }

    fn unary(&mut self) -> ArchResult<ExprAst> {
        if self.eat_keyword("not") {
            self.descend()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(ExprAst::not(inner));
        }
        self.primary()
    }

    fn primary(&mut self) -> ArchResult<ExprAst> {
        if self.eat(&Tok::LParen) {
            self.descend()?;
            let inner = self.expr()?;
            self.depth -= 1;
            self.expect(&Tok::RParen, "`)`")?;
            return Ok(inner);
        }

        let left = self.operand()?;
        let span = self.peek().span;
        let Some(op) = self.compare_op() else {
            return Ok(ExprAst::Operand(left));
        };
        let right = self.operand()?;
        Ok(ExprAst::Compare {
            left,
            op,
            right,
            span,
        })
    }

    fn compare_op(&mut self) -> Option<CompareOp> {
        let op = match self.peek().tok.clone() {
            Tok::Eq => CompareOp::Eq,
            Tok::Ne => CompareOp::Ne,
            Tok::Tilde => CompareOp::RegexMatch,
            Tok::Ident(s) if s == "in" => CompareOp::In,
            Tok::Ident(s) if s == "matches" => CompareOp::Matches,
            Tok::Ident(s) if s == "not" && matches!(self.peek_at(1), Tok::Ident(n) if n == "in") => {
                self.bump();
                CompareOp::NotIn
            }
            _ => return None,
        };
        self.bump();
        Some(op)
    }

    fn operand(&mut self) -> ArchResult<OperandAst> {
        let token = self.peek().clone();
        let span = token.span;
        match token.tok {
            Tok::Str(s) => {
                self.bump();
                Ok(OperandAst::Literal {
                    value: LiteralAst::Str(s),
                    span,
                })
            }
            Tok::Int(i) => {
                self.bump();
                Ok(OperandAst::Literal {
                    value: LiteralAst::Int(i),
                    span,
                })
            }
            Tok::Ident(ref s) if s == "true" || s == "false" => {
                self.bump();
                Ok(OperandAst::Literal {
                    value: LiteralAst::Bool(s == "true"),
                    span,
                })
            }
            Tok::Ident(ref s) if !KEYWORDS.contains(&s.as_str()) => {
                self.bump();
                Ok(OperandAst::Field(FieldAst {
                    name: s.clone(),
                    span,
                }))
            }
            Tok::LBracket => {
                self.bump();
                let items = self.list_items()?;
                Ok(OperandAst::List { items, span })
            }
            _ => Err(self.error_here("a field, a literal or `(`")),
        }
    }

    fn list_items(&mut self) -> ArchResult<Vec<LiteralAst>> {
        let mut items = Vec::new();
        if self.eat(&Tok::RBracket) {
            return Ok(items);
        }
        loop {
            let item = match self.peek().tok.clone() {
                Tok::Str(s) => LiteralAst::Str(s),
                Tok::Int(i) => LiteralAst::Int(i),
                Tok::Ident(s) if s == "true" => LiteralAst::Bool(true),
                Tok::Ident(s) if s == "false" => LiteralAst::Bool(false),
                _ => return Err(self.error_here("a literal in the list")),
            };
            self.bump();
            items.push(item);
            if self.eat(&Tok::RBracket) {
                return Ok(items);
            }
            self.expect(&Tok::Comma, "`,` or `]`")?;
            // trailing comma
            if self.eat(&Tok::RBracket) {
                return Ok(items);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const SCENARIO: &str = r#"rule no-domain-to-infra: deny dependency when src.layer = "domain" and dst.layer = "infrastructure""#;

    #[test]
    fn parses_scenario_rule() {
        let doc = parse(SCENARIO).unwrap();
        assert_eq!(doc.rules.len(), 1);
        let rule = &doc.rules[0];
        assert_eq!(rule.id, "no-domain-to-infra");
        assert_eq!(rule.action, RuleAction::Deny);
        assert_eq!(rule.target(), RuleTarget::Dependency);
        assert!(matches!(rule.when.expr(), ExprAst::And(..)));
        assert_eq!(rule.span, Span::new(1, 1));
    }

    #[test]
    fn parses_full_rule_with_clauses() {
        let doc = parse(
            r#"
            # layering
            rule services-named "Services are named *Service":
                allow node
                within kind = "class" and layer = "application"
                when name =~ ".*Service"
                severity warning
                message "rename it"
                description "naming convention";
            "#,
        )
        .unwrap();
        let rule = &doc.rules[0];
        assert_eq!(rule.name.as_deref(), Some("Services are named *Service"));
        assert_eq!(rule.action, RuleAction::Allow);
        assert!(rule.within.is_some());
        assert_eq!(rule.severity.as_ref().map(|(s, _)| s.as_str()), Some("warning"));
        assert_eq!(rule.message.as_deref(), Some("rename it"));
        assert_eq!(rule.description.as_deref(), Some("naming convention"));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let doc = parse(r#"rule r: deny node when a = "1" or b = "2" and c = "3""#).unwrap();
        let ExprAst::Or(_, right) = doc.rules[0].when.expr() else {
            panic!("expected or at the root");
        };
        assert!(matches!(**right, ExprAst::And(..)));
    }

    #[test]
    fn parses_not_in_and_lists() {
        let doc = parse(r#"rule r: deny dependency when dst.layer not in ["a", "b",]"#).unwrap();
        let ExprAst::Compare { op, right, .. } = doc.rules[0].when.expr() else {
            panic!("expected comparison");
        };
        assert_eq!(*op, CompareOp::NotIn);
        assert!(matches!(right, OperandAst::List { items, .. } if items.len() == 2));
    }

    #[test]
    fn parses_negation_and_grouping() {
        let doc = parse(r#"rule r: deny node when not (kind = "class" or kind = "struct")"#).unwrap();
        assert!(matches!(doc.rules[0].when.expr(), ExprAst::Not(_)));
    }

    #[test]
    fn parses_multiple_rules_without_separators() {
        let doc = parse(
            "rule a: deny node when layer = \"x\"\nrule b: warn dependency when dep_type = \"call\"",
        )
        .unwrap();
        assert_eq!(doc.rules.len(), 2);
        assert_eq!(doc.rules[1].span, Span::new(2, 1));
    }

    #[test]
    fn empty_document_is_valid() {
        assert!(parse("  # nothing here\n").unwrap().rules.is_empty());
    }

    #[test]
    fn missing_when_is_located() {
        let err = parse("rule r: deny node layer = \"x\"").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
        assert_eq!(err.location.as_ref().and_then(|l| l.column), Some(19));
        assert!(err.message.contains("`when`"), "{}", err.message);
    }

    #[test]
    fn bad_target_is_reported() {
        let err = parse("rule r: deny edge when x = 1").unwrap_err();
        assert!(err.message.contains("`node` or `dependency`"));
    }

    #[test]
    fn trailing_garbage_is_reported() {
        let err = parse(r#"rule r: deny node when layer = "x" "oops""#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
    }

    #[test]
    fn named_parse_carries_file() {
        let err = DslParser::new()
            .parse_named("rule", "arch.rules")
            .unwrap_err();
        assert_eq!(
            err.location.as_ref().and_then(|l| l.file.as_deref()),
            Some("arch.rules")
        );

        let doc = DslParser::new()
            .parse_named(SCENARIO, "arch.rules")
            .unwrap();
        assert_eq!(doc.rules[0].file.as_deref(), Some("arch.rules"));
    }

    #[test]
    fn garbage_never_panics() {
        for text in ["", ":", "rule", "rule x", "rule x:", "rule x: deny", "((((", "]", "rule x: deny node when (", "rule x: deny node when a in [1,", "\"", "!"] {
            let _ = parse(text);
        }
    }

    #[test]
    fn deep_nesting_is_a_parse_error() {
        let inputs = [
            format!("rule r: deny node when {}layer = \"x\"", "(".repeat(5_000)),
            format!("rule r: deny node when {}layer = \"x\"", "not ".repeat(100_000)),
            format!("rule r: deny node when true{}", " or true".repeat(10_000)),
        ];
        for text in &inputs {
            let err = parse(text).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Parse);
            assert!(err.message.contains("nested deeper"), "{}", err.message);
            assert!(err.location.is_some());
        }
    }

    #[test]
    fn nesting_within_the_limit_parses() {
        let depth = MAX_EXPR_DEPTH - 1;
        let text = format!(
            "rule r: deny node when {}layer = \"x\"{}",
            "(".repeat(depth),
            ")".repeat(depth)
        );
        assert_eq!(parse(&text).unwrap().rules.len(), 1);
    }
}
