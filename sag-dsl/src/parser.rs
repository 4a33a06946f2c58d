//! Parser implementation
//!
//! Recursive descent over the lexer's token stream, producing a typed
//! `Message`. Expression text is preserved verbatim-compact on the AST:
//! the parser validates the expression structure but stores the
//! concatenated token lexemes, so the evaluator can re-enter the same
//! grammar later and the AST stays serialization-stable.

use crate::lexer::{Lexer, Span, Token, TokenKind};
use sag_core::{
    ActionStatement, AssertStatement, ControlStatement, ErrorStatement, EventStatement,
    FoldStatement, Header, KnowledgeStatement, Message, ParseError, Priority, QueryStatement,
    RecallStatement, Statement, SubscribeStatement, UnsubscribeStatement, Value,
};

/// Parse wire text into a message. Fails fast on the first syntax error.
pub fn parse(text: &str) -> Result<Message, ParseError> {
    let tokens = Lexer::new(text).tokenize();

    // The lexer reports bad input as error tokens; surface the first one the
    // way a throwing error listener would.
    for token in &tokens {
        if let TokenKind::Error(message) = &token.kind {
            return Err(ParseError {
                message: message.clone(),
                line: token.span.line,
                column: token.span.column,
            });
        }
    }

    Parser::new(text, tokens).parse_message()
}

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
        }
    }

    /// Parse a complete message: header line, newline, statement list.
    pub fn parse_message(&mut self) -> Result<Message, ParseError> {
        let header = self.parse_header()?;
        self.skip_newlines();

        let mut statements = Vec::new();
        while !self.is_at_end() {
            statements.push(self.parse_statement()?);
            self.skip_newlines();
            if self.check(&TokenKind::Semicolon) {
                self.advance();
                self.skip_newlines();
            } else {
                break;
            }
        }

        if !self.is_at_end() {
            return Err(self.error("Expected ';' between statements"));
        }

        Ok(Message::new(header, statements))
    }

    // ========================================================================
    // Header
    // ========================================================================

    fn parse_header(&mut self) -> Result<Header, ParseError> {
        self.expect(TokenKind::H)?;
        self.expect(TokenKind::V)?;
        let version = self.expect_int()?;
        if !(0..=u32::MAX as i64).contains(&version) {
            return Err(self.error("Protocol version out of range"));
        }

        self.expect_header_key("id")?;
        let message_id = self.expect_ident()?;
        self.expect_header_key("src")?;
        let source = self.expect_ident()?;
        self.expect_header_key("dst")?;
        let destination = self.expect_ident()?;
        self.expect_header_key("ts")?;
        let timestamp = self.expect_int()?;

        let mut correlation = None;
        if self.at_header_key("corr") {
            self.advance();
            self.expect(TokenKind::Assign)?;
            correlation = match &self.current().kind {
                TokenKind::Minus => {
                    self.advance();
                    None
                }
                TokenKind::Ident(id) => {
                    let id = id.clone();
                    self.advance();
                    Some(id)
                }
                _ => return Err(self.error("Expected correlation id or '-'")),
            };
        }

        let mut ttl = None;
        if self.at_header_key("ttl") {
            self.advance();
            self.expect(TokenKind::Assign)?;
            let value = self.expect_int()?;
            if !(0..=u32::MAX as i64).contains(&value) {
                return Err(self.error("TTL out of range"));
            }
            ttl = Some(value as u32);
        }

        if !self.is_at_end() {
            self.expect(TokenKind::Newline)?;
        }

        Ok(Header {
            version: version as u32,
            message_id,
            source,
            destination,
            timestamp,
            correlation,
            ttl,
        })
    }

    fn expect_header_key(&mut self, key: &str) -> Result<(), ParseError> {
        if !self.at_header_key(key) {
            return Err(self.error(&format!("Expected '{}='", key)));
        }
        self.advance();
        self.expect(TokenKind::Assign)
    }

    fn at_header_key(&self, key: &str) -> bool {
        matches!(&self.current().kind, TokenKind::Ident(s) if s == key)
            && matches!(self.peek_kind(1), Some(TokenKind::Assign))
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match &self.current().kind {
            TokenKind::Do => self.parse_action(),
            TokenKind::Q => self.parse_query(),
            TokenKind::A => self.parse_assert(),
            TokenKind::If => self.parse_control(),
            TokenKind::Evt => self.parse_event(),
            TokenKind::Err => self.parse_error_stmt(),
            TokenKind::Fold => self.parse_fold(),
            TokenKind::Recall => self.parse_recall(),
            TokenKind::Sub => self.parse_subscribe(),
            TokenKind::Unsub => self.parse_unsubscribe(),
            TokenKind::Know => self.parse_knowledge(),
            _ => Err(self.error("Expected statement")),
        }
    }

    fn parse_action(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Do)?;
        let verb = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;
        let (args, named_args) = self.parse_arg_list()?;
        self.expect(TokenKind::RParen)?;

        let mut policy = None;
        let mut policy_expr = None;
        if self.at_policy_clause() {
            self.advance(); // P
            self.advance(); // :
            policy = Some(self.expect_ident()?);
            if self.check(&TokenKind::Colon) {
                self.advance();
                policy_expr = Some(self.parse_expr_text()?);
            }
        }

        let mut priority = None;
        if self.check(&TokenKind::Prio) {
            self.advance();
            self.expect(TokenKind::Assign)?;
            priority = Some(self.expect_priority()?);
        }

        let mut reason = None;
        if self.check(&TokenKind::Because) {
            self.advance();
            reason = Some(match &self.current().kind {
                TokenKind::Str(s) => {
                    let s = s.clone();
                    self.advance();
                    s
                }
                _ => self.parse_expr_text()?,
            });
        }

        Ok(Statement::Action(ActionStatement {
            verb,
            args,
            named_args,
            policy,
            policy_expr,
            priority,
            reason,
        }))
    }

    fn at_policy_clause(&self) -> bool {
        matches!(&self.current().kind, TokenKind::Ident(s) if s == "P")
            && matches!(self.peek_kind(1), Some(TokenKind::Colon))
    }

    fn parse_query(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Q)?;
        let expression = self.parse_expr_text()?;
        let mut constraint = None;
        if self.check(&TokenKind::Where) {
            self.advance();
            constraint = Some(self.parse_expr_text()?);
        }
        Ok(Statement::Query(QueryStatement {
            expression,
            constraint,
        }))
    }

    fn parse_assert(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::A)?;
        let path = self.expect_ident()?;
        self.expect(TokenKind::Assign)?;
        let value = self.parse_value()?;
        Ok(Statement::Assert(AssertStatement { path, value }))
    }

    fn parse_control(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::If)?;
        let condition = self.parse_expr_text()?;
        self.expect(TokenKind::Then)?;
        let then_branch = Box::new(self.parse_statement()?);
        let mut else_branch = None;
        if self.check(&TokenKind::Else) {
            self.advance();
            else_branch = Some(Box::new(self.parse_statement()?));
        }
        Ok(Statement::Control(ControlStatement {
            condition,
            then_branch,
            else_branch,
        }))
    }

    fn parse_event(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Evt)?;
        let event_name = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;
        let (args, named_args) = self.parse_arg_list()?;
        self.expect(TokenKind::RParen)?;
        Ok(Statement::Event(EventStatement {
            event_name,
            args,
            named_args,
        }))
    }

    fn parse_error_stmt(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Err)?;
        let error_code = self.expect_ident()?;
        let mut message = None;
        if let TokenKind::Str(s) = &self.current().kind {
            message = Some(s.clone());
            self.advance();
        }
        Ok(Statement::Error(ErrorStatement {
            error_code,
            message,
        }))
    }

    fn parse_fold(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Fold)?;
        let fold_id = self.expect_ident()?;
        let summary = self.expect_string()?;
        let mut state = None;
        if self.check(&TokenKind::State) {
            self.advance();
            state = Some(self.parse_object()?);
        }
        Ok(Statement::Fold(FoldStatement {
            fold_id,
            summary,
            state,
        }))
    }

    fn parse_recall(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Recall)?;
        let fold_id = self.expect_ident()?;
        Ok(Statement::Recall(RecallStatement { fold_id }))
    }

    fn parse_subscribe(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Sub)?;
        let topic = self.parse_topic_pattern()?;
        let mut filter_expr = None;
        if self.check(&TokenKind::Where) {
            self.advance();
            filter_expr = Some(self.parse_expr_text()?);
        }
        Ok(Statement::Subscribe(SubscribeStatement {
            topic,
            filter_expr,
        }))
    }

    fn parse_unsubscribe(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Unsub)?;
        let topic = self.parse_topic_pattern()?;
        Ok(Statement::Unsubscribe(UnsubscribeStatement { topic }))
    }

    fn parse_knowledge(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Know)?;
        let topic = self.parse_topic_pattern()?;
        self.expect(TokenKind::Assign)?;
        let value = self.parse_value()?;
        self.expect(TokenKind::V)?;
        let version = self.expect_int()?;
        if version < 0 {
            return Err(self.error("Knowledge version must be non-negative"));
        }
        Ok(Statement::Knowledge(KnowledgeStatement {
            topic,
            value,
            version: version as u64,
        }))
    }

    /// Scan a topic pattern: a contiguous run of identifier pieces, dots and
    /// wildcards. The lexer folds dots into identifiers, so `system.*` arrives
    /// as `system.` followed by `*`; contiguity (no gap between spans) keeps a
    /// following operator from being swallowed.
    fn parse_topic_pattern(&mut self) -> Result<String, ParseError> {
        let mut text = String::new();
        let mut end: Option<usize> = None;

        loop {
            let (is_pattern_piece, span) = {
                let token = self.current();
                let ok = matches!(
                    token.kind,
                    TokenKind::Ident(_) | TokenKind::Star | TokenKind::DoubleStar | TokenKind::Dot
                );
                (ok, token.span)
            };
            if !is_pattern_piece {
                break;
            }
            if let Some(e) = end {
                if span.start != e {
                    break;
                }
            }
            text.push_str(self.lexeme(span));
            end = Some(span.end);
            self.advance();
        }

        if text.is_empty() {
            return Err(self.error("Expected topic pattern"));
        }
        Ok(text)
    }

    // ========================================================================
    // Arguments and values
    // ========================================================================

    fn parse_arg_list(&mut self) -> Result<(Vec<Value>, Vec<(String, Value)>), ParseError> {
        let mut args = Vec::new();
        let mut named_args = Vec::new();

        if self.check(&TokenKind::RParen) {
            return Ok((args, named_args));
        }

        loop {
            if self.at_named_arg() {
                let name = self.expect_ident()?;
                self.expect(TokenKind::Assign)?;
                let value = self.parse_value()?;
                named_args.push((name, value));
            } else {
                args.push(self.parse_value()?);
            }
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        Ok((args, named_args))
    }

    fn at_named_arg(&self) -> bool {
        matches!(self.current().kind, TokenKind::Ident(_))
            && matches!(self.peek_kind(1), Some(TokenKind::Assign))
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        match &self.current().kind {
            TokenKind::Str(s) => {
                let v = Value::String(s.clone());
                self.advance();
                Ok(v)
            }
            TokenKind::Int(n) => {
                let v = Value::Int(*n);
                self.advance();
                Ok(v)
            }
            TokenKind::Float(f) => {
                let v = Value::Float(*f);
                self.advance();
                Ok(v)
            }
            TokenKind::Bool(b) => {
                let v = Value::Bool(*b);
                self.advance();
                Ok(v)
            }
            TokenKind::Null => {
                self.advance();
                Ok(Value::Null)
            }
            TokenKind::Ident(s) => {
                let v = Value::Path(s.clone());
                self.advance();
                Ok(v)
            }
            // Priority words double as bare paths in value position
            TokenKind::Priority(p) => {
                let v = Value::Path(p.as_wire().to_string());
                self.advance();
                Ok(v)
            }
            TokenKind::LBracket => self.parse_list(),
            TokenKind::LBrace => self.parse_object().map(Value::Object),
            _ => Err(self.error("Expected value")),
        }
    }

    fn parse_list(&mut self) -> Result<Value, ParseError> {
        self.expect(TokenKind::LBracket)?;
        let mut items = Vec::new();
        if !self.check(&TokenKind::RBracket) {
            loop {
                items.push(self.parse_value()?);
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Value::List(items))
    }

    fn parse_object(&mut self) -> Result<Vec<(String, Value)>, ParseError> {
        self.expect(TokenKind::LBrace)?;
        let mut members = Vec::new();
        if !self.check(&TokenKind::RBrace) {
            loop {
                let key = self.expect_string()?;
                self.expect(TokenKind::Colon)?;
                let value = self.parse_value()?;
                members.push((key, value));
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(members)
    }

    // ========================================================================
    // Expression text capture
    // ========================================================================

    /// Consume one expression (precedence ladder) and return its compact
    /// source text: the consumed token lexemes concatenated without
    /// whitespace.
    fn parse_expr_text(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.skim_or()?;
        let text = self.tokens[start..self.pos]
            .iter()
            .map(|t| self.lexeme(t.span))
            .collect();
        Ok(text)
    }

    fn skim_or(&mut self) -> Result<(), ParseError> {
        self.skim_and()?;
        while self.check(&TokenKind::OrOr) {
            self.advance();
            self.skim_and()?;
        }
        Ok(())
    }

    fn skim_and(&mut self) -> Result<(), ParseError> {
        self.skim_rel()?;
        while self.check(&TokenKind::AndAnd) {
            self.advance();
            self.skim_rel()?;
        }
        Ok(())
    }

    fn skim_rel(&mut self) -> Result<(), ParseError> {
        self.skim_add()?;
        while matches!(
            self.current().kind,
            TokenKind::Eq
                | TokenKind::Ne
                | TokenKind::Gt
                | TokenKind::Lt
                | TokenKind::Ge
                | TokenKind::Le
        ) {
            self.advance();
            self.skim_add()?;
        }
        Ok(())
    }

    fn skim_add(&mut self) -> Result<(), ParseError> {
        self.skim_mul()?;
        while matches!(self.current().kind, TokenKind::Plus | TokenKind::Minus) {
            self.advance();
            self.skim_mul()?;
        }
        Ok(())
    }

    fn skim_mul(&mut self) -> Result<(), ParseError> {
        self.skim_primary()?;
        while matches!(self.current().kind, TokenKind::Star | TokenKind::Slash) {
            self.advance();
            self.skim_primary()?;
        }
        Ok(())
    }

    fn skim_primary(&mut self) -> Result<(), ParseError> {
        if self.check(&TokenKind::LParen) {
            self.advance();
            self.skim_or()?;
            self.expect(TokenKind::RParen)?;
            return Ok(());
        }
        self.parse_value().map(|_| ())
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.check(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!("Expected {:?}", kind)))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::Ident(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            _ => Err(self.error("Expected identifier")),
        }
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::Str(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            _ => Err(self.error("Expected string")),
        }
    }

    fn expect_int(&mut self) -> Result<i64, ParseError> {
        match self.current().kind {
            TokenKind::Int(n) => {
                self.advance();
                Ok(n)
            }
            _ => Err(self.error("Expected integer")),
        }
    }

    fn expect_priority(&mut self) -> Result<Priority, ParseError> {
        match self.current().kind {
            TokenKind::Priority(p) => {
                self.advance();
                Ok(p)
            }
            _ => Err(self.error("Expected priority (LOW, NORMAL, HIGH, CRITICAL)")),
        }
    }

    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    fn lexeme(&self, span: Span) -> &str {
        &self.source[span.start..span.end]
    }

    fn error(&self, msg: &str) -> ParseError {
        let span = self.current().span;
        ParseError {
            message: msg.to_string(),
            line: span.line,
            column: span.column,
        }
    }
}
