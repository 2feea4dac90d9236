//! Single-pass Pratt compiler: source text straight to bytecode.
//!
//! There is no AST. Prefix and infix handlers, selected by a rule table
//! keyed on token kind, emit instructions as they parse. Nested function
//! bodies push a fresh [`FunctionContext`]; the enclosing contexts wait
//! on an explicit stack. Errors never abort the pass: the parser records
//! a diagnostic, enters panic mode, and resynchronizes at the next
//! statement boundary so one run can report several problems.

use std::rc::Rc;

use lark_core::array::{extent, MAX_ARRAY_DIMENSIONS};
use lark_core::chunk::{Chunk, OpCode};
use lark_core::object::{Function, LarkString, Strings};
use lark_core::value::Value;

use crate::error::{CompileErrors, Diagnostic, Location};
use crate::scanner::{Scanner, Token, TokenKind};

/// Locals per function context, including the reserved slot 0.
const MAX_LOCALS: usize = 256;
/// Declarators allowed in one `var` statement.
const MAX_VARS_IN_DECLARE: usize = 20;

/// Compile a whole source string into the top-level script function.
///
/// Identifier and string-literal constants are interned through the
/// shared interner so the VM can compare them by pointer.
pub fn compile(source: &str, strings: &mut Strings) -> Result<Function, CompileErrors> {
    let mut parser = Parser::new(source, strings);
    parser.advance();
    while !parser.matches(TokenKind::Eof) {
        parser.declaration();
    }
    parser.emit_return();
    if parser.diagnostics.is_empty() {
        Ok(parser.context.function)
    } else {
        Err(CompileErrors {
            diagnostics: parser.diagnostics,
        })
    }
}

/// Binding power, weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
    Primary,
}

impl Precedence {
    fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

type ParseFn<'src, 'st> = fn(&mut Parser<'src, 'st>, bool);

struct ParseRule<'src, 'st> {
    prefix: Option<ParseFn<'src, 'st>>,
    infix: Option<ParseFn<'src, 'st>>,
    precedence: Precedence,
}

fn rule<'src, 'st>(kind: TokenKind) -> ParseRule<'src, 'st> {
    let (prefix, infix, precedence): (
        Option<ParseFn<'src, 'st>>,
        Option<ParseFn<'src, 'st>>,
        Precedence,
    ) = match kind {
        TokenKind::LeftParen => (Some(Parser::grouping), Some(Parser::call), Precedence::Call),
        TokenKind::Minus => (Some(Parser::unary), Some(Parser::binary), Precedence::Term),
        TokenKind::Plus => (None, Some(Parser::binary), Precedence::Term),
        TokenKind::Question => (None, Some(Parser::binary), Precedence::Factor),
        TokenKind::Slash => (None, Some(Parser::binary), Precedence::Factor),
        TokenKind::Star => (None, Some(Parser::binary), Precedence::Factor),
        TokenKind::Bang => (Some(Parser::unary), None, Precedence::None),
        TokenKind::BangEqual => (None, Some(Parser::binary), Precedence::Equality),
        TokenKind::EqualEqual => (None, Some(Parser::binary), Precedence::Equality),
        TokenKind::Greater => (None, Some(Parser::binary), Precedence::Comparison),
        TokenKind::GreaterEqual => (None, Some(Parser::binary), Precedence::Comparison),
        TokenKind::Less => (None, Some(Parser::binary), Precedence::Comparison),
        TokenKind::LessEqual => (None, Some(Parser::binary), Precedence::Comparison),
        TokenKind::Identifier => (Some(Parser::variable), None, Precedence::None),
        TokenKind::String => (Some(Parser::string), None, Precedence::None),
        TokenKind::Number => (Some(Parser::number), None, Precedence::None),
        TokenKind::And => (None, Some(Parser::and_op), Precedence::And),
        TokenKind::Or => (None, Some(Parser::or_op), Precedence::Or),
        TokenKind::True | TokenKind::False | TokenKind::Nil => {
            (Some(Parser::literal), None, Precedence::None)
        }
        _ => (None, None, Precedence::None),
    };
    ParseRule {
        prefix,
        infix,
        precedence,
    }
}

#[derive(Debug)]
struct Local<'src> {
    name: &'src str,
    /// Scope depth, or -1 while declared but not yet initialized.
    depth: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    Script,
    Function,
}

/// State for one function being compiled.
struct FunctionContext<'src> {
    function: Function,
    kind: FunctionKind,
    locals: Vec<Local<'src>>,
    scope_depth: i32,
}

impl<'src> FunctionContext<'src> {
    fn new(kind: FunctionKind, name: Option<Rc<LarkString>>) -> Self {
        let function = match name {
            Some(name) => Function::named(name),
            None => Function::new_script(),
        };
        // Slot 0 holds the function value itself at runtime.
        let locals = vec![Local { name: "", depth: 0 }];
        Self {
            function,
            kind,
            locals,
            scope_depth: 0,
        }
    }
}

struct Parser<'src, 'st> {
    scanner: Scanner<'src>,
    current: Token<'src>,
    previous: Token<'src>,
    context: FunctionContext<'src>,
    enclosing: Vec<FunctionContext<'src>>,
    strings: &'st mut Strings,
    /// Names declared by top-level `fun`; used to tell calls from array
    /// references when an identifier is followed by `(`.
    functions: Vec<String>,
    diagnostics: Vec<Diagnostic>,
    panic_mode: bool,
}

impl<'src, 'st> Parser<'src, 'st> {
    fn new(source: &'src str, strings: &'st mut Strings) -> Self {
        let placeholder = Token {
            kind: TokenKind::Eof,
            lexeme: "",
            line: 1,
        };
        Self {
            scanner: Scanner::new(source),
            current: placeholder,
            previous: placeholder,
            context: FunctionContext::new(FunctionKind::Script, None),
            enclosing: Vec::new(),
            strings,
            functions: Vec::new(),
            diagnostics: Vec::new(),
            panic_mode: false,
        }
    }

    // --- token plumbing ---

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            let token = self.current;
            self.error_at(token, token.lexeme);
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    // --- diagnostics ---

    fn error(&mut self, message: &str) {
        let token = self.previous;
        self.error_at(token, message);
    }

    fn error_at_current(&mut self, message: &str) {
        let token = self.current;
        self.error_at(token, message);
    }

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        // Panic mode swallows cascades until the next synchronize().
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        let location = match token.kind {
            TokenKind::Eof => Location::End,
            TokenKind::Error => Location::None,
            _ => Location::At(token.lexeme.to_string()),
        };
        self.diagnostics.push(Diagnostic {
            line: token.line,
            location,
            message: message.to_string(),
        });
    }

    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => self.advance(),
            }
        }
    }

    // --- emission ---

    fn chunk(&mut self) -> &mut Chunk {
        &mut self.context.function.chunk
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.chunk().write(byte, line);
    }

    fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op as u8);
    }

    fn emit_return(&mut self) {
        self.emit_op(OpCode::Nil);
        self.emit_op(OpCode::Return);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        let index = self.chunk().add_constant(value);
        if index > u8::MAX as usize {
            self.error("Too many constants in one chunk.");
            return 0;
        }
        index as u8
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_op(OpCode::Constant);
        self.emit_byte(index);
    }

    fn identifier_constant(&mut self, lexeme: &str) -> u8 {
        let name = self.strings.intern(lexeme);
        self.make_constant(Value::Str(name))
    }

    /// Emit a jump with a placeholder offset; returns the offset of the
    /// placeholder for later patching.
    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.chunk().code.len() - 2
    }

    fn patch_jump(&mut self, offset: usize) {
        // Distance from just past the operand to the jump target.
        let distance = self.chunk().code.len() - offset - 2;
        if distance > u16::MAX as usize {
            self.error("Too much code to jump over.");
        }
        let bytes = (distance as u16).to_be_bytes();
        self.chunk().code[offset] = bytes[0];
        self.chunk().code[offset + 1] = bytes[1];
    }

    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(OpCode::Loop);
        let distance = self.chunk().code.len() - loop_start + 2;
        if distance > u16::MAX as usize {
            self.error("Loop body too large.");
        }
        let bytes = (distance as u16).to_be_bytes();
        self.emit_byte(bytes[0]);
        self.emit_byte(bytes[1]);
    }

    // --- scopes and locals ---

    fn begin_scope(&mut self) {
        self.context.scope_depth += 1;
    }

    fn end_scope(&mut self) {
        self.context.scope_depth -= 1;
        while self
            .context
            .locals
            .last()
            .is_some_and(|local| local.depth > self.context.scope_depth)
        {
            self.emit_op(OpCode::Pop);
            self.context.locals.pop();
        }
    }

    fn add_local(&mut self, name: &'src str) {
        if self.context.locals.len() == MAX_LOCALS {
            self.error("Too many local variables in function.");
            return;
        }
        self.context.locals.push(Local { name, depth: -1 });
    }

    fn declare_variable(&mut self) {
        if self.context.scope_depth == 0 {
            return;
        }
        let name = self.previous.lexeme;
        let duplicate = self
            .context
            .locals
            .iter()
            .rev()
            .take_while(|local| local.depth == -1 || local.depth >= self.context.scope_depth)
            .any(|local| local.name == name);
        if duplicate {
            self.error("Already a variable with this name in this scope.");
        }
        self.add_local(name);
    }

    fn mark_initialized(&mut self) {
        if self.context.scope_depth == 0 {
            return;
        }
        let depth = self.context.scope_depth;
        if let Some(local) = self.context.locals.last_mut() {
            local.depth = depth;
        }
    }

    fn resolve_local(&mut self, name: &str) -> Option<u8> {
        let found = self
            .context
            .locals
            .iter()
            .rposition(|local| !local.name.is_empty() && local.name == name);
        let index = found?;
        if self.context.locals[index].depth == -1 {
            self.error("Can't read local variable in its own initializer.");
        }
        Some(index as u8)
    }

    /// Consume an identifier and declare it. Returns the name constant
    /// index for globals, 0 for locals.
    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenKind::Identifier, message);
        self.declare_variable();
        if self.context.scope_depth > 0 {
            return 0;
        }
        self.identifier_constant(self.previous.lexeme)
    }

    fn define_variable(&mut self, global: u8) {
        if self.context.scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_op(OpCode::DefineGlobal);
        self.emit_byte(global);
    }

    // --- declarations ---

    fn declaration(&mut self) {
        if self.matches(TokenKind::Fun) {
            self.fun_declaration();
        } else if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }
        if self.panic_mode {
            self.synchronize();
        }
    }

    fn fun_declaration(&mut self) {
        let global = self.parse_variable("Expect function name.");
        if self.context.scope_depth == 0 && self.enclosing.is_empty() {
            self.functions.push(self.previous.lexeme.to_string());
        }
        self.mark_initialized();
        self.function_body();
        self.define_variable(global);
    }

    fn function_body(&mut self) {
        let name = self.strings.intern(self.previous.lexeme);
        let context = FunctionContext::new(FunctionKind::Function, Some(name));
        let outer = std::mem::replace(&mut self.context, context);
        self.enclosing.push(outer);
        self.begin_scope();

        self.consume(TokenKind::LeftParen, "Expect '(' after function name.");
        if !self.check(TokenKind::RightParen) {
            loop {
                if self.context.function.arity == u8::MAX {
                    self.error_at_current("Can't have more than 255 parameters.");
                } else {
                    self.context.function.arity += 1;
                }
                let constant = self.parse_variable("Expect parameter name.");
                self.define_variable(constant);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.");
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.");
        self.block();

        self.emit_return();
        let finished = match self.enclosing.pop() {
            Some(outer) => std::mem::replace(&mut self.context, outer),
            None => return,
        };
        let index = self.make_constant(Value::Function(Rc::new(finished.function)));
        self.emit_op(OpCode::Constant);
        self.emit_byte(index);
    }

    fn var_declaration(&mut self) {
        let mut declared = 0;
        loop {
            declared += 1;
            if declared > MAX_VARS_IN_DECLARE {
                self.error_at_current("Can't define more than 20 variables at a time, sorry.");
            }
            self.consume(TokenKind::Identifier, "Expect variable name.");
            let name = self.previous;
            if self.check(TokenKind::LeftParen) {
                self.array_declaration(name);
            } else {
                self.declare_variable();
                let global = if self.context.scope_depth > 0 {
                    0
                } else {
                    self.identifier_constant(name.lexeme)
                };
                if self.matches(TokenKind::Equal) {
                    self.expression();
                } else {
                    self.emit_op(OpCode::Nil);
                }
                self.define_variable(global);
            }
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.");
    }

    /// `var name(bounds, ...)` where a bound is `N` (meaning 1:N) or
    /// `lo:hi`. Arrays exist only at the global scope; the instruction
    /// carries the full shape so the VM can allocate without any side
    /// channel.
    fn array_declaration(&mut self, name: Token<'src>) {
        self.consume(TokenKind::LeftParen, "Expect '(' after array name.");
        if self.context.scope_depth > 0 || !self.enclosing.is_empty() {
            self.error("Arrays must be declared in global scope.");
        }

        let mut bounds: Vec<(i16, i16)> = Vec::new();
        loop {
            let first = self.array_bound();
            let pair = if self.matches(TokenKind::Colon) {
                let high = self.array_bound();
                if first >= high {
                    self.error("Array bound low value must be less than high value.");
                }
                (first, high)
            } else {
                if first < 1 {
                    self.error("Array bound low value must be less than high value.");
                }
                (1, first)
            };
            if bounds.len() == MAX_ARRAY_DIMENSIONS {
                self.error("Too many array dimensions.");
            } else {
                bounds.push(pair);
            }
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after array bounds.");

        let elements: usize = bounds
            .iter()
            .map(|&(lo, hi)| extent(lo as i32, hi as i32))
            .product();
        if elements > u16::MAX as usize {
            self.error("Array is too large.");
        }

        let name_constant = self.identifier_constant(name.lexeme);
        self.emit_op(OpCode::DefineGlobalArray);
        self.emit_byte(name_constant);
        self.emit_byte(bounds.len() as u8);
        let count = (elements as u16).to_be_bytes();
        self.emit_byte(count[0]);
        self.emit_byte(count[1]);
        for (lo, hi) in bounds {
            for byte in lo.to_be_bytes().into_iter().chain(hi.to_be_bytes()) {
                self.emit_byte(byte);
            }
        }
    }

    /// One integer literal bound, optionally negated. Fractions truncate.
    fn array_bound(&mut self) -> i16 {
        let negative = self.matches(TokenKind::Minus);
        self.consume(TokenKind::Number, "Expect array bound.");
        let magnitude: f64 = self.previous.lexeme.parse().unwrap_or(f64::INFINITY);
        let value = if negative { -magnitude } else { magnitude };
        if value < i16::MIN as f64 || value > i16::MAX as f64 {
            self.error("Array bound is out of range.");
            return 0;
        }
        value as i16
    }

    // --- statements ---

    fn statement(&mut self) {
        if self.matches(TokenKind::Print) {
            self.print_statement();
        } else if self.matches(TokenKind::If) {
            self.if_statement();
        } else if self.matches(TokenKind::Return) {
            self.return_statement();
        } else if self.matches(TokenKind::While) {
            self.while_statement();
        } else if self.matches(TokenKind::For) {
            self.for_statement();
        } else if self.matches(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.");
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::Print);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::Pop);
    }

    fn if_statement(&mut self) {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();
        let else_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(then_jump);
        self.emit_op(OpCode::Pop);
        if self.matches(TokenKind::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn return_statement(&mut self) {
        if self.context.kind == FunctionKind::Script {
            self.error("Can't return from top-level code.");
        }
        if self.matches(TokenKind::Semicolon) {
            self.emit_return();
        } else {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after return value.");
            self.emit_op(OpCode::Return);
        }
    }

    fn while_statement(&mut self) {
        let loop_start = self.chunk().code.len();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();
        self.emit_loop(loop_start);
        self.patch_jump(exit_jump);
        self.emit_op(OpCode::Pop);
    }

    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.");
        if self.matches(TokenKind::Semicolon) {
            // No initializer.
        } else if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.chunk().code.len();
        let mut exit_jump = None;
        if !self.matches(TokenKind::Semicolon) {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.");
            exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
            self.emit_op(OpCode::Pop);
        }

        if !self.matches(TokenKind::RightParen) {
            // Jump over the increment, run it after each body pass.
            let body_jump = self.emit_jump(OpCode::Jump);
            let increment_start = self.chunk().code.len();
            self.expression();
            self.emit_op(OpCode::Pop);
            self.consume(TokenKind::RightParen, "Expect ')' after for clauses.");
            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);
        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_op(OpCode::Pop);
        }
        self.end_scope();
    }

    // --- expressions ---

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let Some(prefix) = rule(self.previous.kind).prefix else {
            self.error("Expect expression.");
            return;
        };
        let can_assign = precedence <= Precedence::Assignment;
        prefix(self, can_assign);

        while precedence <= rule(self.current.kind).precedence {
            self.advance();
            if let Some(infix) = rule(self.previous.kind).infix {
                infix(self, can_assign);
            }
        }

        if can_assign && self.matches(TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    fn number(&mut self, _can_assign: bool) {
        match self.previous.lexeme.parse::<f64>() {
            Ok(value) => self.emit_constant(Value::Number(value)),
            Err(_) => self.error("Invalid number literal."),
        }
    }

    fn string(&mut self, _can_assign: bool) {
        let lexeme = self.previous.lexeme;
        let contents = &lexeme[1..lexeme.len() - 1];
        let interned = self.strings.intern(contents);
        self.emit_constant(Value::Str(interned));
    }

    fn literal(&mut self, _can_assign: bool) {
        match self.previous.kind {
            TokenKind::False => self.emit_op(OpCode::False),
            TokenKind::True => self.emit_op(OpCode::True),
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            _ => unreachable!("literal handler on non-literal token"),
        }
    }

    fn grouping(&mut self, _can_assign: bool) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self, _can_assign: bool) {
        let op = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match op {
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            TokenKind::Bang => self.emit_op(OpCode::Not),
            _ => unreachable!("unary handler on non-unary token"),
        }
    }

    fn binary(&mut self, _can_assign: bool) {
        let op = self.previous.kind;
        let next = rule(op).precedence.next();
        self.parse_precedence(next);
        match op {
            TokenKind::BangEqual => {
                self.emit_op(OpCode::Equal);
                self.emit_op(OpCode::Not);
            }
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::GreaterEqual => {
                self.emit_op(OpCode::Less);
                self.emit_op(OpCode::Not);
            }
            TokenKind::Less => self.emit_op(OpCode::Less),
            TokenKind::LessEqual => {
                self.emit_op(OpCode::Greater);
                self.emit_op(OpCode::Not);
            }
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            TokenKind::Question => self.emit_op(OpCode::Random),
            _ => unreachable!("binary handler on non-binary token"),
        }
    }

    fn and_op(&mut self, _can_assign: bool) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    fn or_op(&mut self, _can_assign: bool) {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(else_jump);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    fn call(&mut self, _can_assign: bool) {
        let arg_count = self.argument_list();
        self.emit_op(OpCode::Call);
        self.emit_byte(arg_count);
    }

    fn argument_list(&mut self) -> u8 {
        let mut count: u8 = 0;
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expression();
                if count == u8::MAX {
                    self.error("Can't have more than 255 arguments.");
                } else {
                    count += 1;
                }
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after arguments.");
        count
    }

    fn variable(&mut self, can_assign: bool) {
        let name = self.previous;
        let local = self.resolve_local(name.lexeme);

        // `name(` is a call when the name is callable (a declared
        // function, the clock native, or something bound locally) and an
        // array reference otherwise.
        if self.check(TokenKind::LeftParen) {
            let callable = local.is_some()
                || name.lexeme == "clock"
                || self.functions.iter().any(|f| f == name.lexeme);
            if !callable {
                self.array_access(name, can_assign);
                return;
            }
        }

        let (get_op, set_op, arg) = match local {
            Some(slot) => (OpCode::GetLocal, OpCode::SetLocal, slot),
            None => {
                let constant = self.identifier_constant(name.lexeme);
                (OpCode::GetGlobal, OpCode::SetGlobal, constant)
            }
        };
        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_op(set_op);
        } else {
            self.emit_op(get_op);
        }
        self.emit_byte(arg);
    }

    /// `name(sub, ...)` read or `name(sub, ...) = expr` write. Subscripts
    /// are pushed left to right; on a write the right-hand side goes on
    /// top of them.
    fn array_access(&mut self, name: Token<'src>, can_assign: bool) {
        self.consume(TokenKind::LeftParen, "Expect '(' after array name.");

        let mut count: u8 = 0;
        loop {
            if self.check(TokenKind::Star) {
                self.advance();
                // A bare `*` is the whole-axis wildcard; anything after
                // it would have to be an expression starting with `*`.
                if self.check(TokenKind::Comma) || self.check(TokenKind::RightParen) {
                    self.emit_op(OpCode::Star);
                } else {
                    self.error("Expect expression.");
                }
            } else {
                self.expression();
            }
            if self.matches(TokenKind::Colon) {
                self.error("Range subscripts are not implemented.");
                self.expression();
            }
            if count == u8::MAX {
                self.error("Too many array subscripts.");
            } else {
                count += 1;
            }
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after array subscripts.");

        let name_constant = self.identifier_constant(name.lexeme);
        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_op(OpCode::SetGlobalArray);
        } else {
            self.emit_op(OpCode::GetGlobalArray);
        }
        self.emit_byte(name_constant);
        self.emit_byte(count);
    }
}
