//! Operation scripts: one protocol operation per line.
//!
//! ```text
//! push 3          # int literal
//! push 2.5        # float literal
//! push x          # identifier
//! push "hi\n"     # string literal
//! add | sub | mul | div
//! assign x
//! print
//! read x int
//! ```

use crate::compiler::{Compiler, Op};
use crate::diagnostic::{Diagnostic, DiagnosticSink};
use crate::ir::ArithOp;
use crate::span::{Span, Spanned};
use crate::value::{Data, Symbol, Type};

/// A word or quoted string on one line.
#[derive(Clone, Debug, PartialEq)]
enum Token {
    Word(String),
    Text(String),
}

/// Parse a whole script. Every malformed line is reported, not just the
/// first.
pub fn parse(source: &str) -> Result<Vec<Spanned<Op>>, Vec<Diagnostic>> {
    let mut ops = Vec::new();
    let mut errors = Vec::new();
    let mut offset = 0;
    for line in source.split_inclusive('\n') {
        let mut scanner = LineScanner::new(source.as_bytes(), offset, offset + line.len());
        match scanner.tokens().and_then(|tokens| parse_line(&tokens)) {
            Ok(Some(op)) => ops.push(op),
            Ok(None) => {}
            Err(diag) => errors.push(diag),
        }
        offset += line.len();
    }
    if errors.is_empty() {
        Ok(ops)
    } else {
        Err(errors)
    }
}

/// Run `ops` against `compiler`, tagging each operation's diagnostics with
/// its span. A failing operation does not stop the ones after it.
///
/// Returns the number of operations that failed.
pub fn apply<D: DiagnosticSink>(ops: &[Spanned<Op>], compiler: &mut Compiler<D>) -> usize {
    let mut failed = 0;
    for op in ops {
        compiler.set_span(op.span);
        if compiler.apply(&op.node).is_err() {
            failed += 1;
        }
    }
    compiler.set_span(Span::dummy());
    failed
}

// ─── Lines ────────────────────────────────────────────────────────

struct LineScanner<'src> {
    source: &'src [u8],
    pos: usize,
    end: usize,
}

impl<'src> LineScanner<'src> {
    fn new(source: &'src [u8], start: usize, end: usize) -> Self {
        Self {
            source,
            pos: start,
            end,
        }
    }

    fn peek(&self) -> Option<u8> {
        if self.pos < self.end {
            Some(self.source[self.pos])
        } else {
            None
        }
    }

    fn tokens(&mut self) -> Result<Vec<Spanned<Token>>, Diagnostic> {
        let mut tokens = Vec::new();
        loop {
            while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
                self.pos += 1;
            }
            match self.peek() {
                None | Some(b'#') => return Ok(tokens),
                Some(b'"') => tokens.push(self.scan_text()?),
                Some(_) => tokens.push(self.scan_word()),
            }
        }
    }

    fn scan_word(&mut self) -> Spanned<Token> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if !c.is_ascii_whitespace() && c != b'#' && c != b'"')
        {
            self.pos += 1;
        }
        let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
        Spanned::new(Token::Word(text), self.span_from(start))
    }

    fn scan_text(&mut self) -> Result<Spanned<Token>, Diagnostic> {
        let start = self.pos;
        self.pos += 1; // opening quote
        let mut bytes = Vec::new();
        loop {
            match self.peek() {
                None | Some(b'\n') | Some(b'\r') => {
                    return Err(Diagnostic::error(
                        "unterminated string literal".to_string(),
                        self.span_from(start),
                    )
                    .with_help("close the string with `\"` on the same line".to_string()));
                }
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    let escape_start = self.pos;
                    self.pos += 1;
                    let decoded = match self.peek() {
                        Some(b'n') => b'\n',
                        Some(b't') => b'\t',
                        Some(b'"') => b'"',
                        Some(b'\\') => b'\\',
                        _ => {
                            return Err(Diagnostic::error(
                                "unknown escape sequence".to_string(),
                                Span::new(escape_start as u32, (self.pos + 1).min(self.end) as u32),
                            )
                            .with_note("supported escapes: \\n \\t \\\" \\\\".to_string()));
                        }
                    };
                    bytes.push(decoded);
                    self.pos += 1;
                }
                Some(c) => {
                    bytes.push(c);
                    self.pos += 1;
                }
            }
        }
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(Spanned::new(Token::Text(text), self.span_from(start)))
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start as u32, self.pos as u32)
    }
}

// ─── Operations ───────────────────────────────────────────────────

fn parse_line(tokens: &[Spanned<Token>]) -> Result<Option<Spanned<Op>>, Diagnostic> {
    let Some((head, args)) = tokens.split_first() else {
        return Ok(None);
    };
    let span = args.iter().fold(head.span, |span, t| span.merge(t.span));
    let keyword = match &head.node {
        Token::Word(word) => word.as_str(),
        Token::Text(_) => {
            return Err(Diagnostic::error(
                "expected an operation, found a string literal".to_string(),
                head.span,
            ));
        }
    };

    let op = match keyword {
        "push" => {
            let [arg] = expect_args::<1>(keyword, args, span)?;
            Op::Push(parse_operand(arg)?)
        }
        "add" | "sub" | "mul" | "div" => {
            expect_args::<0>(keyword, args, span)?;
            Op::Triplet(match keyword {
                "add" => ArithOp::Add,
                "sub" => ArithOp::Sub,
                "mul" => ArithOp::Mul,
                _ => ArithOp::Div,
            })
        }
        "assign" => {
            let [target] = expect_args::<1>(keyword, args, span)?;
            Op::Assign(expect_ident(target)?)
        }
        "print" => {
            expect_args::<0>(keyword, args, span)?;
            Op::Print
        }
        "read" => {
            let [target, ty] = expect_args::<2>(keyword, args, span)?;
            Op::Read(expect_ident(target)?, expect_read_type(ty)?)
        }
        other => {
            return Err(Diagnostic::error(
                format!("unknown operation `{}`", other),
                head.span,
            )
            .with_help("expected push, add, sub, mul, div, assign, print or read".to_string()));
        }
    };
    Ok(Some(Spanned::new(op, span)))
}

fn expect_args<'a, const N: usize>(
    keyword: &str,
    args: &'a [Spanned<Token>],
    span: Span,
) -> Result<[&'a Spanned<Token>; N], Diagnostic> {
    if args.len() != N {
        return Err(Diagnostic::error(
            format!(
                "`{}` takes {} argument{}, found {}",
                keyword,
                N,
                if N == 1 { "" } else { "s" },
                args.len()
            ),
            span,
        ));
    }
    Ok(std::array::from_fn(|i| &args[i]))
}

fn parse_operand(token: &Spanned<Token>) -> Result<Symbol, Diagnostic> {
    match &token.node {
        Token::Text(text) => Ok(Symbol::Text(text.clone())),
        Token::Word(word) if looks_numeric(word) => parse_number(word, token.span).map(Symbol::Literal),
        Token::Word(_) => expect_ident(token).map(Symbol::Ident),
    }
}

fn looks_numeric(word: &str) -> bool {
    let unsigned = word.strip_prefix(['+', '-']).unwrap_or(word);
    unsigned
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '.')
}

fn parse_number(word: &str, span: Span) -> Result<Data, Diagnostic> {
    let is_float = word.contains(['.', 'e', 'E']);
    if is_float {
        match word.parse::<f32>() {
            Ok(v) if v.is_finite() => Ok(Data::F32(v)),
            Ok(_) => Err(Diagnostic::error(
                format!("float literal `{}` is out of range", word),
                span,
            )),
            Err(_) => Err(Diagnostic::error(
                format!("invalid float literal `{}`", word),
                span,
            )),
        }
    } else {
        word.parse::<i32>().map(Data::I32).map_err(|_| {
            Diagnostic::error(format!("invalid int literal `{}`", word), span)
                .with_note("int literals must fit in 32 signed bits".to_string())
        })
    }
}

fn expect_ident(token: &Spanned<Token>) -> Result<String, Diagnostic> {
    match &token.node {
        Token::Word(word) if is_ident(word) => Ok(word.clone()),
        Token::Word(word) => Err(Diagnostic::error(
            format!("`{}` is not a valid identifier", word),
            token.span,
        )),
        Token::Text(_) => Err(Diagnostic::error(
            "expected an identifier, found a string literal".to_string(),
            token.span,
        )),
    }
}

fn expect_read_type(token: &Spanned<Token>) -> Result<Type, Diagnostic> {
    let parsed = match &token.node {
        Token::Word(word) => word.parse::<Type>().ok(),
        Token::Text(_) => None,
    };
    match parsed {
        Some(ty) if ty.is_numeric() => Ok(ty),
        _ => Err(
            Diagnostic::error("expected `int` or `float`".to_string(), token.span)
                .with_note("only numeric values can be read".to_string()),
        ),
    }
}

pub(crate) fn is_ident(word: &str) -> bool {
    let mut chars = word.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
