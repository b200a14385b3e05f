use super::FormulaError;

/// Deepest expression tree the parser builds, counting both parentheses and
/// operator chains
pub const MAX_DEPTH: usize = 256;

/// Parsed arithmetic expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Var(String),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// `left ?? right`: right is used when left cannot be evaluated
    Coalesce(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Coalesce,
}

fn tokenize(input: &str) -> Result<Vec<Token>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '[' => tokens.push(Token::LBracket),
            ']' => tokens.push(Token::RBracket),
            ',' => tokens.push(Token::Comma),
            '+' => tokens.push(Token::Plus),
            '-' => tokens.push(Token::Minus),
            '*' => tokens.push(Token::Star),
            '/' => tokens.push(Token::Slash),
            '%' => tokens.push(Token::Percent),
            '^' => tokens.push(Token::Caret),
            '?' => {
                if chars.peek().map(|(_, c)| *c) == Some('?') {
                    chars.next();
                    tokens.push(Token::Coalesce);
                } else {
                    return Err(FormulaError::UnexpectedChar { ch: c, pos });
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut literal = String::from(c);
                while let Some((_, next)) = chars.peek().copied() {
                    if next.is_ascii_digit() || next == '.' {
                        literal.push(next);
                        chars.next();
                    } else if (next == 'e' || next == 'E') && !literal.contains(['e', 'E']) {
                        // exponent only when followed by a digit or sign
                        let mut lookahead = chars.clone();
                        lookahead.next();
                        match lookahead.peek().map(|(_, c)| *c) {
                            Some(d) if d.is_ascii_digit() || d == '-' || d == '+' => {
                                literal.push(next);
                                chars.next();
                                if let Some((_, sign)) = chars.peek().copied() {
                                    if sign == '-' || sign == '+' {
                                        literal.push(sign);
                                        chars.next();
                                    }
                                }
                            }
                            _ => break,
                        }
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| FormulaError::InvalidNumber(literal.clone()))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::from(c);
                while let Some((_, next)) = chars.peek().copied() {
                    if next.is_alphanumeric() || next == '_' || next == '.' {
                        ident.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            _ => return Err(FormulaError::UnexpectedChar { ch: c, pos }),
        }
    }

    Ok(tokens)
}

/// Parse an expression into an [`Expr`] tree
pub fn parse(input: &str) -> Result<Expr, FormulaError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(FormulaError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.coalesce()?;
    if parser.pos < parser.tokens.len() {
        return Err(FormulaError::TrailingInput(parser.pos));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), FormulaError> {
        match self.next() {
            Some(ref token) if *token == expected => Ok(()),
            _ => Err(FormulaError::Expected {
                expected: format!("{:?}", expected),
                pos: self.pos.saturating_sub(1),
            }),
        }
    }

    fn enter(&mut self) -> Result<(), FormulaError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(FormulaError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn coalesce(&mut self) -> Result<Expr, FormulaError> {
        let base = self.depth;
        self.enter()?;
        let mut left = self.additive()?;
        while self.peek() == Some(&Token::Coalesce) {
            self.next();
            self.enter()?;
            let right = self.additive()?;
            left = Expr::Coalesce(Box::new(left), Box::new(right));
        }
        self.depth = base;
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, FormulaError> {
        let base = self.depth;
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.next();
            self.enter()?;
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = base;
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let base = self.depth;
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Rem,
                _ => break,
            };
            self.next();
            self.enter()?;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = base;
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        let base = self.depth;
        let expr = match self.peek() {
            Some(Token::Minus) => {
                self.next();
                self.enter()?;
                Expr::Neg(Box::new(self.unary()?))
            }
            Some(Token::Plus) => {
                self.next();
                self.enter()?;
                self.unary()?
            }
            _ => self.power()?,
        };
        self.depth = base;
        Ok(expr)
    }

    fn power(&mut self) -> Result<Expr, FormulaError> {
        let base = self.primary()?;
        if self.peek() == Some(&Token::Caret) {
            self.next();
            let depth = self.depth;
            self.enter()?;
            let exponent = self.unary()?;
            self.depth = depth;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        let pos = self.pos;
        match self.next() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::LParen) => {
                let inner = self.coalesce()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::LBracket) => match self.next() {
                Some(Token::Ident(name)) => {
                    self.expect(Token::RBracket)?;
                    Ok(Expr::Var(name))
                }
                _ => Err(FormulaError::Expected {
                    expected: "variable name".to_string(),
                    pos: pos + 1,
                }),
            },
            Some(Token::Ident(name)) => {
                if self.peek() != Some(&Token::LParen) {
                    return Ok(Expr::Var(name));
                }
                self.next();
                let mut args = vec![self.coalesce()?];
                while self.peek() == Some(&Token::Comma) {
                    self.next();
                    args.push(self.coalesce()?);
                }
                self.expect(Token::RParen)?;
                Ok(Expr::Call(name.to_ascii_lowercase(), args))
            }
            _ => Err(FormulaError::Expected {
                expected: "number, variable or '('".to_string(),
                pos,
            }),
        }
    }
}
