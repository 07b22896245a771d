use thiserror::Error;

use super::{
    ast::{Item, ItemKind, NodeId},
    intern::InternedSymbol,
};
use crate::frontend::{
    SourceFile,
    ast::{
        Assignment, BinaryOperator, BinaryOperatorKind, Block, Expression, ExpressionKind,
        FunctionCallArgumentList, FunctionDefinition, FunctionParameter, FunctionParameterList,
        FunctionSignature, Identifier, If, Literal, LiteralKind, Local, Module, Statement,
        StatementKind, Type, TypeKind, UnaryOperator, UnaryOperatorKind, While,
    },
    lexer::{Keyword, LexError, Lexer, Span, Token, TokenKind},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("expected {expected} but reached end of file")]
    UnexpectedEndOfFile { expected: String, span: Span },
    #[error("expected {expected} but found `{found}`")]
    UnexpectedToken {
        expected: String,
        /// Source text of the offending token
        found: String,
        span: Span,
    },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::Lex(error) => error.span(),
            ParseError::UnexpectedEndOfFile { span, .. }
            | ParseError::UnexpectedToken { span, .. } => *span,
        }
    }
}

type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug)]
pub struct Parser<'source> {
    lexer: Lexer<'source>,
    next_node_id: u32,
}

impl<'source> Parser<'source> {
    pub fn parse_module(source_file: &'source SourceFile) -> ParseResult<Module> {
        let mut parser = Self {
            lexer: Lexer::new(source_file),
            next_node_id: 0,
        };

        let mut module = Module { items: Vec::new() };

        while parser.lexer.peek()?.is_some() {
            module.items.push(parser.parse_module_item()?);
        }

        Ok(module)
    }

    fn create_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    fn unexpected(&self, expecting: &str, token: Token) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expecting.to_owned(),
            found: self.lexer.source().value_of_span(token.span).to_owned(),
            span: token.span,
        }
    }

    fn expect_peek(&mut self, expecting: &str) -> ParseResult<Token> {
        match self.lexer.peek()? {
            Some(token) => Ok(token),
            None => Err(ParseError::UnexpectedEndOfFile {
                expected: expecting.to_owned(),
                span: self.lexer.eof_span(),
            }),
        }
    }

    fn expect_next(&mut self, expecting: &str) -> ParseResult<Token> {
        match self.lexer.next()? {
            Some(token) => Ok(token),
            None => Err(ParseError::UnexpectedEndOfFile {
                expected: expecting.to_owned(),
                span: self.lexer.eof_span(),
            }),
        }
    }

    fn expect_next_to_be(&mut self, kind: TokenKind, expecting: &str) -> ParseResult<Token> {
        let token = self.expect_next(expecting)?;

        if token.kind != kind {
            return Err(self.unexpected(expecting, token));
        }

        Ok(token)
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> ParseResult<Token> {
        self.expect_next_to_be(TokenKind::Keyword(keyword), &format!("`{keyword}`"))
    }

    fn next_is(&mut self, kind: TokenKind) -> ParseResult<bool> {
        Ok(self.lexer.peek()?.is_some_and(|t| t.kind == kind))
    }

    /// Both items start with `type IDENT`; an open paren after the name makes
    /// it a function definition.
    fn parse_module_item(&mut self) -> ParseResult<Item> {
        let ty = self.parse_type()?;
        let name = self.parse_identifier()?;

        if self.next_is(TokenKind::OpenParen)? {
            let function = Box::new(self.parse_function_definition(ty, name)?);

            return Ok(Item {
                id: self.create_node_id(),
                span: function.span,
                kind: ItemKind::FunctionDefinition(function),
            });
        }

        let local = Box::new(self.parse_local_rest(ty, name)?);

        Ok(Item {
            id: self.create_node_id(),
            span: local.span,
            kind: ItemKind::GlobalDeclaration(local),
        })
    }

    /// type name(type param, ...) {}
    fn parse_function_definition(
        &mut self,
        return_type: Type,
        name: Identifier,
    ) -> ParseResult<FunctionDefinition> {
        let parameters = self.parse_function_parameter_list()?;

        let signature = FunctionSignature {
            id: self.create_node_id(),
            span: return_type.span.to(parameters.span),
            return_type,
            name,
            parameters,
        };

        let body = self.parse_block()?;

        Ok(FunctionDefinition {
            id: self.create_node_id(),
            span: signature.span.to(body.span),
            signature,
            body,
        })
    }

    // main
    fn parse_identifier(&mut self) -> ParseResult<Identifier> {
        let token = self.expect_next_to_be(TokenKind::Identifier, "identifier")?;

        Ok(Identifier {
            id: self.create_node_id(),
            span: token.span,
            symbol: InternedSymbol::new(self.lexer.source().value_of_span(token.span)),
        })
    }

    // (int argc, char c)
    fn parse_function_parameter_list(&mut self) -> ParseResult<FunctionParameterList> {
        let mut parameters = Vec::new();

        let open_paren = self.expect_next_to_be(TokenKind::OpenParen, "`(`")?;

        // If the next token is not a closing paren there MUST be at least one
        // parameter
        if self.expect_peek("function parameter or `)`")?.kind != TokenKind::CloseParen {
            parameters.push(self.parse_function_parameter()?);

            while self.next_is(TokenKind::Comma)? {
                self.expect_next_to_be(TokenKind::Comma, "`,`")?;
                parameters.push(self.parse_function_parameter()?);
            }
        }

        let close_paren = self.expect_next_to_be(TokenKind::CloseParen, "`,` or `)`")?;

        Ok(FunctionParameterList {
            id: self.create_node_id(),
            span: open_paren.span.to(close_paren.span),
            parameters,
        })
    }

    // int argc
    fn parse_function_parameter(&mut self) -> ParseResult<FunctionParameter> {
        let ty = self.parse_type()?;
        let name = self.parse_identifier()?;

        Ok(FunctionParameter {
            id: self.create_node_id(),
            span: ty.span.to(name.span),
            ty,
            name,
        })
    }

    // type = "int" | "float" | "char"
    fn parse_type(&mut self) -> ParseResult<Type> {
        let token = self.expect_next("type")?;

        let kind = match token.kind {
            TokenKind::Keyword(Keyword::Int) => TypeKind::Int,
            TokenKind::Keyword(Keyword::Float) => TypeKind::Float,
            TokenKind::Keyword(Keyword::Char) => TypeKind::Char,
            _ => return Err(self.unexpected("type", token)),
        };

        Ok(Type {
            id: self.create_node_id(),
            span: token.span,
            kind,
        })
    }

    // "{" ( statement )* "}"
    fn parse_block(&mut self) -> ParseResult<Block> {
        let mut statements = Vec::new();

        let open_brace = self.expect_next_to_be(TokenKind::OpenBrace, "`{`")?;

        while self.expect_peek("statement or `}`")?.kind != TokenKind::CloseBrace {
            statements.push(self.parse_statement()?);
        }

        let close_brace = self.expect_next_to_be(TokenKind::CloseBrace, "`}`")?;

        Ok(Block {
            id: self.create_node_id(),
            span: open_brace.span.to(close_brace.span),
            statements,
        })
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        let peeked = self.expect_peek("statement")?;

        let (span, kind) = match peeked.kind {
            kind if kind.is_type_keyword() => {
                let ty = self.parse_type()?;
                let name = self.parse_identifier()?;
                let local = self.parse_local_rest(ty, name)?;

                (local.span, StatementKind::Local(Box::new(local)))
            }
            TokenKind::Keyword(Keyword::If) => {
                let if_statement = self.parse_if()?;

                (if_statement.span, StatementKind::If(Box::new(if_statement)))
            }
            TokenKind::Keyword(Keyword::While) => {
                let while_statement = self.parse_while()?;

                (
                    while_statement.span,
                    StatementKind::While(Box::new(while_statement)),
                )
            }
            TokenKind::Keyword(Keyword::Return) => {
                let return_keyword = self.expect_keyword(Keyword::Return)?;

                let expression = if self.next_is(TokenKind::Semicolon)? {
                    None
                } else {
                    Some(Box::new(self.parse_expression()?))
                };

                let semicolon = self.expect_next_to_be(TokenKind::Semicolon, "`;`")?;

                (
                    return_keyword.span.to(semicolon.span),
                    StatementKind::Return(expression),
                )
            }
            TokenKind::Identifier => {
                let assignment = self.parse_assignment()?;

                (
                    assignment.span,
                    StatementKind::Assignment(Box::new(assignment)),
                )
            }
            _ => return Err(self.unexpected("statement", peeked)),
        };

        Ok(Statement {
            id: self.create_node_id(),
            span,
            kind,
        })
    }

    /// Everything after `type name` in a declaration: `;` or `= expression;`
    fn parse_local_rest(&mut self, ty: Type, name: Identifier) -> ParseResult<Local> {
        let initializer = if self.expect_peek("`=` or `;`")?.kind == TokenKind::Equals {
            self.expect_next_to_be(TokenKind::Equals, "`=`")?;
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        let semicolon = self.expect_next_to_be(TokenKind::Semicolon, "`;`")?;

        Ok(Local {
            id: self.create_node_id(),
            span: ty.span.to(semicolon.span),
            ty,
            name,
            initializer,
        })
    }

    // name = expression;
    fn parse_assignment(&mut self) -> ParseResult<Assignment> {
        let target = self.parse_identifier()?;
        self.expect_next_to_be(TokenKind::Equals, "`=`")?;
        let value = self.parse_expression()?;
        let semicolon = self.expect_next_to_be(TokenKind::Semicolon, "`;`")?;

        Ok(Assignment {
            id: self.create_node_id(),
            span: target.span.to(semicolon.span),
            target,
            value: Box::new(value),
        })
    }

    /// "if" "(" expression ")" BLOCK ( "else" ( BLOCK | if ) )?
    fn parse_if(&mut self) -> ParseResult<If> {
        let if_keyword = self.expect_keyword(Keyword::If)?;
        let condition = self.parse_parenthesized_condition()?;
        let positive = self.parse_block()?;

        let negative = if self.next_is(TokenKind::Keyword(Keyword::Else))? {
            self.expect_keyword(Keyword::Else)?;

            let peeked = self.expect_peek("`if` or `{`")?;

            match peeked.kind {
                TokenKind::OpenBrace => Some(self.parse_block()?),
                // `else if` becomes an else block holding a single if
                TokenKind::Keyword(Keyword::If) => {
                    let nested = self.parse_if()?;
                    let span = nested.span;

                    let statement = Statement {
                        id: self.create_node_id(),
                        span,
                        kind: StatementKind::If(Box::new(nested)),
                    };

                    Some(Block {
                        id: self.create_node_id(),
                        span,
                        statements: vec![statement],
                    })
                }
                _ => return Err(self.unexpected("`if` or `{` after `else`", peeked)),
            }
        } else {
            None
        };

        Ok(If {
            id: self.create_node_id(),
            span: if_keyword
                .span
                .to(negative.as_ref().map(|n| n.span).unwrap_or(positive.span)),
            condition: Box::new(condition),
            positive,
            negative,
        })
    }

    /// "while" "(" expression ")" BLOCK
    fn parse_while(&mut self) -> ParseResult<While> {
        let while_keyword = self.expect_keyword(Keyword::While)?;
        let condition = self.parse_parenthesized_condition()?;
        let body = self.parse_block()?;

        Ok(While {
            id: self.create_node_id(),
            span: while_keyword.span.to(body.span),
            condition: Box::new(condition),
            body,
        })
    }

    fn parse_parenthesized_condition(&mut self) -> ParseResult<Expression> {
        self.expect_next_to_be(TokenKind::OpenParen, "`(`")?;
        let condition = self.parse_expression()?;
        self.expect_next_to_be(TokenKind::CloseParen, "`)`")?;

        Ok(condition)
    }

    /// expression     -> comparison
    /// comparison     -> term ( ( "!=" | "==" | "<" | "<=" | ">" | ">=" ) term )*
    /// term           -> factor ( ( "-" | "+" ) factor )*
    /// factor         -> unary ( ( "/" | "*" ) unary )*
    /// unary          -> "-" unary
    ///                   | atom
    /// atom           -> IDENTIFIER ( "(" ( expression ( "," expression )* )? ")" )?
    ///                   | NUMBER | CHAR
    ///                   | "(" expression ")"
    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_comparison_expression()
    }

    fn parse_comparison_expression(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_term_expression()?;

        while self.lexer.peek()?.is_some_and(|t| t.kind.is_comparison_operator()) {
            let operator = self.parse_binary_operator()?;
            let rhs = self.parse_term_expression()?;

            expression = self.binary(expression, operator, rhs);
        }

        Ok(expression)
    }

    fn parse_term_expression(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_factor_expression()?;

        while self.lexer.peek()?.is_some_and(|t| t.kind.is_term_operator()) {
            let operator = self.parse_binary_operator()?;
            let rhs = self.parse_factor_expression()?;

            expression = self.binary(expression, operator, rhs);
        }

        Ok(expression)
    }

    fn parse_factor_expression(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_unary_expression()?;

        while self.lexer.peek()?.is_some_and(|t| t.kind.is_factor_operator()) {
            let operator = self.parse_binary_operator()?;
            let rhs = self.parse_unary_expression()?;

            expression = self.binary(expression, operator, rhs);
        }

        Ok(expression)
    }

    fn binary(&mut self, lhs: Expression, operator: BinaryOperator, rhs: Expression) -> Expression {
        Expression {
            id: self.create_node_id(),
            span: lhs.span.to(rhs.span),
            kind: ExpressionKind::Binary {
                lhs: Box::new(lhs),
                operator,
                rhs: Box::new(rhs),
            },
        }
    }

    fn parse_binary_operator(&mut self) -> ParseResult<BinaryOperator> {
        let operator = self.expect_next("binary operator")?;

        let kind = match operator.kind {
            TokenKind::Plus => BinaryOperatorKind::Add,
            TokenKind::Minus => BinaryOperatorKind::Subtract,
            TokenKind::Asterisk => BinaryOperatorKind::Multiply,
            TokenKind::Divide => BinaryOperatorKind::Divide,
            TokenKind::NotEquals => BinaryOperatorKind::NotEquals,
            TokenKind::DoubleEquals => BinaryOperatorKind::Equals,
            TokenKind::LessThan => BinaryOperatorKind::LessThan,
            TokenKind::LessThanOrEqualTo => BinaryOperatorKind::LessThanOrEqualTo,
            TokenKind::GreaterThan => BinaryOperatorKind::GreaterThan,
            TokenKind::GreaterThanOrEqualTo => BinaryOperatorKind::GreaterThanOrEqualTo,
            _ => return Err(self.unexpected("binary operator", operator)),
        };

        Ok(BinaryOperator {
            id: self.create_node_id(),
            span: operator.span,
            kind,
        })
    }

    fn parse_unary_expression(&mut self) -> ParseResult<Expression> {
        if self.expect_peek("expression")?.kind == TokenKind::Minus {
            let minus = self.expect_next_to_be(TokenKind::Minus, "`-`")?;
            let operator = UnaryOperator {
                id: self.create_node_id(),
                span: minus.span,
                kind: UnaryOperatorKind::Negate,
            };
            let operand = self.parse_unary_expression()?;

            return Ok(Expression {
                id: self.create_node_id(),
                span: minus.span.to(operand.span),
                kind: ExpressionKind::Unary {
                    operator,
                    operand: Box::new(operand),
                },
            });
        }

        self.parse_atomic_expression()
    }

    fn parse_atomic_expression(&mut self) -> ParseResult<Expression> {
        let peeked = self.expect_peek("expression")?;

        match peeked.kind {
            TokenKind::Identifier => {
                let identifier = self.parse_identifier()?;

                if self.next_is(TokenKind::OpenParen)? {
                    let arguments = self.parse_function_call_arguments()?;

                    return Ok(Expression {
                        id: self.create_node_id(),
                        span: identifier.span.to(arguments.span),
                        kind: ExpressionKind::FunctionCall {
                            target: Box::new(identifier),
                            arguments: Box::new(arguments),
                        },
                    });
                }

                Ok(Expression {
                    id: self.create_node_id(),
                    span: identifier.span,
                    kind: ExpressionKind::Identifier(Box::new(identifier)),
                })
            }
            TokenKind::OpenParen => self.parse_grouping_expression(),
            _ => {
                let literal = self.parse_literal()?;

                Ok(Expression {
                    id: self.create_node_id(),
                    span: literal.span,
                    kind: ExpressionKind::Literal(Box::new(literal)),
                })
            }
        }
    }

    fn parse_function_call_arguments(&mut self) -> ParseResult<FunctionCallArgumentList> {
        let mut arguments = Vec::new();

        let open_paren = self.expect_next_to_be(TokenKind::OpenParen, "`(`")?;

        if self.expect_peek("function call argument or `)`")?.kind != TokenKind::CloseParen {
            arguments.push(self.parse_expression()?);

            while self.next_is(TokenKind::Comma)? {
                self.expect_next_to_be(TokenKind::Comma, "`,`")?;
                arguments.push(self.parse_expression()?);
            }
        }

        let close_paren = self.expect_next_to_be(TokenKind::CloseParen, "`,` or `)`")?;

        Ok(FunctionCallArgumentList {
            id: self.create_node_id(),
            span: open_paren.span.to(close_paren.span),
            arguments,
        })
    }

    fn parse_grouping_expression(&mut self) -> ParseResult<Expression> {
        let open_paren = self.expect_next_to_be(TokenKind::OpenParen, "`(`")?;
        let expression = self.parse_expression()?;
        let close_paren = self.expect_next_to_be(TokenKind::CloseParen, "`)`")?;

        Ok(Expression {
            id: self.create_node_id(),
            span: open_paren.span.to(close_paren.span),
            kind: ExpressionKind::Grouping(Box::new(expression)),
        })
    }

    fn parse_literal(&mut self) -> ParseResult<Literal> {
        let token = self.expect_next("literal")?;

        let kind = match token.kind {
            TokenKind::CharLiteral => LiteralKind::Char,
            TokenKind::IntegerLiteral => LiteralKind::Integer,
            TokenKind::FloatLiteral => LiteralKind::Float,
            _ => return Err(self.unexpected("expression", token)),
        };

        Ok(Literal {
            id: self.create_node_id(),
            span: token.span,
            kind,
            symbol: InternedSymbol::new(self.lexer.source().value_of_span(token.span)),
        })
    }
}
