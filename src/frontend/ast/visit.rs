//! Trait definition for an AST visitor which walks the tree in DFS order

use super::{
    Assignment, Block, Expression, ExpressionKind, FunctionCallArgumentList, FunctionDefinition,
    FunctionParameter, FunctionParameterList, FunctionSignature, Identifier, If, Item, ItemKind,
    Literal, Local, Module, Statement, StatementKind, Type, While,
};

pub trait Visitor<'ast>: Sized {
    fn visit_item(&mut self, item: &'ast Item) {
        walk_item(self, item)
    }

    fn visit_function_definition(&mut self, function: &'ast FunctionDefinition) {
        walk_function_definition(self, function)
    }

    fn visit_function_signature(&mut self, signature: &'ast FunctionSignature) {
        walk_function_signature(self, signature)
    }

    fn visit_function_parameter_list(&mut self, parameters: &'ast FunctionParameterList) {
        walk_function_parameter_list(self, parameters)
    }

    fn visit_function_parameter(&mut self, parameter: &'ast FunctionParameter) {
        walk_function_parameter(self, parameter)
    }

    fn visit_identifier(&mut self, _identifier: &'ast Identifier) {}

    fn visit_type(&mut self, _ty: &'ast Type) {}

    fn visit_block(&mut self, block: &'ast Block) {
        walk_block(self, block)
    }

    fn visit_statement(&mut self, statement: &'ast Statement) {
        walk_statement(self, statement)
    }

    fn visit_local(&mut self, local: &'ast Local) {
        walk_local(self, local)
    }

    fn visit_assignment(&mut self, assignment: &'ast Assignment) {
        walk_assignment(self, assignment)
    }

    fn visit_if(&mut self, if_statement: &'ast If) {
        walk_if(self, if_statement)
    }

    fn visit_while(&mut self, while_statement: &'ast While) {
        walk_while(self, while_statement)
    }

    fn visit_expression(&mut self, expression: &'ast Expression) {
        walk_expression(self, expression)
    }

    fn visit_literal(&mut self, _literal: &'ast Literal) {}

    fn visit_function_call_argument_list(&mut self, arguments: &'ast FunctionCallArgumentList) {
        walk_function_call_argument_list(self, arguments)
    }
}

pub fn walk_module<'a>(visitor: &mut impl Visitor<'a>, module: &'a Module) {
    for item in &module.items {
        visitor.visit_item(item);
    }
}

pub fn walk_item<'a>(visitor: &mut impl Visitor<'a>, item: &'a Item) {
    match &item.kind {
        ItemKind::FunctionDefinition(function) => {
            visitor.visit_function_definition(function);
        }
        ItemKind::GlobalDeclaration(local) => {
            visitor.visit_local(local);
        }
    }
}

pub fn walk_function_definition<'a>(
    visitor: &mut impl Visitor<'a>,
    function: &'a FunctionDefinition,
) {
    visitor.visit_function_signature(&function.signature);
    visitor.visit_block(&function.body);
}

pub fn walk_function_signature<'a>(
    visitor: &mut impl Visitor<'a>,
    signature: &'a FunctionSignature,
) {
    visitor.visit_type(&signature.return_type);
    visitor.visit_identifier(&signature.name);
    visitor.visit_function_parameter_list(&signature.parameters);
}

pub fn walk_function_parameter_list<'a>(
    visitor: &mut impl Visitor<'a>,
    parameters: &'a FunctionParameterList,
) {
    for parameter in &parameters.parameters {
        visitor.visit_function_parameter(parameter)
    }
}

pub fn walk_function_parameter<'a>(
    visitor: &mut impl Visitor<'a>,
    parameter: &'a FunctionParameter,
) {
    visitor.visit_type(&parameter.ty);
    visitor.visit_identifier(&parameter.name);
}

pub fn walk_block<'a>(visitor: &mut impl Visitor<'a>, block: &'a Block) {
    for statement in &block.statements {
        visitor.visit_statement(statement);
    }
}

pub fn walk_statement<'a>(visitor: &mut impl Visitor<'a>, statement: &'a Statement) {
    match &statement.kind {
        StatementKind::Local(local) => visitor.visit_local(local),
        StatementKind::Assignment(assignment) => visitor.visit_assignment(assignment),
        StatementKind::If(if_statement) => visitor.visit_if(if_statement),
        StatementKind::While(while_statement) => visitor.visit_while(while_statement),
        StatementKind::Return(expression) => {
            if let Some(e) = &expression {
                visitor.visit_expression(e)
            }
        }
    }
}

/// Visits the initializer before the declared name, matching C's rule that a
/// declaration is only in scope after its declarator
pub fn walk_local<'a>(visitor: &mut impl Visitor<'a>, local: &'a Local) {
    visitor.visit_type(&local.ty);

    if let Some(initializer) = &local.initializer {
        visitor.visit_expression(initializer);
    }

    visitor.visit_identifier(&local.name);
}

pub fn walk_assignment<'a>(visitor: &mut impl Visitor<'a>, assignment: &'a Assignment) {
    visitor.visit_expression(&assignment.value);
    visitor.visit_identifier(&assignment.target);
}

pub fn walk_if<'a>(visitor: &mut impl Visitor<'a>, if_statement: &'a If) {
    visitor.visit_expression(&if_statement.condition);
    visitor.visit_block(&if_statement.positive);

    if let Some(negative) = &if_statement.negative {
        visitor.visit_block(negative);
    }
}

pub fn walk_while<'a>(visitor: &mut impl Visitor<'a>, while_statement: &'a While) {
    visitor.visit_expression(&while_statement.condition);
    visitor.visit_block(&while_statement.body);
}

pub fn walk_expression<'a>(visitor: &mut impl Visitor<'a>, expression: &'a Expression) {
    match &expression.kind {
        ExpressionKind::Literal(literal) => visitor.visit_literal(literal),
        ExpressionKind::Identifier(identifier) => visitor.visit_identifier(identifier),
        ExpressionKind::Grouping(expression) => visitor.visit_expression(expression),
        ExpressionKind::FunctionCall { target, arguments } => {
            visitor.visit_identifier(target);
            visitor.visit_function_call_argument_list(arguments);
        }
        ExpressionKind::Binary { lhs, rhs, .. } => {
            visitor.visit_expression(lhs);
            visitor.visit_expression(rhs);
        }
        ExpressionKind::Unary { operand, .. } => visitor.visit_expression(operand),
    }
}

pub fn walk_function_call_argument_list<'a>(
    visitor: &mut impl Visitor<'a>,
    arguments: &'a FunctionCallArgumentList,
) {
    for argument in &arguments.arguments {
        visitor.visit_expression(argument)
    }
}
