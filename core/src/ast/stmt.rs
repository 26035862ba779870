//! file: core/src/ast/stmt.rs
//! description: parsing helpers for statements and blocks.
//!
//! Turns `statement`, `block` and `with_stmt` pairs from the `pest`-generated
//! `RulesParser` into `AstNode`s, attaching `Location`/`Span` metadata via the
//! `rules` helpers so lowering can stamp positions on every IR node.
//!
use crate::{
    ast::{AstNode, AstNodeKind, ReformErrorExt, Rule, rules},
    script,
};

fn unexpected(
    what: &str,
    rule: Rule,
    issuer: &str,
    location: Option<crate::location::Location>,
    span: Option<crate::location::Span>,
) -> Box<dyn ReformErrorExt> {
    Box::<dyn ReformErrorExt>::from(Box::new(crate::ast::err::SyntaxError::with(
        crate::Level::Error,
        format!("Unexpected {} rule: {:?}", what, rule),
        issuer.into(),
        location,
        span,
    )))
}

/// Parse a single `statement` pair into an `AstNode`.
pub(crate) fn parse_statement_rule(
    pair: pest::iterators::Pair<Rule>,
    script: &script::Script,
) -> Result<AstNode, Box<dyn ReformErrorExt>> {
    let (mut inner_pairs, location, span) = rules::get_data_from_rule(&pair, script);
    let next_rule = rules::fetch_next_pair(&mut inner_pairs, &location, &span)?;
    match next_rule.as_rule() {
        Rule::with_stmt => parse_with_statement_rule(next_rule, script),
        Rule::pass_stmt => Ok(AstNode::new(AstNodeKind::Pass, location, span)),
        Rule::assign_stmt => {
            let (mut parts, location, span) = rules::get_data_from_rule(&next_rule, script);
            let target_pair = rules::fetch_next_pair(&mut parts, &location, &span)?;
            let value_pair = rules::fetch_next_pair(&mut parts, &location, &span)?;
            let target = parse_target_rule(target_pair, script)?;
            let value = super::expr::parse_expression_rule(value_pair, script)?;
            Ok(AstNode::new(
                AstNodeKind::Assignment {
                    target: Box::new(target),
                    value: Box::new(value),
                },
                location,
                span,
            ))
        }
        Rule::expr_stmt => {
            let (mut parts, location, span) = rules::get_data_from_rule(&next_rule, script);
            let expr_pair = rules::fetch_next_pair(&mut parts, &location, &span)?;
            let expr = super::expr::parse_expression_rule(expr_pair, script)?;
            Ok(AstNode::new(
                AstNodeKind::ExprStatement { expr: Box::new(expr) },
                location,
                span,
            ))
        }
        other => Err(unexpected(
            "statement",
            other,
            "reform.stmt.parse_statement_rule",
            location,
            span,
        )),
    }
}

pub(crate) fn parse_block_rule(
    pair: pest::iterators::Pair<Rule>,
    script: &script::Script,
) -> Result<AstNode, Box<dyn ReformErrorExt>> {
    let (inner_pairs, location, span) = rules::get_data_from_rule(&pair, script);
    let mut statements = Vec::new();
    for p in inner_pairs {
        match p.as_rule() {
            Rule::statement => statements.push(parse_statement_rule(p, script)?),
            other => {
                return Err(unexpected(
                    "block",
                    other,
                    "reform.stmt.parse_block_rule",
                    location,
                    span,
                ));
            }
        }
    }
    Ok(AstNode::new(AstNodeKind::Block { statements }, location, span))
}

/// Parse `async? with item, item ... { block }`.
///
/// Items keep source order; reversing them for nesting is the lowering
/// stage's job.
fn parse_with_statement_rule(
    pair: pest::iterators::Pair<Rule>,
    script: &script::Script,
) -> Result<AstNode, Box<dyn ReformErrorExt>> {
    let (inner_pairs, location, span) = rules::get_data_from_rule(&pair, script);
    let mut is_async = false;
    let mut items = Vec::new();
    let mut body = None;

    for p in inner_pairs {
        match p.as_rule() {
            Rule::async_kw => is_async = true,
            Rule::with_kw => {}
            Rule::with_item => items.push(parse_with_item_rule(p, script)?),
            Rule::block => body = Some(parse_block_rule(p, script)?),
            other => {
                return Err(unexpected(
                    "with statement",
                    other,
                    "reform.stmt.parse_with_statement_rule",
                    location,
                    span,
                ));
            }
        }
    }

    let body = match body {
        Some(b) => b,
        None => {
            return Err(Box::<dyn ReformErrorExt>::from(Box::new(
                crate::ast::err::SyntaxError::with(
                    crate::Level::Error,
                    "with statement is missing its block.".into(),
                    "reform.stmt.parse_with_statement_rule".into(),
                    location,
                    span,
                ),
            )));
        }
    };

    Ok(AstNode::new(
        AstNodeKind::With {
            items,
            body: Box::new(body),
            is_async,
        },
        location,
        span,
    ))
}

fn parse_with_item_rule(
    pair: pest::iterators::Pair<Rule>,
    script: &script::Script,
) -> Result<AstNode, Box<dyn ReformErrorExt>> {
    let (mut inner_pairs, location, span) = rules::get_data_from_rule(&pair, script);
    let context_pair = rules::fetch_next_pair(&mut inner_pairs, &location, &span)?;
    let context = super::expr::parse_expression_rule(context_pair, script)?;

    let mut target = None;
    for p in inner_pairs {
        match p.as_rule() {
            Rule::as_kw => {}
            Rule::target => target = Some(Box::new(parse_target_rule(p, script)?)),
            other => {
                return Err(unexpected(
                    "with item",
                    other,
                    "reform.stmt.parse_with_item_rule",
                    location,
                    span,
                ));
            }
        }
    }

    Ok(AstNode::new(
        AstNodeKind::WithItem {
            context: Box::new(context),
            target,
        },
        location,
        span,
    ))
}

/// Targets are a bare name or a dotted attribute chain `a.b.c`.
fn parse_target_rule(
    pair: pest::iterators::Pair<Rule>,
    script: &script::Script,
) -> Result<AstNode, Box<dyn ReformErrorExt>> {
    let (mut inner_pairs, location, span) = rules::get_data_from_rule(&pair, script);
    let next_rule = rules::fetch_next_pair(&mut inner_pairs, &location, &span)?;
    match next_rule.as_rule() {
        Rule::name => Ok(AstNode::new(
            AstNodeKind::Identifier {
                name: next_rule.as_str().to_string(),
            },
            location,
            span,
        )),
        Rule::attribute_target => {
            let (mut names, location, span) = rules::get_data_from_rule(&next_rule, script);
            let first = rules::fetch_next_pair(&mut names, &location, &span)?;
            let mut node = AstNode::new(
                AstNodeKind::Identifier {
                    name: first.as_str().to_string(),
                },
                rules::get_location_from_pair(&first, script),
                rules::get_span_from_pair(&first, script),
            );
            for name in names {
                node = AstNode::new(
                    AstNodeKind::Member {
                        object: Box::new(node),
                        property: name.as_str().to_string(),
                    },
                    location.clone(),
                    span.clone(),
                );
            }
            Ok(node)
        }
        other => Err(unexpected(
            "target",
            other,
            "reform.stmt.parse_target_rule",
            location,
            span,
        )),
    }
}
