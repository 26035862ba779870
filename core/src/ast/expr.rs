use crate::{
    ast::{AstNode, AstNodeKind, ReformErrorExt, Rule, rules},
    script,
};

/// Parse an `expr` pair: a primary followed by any chain of calls and
/// attribute accesses, folded left to right.
pub(crate) fn parse_expression_rule(
    pair: pest::iterators::Pair<Rule>,
    script: &script::Script,
) -> Result<AstNode, Box<dyn ReformErrorExt>> {
    let (mut inner_pairs, location, span) = rules::get_data_from_rule(&pair, script);
    let primary = rules::fetch_next_pair(&mut inner_pairs, &location, &span)?;
    let mut node = parse_primary_rule(primary, script)?;

    for postfix in inner_pairs {
        let postfix_location = rules::get_location_from_pair(&postfix, script);
        let postfix_span = rules::get_span_from_pair(&postfix, script);
        match postfix.as_rule() {
            Rule::call_args => {
                let mut args = Vec::new();
                for arg in postfix.into_inner() {
                    args.push(parse_expression_rule(arg, script)?);
                }
                node = AstNode::new(
                    AstNodeKind::Call {
                        callee: Box::new(node),
                        args,
                    },
                    location.clone(),
                    span.clone(),
                );
            }
            Rule::attr_access => {
                let property = postfix.as_str().trim_start_matches('.').trim().to_string();
                node = AstNode::new(
                    AstNodeKind::Member {
                        object: Box::new(node),
                        property,
                    },
                    location.clone(),
                    span.clone(),
                );
            }
            other => {
                return Err(Box::<dyn ReformErrorExt>::from(Box::new(
                    crate::ast::err::SyntaxError::with(
                        crate::Level::Error,
                        format!("Unexpected postfix rule: {:?}", other),
                        "reform.expr.parse_expression_rule".into(),
                        postfix_location,
                        postfix_span,
                    ),
                )));
            }
        }
    }

    Ok(node)
}

fn parse_primary_rule(
    pair: pest::iterators::Pair<Rule>,
    script: &script::Script,
) -> Result<AstNode, Box<dyn ReformErrorExt>> {
    let location = rules::get_location_from_pair(&pair, script);
    let span = rules::get_span_from_pair(&pair, script);
    let text = pair.as_str();
    let kind = match pair.as_rule() {
        Rule::none_lit => AstNodeKind::None,
        Rule::bool_lit => AstNodeKind::Bool { value: text == "True" },
        Rule::int_lit => match text.parse::<i64>() {
            Ok(value) => AstNodeKind::Integer { value },
            Err(_) => {
                return Err(Box::<dyn ReformErrorExt>::from(Box::new(
                    crate::ast::err::SyntaxError::with(
                        crate::Level::Error,
                        format!("Integer literal out of range: {}", text),
                        "reform.expr.parse_primary_rule".into(),
                        location,
                        span,
                    ),
                )));
            }
        },
        Rule::string_lit => AstNodeKind::String {
            value: text.trim_matches('"').to_string(),
        },
        Rule::name => AstNodeKind::Identifier {
            name: text.to_string(),
        },
        other => {
            return Err(Box::<dyn ReformErrorExt>::from(Box::new(
                crate::ast::err::SyntaxError::with(
                    crate::Level::Error,
                    format!("Unexpected primary rule: {:?}", other),
                    "reform.expr.parse_primary_rule".into(),
                    location,
                    span,
                ),
            )));
        }
    };
    Ok(AstNode::new(kind, location, span))
}
