use pest::iterators::{Pair, Pairs};
use pest_derive::Parser;

use crate::ast::err::SyntaxError;
use crate::error::{Level, ReformErrorExt};
use crate::location::{Location, Span};
use crate::script::Script;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct RulesParser;

/// Next inner pair of a rule whose grammar guarantees one more child.
pub(crate) fn fetch_next_pair<'a>(
    pairs: &mut Pairs<'a, Rule>,
    location: &Option<Location>,
    span: &Option<Span>,
) -> Result<Pair<'a, Rule>, Box<dyn ReformErrorExt>> {
    pairs.next().ok_or_else(|| {
        SyntaxError::with(
            Level::Error,
            "Expected more inner pairs but found none.".into(),
            "reform.ast.rules.fetch_next_pair".into(),
            location.clone(),
            span.clone(),
        )
        .into()
    })
}

/// Inner pairs of `rule` plus where it sits in `script`.
pub(crate) fn get_data_from_rule<'a>(
    rule: &Pair<'a, Rule>,
    script: &Script,
) -> (Pairs<'a, Rule>, Option<Location>, Option<Span>) {
    let span = get_span_from_pair(rule, script);
    let location = get_location_from_pair(rule, script);
    (rule.clone().into_inner(), location, span)
}

fn position_location(position: pest::Position<'_>, script: &Script) -> Location {
    let (line, column) = position.line_col();
    script.location_at(line, column)
}

pub fn get_location_from_pair(rule: &Pair<Rule>, script: &Script) -> Option<Location> {
    Some(position_location(rule.as_span().start_pos(), script))
}

pub fn get_span_from_pair(rule: &Pair<Rule>, script: &Script) -> Option<Span> {
    let span = rule.as_span();
    Some(Span::new(
        position_location(span.start_pos(), script),
        position_location(span.end_pos(), script),
    ))
}

/// Convert a pest parse failure into a located `SyntaxError`.
pub(crate) fn syntax_error_from_pest(err: pest::error::Error<Rule>, script: &Script) -> Box<dyn ReformErrorExt> {
    let (line, column) = match err.line_col {
        pest::error::LineColLocation::Pos(pos) => pos,
        pest::error::LineColLocation::Span(start, _) => start,
    };
    SyntaxError::with(
        Level::Error,
        format!("Failed to parse script: {}", err.variant.message()),
        "reform.ast.generate_ast_from_source".into(),
        Some(script.location_at(line, column)),
        None,
    )
    .into()
}
