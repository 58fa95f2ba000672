// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Unit expression parser using Pest.
//!
//! Turns an expression such as `kg*m/s^2` into a flat list of
//! `(symbol, exponent)` terms. Symbol lookup happens later, in the registry.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use super::UnitError;

/// Pest parser for unit expressions.
#[derive(Parser)]
#[grammar = "units/units.pest"] // Path relative to src/ directory
pub struct UnitParser;

/// One symbol raised to an integer power.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitTerm {
    pub symbol: String,
    pub exponent: i32,
}

/// Parse a unit expression into flattened terms.
///
/// Group exponents distribute over their contents, so `(m/s)^2` yields
/// `m^2` and `s^-2`. A dimensionless expression (`1`) yields no terms.
pub fn parse_expression(expression: &str) -> Result<Vec<UnitTerm>, UnitError> {
    let mut pairs =
        UnitParser::parse(Rule::expression, expression).map_err(|e| UnitError::Parse {
            unit: expression.to_string(),
            message: e.to_string(),
        })?;

    let mut terms = Vec::new();
    let root = pairs.next().ok_or_else(|| UnitError::Parse {
        unit: expression.to_string(),
        message: "empty expression".to_string(),
    })?;

    for pair in root.into_inner() {
        if pair.as_rule() == Rule::product {
            walk_product(pair, 1, &mut terms, expression)?;
        }
    }
    Ok(terms)
}

fn walk_product(
    pair: Pair<Rule>,
    sign: i32,
    terms: &mut Vec<UnitTerm>,
    expression: &str,
) -> Result<(), UnitError> {
    let mut divide = false;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::operator => divide = inner.as_str() == "/",
            Rule::factor => {
                let factor_sign = if divide { -sign } else { sign };
                walk_factor(inner, factor_sign, terms, expression)?;
                divide = false;
            }
            _ => {}
        }
    }
    Ok(())
}

fn walk_factor(
    pair: Pair<Rule>,
    sign: i32,
    terms: &mut Vec<UnitTerm>,
    expression: &str,
) -> Result<(), UnitError> {
    let mut base = None;
    let mut exponent = 1i32;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::exponent => exponent = parse_exponent(inner, expression)?,
            _ => base = Some(inner),
        }
    }

    let Some(base) = base else {
        return Ok(());
    };
    let power = sign.checked_mul(exponent).ok_or_else(|| UnitError::Parse {
        unit: expression.to_string(),
        message: format!("exponent {exponent} is out of range"),
    })?;

    match base.as_rule() {
        Rule::symbol => terms.push(UnitTerm {
            symbol: base.as_str().to_string(),
            exponent: power,
        }),
        Rule::group => {
            for product in base.into_inner() {
                walk_product(product, power, terms, expression)?;
            }
        }
        // `1` contributes nothing
        _ => {}
    }
    Ok(())
}

fn parse_exponent(pair: Pair<Rule>, expression: &str) -> Result<i32, UnitError> {
    let text = pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::integer)
        .map(|p| p.as_str().to_string())
        .unwrap_or_default();
    text.trim_start_matches('+')
        .parse::<i32>()
        .map_err(|e| UnitError::Parse {
            unit: expression.to_string(),
            message: format!("invalid exponent '{text}': {e}"),
        })
}
