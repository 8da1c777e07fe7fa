//! Query expression parsing
//!
//! Parses a dashboard target string into an [`Expression`] tree. An
//! expression is either a leaf metric pattern (literal substring or
//! `/regex/`) or one of the fixed transformation calls, whose first
//! argument is itself an expression:
//!
//! ```text
//! measure_temperature
//! /Energiemeter.*power/
//! alias(measure_temperature, "Outside Temp")
//! aliasSub(measure_temperature, "(Thermometer\s+)(.*?)~.*", "$2")
//! sum(timeShift(meter_power, 1d))
//! increase(meter_power, 7d)
//! increaseRange(meter_power)
//! ```
//!
//! Call names are recognized in a fixed order, more specific prefixes first
//! (`aliasSub` before `alias`, `increaseRange` before `increase`). A string
//! that matches no call name is a leaf pattern. A recognized call whose
//! argument list does not conform fails with a syntax error naming the
//! expected signature; the error from the innermost failing call wins.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, multispace0},
    combinator::value,
    error::{ErrorKind, ParseError},
    Err, IResult,
};

use crate::query::error::{QueryError, QueryResult};

const ALIAS_SIGNATURE: &str =
    "alias statement should adhere to the following signature: \
     alias(expression: Expression, alias: string)";
const ALIAS_SUB_SIGNATURE: &str =
    "aliasSub statement should adhere to the following signature: \
     aliasSub(expression: Expression, regex: string, alias: string)";
const SUM_SIGNATURE: &str =
    "sum statement should adhere to the following signature: \
     sum(expression: Expression)";
const INCREASE_SIGNATURE: &str =
    "increase statement should adhere to the following signature: \
     increase(expression: Expression, interval: TimeInterval) (examples: 1m, 9h, 3d)";
const INCREASE_RANGE_SIGNATURE: &str =
    "increaseRange statement should adhere to the following signature: \
     increaseRange(expression: Expression)";
const TIME_SHIFT_SIGNATURE: &str =
    "timeShift statement should adhere to the following signature: \
     timeShift(expression: Expression, interval: TimeInterval) (examples: 1m, 9h, 3d)";

/// A parsed query expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Leaf metric pattern: literal substring or `/regex/` against the
    /// catalog's `original_target` labels
    Metric(String),
    /// `alias(expr, "label")`: overwrite every result label
    Alias {
        expr: Box<Expression>,
        label: String,
    },
    /// `aliasSub(expr, "regex", "replacement")`: regex-rewrite each label
    AliasSub {
        expr: Box<Expression>,
        pattern: String,
        replacement: String,
    },
    /// `sum(expr)`: fold all matched series into one
    Sum(Box<Expression>),
    /// `increase(expr, interval)`: delta against the sample one interval back
    Increase {
        expr: Box<Expression>,
        interval: Interval,
    },
    /// `increaseRange(expr)`: delta against the first sample in the range
    IncreaseRange(Box<Expression>),
    /// `timeShift(expr, interval)`: fetch one interval back, display now
    TimeShift {
        expr: Box<Expression>,
        interval: Interval,
    },
}

/// A time interval argument: digits followed by `m`, `h` or `d`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub amount: i64,
    pub unit: IntervalUnit,
}

/// Recognized interval units; nothing else is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalUnit {
    Minutes,
    Hours,
    Days,
}

impl Interval {
    /// The interval length in milliseconds
    pub fn as_millis(&self) -> i64 {
        let scale = match self.unit {
            IntervalUnit::Minutes => 1000 * 60,
            IntervalUnit::Hours => 1000 * 60 * 60,
            IntervalUnit::Days => 1000 * 60 * 60 * 24,
        };
        self.amount * scale
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unit = match self.unit {
            IntervalUnit::Minutes => "m",
            IntervalUnit::Hours => "h",
            IntervalUnit::Days => "d",
        };
        write!(f, "{}{}", self.amount, unit)
    }
}

impl std::fmt::Display for Expression {
    /// Canonical query text for the expression
    ///
    /// Whitespace inside calls is normalized; sum() uses this as the label
    /// of its folded series.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Metric(pattern) => f.write_str(pattern),
            Expression::Alias { expr, label } => write!(f, "alias({}, \"{}\")", expr, label),
            Expression::AliasSub {
                expr,
                pattern,
                replacement,
            } => write!(f, "aliasSub({}, \"{}\", \"{}\")", expr, pattern, replacement),
            Expression::Sum(expr) => write!(f, "sum({})", expr),
            Expression::Increase { expr, interval } => {
                write!(f, "increase({}, {})", expr, interval)
            }
            Expression::IncreaseRange(expr) => write!(f, "increaseRange({})", expr),
            Expression::TimeShift { expr, interval } => {
                write!(f, "timeShift({}, {})", expr, interval)
            }
        }
    }
}

/// Parse a dashboard target string into an expression tree
pub fn parse_expression(raw: &str) -> QueryResult<Expression> {
    let input = raw.trim();

    match call(input) {
        Ok((rest, expr)) => {
            if rest.trim().is_empty() {
                Ok(expr)
            } else {
                Err(QueryError::Syntax(signature_of(&expr).to_string()))
            }
        }
        Err(Err::Failure(failure)) => Err(QueryError::Syntax(
            failure
                .message
                .unwrap_or_else(|| format!("malformed query expression: '{}'", input)),
        )),
        // No call name matched: the whole string is a leaf metric pattern.
        Err(_) => Ok(Expression::Metric(input.to_string())),
    }
}

fn signature_of(expr: &Expression) -> &'static str {
    match expr {
        Expression::Metric(_) => "",
        Expression::Alias { .. } => ALIAS_SIGNATURE,
        Expression::AliasSub { .. } => ALIAS_SUB_SIGNATURE,
        Expression::Sum(_) => SUM_SIGNATURE,
        Expression::Increase { .. } => INCREASE_SIGNATURE,
        Expression::IncreaseRange(_) => INCREASE_RANGE_SIGNATURE,
        Expression::TimeShift { .. } => TIME_SHIFT_SIGNATURE,
    }
}

/// Parser error that carries the signature message once a call name has
/// committed; a plain mismatch (message `None`) lets `alt` keep trying.
#[derive(Debug)]
struct SyntaxFailure {
    message: Option<String>,
}

impl<'a> ParseError<&'a str> for SyntaxFailure {
    fn from_error_kind(_input: &'a str, _kind: ErrorKind) -> Self {
        Self { message: None }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

type PResult<'a, T> = IResult<&'a str, T, SyntaxFailure>;

/// Once a call name has matched, argument errors become hard failures
/// carrying the call's signature. A failure bubbling up from a nested call
/// keeps its own (more specific) message.
fn committed(err: Err<SyntaxFailure>, signature: &str) -> Err<SyntaxFailure> {
    match err {
        Err::Error(f) | Err::Failure(f) => Err::Failure(SyntaxFailure {
            message: f.message.or_else(|| Some(signature.to_string())),
        }),
        other => other,
    }
}

/// Recognize one transformation call
///
/// Tested in fixed priority order, more specific prefixes first.
fn call(input: &str) -> PResult<'_, Expression> {
    alt((
        alias_sub_call,
        alias_call,
        time_shift_call,
        increase_range_call,
        increase_call,
        sum_call,
    ))(input)
}

fn alias_call(input: &str) -> PResult<'_, Expression> {
    let (rest, _) = tag("alias(")(input)?;
    alias_args(rest).map_err(|e| committed(e, ALIAS_SIGNATURE))
}

fn alias_args(input: &str) -> PResult<'_, Expression> {
    let (input, expr) = sub_expression(input)?;
    let (input, _) = arg_separator(input)?;
    let (input, label) = quoted_string(input)?;
    let (input, _) = closing_paren(input)?;
    Ok((
        input,
        Expression::Alias {
            expr: Box::new(expr),
            label,
        },
    ))
}

fn alias_sub_call(input: &str) -> PResult<'_, Expression> {
    let (rest, _) = tag("aliasSub(")(input)?;
    alias_sub_args(rest).map_err(|e| committed(e, ALIAS_SUB_SIGNATURE))
}

fn alias_sub_args(input: &str) -> PResult<'_, Expression> {
    let (input, expr) = sub_expression(input)?;
    let (input, _) = arg_separator(input)?;
    let (input, pattern) = quoted_string(input)?;
    let (input, _) = arg_separator(input)?;
    let (input, replacement) = quoted_string(input)?;
    let (input, _) = closing_paren(input)?;
    Ok((
        input,
        Expression::AliasSub {
            expr: Box::new(expr),
            pattern,
            replacement,
        },
    ))
}

fn sum_call(input: &str) -> PResult<'_, Expression> {
    let (rest, _) = tag("sum(")(input)?;
    sum_args(rest).map_err(|e| committed(e, SUM_SIGNATURE))
}

fn sum_args(input: &str) -> PResult<'_, Expression> {
    let (input, expr) = sub_expression(input)?;
    let (input, _) = closing_paren(input)?;
    Ok((input, Expression::Sum(Box::new(expr))))
}

fn increase_call(input: &str) -> PResult<'_, Expression> {
    let (rest, _) = tag("increase(")(input)?;
    increase_args(rest).map_err(|e| committed(e, INCREASE_SIGNATURE))
}

fn increase_args(input: &str) -> PResult<'_, Expression> {
    let (input, expr) = sub_expression(input)?;
    let (input, _) = arg_separator(input)?;
    let (input, interval) = interval(input)?;
    let (input, _) = closing_paren(input)?;
    Ok((
        input,
        Expression::Increase {
            expr: Box::new(expr),
            interval,
        },
    ))
}

fn increase_range_call(input: &str) -> PResult<'_, Expression> {
    let (rest, _) = tag("increaseRange(")(input)?;
    increase_range_args(rest).map_err(|e| committed(e, INCREASE_RANGE_SIGNATURE))
}

fn increase_range_args(input: &str) -> PResult<'_, Expression> {
    let (input, expr) = sub_expression(input)?;
    let (input, _) = closing_paren(input)?;
    Ok((input, Expression::IncreaseRange(Box::new(expr))))
}

fn time_shift_call(input: &str) -> PResult<'_, Expression> {
    let (rest, _) = tag("timeShift(")(input)?;
    time_shift_args(rest).map_err(|e| committed(e, TIME_SHIFT_SIGNATURE))
}

fn time_shift_args(input: &str) -> PResult<'_, Expression> {
    let (input, expr) = sub_expression(input)?;
    let (input, _) = arg_separator(input)?;
    let (input, interval) = interval(input)?;
    let (input, _) = closing_paren(input)?;
    Ok((
        input,
        Expression::TimeShift {
            expr: Box::new(expr),
            interval,
        },
    ))
}

/// Parse a nested sub-expression: a call if one is recognized, otherwise a
/// leaf pattern running to the enclosing `,` or `)`
fn sub_expression(input: &str) -> PResult<'_, Expression> {
    let (input, _) = multispace0(input)?;
    match call(input) {
        Ok(result) => Ok(result),
        Err(Err::Failure(f)) => Err(Err::Failure(f)),
        Err(_) => metric_pattern(input),
    }
}

/// Leaf pattern inside a call: everything up to the first `,` or `)` at
/// paren depth zero (an unknown call-shaped token stays one leaf)
fn metric_pattern(input: &str) -> PResult<'_, Expression> {
    let mut depth = 0usize;
    let mut end = input.len();
    for (index, ch) in input.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' | ',' if depth == 0 => {
                end = index;
                break;
            }
            ')' => depth -= 1,
            _ => {}
        }
    }

    let (pattern, rest) = input.split_at(end);
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err(Err::Error(SyntaxFailure::from_error_kind(
            input,
            ErrorKind::TakeWhile1,
        )));
    }
    Ok((rest, Expression::Metric(pattern.to_string())))
}

/// `,` with optional surrounding whitespace
fn arg_separator(input: &str) -> PResult<'_, ()> {
    let (input, _) = multispace0(input)?;
    let (input, _) = char(',')(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, ()))
}

/// `)` with optional leading whitespace
fn closing_paren(input: &str) -> PResult<'_, ()> {
    let (input, _) = multispace0(input)?;
    let (input, _) = char(')')(input)?;
    Ok((input, ()))
}

/// Double-quoted string argument; no escape sequences, as in the grammar
fn quoted_string(input: &str) -> PResult<'_, String> {
    let (input, _) = char('"')(input)?;
    let (input, content) = take_while(|c| c != '"')(input)?;
    let (input, _) = char('"')(input)?;
    Ok((input, content.to_string()))
}

/// Interval argument: digits then one of `m`/`h`/`d`
fn interval(input: &str) -> PResult<'_, Interval> {
    let (input, digits) = digit1(input)?;
    let amount: i64 = digits.parse().map_err(|_| {
        Err::Error(SyntaxFailure::from_error_kind(input, ErrorKind::Digit))
    })?;
    let (input, unit) = alt((
        value(IntervalUnit::Minutes, char('m')),
        value(IntervalUnit::Hours, char('h')),
        value(IntervalUnit::Days, char('d')),
    ))(input)?;

    Ok((input, Interval { amount, unit }))
}
