// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Built-in transformations.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use super::ArrayTransform;
use crate::core::{format_shape, ArrayData, DataType, Result, TranslateError};

/// One built-in transformation.
#[derive(Debug, Clone, PartialEq)]
pub enum Transformation {
    /// Multiply by a constant
    Scale(f64),
    /// Add a constant
    Offset(f64),
    /// Limit values to `[min, max]`
    Clip { min: f64, max: f64 },
    Abs,
    Negate,
    /// Square root; negative input fails
    Sqrt,
    /// Base-10 logarithm; non-positive input fails
    Log10,
    Exp,
    /// `1 / x`; zero fails
    Reciprocal,
    /// Round to a number of decimals
    Round(i32),
    /// Drop one size-1 axis, or all of them
    Squeeze(Option<usize>),
}

impl Transformation {
    fn op_name(&self) -> &'static str {
        match self {
            Transformation::Scale(_) => "scale",
            Transformation::Offset(_) => "offset",
            Transformation::Clip { .. } => "clip",
            Transformation::Abs => "abs",
            Transformation::Negate => "negate",
            Transformation::Sqrt => "sqrt",
            Transformation::Log10 => "log10",
            Transformation::Exp => "exp",
            Transformation::Reciprocal => "reciprocal",
            Transformation::Round(_) => "round",
            Transformation::Squeeze(_) => "squeeze",
        }
    }

    /// Whether the result is always floating point.
    fn promotes_to_float(&self) -> bool {
        matches!(
            self,
            Transformation::Sqrt
                | Transformation::Log10
                | Transformation::Exp
                | Transformation::Reciprocal
        )
    }

    fn eval(&self, x: f64) -> std::result::Result<f64, String> {
        match *self {
            Transformation::Scale(k) => Ok(x * k),
            Transformation::Offset(k) => Ok(x + k),
            Transformation::Clip { min, max } => Ok(x.max(min).min(max)),
            Transformation::Abs => Ok(x.abs()),
            Transformation::Negate => Ok(-x),
            Transformation::Sqrt if x < 0.0 => Err(format!("square root of negative value {x}")),
            Transformation::Sqrt => Ok(x.sqrt()),
            Transformation::Log10 if x <= 0.0 => Err(format!("logarithm of non-positive value {x}")),
            Transformation::Log10 => Ok(x.log10()),
            Transformation::Exp => Ok(x.exp()),
            Transformation::Reciprocal if x == 0.0 => Err("reciprocal of zero".to_string()),
            Transformation::Reciprocal => Ok(1.0 / x),
            Transformation::Round(decimals) => {
                let factor = 10f64.powi(decimals);
                Ok((x * factor).round() / factor)
            }
            Transformation::Squeeze(_) => Ok(x),
        }
    }

    fn error(&self, message: impl Into<String>) -> TranslateError {
        TranslateError::transformation(self.to_string(), message)
    }
}

impl ArrayTransform for Transformation {
    fn name(&self) -> String {
        self.to_string()
    }

    fn output_shape(&self, shape: &[usize]) -> Result<Vec<usize>> {
        match *self {
            Transformation::Squeeze(None) => {
                Ok(shape.iter().copied().filter(|&d| d != 1).collect())
            }
            Transformation::Squeeze(Some(axis)) => match shape.get(axis) {
                Some(1) => {
                    let mut out = shape.to_vec();
                    out.remove(axis);
                    Ok(out)
                }
                Some(size) => Err(self.error(format!(
                    "axis {axis} of {} has size {size}, expected 1",
                    format_shape(shape)
                ))),
                None => Err(self.error(format!(
                    "axis {axis} out of range for {}",
                    format_shape(shape)
                ))),
            },
            _ => Ok(shape.to_vec()),
        }
    }

    fn output_dtype(&self, dtype: DataType) -> Result<DataType> {
        if matches!(self, Transformation::Squeeze(_)) {
            return Ok(dtype);
        }
        if !dtype.is_numeric() {
            return Err(self.error(format!("{dtype} data is not numeric")));
        }
        if self.promotes_to_float() && !dtype.is_float() {
            return Ok(DataType::Float64);
        }
        Ok(dtype)
    }

    fn apply_chunk(&self, chunk: &ArrayData) -> Result<ArrayData> {
        if matches!(self, Transformation::Squeeze(_)) {
            return Ok(chunk.clone());
        }
        let target = self.output_dtype(chunk.dtype())?;
        let values = chunk
            .to_f64_vec()
            .ok_or_else(|| self.error(format!("{} data is not numeric", chunk.dtype())))?;
        let out = values
            .into_iter()
            .map(|x| self.eval(x))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|message| self.error(message))?;
        ArrayData::from_f64_vec(target, out).map_err(|e| self.error(e.to_string()))
    }
}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transformation::Scale(k) | Transformation::Offset(k) => {
                write!(f, "{}({k})", self.op_name())
            }
            Transformation::Clip { min, max } => write!(f, "clip({min}, {max})"),
            Transformation::Round(0) | Transformation::Squeeze(None) => {
                write!(f, "{}()", self.op_name())
            }
            Transformation::Round(d) => write!(f, "round({d})"),
            Transformation::Squeeze(Some(axis)) => write!(f, "squeeze({axis})"),
            _ => write!(f, "{}()", self.op_name()),
        }
    }
}

fn call_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*(?:\(\s*(.*?)\s*\))?\s*$"))
        .as_ref()
        .map_err(|e| TranslateError::invalid_rule("transformation", e.to_string()))
}

fn parse_args(expr: &str, raw: &str) -> Result<Vec<f64>> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',')
        .map(|arg| {
            arg.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| !v.is_nan())
                .ok_or_else(|| {
                    TranslateError::invalid_rule(
                        expr,
                        format!("argument '{}' is not a number", arg.trim()),
                    )
                })
        })
        .collect()
}

fn expect_args(expr: &str, args: &[f64], allowed: &[usize]) -> Result<()> {
    if allowed.contains(&args.len()) {
        return Ok(());
    }
    let wanted: Vec<String> = allowed.iter().map(|n| n.to_string()).collect();
    Err(TranslateError::invalid_rule(
        expr,
        format!("expected {} argument(s), got {}", wanted.join(" or "), args.len()),
    ))
}

fn as_index(expr: &str, value: f64) -> Result<usize> {
    if value < 0.0 || value.fract() != 0.0 {
        return Err(TranslateError::invalid_rule(
            expr,
            format!("'{value}' is not a non-negative integer"),
        ));
    }
    Ok(value as usize)
}

impl FromStr for Transformation {
    type Err = TranslateError;

    fn from_str(expr: &str) -> Result<Self> {
        let caps = call_pattern()?
            .captures(expr)
            .ok_or_else(|| TranslateError::invalid_rule(expr, "expected name(arguments)"))?;
        let name = caps.get(1).map_or("", |m| m.as_str()).to_lowercase();
        let args = parse_args(expr, caps.get(2).map_or("", |m| m.as_str()))?;

        let op = match name.as_str() {
            "scale" | "multiply" => {
                expect_args(expr, &args, &[1])?;
                Transformation::Scale(args[0])
            }
            "offset" | "add" => {
                expect_args(expr, &args, &[1])?;
                Transformation::Offset(args[0])
            }
            "clip" => {
                expect_args(expr, &args, &[2])?;
                if args[0] > args[1] {
                    return Err(TranslateError::invalid_rule(expr, "clip minimum exceeds maximum"));
                }
                Transformation::Clip {
                    min: args[0],
                    max: args[1],
                }
            }
            "abs" => {
                expect_args(expr, &args, &[0])?;
                Transformation::Abs
            }
            "negate" | "neg" => {
                expect_args(expr, &args, &[0])?;
                Transformation::Negate
            }
            "sqrt" => {
                expect_args(expr, &args, &[0])?;
                Transformation::Sqrt
            }
            "log10" => {
                expect_args(expr, &args, &[0])?;
                Transformation::Log10
            }
            "exp" => {
                expect_args(expr, &args, &[0])?;
                Transformation::Exp
            }
            "reciprocal" | "inverse" => {
                expect_args(expr, &args, &[0])?;
                Transformation::Reciprocal
            }
            "round" => {
                expect_args(expr, &args, &[0, 1])?;
                let decimals = args.first().copied().unwrap_or(0.0);
                if decimals.fract() != 0.0 {
                    return Err(TranslateError::invalid_rule(expr, "decimals must be an integer"));
                }
                Transformation::Round(decimals as i32)
            }
            "squeeze" => {
                expect_args(expr, &args, &[0, 1])?;
                let axis = args.first().map(|&a| as_index(expr, a)).transpose()?;
                Transformation::Squeeze(axis)
            }
            other => {
                return Err(TranslateError::invalid_rule(
                    expr,
                    format!("unknown transformation '{other}'"),
                ))
            }
        };
        Ok(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Transformation {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!(parse("scale(2.5)"), Transformation::Scale(2.5));
        assert_eq!(parse(" Offset( -1 ) "), Transformation::Offset(-1.0));
        assert_eq!(parse("clip(0, 10)"), Transformation::Clip { min: 0.0, max: 10.0 });
        assert_eq!(parse("abs"), Transformation::Abs);
        assert_eq!(parse("abs()"), Transformation::Abs);
        assert_eq!(parse("squeeze(1)"), Transformation::Squeeze(Some(1)));
        assert_eq!(parse("round"), Transformation::Round(0));
    }

    #[test]
    fn test_parse_errors() {
        assert!("lambda x: x".parse::<Transformation>().is_err());
        assert!("scale()".parse::<Transformation>().is_err());
        assert!("scale(abc)".parse::<Transformation>().is_err());
        assert!("clip(5, 1)".parse::<Transformation>().is_err());
        assert!("squeeze(-1)".parse::<Transformation>().is_err());
        assert!("eval(1)".parse::<Transformation>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for op in [
            Transformation::Scale(2.0),
            Transformation::Clip { min: -1.0, max: 1.5 },
            Transformation::Round(2),
            Transformation::Squeeze(None),
            Transformation::Log10,
        ] {
            assert_eq!(op.to_string().parse::<Transformation>().unwrap(), op);
        }
    }

    #[test]
    fn test_integer_scale_keeps_type() {
        let out = parse("scale(3)").apply_chunk(&ArrayData::Int16(vec![1, -2])).unwrap();
        assert_eq!(out, ArrayData::Int16(vec![3, -6]));
    }

    #[test]
    fn test_sqrt_promotes_integers() {
        let op = parse("sqrt");
        assert_eq!(op.output_dtype(DataType::UInt8).unwrap(), DataType::Float64);
        assert_eq!(op.output_dtype(DataType::Float32).unwrap(), DataType::Float32);
        let out = op.apply_chunk(&ArrayData::UInt8(vec![4, 9])).unwrap();
        assert_eq!(out, ArrayData::Float64(vec![2.0, 3.0]));
    }

    #[test]
    fn test_domain_errors() {
        let err = parse("sqrt").apply_chunk(&ArrayData::Float64(vec![-1.0])).unwrap_err();
        assert_eq!(err.kind(), "TransformationError");
        assert!(parse("log10").apply_chunk(&ArrayData::Float64(vec![0.0])).is_err());
        assert!(parse("reciprocal").apply_chunk(&ArrayData::Int32(vec![0])).is_err());
    }

    #[test]
    fn test_non_numeric_fails() {
        let data = ArrayData::String(vec!["a".into()]);
        assert!(parse("abs").apply_chunk(&data).is_err());
        assert!(parse("abs").output_dtype(DataType::Bool).is_err());
        assert_eq!(parse("squeeze").apply_chunk(&data).unwrap(), data);
    }

    #[test]
    fn test_negate_unsigned_overflows() {
        let err = parse("negate").apply_chunk(&ArrayData::UInt8(vec![1])).unwrap_err();
        assert!(matches!(err, TranslateError::Transformation { .. }));
    }

    #[test]
    fn test_squeeze_shapes() {
        assert_eq!(parse("squeeze").output_shape(&[1, 5, 1]).unwrap(), vec![5]);
        assert_eq!(parse("squeeze(0)").output_shape(&[1, 5, 1]).unwrap(), vec![5, 1]);
        assert!(parse("squeeze(1)").output_shape(&[1, 5]).is_err());
        assert!(parse("squeeze(3)").output_shape(&[1, 5]).is_err());
    }

    #[test]
    fn test_round_decimals() {
        let out = parse("round(1)").apply_chunk(&ArrayData::Float64(vec![1.26, -0.04])).unwrap();
        assert_eq!(out, ArrayData::Float64(vec![1.3, -0.0]));
    }
}
