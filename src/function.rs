//! Symbolic functions parsed from configuration expressions.
//!
//! Expressions are compiled once at configuration time; evaluation is pure.
//! The embedded parameter binds as `t`, physical coordinates bind as `x` and
//! `y`. Vector-valued expressions are semicolon-separated component
//! expressions, e.g. `"0.3*cos(2*pi*t)+0.4; 0.3*sin(2*pi*t)+0.4"`.
use nalgebra::{Point2, Vector2};

use crate::error::ConfigurationError;

fn parse_component(
    name: &'static str,
    expression: &str,
    bind: &'static str,
) -> Result<Box<dyn Fn(f64) -> f64>, ConfigurationError> {
    let parsed: meval::Expr = expression.parse().map_err(|err| ConfigurationError::InvalidParameter {
        name,
        reason: format!("cannot parse expression '{}': {}", expression, err),
    })?;
    let bound = parsed.bind(bind).map_err(|err| ConfigurationError::InvalidParameter {
        name,
        reason: format!("cannot bind expression '{}': {}", expression, err),
    })?;
    Ok(Box::new(bound))
}

/// A scalar function of physical coordinates, `g(x, y)`.
pub struct ParsedScalarFunction {
    function: Box<dyn Fn(f64, f64) -> f64>,
}

impl ParsedScalarFunction {
    pub fn parse(name: &'static str, expression: &str) -> Result<Self, ConfigurationError> {
        let parsed: meval::Expr = expression.parse().map_err(|err| ConfigurationError::InvalidParameter {
            name,
            reason: format!("cannot parse expression '{}': {}", expression, err),
        })?;
        let bound = parsed
            .bind2("x", "y")
            .map_err(|err| ConfigurationError::InvalidParameter {
                name,
                reason: format!("cannot bind expression '{}': {}", expression, err),
            })?;
        Ok(Self {
            function: Box::new(bound),
        })
    }

    pub fn evaluate(&self, point: &Point2<f64>) -> f64 {
        (self.function)(point.x, point.y)
    }
}

/// A vector-valued function of the embedded parameter, `c(t) ∈ R²`.
pub struct ParsedCurveFunction {
    components: [Box<dyn Fn(f64) -> f64>; 2],
}

impl ParsedCurveFunction {
    pub fn parse(name: &'static str, expression: &str) -> Result<Self, ConfigurationError> {
        let components: Vec<&str> = expression.split(';').map(str::trim).collect();
        if components.len() != 2 {
            return Err(ConfigurationError::InvalidParameter {
                name,
                reason: format!(
                    "expected 2 semicolon-separated components, got {} in '{}'",
                    components.len(),
                    expression
                ),
            });
        }
        Ok(Self {
            components: [
                parse_component(name, components[0], "t")?,
                parse_component(name, components[1], "t")?,
            ],
        })
    }

    pub fn evaluate(&self, t: f64) -> Vector2<f64> {
        Vector2::new((self.components[0])(t), (self.components[1])(t))
    }
}
