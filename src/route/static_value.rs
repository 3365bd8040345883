use rootcause::Report;

use crate::query::ast::{Deparse, LiteralValue, WhereExpr};

use super::{RouteError, RouteResult};

/// An operand reduced to a form that can be compared and later resolved:
/// a constant, or a reference to a value bound at execution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaticValue {
    Literal(LiteralValue),
    /// Client placeholder (`$1`) or an existing routing parameter name
    Parameter(String),
}

impl StaticValue {
    /// Routing identity: literals match on their text, parameters on their key.
    /// `1` and `'1'` are the same routing value.
    pub fn routing_eq(&self, other: &StaticValue) -> bool {
        match (self, other) {
            (StaticValue::Literal(left), StaticValue::Literal(right)) => {
                literal_text(left) == literal_text(right)
            }
            (StaticValue::Parameter(left), StaticValue::Parameter(right)) => left == right,
            (StaticValue::Literal(_), StaticValue::Parameter(_))
            | (StaticValue::Parameter(_), StaticValue::Literal(_)) => false,
        }
    }
}

impl Deparse for StaticValue {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        match self {
            StaticValue::Literal(literal) => literal.deparse(buf),
            StaticValue::Parameter(name) => {
                buf.push_str(name);
                buf
            }
        }
    }
}

/// Text a literal contributes as a schema or table name.
pub(crate) fn literal_text(literal: &LiteralValue) -> String {
    match literal {
        LiteralValue::String(s) | LiteralValue::StringWithCast(s, _) => s.clone(),
        LiteralValue::Integer(i) => i.to_string(),
        LiteralValue::Float { text, .. } => text.clone(),
        LiteralValue::Boolean(b) => b.to_string(),
        LiteralValue::Null => "NULL".to_owned(),
        LiteralValue::Parameter(p) => p.clone(),
    }
}

/// Outcome of reducing an operand to a [`StaticValue`].
#[derive(Debug)]
pub enum StaticConversion {
    Value(StaticValue),
    /// The operand's shape has no static form; the comparison is left alone.
    Unsupported,
    /// The operand looked static but could not be converted.
    Failed(Report<RouteError>),
}

const TEXT_CASTS: &[&str] = &[
    "text",
    "varchar",
    "bpchar",
    "char",
    "name",
    "sql_identifier",
    "character_data",
];

const INTEGER_CASTS: &[&str] = &["int2", "int4", "int8", "smallint", "integer", "bigint"];

/// Reduce a filter operand to a [`StaticValue`].
pub fn static_value_convert(expr: &WhereExpr) -> StaticConversion {
    match expr {
        WhereExpr::Value(literal) => literal_convert(literal),
        WhereExpr::RouteParam(name) => StaticConversion::Value(StaticValue::Parameter(name.clone())),
        WhereExpr::Column(_)
        | WhereExpr::Unary(_)
        | WhereExpr::Binary(_)
        | WhereExpr::Multi(_)
        | WhereExpr::Row(_)
        | WhereExpr::Function { .. }
        | WhereExpr::Opaque(_) => StaticConversion::Unsupported,
    }
}

fn literal_convert(literal: &LiteralValue) -> StaticConversion {
    match literal {
        // NULL never names a schema or table
        LiteralValue::Null => StaticConversion::Unsupported,
        LiteralValue::Parameter(placeholder) => match parameter_index_parse(placeholder) {
            Ok(_) => StaticConversion::Value(StaticValue::Parameter(placeholder.clone())),
            Err(report) => StaticConversion::Failed(report),
        },
        LiteralValue::StringWithCast(value, cast) => cast_literal_convert(value, cast),
        LiteralValue::String(_)
        | LiteralValue::Integer(_)
        | LiteralValue::Float { .. }
        | LiteralValue::Boolean(_) => StaticConversion::Value(StaticValue::Literal(literal.clone())),
    }
}

fn cast_literal_convert(value: &str, cast: &str) -> StaticConversion {
    let cast_lower = cast.to_ascii_lowercase();

    if TEXT_CASTS.contains(&cast_lower.as_str()) {
        return StaticConversion::Value(StaticValue::Literal(LiteralValue::String(
            value.to_owned(),
        )));
    }

    if INTEGER_CASTS.contains(&cast_lower.as_str()) {
        return match value.trim().parse::<i64>() {
            Ok(i) => StaticConversion::Value(StaticValue::Literal(LiteralValue::Integer(i))),
            Err(_) => StaticConversion::Failed(Report::from(RouteError::InvalidCastLiteral {
                value: value.to_owned(),
                cast: cast.to_owned(),
            })),
        };
    }

    StaticConversion::Unsupported
}

/// Parse parameter index from placeholder string (e.g., "$1" -> 0, "$2" -> 1)
pub(crate) fn parameter_index_parse(placeholder: &str) -> RouteResult<usize> {
    let invalid = || {
        Report::from(RouteError::InvalidParameterPlaceholder {
            placeholder: placeholder.to_owned(),
        })
    };

    let index_str = placeholder.strip_prefix('$').ok_or_else(invalid)?;
    let param_num = index_str.parse::<usize>().map_err(|_| invalid())?;

    if param_num == 0 {
        return Err(invalid());
    }

    Ok(param_num - 1)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use ordered_float::NotNan;

    use crate::query::ast::ColumnNode;

    use super::*;

    fn literal(value: LiteralValue) -> StaticValue {
        StaticValue::Literal(value)
    }

    #[test]
    fn literals_compare_by_text() {
        let int = literal(LiteralValue::Integer(1));
        let string = literal(LiteralValue::String("1".to_owned()));
        let other = literal(LiteralValue::String("2".to_owned()));

        assert!(int.routing_eq(&string));
        assert!(!int.routing_eq(&other));
    }

    #[test]
    fn float_compares_by_source_text() {
        let float = |text: &str| {
            literal(LiteralValue::Float {
                value: NotNan::new(text.parse::<f64>().unwrap()).unwrap(),
                text: text.to_owned(),
            })
        };

        assert!(float("1.50").routing_eq(&literal(LiteralValue::String("1.50".to_owned()))));
        assert!(!float("1.50").routing_eq(&literal(LiteralValue::String("1.5".to_owned()))));
        assert!(float("1e20").routing_eq(&literal(LiteralValue::String("1e20".to_owned()))));
        assert!(!float("1.50").routing_eq(&float("1.5")));
    }

    #[test]
    fn parameters_compare_by_key() {
        let first = StaticValue::Parameter("$1".to_owned());
        assert!(first.routing_eq(&StaticValue::Parameter("$1".to_owned())));
        assert!(!first.routing_eq(&StaticValue::Parameter("$2".to_owned())));
        assert!(!first.routing_eq(&literal(LiteralValue::String("$1".to_owned()))));
    }

    #[test]
    fn convert_string_literal() {
        let expr = WhereExpr::Value(LiteralValue::String("ks".to_owned()));
        assert!(matches!(
            static_value_convert(&expr),
            StaticConversion::Value(StaticValue::Literal(LiteralValue::String(s))) if s == "ks"
        ));
    }

    #[test]
    fn convert_text_cast_drops_cast() {
        let expr = WhereExpr::Value(LiteralValue::StringWithCast(
            "ks".to_owned(),
            "name".to_owned(),
        ));
        assert!(matches!(
            static_value_convert(&expr),
            StaticConversion::Value(StaticValue::Literal(LiteralValue::String(s))) if s == "ks"
        ));
    }

    #[test]
    fn convert_integer_cast() {
        let expr = WhereExpr::Value(LiteralValue::StringWithCast(
            "42".to_owned(),
            "int4".to_owned(),
        ));
        assert!(matches!(
            static_value_convert(&expr),
            StaticConversion::Value(StaticValue::Literal(LiteralValue::Integer(42)))
        ));

        let expr = WhereExpr::Value(LiteralValue::StringWithCast(
            "forty-two".to_owned(),
            "int4".to_owned(),
        ));
        let StaticConversion::Failed(report) = static_value_convert(&expr) else {
            panic!("expected failure");
        };
        assert!(matches!(
            report.into_current_context(),
            RouteError::InvalidCastLiteral { .. }
        ));
    }

    #[test]
    fn convert_other_cast_unsupported() {
        let expr = WhereExpr::Value(LiteralValue::StringWithCast(
            "{}".to_owned(),
            "jsonb".to_owned(),
        ));
        assert!(matches!(
            static_value_convert(&expr),
            StaticConversion::Unsupported
        ));
    }

    #[test]
    fn convert_parameter() {
        let expr = WhereExpr::Value(LiteralValue::Parameter("$3".to_owned()));
        assert!(matches!(
            static_value_convert(&expr),
            StaticConversion::Value(StaticValue::Parameter(p)) if p == "$3"
        ));

        let expr = WhereExpr::Value(LiteralValue::Parameter("$0".to_owned()));
        let StaticConversion::Failed(report) = static_value_convert(&expr) else {
            panic!("expected failure");
        };
        assert!(matches!(
            report.into_current_context(),
            RouteError::InvalidParameterPlaceholder { .. }
        ));
    }

    #[test]
    fn convert_route_param() {
        let expr = WhereExpr::RouteParam("__pgschemaname1".to_owned());
        assert!(matches!(
            static_value_convert(&expr),
            StaticConversion::Value(StaticValue::Parameter(p)) if p == "__pgschemaname1"
        ));
    }

    #[test]
    fn convert_non_static_shapes_unsupported() {
        let column = WhereExpr::Column(ColumnNode {
            table: None,
            column: "table_name".to_owned(),
        });
        let function = WhereExpr::Function {
            name: "lower".to_owned(),
            args: vec![column.clone()],
        };

        assert!(matches!(
            static_value_convert(&column),
            StaticConversion::Unsupported
        ));
        assert!(matches!(
            static_value_convert(&function),
            StaticConversion::Unsupported
        ));
        assert!(matches!(
            static_value_convert(&WhereExpr::Opaque("(SELECT 'ks')".to_owned())),
            StaticConversion::Unsupported
        ));
        assert!(matches!(
            static_value_convert(&WhereExpr::Value(LiteralValue::Null)),
            StaticConversion::Unsupported
        ));
    }

    #[test]
    fn deparse_static_values() {
        let mut buf = String::new();
        literal(LiteralValue::String("o'brien".to_owned())).deparse(&mut buf);
        buf.push(' ');
        StaticValue::Parameter("$2".to_owned()).deparse(&mut buf);

        assert_eq!(buf, "'o''brien' $2");
    }

    #[test]
    fn parameter_index() {
        assert_eq!(parameter_index_parse("$1").unwrap(), 0);
        assert_eq!(parameter_index_parse("$12").unwrap(), 11);
        assert!(parameter_index_parse("1").is_err());
        assert!(parameter_index_parse("$x").is_err());
    }
}
