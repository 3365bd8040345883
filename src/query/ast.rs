use ordered_float::NotNan;
use postgres_protocol::escape;
use strum_macros::AsRefStr;

pub trait Deparse {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String;
}

/// Whether an identifier must be double-quoted to survive a round trip through the parser.
fn identifier_needs_quotes(id: &str) -> bool {
    match id.as_bytes() {
        [] => true,
        [first, rest @ ..] => {
            (!first.is_ascii_lowercase() && *first != b'_')
                || !rest
                    .iter()
                    .all(|&b| b == b'_' || b.is_ascii_lowercase() || b.is_ascii_digit())
        }
    }
}

impl Deparse for &str {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        match identifier_needs_quotes(self) {
            true => {
                buf.push('"');
                buf.push_str(self);
                buf.push('"');
            }
            false => buf.push_str(self),
        };

        buf
    }
}

impl Deparse for String {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        self.as_str().deparse(buf)
    }
}

fn string_literal_push(buf: &mut String, s: &str) {
    let escaped = escape::escape_literal(s);
    // escape_literal prefixes E-strings with a space
    match escaped.strip_prefix(' ') {
        Some(trimmed) => buf.push_str(trimmed),
        None => buf.push_str(&escaped),
    }
}

// Core literal value types that can appear in a filter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    String(String),
    StringWithCast(String, String),
    Integer(i64),
    /// Parsed value and the literal as written (`1.50`, `1e20`)
    Float { value: NotNan<f64>, text: String },
    Boolean(bool),
    Null,
    Parameter(String), // For $1, $2, etc.
}

impl Deparse for LiteralValue {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        match self {
            LiteralValue::String(s) => string_literal_push(buf, s),
            LiteralValue::StringWithCast(s, cast) => {
                string_literal_push(buf, s);
                buf.push_str("::");
                buf.push_str(cast);
            }
            LiteralValue::Integer(i) => buf.push_str(i.to_string().as_str()),
            LiteralValue::Float { text, .. } => buf.push_str(text),
            LiteralValue::Boolean(b) => buf.push_str(if *b { "true" } else { "false" }),
            LiteralValue::Null => buf.push_str("NULL"),
            LiteralValue::Parameter(p) => buf.push_str(p),
        };

        buf
    }
}

// Column reference (potentially qualified: table.column)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnNode {
    pub table: Option<String>,
    pub column: String,
}

impl Deparse for ColumnNode {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        if let Some(table) = &self.table {
            table.deparse(buf);
            buf.push('.');
        }
        self.column.deparse(buf);

        buf
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum UnaryOp {
    Not,
    #[strum(to_string = "IS NULL")]
    IsNull,
    #[strum(to_string = "IS NOT NULL")]
    IsNotNull,
}

impl Deparse for UnaryOp {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        buf.push_str(self.as_ref());
        buf
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum BinaryOp {
    // Logical
    And,
    Or,
    // Comparison
    #[strum(to_string = "=")]
    Equal,
    #[strum(to_string = "<>")]
    NotEqual,
    #[strum(to_string = "<")]
    LessThan,
    #[strum(to_string = "<=")]
    LessThanOrEqual,
    #[strum(to_string = ">")]
    GreaterThan,
    #[strum(to_string = ">=")]
    GreaterThanOrEqual,
    // Pattern matching
    Like,
    ILike,
    #[strum(to_string = "NOT LIKE")]
    NotLike,
    #[strum(to_string = "NOT ILIKE")]
    NotILike,
}

impl BinaryOp {
    /// Returns true if this is a logical operator (AND/OR).
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

impl Deparse for BinaryOp {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        buf.push_str(self.as_ref());
        buf
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
pub enum MultiOp {
    #[strum(to_string = "IN")]
    In,
    #[strum(to_string = "NOT IN")]
    NotIn,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub expr: Box<WhereExpr>,
}

impl Deparse for UnaryExpr {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        match self.op {
            UnaryOp::IsNull | UnaryOp::IsNotNull => {
                self.expr.deparse(buf);
                buf.push(' ');
                self.op.deparse(buf);
            }
            UnaryOp::Not => {
                // NOT binds tighter than AND/OR
                let needs_parens = matches!(
                    self.expr.as_ref(),
                    WhereExpr::Binary(child) if child.op.is_logical()
                );
                self.op.deparse(buf);
                buf.push(' ');
                if needs_parens {
                    buf.push('(');
                }
                self.expr.deparse(buf);
                if needs_parens {
                    buf.push(')');
                }
            }
        }
        buf
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub lexpr: Box<WhereExpr>, // left expression
    pub rexpr: Box<WhereExpr>, // right expression
}

impl BinaryExpr {
    /// An OR nested under an AND needs parentheses to keep its grouping.
    fn child_needs_parens(&self, child: &WhereExpr) -> bool {
        if let WhereExpr::Binary(child_expr) = child {
            matches!((&self.op, &child_expr.op), (BinaryOp::And, BinaryOp::Or))
        } else {
            false
        }
    }
}

impl Deparse for BinaryExpr {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        if self.child_needs_parens(&self.lexpr) {
            buf.push('(');
            self.lexpr.deparse(buf);
            buf.push(')');
        } else {
            self.lexpr.deparse(buf);
        }

        buf.push(' ');
        self.op.deparse(buf);
        buf.push(' ');

        if self.child_needs_parens(&self.rexpr) {
            buf.push('(');
            self.rexpr.deparse(buf);
            buf.push(')');
        } else {
            self.rexpr.deparse(buf);
        }

        buf
    }
}

/// IN / NOT IN. `exprs` holds the subject first, then the value list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MultiExpr {
    pub op: MultiOp,
    pub exprs: Vec<WhereExpr>,
}

impl MultiExpr {
    pub fn subject(&self) -> Option<&WhereExpr> {
        self.exprs.first()
    }

    pub fn values(&self) -> &[WhereExpr] {
        self.exprs.get(1..).unwrap_or_default()
    }
}

impl Deparse for MultiExpr {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        let [first, rest @ ..] = self.exprs.as_slice() else {
            return buf;
        };

        first.deparse(buf);
        buf.push(' ');
        buf.push_str(self.op.as_ref());
        buf.push_str(" (");

        let mut sep = "";
        for expr in rest {
            buf.push_str(sep);
            expr.deparse(buf);
            sep = ", ";
        }
        buf.push(')');
        buf
    }
}

/// Filter expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WhereExpr {
    // Leaf nodes
    Value(LiteralValue),
    Column(ColumnNode),

    // Expression nodes
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Multi(MultiExpr),

    /// Parenthesised tuple: `(a, b)`
    Row(Vec<WhereExpr>),

    Function {
        name: String,
        args: Vec<WhereExpr>,
    },

    /// Routing parameter bound at execution time, e.g. `:__pgschemaname1`
    RouteParam(String),

    /// Expression the tree does not model (subquery, arithmetic, BETWEEN),
    /// kept as SQL text
    Opaque(String),
}

impl WhereExpr {
    /// Names of all routing parameters in this tree, in left-to-right order.
    pub fn route_param_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.route_param_names_collect(&mut names);
        names
    }

    fn route_param_names_collect<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            WhereExpr::RouteParam(name) => names.push(name),
            WhereExpr::Unary(unary) => unary.expr.route_param_names_collect(names),
            WhereExpr::Binary(binary) => {
                binary.lexpr.route_param_names_collect(names);
                binary.rexpr.route_param_names_collect(names);
            }
            WhereExpr::Multi(MultiExpr { exprs, .. })
            | WhereExpr::Row(exprs)
            | WhereExpr::Function { args: exprs, .. } => {
                for expr in exprs {
                    expr.route_param_names_collect(names);
                }
            }
            WhereExpr::Value(_) | WhereExpr::Column(_) | WhereExpr::Opaque(_) => {}
        }
    }

    /// Render this expression back to SQL text.
    pub fn to_sql(&self) -> String {
        let mut buf = String::new();
        self.deparse(&mut buf);
        buf
    }
}

impl Deparse for WhereExpr {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        match self {
            WhereExpr::Value(literal) => {
                literal.deparse(buf);
            }
            WhereExpr::Column(col) => {
                col.deparse(buf);
            }
            WhereExpr::Unary(expr) => {
                expr.deparse(buf);
            }
            WhereExpr::Binary(expr) => {
                expr.deparse(buf);
            }
            WhereExpr::Multi(expr) => {
                expr.deparse(buf);
            }
            WhereExpr::Row(elems) => {
                buf.push('(');
                let mut sep = "";
                for elem in elems {
                    buf.push_str(sep);
                    elem.deparse(buf);
                    sep = ", ";
                }
                buf.push(')');
            }
            WhereExpr::Function { name, args } => {
                buf.push_str(name);
                buf.push('(');
                let mut sep = "";
                for arg in args {
                    buf.push_str(sep);
                    arg.deparse(buf);
                    sep = ", ";
                }
                buf.push(')');
            }
            WhereExpr::RouteParam(name) => {
                buf.push(':');
                buf.push_str(name);
            }
            WhereExpr::Opaque(sql) => {
                buf.push_str(sql);
            }
        }

        buf
    }
}
