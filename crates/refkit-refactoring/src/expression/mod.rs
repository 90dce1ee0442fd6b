//! Enablement expressions
//!
//! Descriptors declare when they apply with a small boolean expression language
//! evaluated against an [`EvaluationContext`]. Evaluation is three-valued: an
//! expression that would need a not-yet-activated tester or adapter yields
//! [`EvaluationResult::NotLoaded`] instead of silently becoming `False`.
//!
//! Expressions are serde-tagged by `type` so descriptors can be written in
//! YAML or JSON:
//!
//! ```yaml
//! type: with
//! variable: affectedProjects
//! expressions:
//!   - type: iterate
//!     operator: or
//!     expressions:
//!       - type: equals
//!         value: core
//! ```

pub mod adapter;
pub mod context;
pub mod result;
pub mod tester;

pub use adapter::{Adaptation, Adapter, AdapterLoader, AdapterRegistry};
pub use context::{
    ContextKey, EvaluationContext, ExpressionEnvironment, Value, AFFECTED_PROJECTS_VARIABLE,
    ELEMENTS_VARIABLE, PROCESSOR_VARIABLE,
};
pub use result::EvaluationResult;
pub use tester::{
    ElementPropertyTester, PropertyTester, TesterLoader, TesterLookup, TesterRegistry,
    ELEMENT_NAMESPACE,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::trace;

use crate::error::ExpressionError;

/// Result type for expression evaluation
pub type EvalResult = std::result::Result<EvaluationResult, ExpressionError>;

/// How `iterate` combines the results for each item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IterateOperator {
    /// Every item must match
    #[default]
    And,
    /// At least one item must match
    Or,
}

/// Collection size constraint of a `count` expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CountSpec {
    /// `*`: any number
    Any,
    /// `+`: one or more
    OneOrMore,
    /// `?`: none or one
    NoneOrOne,
    /// `!`: none
    None,
    /// `N`: exactly N
    Exactly(usize),
}

impl CountSpec {
    /// Whether a collection of `size` items satisfies the constraint
    pub fn matches(&self, size: usize) -> bool {
        match self {
            CountSpec::Any => true,
            CountSpec::OneOrMore => size >= 1,
            CountSpec::NoneOrOne => size <= 1,
            CountSpec::None => size == 0,
            CountSpec::Exactly(n) => size == *n,
        }
    }
}

impl FromStr for CountSpec {
    type Err = ExpressionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "*" => Ok(CountSpec::Any),
            "+" => Ok(CountSpec::OneOrMore),
            "?" => Ok(CountSpec::NoneOrOne),
            "!" => Ok(CountSpec::None),
            other => other
                .parse::<usize>()
                .map(CountSpec::Exactly)
                .map_err(|_| ExpressionError::InvalidCount(s.to_string())),
        }
    }
}

impl TryFrom<String> for CountSpec {
    type Error = ExpressionError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CountSpec> for String {
    fn from(spec: CountSpec) -> Self {
        spec.to_string()
    }
}

impl fmt::Display for CountSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountSpec::Any => f.write_str("*"),
            CountSpec::OneOrMore => f.write_str("+"),
            CountSpec::NoneOrOne => f.write_str("?"),
            CountSpec::None => f.write_str("!"),
            CountSpec::Exactly(n) => write!(f, "{}", n),
        }
    }
}

/// An enablement expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
    /// A fixed result
    Constant {
        /// The result
        value: EvaluationResult,
    },
    /// All children hold; an empty list holds
    And {
        /// Children
        expressions: Vec<Expression>,
    },
    /// Any child holds; an empty list holds
    Or {
        /// Children
        expressions: Vec<Expression>,
    },
    /// The child does not hold
    Not {
        /// Child
        expression: Box<Expression>,
    },
    /// The default variable is an instance of a type
    InstanceOf {
        /// Type name; element kinds match on any dotted prefix
        value: String,
    },
    /// A property tester accepts the default variable
    Test {
        /// `namespace.property`
        property: String,
        /// Tester arguments
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<Value>,
        /// Expected value
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        /// Activate a deferred tester instead of answering `NotLoaded`
        #[serde(default)]
        force_activation: bool,
    },
    /// Evaluate the children against a named variable
    With {
        /// Variable name
        variable: String,
        /// Children, combined with AND
        expressions: Vec<Expression>,
    },
    /// Evaluate the children against every item of the default collection
    Iterate {
        /// How per-item results combine
        #[serde(default)]
        operator: IterateOperator,
        /// Result for an empty collection; defaults to `false` for AND and `true` for OR
        #[serde(default, skip_serializing_if = "Option::is_none")]
        if_empty: Option<bool>,
        /// Children, combined with AND per item
        expressions: Vec<Expression>,
    },
    /// The default collection has a number of items
    Count {
        /// Size constraint
        value: CountSpec,
    },
    /// Adapt the default variable and evaluate the children against the result
    Adapt {
        /// Target type
        type_name: String,
        /// Children, combined with AND
        #[serde(default)]
        expressions: Vec<Expression>,
    },
    /// The default variable equals a value
    Equals {
        /// Expected value
        value: Value,
    },
}

impl Expression {
    /// Always `True`
    pub fn always() -> Self {
        Expression::Constant {
            value: EvaluationResult::True,
        }
    }

    /// Conjunction
    pub fn and(expressions: Vec<Expression>) -> Self {
        Expression::And { expressions }
    }

    /// Disjunction
    pub fn or(expressions: Vec<Expression>) -> Self {
        Expression::Or { expressions }
    }

    /// Negation
    pub fn not(expression: Expression) -> Self {
        Expression::Not {
            expression: Box::new(expression),
        }
    }

    /// Type check of the default variable
    pub fn instance_of(type_name: impl Into<String>) -> Self {
        Expression::InstanceOf {
            value: type_name.into(),
        }
    }

    /// Property test without arguments
    pub fn test(property: impl Into<String>, value: Option<Value>) -> Self {
        Expression::Test {
            property: property.into(),
            args: Vec::new(),
            value,
            force_activation: false,
        }
    }

    /// Scope the children to a named variable
    pub fn with(variable: impl Into<String>, expressions: Vec<Expression>) -> Self {
        Expression::With {
            variable: variable.into(),
            expressions,
        }
    }

    /// Iterate the default collection
    pub fn iterate(operator: IterateOperator, expressions: Vec<Expression>) -> Self {
        Expression::Iterate {
            operator,
            if_empty: None,
            expressions,
        }
    }

    /// Size constraint on the default collection
    pub fn count(value: CountSpec) -> Self {
        Expression::Count { value }
    }

    /// Equality with the default variable
    pub fn equals(value: impl Into<Value>) -> Self {
        Expression::Equals {
            value: value.into(),
        }
    }

    /// Evaluate against `context`
    pub fn evaluate(&self, context: &EvaluationContext<'_>) -> EvalResult {
        let result = match self {
            Expression::Constant { value } => Ok(*value),
            Expression::And { expressions } => evaluate_and(expressions, context),
            Expression::Or { expressions } => evaluate_or(expressions, context),
            Expression::Not { expression } => Ok(!expression.evaluate(context)?),
            Expression::InstanceOf { value } => {
                Ok(context.default_variable().is_instance_of(value).into())
            }
            Expression::Test {
                property,
                args,
                value,
                force_activation,
            } => evaluate_test(property, args, value.as_ref(), *force_activation, context),
            Expression::With {
                variable,
                expressions,
            } => {
                let scoped = context
                    .variable(variable)
                    .ok_or_else(|| ExpressionError::VariableNotDefined(variable.clone()))?;
                evaluate_and(expressions, &context.child(scoped.clone()))
            }
            Expression::Iterate {
                operator,
                if_empty,
                expressions,
            } => evaluate_iterate(*operator, *if_empty, expressions, context),
            Expression::Count { value } => {
                let items = collection(context.default_variable())?;
                Ok(value.matches(items.len()).into())
            }
            Expression::Adapt {
                type_name,
                expressions,
            } => evaluate_adapt(type_name, expressions, context),
            Expression::Equals { value } => Ok((context.default_variable() == value).into()),
        };
        if let Ok(outcome) = &result {
            trace!(expression = self.kind(), result = %outcome, "Evaluated expression");
        }
        result
    }

    fn kind(&self) -> &'static str {
        match self {
            Expression::Constant { .. } => "constant",
            Expression::And { .. } => "and",
            Expression::Or { .. } => "or",
            Expression::Not { .. } => "not",
            Expression::InstanceOf { .. } => "instance_of",
            Expression::Test { .. } => "test",
            Expression::With { .. } => "with",
            Expression::Iterate { .. } => "iterate",
            Expression::Count { .. } => "count",
            Expression::Adapt { .. } => "adapt",
            Expression::Equals { .. } => "equals",
        }
    }
}

impl Default for Expression {
    fn default() -> Self {
        Expression::always()
    }
}

fn evaluate_and(expressions: &[Expression], context: &EvaluationContext<'_>) -> EvalResult {
    let mut result = EvaluationResult::True;
    for expression in expressions {
        result = result & expression.evaluate(context)?;
        if result == EvaluationResult::False {
            break;
        }
    }
    Ok(result)
}

fn evaluate_or(expressions: &[Expression], context: &EvaluationContext<'_>) -> EvalResult {
    if expressions.is_empty() {
        return Ok(EvaluationResult::True);
    }
    let mut result = EvaluationResult::False;
    for expression in expressions {
        result = result | expression.evaluate(context)?;
        if result == EvaluationResult::True {
            break;
        }
    }
    Ok(result)
}

fn collection(value: &Value) -> std::result::Result<&[Value], ExpressionError> {
    value
        .as_list()
        .ok_or_else(|| ExpressionError::incompatible("a collection", value.type_name()))
}

fn evaluate_iterate(
    operator: IterateOperator,
    if_empty: Option<bool>,
    expressions: &[Expression],
    context: &EvaluationContext<'_>,
) -> EvalResult {
    let items = collection(context.default_variable())?;
    if items.is_empty() {
        return Ok(if_empty
            .unwrap_or(operator == IterateOperator::Or)
            .into());
    }
    let mut result = match operator {
        IterateOperator::And => EvaluationResult::True,
        IterateOperator::Or => EvaluationResult::False,
    };
    for item in items {
        let item_result = evaluate_and(expressions, &context.child(item.clone()))?;
        match operator {
            IterateOperator::And => {
                result = result & item_result;
                if result == EvaluationResult::False {
                    break;
                }
            }
            IterateOperator::Or => {
                result = result | item_result;
                if result == EvaluationResult::True {
                    break;
                }
            }
        }
    }
    Ok(result)
}

fn evaluate_test(
    property: &str,
    args: &[Value],
    expected: Option<&Value>,
    force_activation: bool,
    context: &EvaluationContext<'_>,
) -> EvalResult {
    let (namespace, name) = property
        .rsplit_once('.')
        .ok_or_else(|| ExpressionError::UnqualifiedProperty(property.to_string()))?;
    let testers = context.environment().testers();
    let tester = match testers.find(namespace, name)? {
        TesterLookup::Loaded(tester) => tester,
        TesterLookup::Deferred if force_activation && context.allow_activation() => {
            testers.activate(namespace, name)?
        }
        TesterLookup::Deferred => return Ok(EvaluationResult::NotLoaded),
    };
    Ok(tester
        .test(context.default_variable(), name, args, expected)
        .into())
}

fn evaluate_adapt(
    type_name: &str,
    expressions: &[Expression],
    context: &EvaluationContext<'_>,
) -> EvalResult {
    let value = context.default_variable();
    if value.is_instance_of(type_name) {
        return evaluate_and(expressions, context);
    }
    match context.environment().adapters().adapt(value, type_name) {
        Adaptation::Adapted(adapted) => evaluate_and(expressions, &context.child(adapted)),
        Adaptation::NotAdaptable => Ok(EvaluationResult::False),
        Adaptation::NotLoaded => Ok(EvaluationResult::NotLoaded),
    }
}
