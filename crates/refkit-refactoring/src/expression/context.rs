//! Values and evaluation contexts

use refkit_core::ElementRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use super::adapter::AdapterRegistry;
use super::tester::TesterRegistry;

/// Variable holding the elements of an operation
pub const ELEMENTS_VARIABLE: &str = "elements";
/// Variable holding the distinct projects of the elements of an operation
pub const AFFECTED_PROJECTS_VARIABLE: &str = "affectedProjects";
/// Variable holding the identifier of the processor a participant is matched for
pub const PROCESSOR_VARIABLE: &str = "processorIdentifier";

/// A value an expression can inspect
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// No value
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// String
    Str(String),
    /// Program element or resource
    Element(ElementRef),
    /// Collection
    List(Vec<Value>),
}

impl Value {
    /// Name of the value's type; elements report their kind
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::Element(element) => &element.kind,
            Value::List(_) => "list",
        }
    }

    /// Whether the value is an instance of `type_name`
    pub fn is_instance_of(&self, type_name: &str) -> bool {
        match self {
            Value::Element(element) => element.is_kind_of(type_name),
            other => other.type_name() == type_name,
        }
    }

    /// The element, if this is one
    pub fn as_element(&self) -> Option<&ElementRef> {
        match self {
            Value::Element(element) => Some(element),
            _ => None,
        }
    }

    /// The items, if this is a collection
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// The string, if this is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean, if this is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<ElementRef> for Value {
    fn from(value: ElementRef) -> Self {
        Value::Element(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Element(e) => write!(f, "{}", e),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Property testers and adapters shared by all contexts of a session
#[derive(Debug, Default)]
pub struct ExpressionEnvironment {
    testers: TesterRegistry,
    adapters: AdapterRegistry,
}

impl ExpressionEnvironment {
    /// Environment with the built-in testers and no adapters
    pub fn new() -> Self {
        Self::default()
    }

    /// Property testers
    pub fn testers(&self) -> &TesterRegistry {
        &self.testers
    }

    /// Adapters
    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }
}

/// Variables visible to an expression.
///
/// A context has a default variable, which most expressions inspect, plus named
/// variables. Child contexts replace the default variable and see the named
/// variables of their parents.
#[derive(Debug)]
pub struct EvaluationContext<'p> {
    parent: Option<&'p EvaluationContext<'p>>,
    default_variable: Value,
    variables: HashMap<String, Value>,
    environment: Arc<ExpressionEnvironment>,
    allow_activation: Option<bool>,
}

impl EvaluationContext<'static> {
    /// Root context with the given default variable
    pub fn new(default_variable: Value, environment: Arc<ExpressionEnvironment>) -> Self {
        EvaluationContext {
            parent: None,
            default_variable,
            variables: HashMap::new(),
            environment,
            allow_activation: None,
        }
    }

    /// Root context for an operation over `elements`.
    ///
    /// The default variable is the element list; [`ELEMENTS_VARIABLE`] holds it
    /// too and [`AFFECTED_PROJECTS_VARIABLE`] lists the distinct projects.
    pub fn for_elements(elements: &[ElementRef], environment: Arc<ExpressionEnvironment>) -> Self {
        let list = Value::from(elements.to_vec());
        let mut context = Self::new(list.clone(), environment);
        context.add_variable(ELEMENTS_VARIABLE, list);
        context.add_variable(AFFECTED_PROJECTS_VARIABLE, affected_projects(elements));
        context
    }
}

impl<'p> EvaluationContext<'p> {
    /// Child context with a different default variable
    pub fn child(&self, default_variable: Value) -> EvaluationContext<'_> {
        EvaluationContext {
            parent: Some(self),
            default_variable,
            variables: HashMap::new(),
            environment: self.environment.clone(),
            allow_activation: None,
        }
    }

    /// Define or replace a named variable in this context
    pub fn add_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Look up a named variable here or in a parent
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables
            .get(name)
            .or_else(|| self.parent.and_then(|parent| parent.variable(name)))
    }

    /// The default variable
    pub fn default_variable(&self) -> &Value {
        &self.default_variable
    }

    /// Testers and adapters
    pub fn environment(&self) -> &Arc<ExpressionEnvironment> {
        &self.environment
    }

    /// Allow or forbid activating deferred testers during evaluation
    pub fn set_allow_activation(&mut self, allow: bool) {
        self.allow_activation = Some(allow);
    }

    /// Whether deferred testers may be activated; inherited from the parent
    pub fn allow_activation(&self) -> bool {
        self.allow_activation
            .or_else(|| self.parent.map(|parent| parent.allow_activation()))
            .unwrap_or(false)
    }

    /// Key identifying everything an expression could observe in this context
    pub fn cache_key(&self) -> ContextKey {
        let mut variables = BTreeMap::new();
        self.collect_variables(&mut variables);
        ContextKey {
            default_variable: self.default_variable.clone(),
            variables: variables.into_iter().collect(),
            allow_activation: self.allow_activation(),
        }
    }

    fn collect_variables(&self, into: &mut BTreeMap<String, Value>) {
        if let Some(parent) = self.parent {
            parent.collect_variables(into);
        }
        for (name, value) in &self.variables {
            into.insert(name.clone(), value.clone());
        }
    }
}

/// Hashable snapshot of a context
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextKey {
    default_variable: Value,
    variables: Vec<(String, Value)>,
    allow_activation: bool,
}

fn affected_projects(elements: &[ElementRef]) -> Value {
    let projects: BTreeSet<&str> = elements
        .iter()
        .filter_map(|element| element.project.as_deref())
        .collect();
    Value::List(projects.into_iter().map(Value::from).collect())
}
