//! Property testers

use parking_lot::RwLock;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::context::Value;
use crate::error::ExpressionError;

/// Namespace of the built-in element tester
pub const ELEMENT_NAMESPACE: &str = "refkit.element";

/// Answers `test` expressions for a namespace
pub trait PropertyTester: Send + Sync {
    /// Namespace the tester serves
    fn namespace(&self) -> &str;

    /// Whether the tester knows `property`
    fn handles(&self, property: &str) -> bool;

    /// Test `property` of `receiver`
    fn test(
        &self,
        receiver: &Value,
        property: &str,
        args: &[Value],
        expected: Option<&Value>,
    ) -> bool;
}

/// Creates a deferred tester on first use
pub type TesterLoader =
    Box<dyn Fn() -> std::result::Result<Arc<dyn PropertyTester>, String> + Send + Sync>;

enum TesterEntry {
    Loaded(Arc<dyn PropertyTester>),
    Deferred {
        namespace: String,
        properties: Vec<String>,
        loader: TesterLoader,
    },
}

impl TesterEntry {
    fn handles(&self, namespace: &str, property: &str) -> bool {
        match self {
            TesterEntry::Loaded(tester) => {
                tester.namespace() == namespace && tester.handles(property)
            }
            TesterEntry::Deferred {
                namespace: ns,
                properties,
                ..
            } => ns == namespace && properties.iter().any(|p| p == property),
        }
    }
}

/// Lookup result of [`TesterRegistry::find`]
pub enum TesterLookup {
    /// The tester is available
    Loaded(Arc<dyn PropertyTester>),
    /// The tester exists but has not been activated
    Deferred,
}

/// Registered property testers, in registration order
pub struct TesterRegistry {
    entries: RwLock<Vec<TesterEntry>>,
}

impl TesterRegistry {
    /// Registry without any tester
    pub fn empty() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Register an active tester
    pub fn register(&self, tester: Arc<dyn PropertyTester>) {
        debug!(namespace = %tester.namespace(), "Registered property tester");
        self.entries.write().push(TesterEntry::Loaded(tester));
    }

    /// Register a tester that is only created when a `test` forces activation
    pub fn register_deferred(
        &self,
        namespace: impl Into<String>,
        properties: Vec<String>,
        loader: TesterLoader,
    ) {
        let namespace = namespace.into();
        debug!(namespace = %namespace, "Registered deferred property tester");
        self.entries.write().push(TesterEntry::Deferred {
            namespace,
            properties,
            loader,
        });
    }

    /// Find the tester for `namespace.property`
    pub fn find(
        &self,
        namespace: &str,
        property: &str,
    ) -> std::result::Result<TesterLookup, ExpressionError> {
        let entries = self.entries.read();
        match entries.iter().find(|e| e.handles(namespace, property)) {
            Some(TesterEntry::Loaded(tester)) => Ok(TesterLookup::Loaded(tester.clone())),
            Some(TesterEntry::Deferred { .. }) => Ok(TesterLookup::Deferred),
            None => Err(ExpressionError::NoTester {
                namespace: namespace.to_string(),
                property: property.to_string(),
            }),
        }
    }

    /// Activate the deferred tester for `namespace.property`
    pub fn activate(
        &self,
        namespace: &str,
        property: &str,
    ) -> std::result::Result<Arc<dyn PropertyTester>, ExpressionError> {
        let mut entries = self.entries.write();
        let Some(entry) = entries.iter_mut().find(|e| e.handles(namespace, property)) else {
            return Err(ExpressionError::NoTester {
                namespace: namespace.to_string(),
                property: property.to_string(),
            });
        };
        let tester = match &*entry {
            TesterEntry::Loaded(tester) => return Ok(tester.clone()),
            TesterEntry::Deferred { loader, .. } => {
                loader().map_err(|reason| ExpressionError::TesterActivation {
                    namespace: namespace.to_string(),
                    reason,
                })?
            }
        };
        debug!(namespace = %namespace, "Activated property tester");
        *entry = TesterEntry::Loaded(tester.clone());
        Ok(tester)
    }
}

impl Default for TesterRegistry {
    fn default() -> Self {
        let registry = Self::empty();
        registry.register(Arc::new(ElementPropertyTester));
        registry
    }
}

impl fmt::Debug for TesterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read();
        let namespaces: Vec<String> = entries
            .iter()
            .map(|e| match e {
                TesterEntry::Loaded(t) => t.namespace().to_string(),
                TesterEntry::Deferred { namespace, .. } => format!("{} (deferred)", namespace),
            })
            .collect();
        f.debug_struct("TesterRegistry")
            .field("testers", &namespaces)
            .finish()
    }
}

/// Tests properties of [`ElementRef`](refkit_core::ElementRef) receivers.
///
/// | property | meaning |
/// |---|---|
/// | `kind` | the element is an instance of the expected kind |
/// | `project` | the element belongs to the expected project |
/// | `handleMatches` | the handle matches the regular expression in `args[0]` |
/// | `isResource` | the element is a workspace resource (expected defaults to `true`) |
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementPropertyTester;

impl ElementPropertyTester {
    const PROPERTIES: [&'static str; 4] = ["kind", "project", "handleMatches", "isResource"];
}

impl PropertyTester for ElementPropertyTester {
    fn namespace(&self) -> &str {
        ELEMENT_NAMESPACE
    }

    fn handles(&self, property: &str) -> bool {
        Self::PROPERTIES.contains(&property)
    }

    fn test(
        &self,
        receiver: &Value,
        property: &str,
        args: &[Value],
        expected: Option<&Value>,
    ) -> bool {
        let Some(element) = receiver.as_element() else {
            return false;
        };
        match property {
            "kind" => expected
                .and_then(Value::as_str)
                .is_some_and(|kind| element.is_kind_of(kind)),
            "project" => match (expected, element.project.as_deref()) {
                (Some(Value::Str(wanted)), Some(project)) => wanted == project,
                (Some(Value::Null) | None, None) => true,
                _ => false,
            },
            "handleMatches" => {
                let Some(pattern) = args.first().and_then(Value::as_str) else {
                    return false;
                };
                match Regex::new(pattern) {
                    Ok(regex) => regex.is_match(&element.handle),
                    Err(err) => {
                        warn!(pattern = %pattern, error = %err, "Invalid handleMatches pattern");
                        false
                    }
                }
            }
            "isResource" => {
                let wanted = expected.and_then(Value::as_bool).unwrap_or(true);
                element.is_resource() == wanted
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refkit_core::ElementRef;

    fn element() -> Value {
        Value::from(ElementRef::new("code.type.class", "crate::model::User").with_project("core"))
    }

    #[test]
    fn test_element_properties() {
        let tester = ElementPropertyTester;
        assert!(tester.test(&element(), "kind", &[], Some(&Value::from("code.type"))));
        assert!(!tester.test(&element(), "kind", &[], Some(&Value::from("resource"))));
        assert!(tester.test(&element(), "project", &[], Some(&Value::from("core"))));
        assert!(tester.test(
            &element(),
            "handleMatches",
            &[Value::from(r"::model::\w+$")],
            None
        ));
        assert!(!tester.test(&element(), "handleMatches", &[Value::from("(")], None));
        assert!(tester.test(&element(), "isResource", &[], Some(&Value::Bool(false))));
        assert!(!tester.test(&Value::from("plain"), "kind", &[], Some(&Value::from("x"))));
    }

    struct PublicTester;

    impl PropertyTester for PublicTester {
        fn namespace(&self) -> &str {
            "ext.lang"
        }

        fn handles(&self, property: &str) -> bool {
            property == "isPublic"
        }

        fn test(&self, receiver: &Value, _: &str, _: &[Value], _: Option<&Value>) -> bool {
            receiver
                .as_element()
                .is_some_and(|e| !e.handle.contains("::private::"))
        }
    }

    #[test]
    fn test_deferred_tester_activation() {
        let registry = TesterRegistry::empty();
        registry.register_deferred(
            "ext.lang",
            vec!["isPublic".to_string()],
            Box::new(|| Ok(Arc::new(PublicTester) as Arc<dyn PropertyTester>)),
        );
        assert!(matches!(
            registry.find("ext.lang", "isPublic"),
            Ok(TesterLookup::Deferred)
        ));
        assert!(registry.find("ext.lang", "other").is_err());

        let tester = registry.activate("ext.lang", "isPublic").unwrap();
        assert!(tester.test(&element(), "isPublic", &[], None));
        assert!(matches!(
            registry.find("ext.lang", "isPublic"),
            Ok(TesterLookup::Loaded(_))
        ));
    }

    #[test]
    fn test_failed_activation_reports_reason() {
        let registry = TesterRegistry::empty();
        registry.register_deferred(
            "ext.broken",
            vec!["p".to_string()],
            Box::new(|| Err("missing library".to_string())),
        );
        let err = match registry.activate("ext.broken", "p") {
            Err(err) => err,
            Ok(_) => panic!("activation should fail"),
        };
        assert!(err.to_string().contains("missing library"));
        assert!(matches!(
            registry.find("ext.broken", "p"),
            Ok(TesterLookup::Deferred)
        ));
    }
}
