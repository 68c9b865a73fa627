//! # Callable Registry
//!
//! Resolves function, method and operator names. Lookups are
//! case-insensitive. Ad hoc registrations are checked before factories, so a
//! custom callable can shadow a built-in one.
//!
//! Factory discovery is lazy: the first lookup scans every factory and caches
//! which factory answers which name. Adding a factory or calling
//! [`CallableRegistry::invalidate`] drops the cache.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use super::{
    BuiltinFunctions, BuiltinMethods, BuiltinOperators, FunctionFactory, FunctionPrototype,
    MethodFactory, MethodHandle, OperatorFactory, OperatorHandle, SqlFunction, SqlMethod,
    SqlOperator,
};
use crate::errors::{QueryError, QueryResult};

/// Which factory answers each lowercased name
#[derive(Debug, Default)]
struct Discovery {
    functions: HashMap<String, usize>,
    methods: HashMap<String, usize>,
    operators: HashMap<String, usize>,
}

/// Registry of callables
#[derive(Default)]
pub struct CallableRegistry {
    function_factories: RwLock<Vec<Arc<dyn FunctionFactory>>>,
    method_factories: RwLock<Vec<Arc<dyn MethodFactory>>>,
    operator_factories: RwLock<Vec<Arc<dyn OperatorFactory>>>,

    discovery: RwLock<Option<Discovery>>,

    custom_functions: RwLock<HashMap<String, FunctionPrototype>>,
    custom_methods: RwLock<HashMap<String, MethodHandle>>,
    custom_operators: RwLock<HashMap<String, OperatorHandle>>,
}

impl CallableRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in factories installed
    pub fn with_builtins() -> Self {
        Self {
            function_factories: RwLock::new(vec![Arc::new(BuiltinFunctions) as Arc<dyn FunctionFactory>]),
            method_factories: RwLock::new(vec![Arc::new(BuiltinMethods) as Arc<dyn MethodFactory>]),
            operator_factories: RwLock::new(vec![Arc::new(BuiltinOperators) as Arc<dyn OperatorFactory>]),
            ..Self::default()
        }
    }

    /// Runs factory discovery now instead of on first lookup
    pub fn init(&self) -> QueryResult<()> {
        self.discovered(|_| ())
    }

    /// Drops the discovery cache; the next lookup rescans the factories
    pub fn invalidate(&self) -> QueryResult<()> {
        *self.discovery.write().map_err(|_| QueryError::poisoned())? = None;
        Ok(())
    }

    pub fn add_function_factory(&self, factory: Arc<dyn FunctionFactory>) -> QueryResult<()> {
        self.function_factories
            .write()
            .map_err(|_| QueryError::poisoned())?
            .push(factory);
        self.invalidate()
    }

    pub fn add_method_factory(&self, factory: Arc<dyn MethodFactory>) -> QueryResult<()> {
        self.method_factories
            .write()
            .map_err(|_| QueryError::poisoned())?
            .push(factory);
        self.invalidate()
    }

    pub fn add_operator_factory(&self, factory: Arc<dyn OperatorFactory>) -> QueryResult<()> {
        self.operator_factories
            .write()
            .map_err(|_| QueryError::poisoned())?
            .push(factory);
        self.invalidate()
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// Resolves a function prototype
    pub fn function(&self, name: &str) -> QueryResult<FunctionPrototype> {
        let key = name.to_lowercase();
        {
            let custom = self.custom_functions.read().map_err(|_| QueryError::poisoned())?;
            if let Some(proto) = custom.get(&key) {
                return Ok(proto.clone());
            }
        }

        let slot = self.discovered(|d| d.functions.get(&key).copied())?;
        let factories = self.function_factories.read().map_err(|_| QueryError::poisoned())?;
        slot.and_then(|i| factories.get(i))
            .and_then(|f| f.create_function(name))
            .map(FunctionPrototype::new)
            .ok_or_else(|| QueryError::UnknownFunction(name.to_string()))
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.function(name).is_ok()
    }

    /// Registers an ad hoc function; fails if the name is already registered ad hoc
    pub fn register_function(&self, function: Box<dyn SqlFunction>) -> QueryResult<()> {
        let key = function.name().to_lowercase();
        let mut custom = self.custom_functions.write().map_err(|_| QueryError::poisoned())?;
        if custom.contains_key(&key) {
            return Err(QueryError::DuplicateCallable(function.name().to_string()));
        }
        custom.insert(key, FunctionPrototype::new(function));
        Ok(())
    }

    /// Removes an ad hoc function, returning whether it existed
    pub fn unregister_function(&self, name: &str) -> QueryResult<bool> {
        let mut custom = self.custom_functions.write().map_err(|_| QueryError::poisoned())?;
        Ok(custom.remove(&name.to_lowercase()).is_some())
    }

    /// Every resolvable function name, sorted
    pub fn function_names(&self) -> QueryResult<Vec<String>> {
        let mut names: BTreeSet<String> = self.discovered(|d| d.functions.keys().cloned().collect())?;
        let custom = self.custom_functions.read().map_err(|_| QueryError::poisoned())?;
        names.extend(custom.keys().cloned());
        Ok(names.into_iter().collect())
    }

    // ========================================================================
    // Methods
    // ========================================================================

    /// Resolves a method
    pub fn method(&self, name: &str) -> QueryResult<MethodHandle> {
        let key = name.to_lowercase();
        {
            let custom = self.custom_methods.read().map_err(|_| QueryError::poisoned())?;
            if let Some(handle) = custom.get(&key) {
                return Ok(handle.clone());
            }
        }

        let slot = self.discovered(|d| d.methods.get(&key).copied())?;
        let factories = self.method_factories.read().map_err(|_| QueryError::poisoned())?;
        slot.and_then(|i| factories.get(i))
            .and_then(|f| f.create_method(name))
            .map(MethodHandle::new)
            .ok_or_else(|| QueryError::UnknownMethod(name.to_string()))
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.method(name).is_ok()
    }

    pub fn register_method(&self, method: Arc<dyn SqlMethod>) -> QueryResult<()> {
        let key = method.name().to_lowercase();
        let mut custom = self.custom_methods.write().map_err(|_| QueryError::poisoned())?;
        if custom.contains_key(&key) {
            return Err(QueryError::DuplicateCallable(method.name().to_string()));
        }
        custom.insert(key, MethodHandle::new(method));
        Ok(())
    }

    pub fn unregister_method(&self, name: &str) -> QueryResult<bool> {
        let mut custom = self.custom_methods.write().map_err(|_| QueryError::poisoned())?;
        Ok(custom.remove(&name.to_lowercase()).is_some())
    }

    // ========================================================================
    // Operators
    // ========================================================================

    /// Resolves an operator by keyword
    pub fn operator(&self, keyword: &str) -> QueryResult<OperatorHandle> {
        let key = keyword.to_lowercase();
        {
            let custom = self.custom_operators.read().map_err(|_| QueryError::poisoned())?;
            if let Some(handle) = custom.get(&key) {
                return Ok(handle.clone());
            }
        }

        let slot = self.discovered(|d| d.operators.get(&key).copied())?;
        let factories = self.operator_factories.read().map_err(|_| QueryError::poisoned())?;
        slot.and_then(|i| factories.get(i))
            .and_then(|f| f.create_operator(keyword))
            .map(OperatorHandle::new)
            .ok_or_else(|| QueryError::UnknownOperator(keyword.to_string()))
    }

    pub fn has_operator(&self, keyword: &str) -> bool {
        self.operator(keyword).is_ok()
    }

    pub fn register_operator(&self, operator: Arc<dyn SqlOperator>) -> QueryResult<()> {
        let key = operator.keyword().to_lowercase();
        let mut custom = self.custom_operators.write().map_err(|_| QueryError::poisoned())?;
        if custom.contains_key(&key) {
            return Err(QueryError::DuplicateCallable(operator.keyword().to_string()));
        }
        custom.insert(key, OperatorHandle::new(operator));
        Ok(())
    }

    pub fn unregister_operator(&self, keyword: &str) -> QueryResult<bool> {
        let mut custom = self.custom_operators.write().map_err(|_| QueryError::poisoned())?;
        Ok(custom.remove(&keyword.to_lowercase()).is_some())
    }

    // ========================================================================
    // Discovery
    // ========================================================================

    fn discovered<T>(&self, read: impl FnOnce(&Discovery) -> T) -> QueryResult<T> {
        {
            let cache = self.discovery.read().map_err(|_| QueryError::poisoned())?;
            if let Some(discovery) = cache.as_ref() {
                return Ok(read(discovery));
            }
        }

        let scanned = self.scan()?;
        let mut cache = self.discovery.write().map_err(|_| QueryError::poisoned())?;
        Ok(read(cache.get_or_insert(scanned)))
    }

    /// First factory to declare a name wins
    fn scan(&self) -> QueryResult<Discovery> {
        let mut discovery = Discovery::default();

        let functions = self.function_factories.read().map_err(|_| QueryError::poisoned())?;
        for (slot, factory) in functions.iter().enumerate() {
            for name in factory.function_names() {
                discovery.functions.entry(name.to_lowercase()).or_insert(slot);
            }
        }

        let methods = self.method_factories.read().map_err(|_| QueryError::poisoned())?;
        for (slot, factory) in methods.iter().enumerate() {
            for name in factory.method_names() {
                discovery.methods.entry(name.to_lowercase()).or_insert(slot);
            }
        }

        let operators = self.operator_factories.read().map_err(|_| QueryError::poisoned())?;
        for (slot, factory) in operators.iter().enumerate() {
            for name in factory.operator_names() {
                discovery.operators.entry(name.to_lowercase()).or_insert(slot);
            }
        }

        Ok(discovery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callable::CallContext;
    use crate::value::Value;

    struct Answer;

    impl SqlFunction for Answer {
        fn name(&self) -> &str {
            "answer"
        }
        fn min_args(&self) -> usize {
            0
        }
        fn max_args(&self) -> Option<usize> {
            Some(0)
        }
        fn execute(&mut self, _args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
            Ok(Value::Integer(42))
        }
        fn fresh(&self) -> Box<dyn SqlFunction> {
            Box::new(Answer)
        }
    }

    struct AnswerFactory;

    impl FunctionFactory for AnswerFactory {
        fn function_names(&self) -> Vec<String> {
            vec!["answer".to_string()]
        }
        fn create_function(&self, name: &str) -> Option<Box<dyn SqlFunction>> {
            name.eq_ignore_ascii_case("answer").then(|| Box::new(Answer) as Box<dyn SqlFunction>)
        }
    }

    #[test]
    fn test_builtin_lookup_case_insensitive() {
        let registry = CallableRegistry::with_builtins();
        assert_eq!(registry.function("SUM").unwrap().name(), "sum");
        assert!(registry.has_method("toUpperCase"));
        assert!(registry.has_method("touppercase"));
        assert!(registry.has_operator("containsall"));
    }

    #[test]
    fn test_unknown_names() {
        let registry = CallableRegistry::with_builtins();
        assert_eq!(
            registry.function("nope").unwrap_err(),
            QueryError::UnknownFunction("nope".into())
        );
        assert!(matches!(registry.method("nope"), Err(QueryError::UnknownMethod(_))));
        assert!(matches!(registry.operator("NOPE"), Err(QueryError::UnknownOperator(_))));
    }

    #[test]
    fn test_register_and_unregister() {
        let registry = CallableRegistry::with_builtins();
        registry.register_function(Box::new(Answer)).unwrap();
        assert!(registry.has_function("ANSWER"));
        assert_eq!(
            registry.register_function(Box::new(Answer)).unwrap_err(),
            QueryError::DuplicateCallable("answer".into())
        );
        assert!(registry.unregister_function("answer").unwrap());
        assert!(!registry.has_function("answer"));
        assert!(!registry.unregister_function("answer").unwrap());
    }

    #[test]
    fn test_factory_added_after_discovery_is_seen() {
        let registry = CallableRegistry::with_builtins();
        registry.init().unwrap();
        assert!(!registry.has_function("answer"));

        registry.add_function_factory(Arc::new(AnswerFactory)).unwrap();
        assert!(registry.has_function("answer"));
        assert!(registry.function_names().unwrap().contains(&"answer".to_string()));
    }

    /// Factory whose advertised names can change after registration
    #[derive(Default)]
    struct GrowingFactory {
        names: RwLock<Vec<String>>,
    }

    impl FunctionFactory for GrowingFactory {
        fn function_names(&self) -> Vec<String> {
            self.names.read().map(|names| names.clone()).unwrap_or_default()
        }
        fn create_function(&self, name: &str) -> Option<Box<dyn SqlFunction>> {
            AnswerFactory.create_function(name)
        }
    }

    #[test]
    fn test_invalidate_rescans_factory_names() {
        let factory = Arc::new(GrowingFactory::default());
        let registry = CallableRegistry::new();
        registry.add_function_factory(factory.clone()).unwrap();
        registry.init().unwrap();
        assert!(!registry.has_function("answer"));

        factory.names.write().unwrap().push("answer".to_string());
        // Discovery is cached until invalidated
        assert!(!registry.has_function("answer"));

        registry.invalidate().unwrap();
        assert!(registry.has_function("answer"));
        assert_eq!(registry.function("ANSWER").unwrap().name(), "answer");

        factory.names.write().unwrap().clear();
        registry.invalidate().unwrap();
        assert!(!registry.has_function("answer"));
    }

    #[test]
    fn test_empty_registry_knows_nothing() {
        let registry = CallableRegistry::new();
        assert!(!registry.has_function("sum"));
        assert!(registry.function_names().unwrap().is_empty());
    }
}
