use super::errors::RuntimeError;
use super::generator::Yielder;
use super::value::{OrderedMap, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub type Env = Rc<Environment>;

#[derive(Clone)]
struct Binding {
    value: Value,
    constant: bool,
}

/// Per-file state reachable from every scope inside a module.
pub struct ModuleScope {
    pub path: Option<PathBuf>,
    pub exports: Rc<RefCell<OrderedMap>>,
}

impl ModuleScope {
    pub fn new(path: Option<PathBuf>, exports: Rc<RefCell<OrderedMap>>) -> Self {
        Self { path, exports }
    }

    /// Directory that relative imports resolve against.
    pub fn base_dir(&self) -> PathBuf {
        self.path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

pub enum Scope {
    Global,
    Module(Rc<ModuleScope>),
    /// Function call frame; generator bodies carry their yield channel.
    Function(Option<Rc<Yielder>>),
    Block,
}

/// A lexical scope. Children hold their parent strongly; parents never point
/// at children, so the chain itself cannot form a cycle.
pub struct Environment {
    values: RefCell<HashMap<String, Binding>>,
    parent: Option<Env>,
    scope: Scope,
}

impl Environment {
    pub fn new_global() -> Env {
        Rc::new(Self {
            values: RefCell::new(HashMap::new()),
            parent: None,
            scope: Scope::Global,
        })
    }

    pub fn child(parent: &Env, scope: Scope) -> Env {
        Rc::new(Self {
            values: RefCell::new(HashMap::new()),
            parent: Some(Rc::clone(parent)),
            scope,
        })
    }

    pub fn define(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        self.insert(name, value, false)
    }

    pub fn define_constant(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        self.insert(name, value, true)
    }

    fn insert(&self, name: &str, value: Value, constant: bool) -> Result<(), RuntimeError> {
        let mut values = self.values.borrow_mut();
        if values.get(name).is_some_and(|b| b.constant) {
            return Err(RuntimeError::ConstantReassignment(name.to_string()));
        }
        values.insert(name.to_string(), Binding { value, constant });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let mut env = self;
        loop {
            if let Some(binding) = env.values.borrow().get(name) {
                return Some(binding.value.clone());
            }
            env = env.parent.as_deref()?;
        }
    }

    pub fn lookup(&self, name: &str) -> Result<Value, RuntimeError> {
        self.get(name)
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))
    }

    /// Writes to the nearest scope that declares `name`.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let mut env = self;
        loop {
            if let Some(binding) = env.values.borrow_mut().get_mut(name) {
                if binding.constant {
                    return Err(RuntimeError::ConstantReassignment(name.to_string()));
                }
                binding.value = value;
                return Ok(());
            }
            match env.parent.as_deref() {
                Some(parent) => env = parent,
                None => return Err(RuntimeError::UndefinedVariable(name.to_string())),
            }
        }
    }

    pub fn has_local(&self, name: &str) -> bool {
        self.values.borrow().contains_key(name)
    }

    pub fn module_scope(&self) -> Option<Rc<ModuleScope>> {
        let mut env = self;
        loop {
            if let Scope::Module(module) = &env.scope {
                return Some(Rc::clone(module));
            }
            env = env.parent.as_deref()?;
        }
    }

    pub fn module_path(&self) -> Option<PathBuf> {
        self.module_scope().and_then(|m| m.path.clone())
    }

    /// Yield channel of the innermost enclosing function, if it is a generator.
    pub fn yielder(&self) -> Option<Rc<Yielder>> {
        let mut env = self;
        loop {
            if let Scope::Function(yielder) = &env.scope {
                return yielder.clone();
            }
            env = env.parent.as_deref()?;
        }
    }

    /// Drops every binding; used at teardown to break closure cycles.
    pub fn clear(&self) {
        let drained: Vec<Binding> = self.values.borrow_mut().drain().map(|(_, b)| b).collect();
        drop(drained);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_outward() {
        let global = Environment::new_global();
        global.define("x", Value::Int(1)).unwrap();
        let block = Environment::child(&global, Scope::Block);
        assert_eq!(block.lookup("x").unwrap().to_string(), "1");
        assert!(matches!(
            block.lookup("missing"),
            Err(RuntimeError::UndefinedVariable(_))
        ));
    }

    #[test]
    fn assign_updates_declaring_scope() {
        let global = Environment::new_global();
        global.define("count", Value::Int(0)).unwrap();
        let inner = Environment::child(&global, Scope::Function(None));
        inner.assign("count", Value::Int(5)).unwrap();
        assert!(!inner.has_local("count"));
        assert_eq!(global.lookup("count").unwrap().to_string(), "5");
    }

    #[test]
    fn shadowing_does_not_touch_parent() {
        let global = Environment::new_global();
        global.define("x", Value::Int(1)).unwrap();
        let block = Environment::child(&global, Scope::Block);
        block.define("x", Value::Int(2)).unwrap();
        assert_eq!(block.lookup("x").unwrap().to_string(), "2");
        assert_eq!(global.lookup("x").unwrap().to_string(), "1");
    }

    #[test]
    fn constants_reject_reassignment() {
        let global = Environment::new_global();
        global.define_constant("PI", Value::Float(3.14)).unwrap();
        assert_eq!(
            global.assign("PI", Value::Int(3)),
            Err(RuntimeError::ConstantReassignment("PI".into()))
        );
        assert!(global.define("PI", Value::Int(3)).is_err());
    }

    #[test]
    fn module_scope_is_found_from_nested_blocks() {
        let global = Environment::new_global();
        let exports = Rc::new(RefCell::new(OrderedMap::new()));
        let module = Environment::child(
            &global,
            Scope::Module(Rc::new(ModuleScope::new(
                Some(PathBuf::from("/tmp/app/main.bang")),
                exports,
            ))),
        );
        let block = Environment::child(&module, Scope::Block);
        let scope = block.module_scope().unwrap();
        assert_eq!(scope.base_dir(), PathBuf::from("/tmp/app"));
        assert!(global.module_scope().is_none());
    }
}
