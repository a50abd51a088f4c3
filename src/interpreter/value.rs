//=====================================================
// File: interpreter/value.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Runtime value model for the BanglaCode interpreter
// Objective: Define the closed Value sum type, ordered maps, closures,
//            classes, instances and native function descriptors
//=====================================================

use super::Interpreter;
use super::environment::Env;
use super::errors::EvalResult;
use super::generator::Generator;
use crate::ast::FunctionDecl;
use crate::builtins::events::EventEmitter;
use crate::builtins::http::ResponseSlot;
use crate::runtime::promise::Promise;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

//=============================================
//            Section 1: Ordered Map
//=============================================

/// String-keyed map that remembers insertion order.
#[derive(Clone, Default)]
pub struct OrderedMap {
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl OrderedMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&idx| &self.entries[idx].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Updating an existing key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.index.get(&key) {
            Some(&idx) => self.entries[idx].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.index.remove(key)?;
        let (_, value) = self.entries.remove(idx);
        for slot in self.index.values_mut() {
            if *slot > idx {
                *slot -= 1;
            }
        }
        Some(value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl FromIterator<(String, Value)> for OrderedMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut map = OrderedMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

//=============================================
//            Section 2: Callables & Objects
//=============================================

/// A script function closed over its defining scope.
pub struct Function {
    pub decl: Rc<FunctionDecl>,
    pub closure: Env,
    /// Receiver bound as `ei` when the function was read off an object.
    pub receiver: Option<Value>,
}

impl Function {
    pub fn new(decl: Rc<FunctionDecl>, closure: Env) -> Self {
        Self {
            decl,
            closure,
            receiver: None,
        }
    }

    pub fn name(&self) -> &str {
        self.decl.name.as_deref().unwrap_or("anonymous")
    }

    pub fn bind(&self, receiver: Value) -> Rc<Function> {
        Rc::new(Function {
            decl: Rc::clone(&self.decl),
            closure: Rc::clone(&self.closure),
            receiver: Some(receiver),
        })
    }
}

pub struct Class {
    pub name: String,
    pub constructor: Option<Rc<FunctionDecl>>,
    pub methods: HashMap<String, Rc<FunctionDecl>>,
    pub getters: HashMap<String, Rc<FunctionDecl>>,
    pub setters: HashMap<String, Rc<FunctionDecl>>,
    pub closure: Env,
}

impl Class {
    /// Builds a callable for `decl` with `ei` bound to `receiver`.
    pub fn bind(&self, decl: &Rc<FunctionDecl>, receiver: Value) -> Rc<Function> {
        Rc::new(Function {
            decl: Rc::clone(decl),
            closure: Rc::clone(&self.closure),
            receiver: Some(receiver),
        })
    }
}

pub struct Instance {
    pub class: Rc<Class>,
    pub fields: RefCell<OrderedMap>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NativeArity {
    Exact(usize),
    Range { min: usize, max: Option<usize> },
}

impl NativeArity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            NativeArity::Exact(expected) => count == expected,
            NativeArity::Range { min, max } => count >= min && max.is_none_or(|m| count <= m),
        }
    }

    pub fn describe(&self) -> String {
        match *self {
            NativeArity::Exact(expected) => expected.to_string(),
            NativeArity::Range { min, max: None } => format!("at least {}", min),
            NativeArity::Range { min, max: Some(max) } if min == max => min.to_string(),
            NativeArity::Range { min, max: Some(max) } => format!("{} to {}", min, max),
        }
    }
}

pub type SyncNative = fn(&Interpreter, &[Value]) -> EvalResult;
pub type AsyncNative = for<'a> fn(&'a Interpreter, Vec<Value>) -> LocalBoxFuture<'a, EvalResult>;

#[derive(Clone)]
pub enum NativeImpl {
    /// Completes without suspending.
    Sync(SyncNative),
    /// May call back into script functions or wait on timers and I/O.
    Async(AsyncNative),
    /// Resolve or reject function handed to a `proyash_banao` executor.
    Settle { promise: Rc<Promise>, fulfill: bool },
}

pub struct NativeFunction {
    pub name: String,
    pub arity: NativeArity,
    pub imp: NativeImpl,
}

/// Native resources exposed to scripts as opaque values.
pub enum Handle {
    Emitter(EventEmitter),
    Response(ResponseSlot),
}

//=============================================
//            Section 3: Value
//=============================================

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<OrderedMap>>),
    Function(Rc<Function>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
    Promise(Rc<Promise>),
    Generator(Rc<Generator>),
    Builtin(Rc<NativeFunction>),
    Handle(Rc<Handle>),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn map(map: OrderedMap) -> Self {
        Value::Map(Rc::new(RefCell::new(map)))
    }

    /// `mittha`, `khali` and zero are the only falsy values.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Function(_) | Value::Builtin(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Promise(_) => "promise",
            Value::Generator(_) => "generator",
            Value::Handle(handle) => match handle.as_ref() {
                Handle::Emitter(_) => "emitter",
                Handle::Response(_) => "response",
            },
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Builtin(_))
    }

    /// Language-level `==`: numbers by value across int/float, scalars by
    /// value, heap objects by identity.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.as_f64() == other.as_f64()
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => {
                Rc::ptr_eq(a, b) || (Rc::ptr_eq(&a.decl, &b.decl) && Rc::ptr_eq(&a.closure, &b.closure))
            }
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Promise(a), Value::Promise(b)) => Rc::ptr_eq(a, b),
            (Value::Generator(a), Value::Generator(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => Rc::ptr_eq(a, b) || a.name == b.name,
            (Value::Handle(a), Value::Handle(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Display form used inside containers: strings are quoted.
    pub fn repr(&self) -> String {
        let mut out = String::new();
        let mut seen = Vec::new();
        // writing into a String cannot fail
        let _ = write_value(&mut out, self, true, &mut seen);
        out
    }
}

fn heap_id(value: &Value) -> Option<usize> {
    match value {
        Value::Array(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
        Value::Map(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
        Value::Instance(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
        _ => None,
    }
}

fn write_value(
    out: &mut impl fmt::Write,
    value: &Value,
    quoted: bool,
    seen: &mut Vec<usize>,
) -> fmt::Result {
    if let Some(id) = heap_id(value) {
        if seen.contains(&id) {
            return out.write_str("[circular]");
        }
        seen.push(id);
    }

    let result = match value {
        Value::Null => out.write_str("khali"),
        Value::Bool(true) => out.write_str("sotti"),
        Value::Bool(false) => out.write_str("mittha"),
        Value::Int(n) => write!(out, "{}", n),
        Value::Float(f) => write!(out, "{}", f),
        Value::String(s) if quoted => write!(out, "{:?}", s),
        Value::String(s) => out.write_str(s),
        Value::Array(items) => {
            out.write_char('[')?;
            for (idx, item) in items.borrow().iter().enumerate() {
                if idx > 0 {
                    out.write_str(", ")?;
                }
                write_value(out, item, true, seen)?;
            }
            out.write_char(']')
        }
        Value::Map(map) => write_entries(out, &map.borrow(), seen),
        Value::Instance(instance) => {
            write!(out, "{} ", instance.class.name)?;
            write_entries(out, &instance.fields.borrow(), seen)
        }
        Value::Function(func) => {
            let prefix = if func.decl.is_async { "proyash kaj" } else { "kaj" };
            write!(out, "<{} {}>", prefix, func.name())
        }
        Value::Class(class) => write!(out, "<sreni {}>", class.name),
        Value::Promise(promise) => write!(out, "<proyash {}>", promise.state_name()),
        Value::Generator(_) => out.write_str("<generator>"),
        Value::Builtin(native) => write!(out, "<builtin {}>", native.name),
        Value::Handle(handle) => match handle.as_ref() {
            Handle::Emitter(_) => out.write_str("<ghotona>"),
            Handle::Response(_) => out.write_str("<response>"),
        },
    };

    if heap_id(value).is_some() {
        seen.pop();
    }
    result
}

fn write_entries(
    out: &mut impl fmt::Write,
    map: &OrderedMap,
    seen: &mut Vec<usize>,
) -> fmt::Result {
    out.write_char('{')?;
    for (idx, (key, item)) in map.iter().enumerate() {
        if idx > 0 {
            out.write_str(", ")?;
        }
        write!(out, "{}: ", key)?;
        write_value(out, item, true, seen)?;
    }
    out.write_char('}')
}

/// `lipi`-style conversion: strings print bare, everything else uses `repr`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut seen = Vec::new();
        write_value(f, self, false, &mut seen)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
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

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}


//=====================================================
// End of file
//=====================================================
