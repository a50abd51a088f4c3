//=====================================================
// File: interpreter/statements.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Statement execution for the tree-walking interpreter
// Objective: Declarations, control flow, exception handling and the
//            module import/export statements
//=====================================================

use super::environment::{Env, Environment, Scope};
use super::errors::{Control, EvalResult, RuntimeError};
use super::value::{Class, LocalBoxFuture, OrderedMap, Value};
use super::Interpreter;
use crate::ast::{
    BindingTarget, ClassDecl, DeclKind, ForEachKind, FunctionDecl, ImportDecl, ImportKind,
    MemberKind, Stmt, SwitchCase,
};
use crate::modules;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

//=============================================
//            Section 1: Blocks
//=============================================

impl Interpreter {
    /// Executes `statements` directly in `env` after hoisting function
    /// declarations. Yields the value of the last statement.
    pub fn exec_block<'a>(&'a self, statements: &'a [Stmt], env: &'a Env) -> LocalBoxFuture<'a, EvalResult> {
        Box::pin(async move {
            self.hoist_functions(statements, env)?;
            let mut last = Value::Null;
            for stmt in statements {
                last = self.exec_stmt(stmt, env).await?;
            }
            Ok(last)
        })
    }

    fn hoist_functions(&self, statements: &[Stmt], env: &Env) -> EvalResult<()> {
        for stmt in statements {
            let decl = match stmt {
                Stmt::Function { decl, .. } => decl,
                Stmt::Export { decl: inner, .. } => match inner.as_ref() {
                    Stmt::Function { decl, .. } => decl,
                    _ => continue,
                },
                _ => continue,
            };
            if let Some(name) = &decl.name {
                env.define(name, self.make_function(decl, env))?;
            }
        }
        Ok(())
    }

    pub(crate) fn make_function(&self, decl: &Rc<FunctionDecl>, env: &Env) -> Value {
        self.register_capture(env);
        Value::Function(Rc::new(super::Function::new(Rc::clone(decl), Rc::clone(env))))
    }

    fn make_class(&self, decl: &Rc<ClassDecl>, env: &Env) -> Value {
        let mut methods = HashMap::new();
        let mut getters = HashMap::new();
        let mut setters = HashMap::new();
        for member in &decl.members {
            let table = match member.kind {
                MemberKind::Method => &mut methods,
                MemberKind::Getter => &mut getters,
                MemberKind::Setter => &mut setters,
            };
            table.insert(member.name.clone(), Rc::clone(&member.function));
        }
        self.register_capture(env);
        Value::Class(Rc::new(Class {
            name: decl.name.clone(),
            constructor: decl.constructor.clone(),
            methods,
            getters,
            setters,
            closure: Rc::clone(env),
        }))
    }

    //=============================================
    //            Section 2: Statements
    //=============================================

    pub(crate) fn exec_stmt<'a>(&'a self, stmt: &'a Stmt, env: &'a Env) -> LocalBoxFuture<'a, EvalResult> {
        Box::pin(async move {
            self.exec_stmt_inner(stmt, env)
                .await
                .map_err(|control| control.located(stmt.position(), || env.module_path()))
        })
    }

    async fn exec_stmt_inner(&self, stmt: &Stmt, env: &Env) -> EvalResult {
        match stmt {
            Stmt::VarDecl {
                kind,
                target,
                initializer,
                ..
            } => {
                let value = match initializer {
                    Some(expr) => self.eval_expr(expr, env).await?,
                    None => Value::Null,
                };
                self.declare(*kind, target, value, env)?;
                Ok(Value::Null)
            }
            // bound during hoisting
            Stmt::Function { .. } => Ok(Value::Null),
            Stmt::Class { decl, .. } => {
                let class = self.make_class(decl, env);
                env.define(&decl.name, class)?;
                Ok(Value::Null)
            }
            Stmt::Expression { expr, .. } => self.eval_expr(expr, env).await,
            Stmt::Block { statements, .. } => {
                let scope = Environment::child(env, Scope::Block);
                self.exec_block(statements, &scope).await
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.eval_expr(condition, env).await?.is_truthy() {
                    self.exec_stmt(then_branch, env).await
                } else if let Some(otherwise) = else_branch {
                    self.exec_stmt(otherwise, env).await
                } else {
                    Ok(Value::Null)
                }
            }
            Stmt::While {
                condition, body, ..
            } => {
                while self.eval_expr(condition, env).await?.is_truthy() {
                    if !keep_looping(self.exec_stmt(body, env).await)? {
                        break;
                    }
                }
                Ok(Value::Null)
            }
            Stmt::DoWhile {
                body, condition, ..
            } => {
                loop {
                    if !keep_looping(self.exec_stmt(body, env).await)? {
                        break;
                    }
                    if !self.eval_expr(condition, env).await?.is_truthy() {
                        break;
                    }
                }
                Ok(Value::Null)
            }
            Stmt::For {
                init,
                condition,
                update,
                body,
                ..
            } => {
                let scope = Environment::child(env, Scope::Block);
                if let Some(init) = init {
                    self.exec_stmt(init, &scope).await?;
                }
                loop {
                    if let Some(condition) = condition
                        && !self.eval_expr(condition, &scope).await?.is_truthy()
                    {
                        break;
                    }
                    if !keep_looping(self.exec_stmt(body, &scope).await)? {
                        break;
                    }
                    if let Some(update) = update {
                        self.eval_expr(update, &scope).await?;
                    }
                }
                Ok(Value::Null)
            }
            Stmt::ForEach {
                kind,
                binding,
                iterable,
                body,
                ..
            } => {
                let collection = self.eval_expr(iterable, env).await?;
                self.for_each(*kind, binding, collection, body, env).await
            }
            Stmt::Switch { subject, cases, .. } => self.exec_switch(subject, cases, env).await,
            Stmt::Break { .. } => Err(Control::Break),
            Stmt::Continue { .. } => Err(Control::Continue),
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, env).await?,
                    None => Value::Null,
                };
                Err(Control::Return(value))
            }
            Stmt::Throw { value, .. } => {
                let value = self.eval_expr(value, env).await?;
                Err(Control::throw(value))
            }
            Stmt::Try {
                body,
                catch,
                finally,
                ..
            } => {
                let scope = Environment::child(env, Scope::Block);
                let outcome = match (self.exec_block(body, &scope).await, catch) {
                    (Err(Control::Throw(thrown)), Some(clause)) => {
                        let catch_scope = Environment::child(env, Scope::Block);
                        if let Some(param) = &clause.param {
                            catch_scope.define(param, thrown.value)?;
                        }
                        self.exec_block(&clause.body, &catch_scope).await
                    }
                    (other, _) => other,
                };
                if let Some(finally) = finally {
                    let scope = Environment::child(env, Scope::Block);
                    self.exec_block(finally, &scope).await?;
                }
                outcome.map(|_| Value::Null)
            }
            Stmt::Import(decl) => {
                self.import_module(decl, env).await?;
                Ok(Value::Null)
            }
            Stmt::Export { decl, .. } => {
                self.exec_stmt(decl, env).await?;
                let names: Vec<String> = match decl.as_ref() {
                    Stmt::VarDecl { target, .. } => {
                        target.names().into_iter().map(str::to_string).collect()
                    }
                    Stmt::Function { decl, .. } => decl.name.iter().cloned().collect(),
                    Stmt::Class { decl, .. } => vec![decl.name.clone()],
                    _ => Vec::new(),
                };
                self.export_names(&names, env)?;
                Ok(Value::Null)
            }
            Stmt::ExportNames { names, .. } => {
                self.export_names(names, env)?;
                Ok(Value::Null)
            }
        }
    }

    fn declare(
        &self,
        kind: DeclKind,
        target: &BindingTarget,
        value: Value,
        env: &Env,
    ) -> Result<(), RuntimeError> {
        let scope = match kind {
            DeclKind::Global => self.globals(),
            DeclKind::Let | DeclKind::Const => env,
        };
        let bindings: Vec<(&str, Value)> = match target {
            BindingTarget::Name(name) => vec![(name.as_str(), value)],
            BindingTarget::Array(names) => {
                let items = match &value {
                    Value::Array(items) => items.borrow().clone(),
                    other => {
                        return Err(RuntimeError::type_error(format!(
                            "cannot destructure {} as an array",
                            other.type_name()
                        )));
                    }
                };
                names
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, name)| {
                        name.as_deref()
                            .map(|name| (name, items.get(idx).cloned().unwrap_or(Value::Null)))
                    })
                    .collect()
            }
            BindingTarget::Map(names) => {
                let entries = match &value {
                    Value::Map(map) => map.borrow().clone(),
                    Value::Instance(instance) => instance.fields.borrow().clone(),
                    other => {
                        return Err(RuntimeError::type_error(format!(
                            "cannot destructure {} as a map",
                            other.type_name()
                        )));
                    }
                };
                names
                    .iter()
                    .map(|name| (name.as_str(), entries.get(name).cloned().unwrap_or(Value::Null)))
                    .collect()
            }
        };
        for (name, value) in bindings {
            match kind {
                DeclKind::Const => scope.define_constant(name, value)?,
                DeclKind::Let | DeclKind::Global => scope.define(name, value)?,
            }
        }
        Ok(())
    }

    //=============================================
    //            Section 3: Iteration & Switch
    //=============================================

    async fn for_each(
        &self,
        kind: ForEachKind,
        binding: &str,
        collection: Value,
        body: &Stmt,
        env: &Env,
    ) -> EvalResult {
        if let (ForEachKind::Of, Value::Generator(generator)) = (kind, &collection) {
            loop {
                let (item, done) = generator.resume(self, Value::Null).await?;
                if done || !self.run_iteration(binding, item, body, env).await? {
                    break;
                }
            }
            return Ok(Value::Null);
        }

        for item in iteration_items(kind, &collection)? {
            if !self.run_iteration(binding, item, body, env).await? {
                break;
            }
        }
        Ok(Value::Null)
    }

    async fn run_iteration(&self, binding: &str, item: Value, body: &Stmt, env: &Env) -> EvalResult<bool> {
        let scope = Environment::child(env, Scope::Block);
        scope.define(binding, item)?;
        keep_looping(self.exec_stmt(body, &scope).await)
    }

    async fn exec_switch(
        &self,
        subject: &crate::ast::Expr,
        cases: &[SwitchCase],
        env: &Env,
    ) -> EvalResult {
        let subject = self.eval_expr(subject, env).await?;
        let mut start = None;
        for (idx, case) in cases.iter().enumerate() {
            if let Some(test) = &case.test
                && self.eval_expr(test, env).await?.equals(&subject)
            {
                start = Some(idx);
                break;
            }
        }
        let Some(start) = start.or_else(|| cases.iter().position(|case| case.test.is_none())) else {
            return Ok(Value::Null);
        };

        let scope = Environment::child(env, Scope::Block);
        for case in &cases[start..] {
            match self.exec_block(&case.body, &scope).await {
                Ok(_) => {}
                Err(Control::Break) => break,
                Err(other) => return Err(other),
            }
        }
        Ok(Value::Null)
    }

    //=============================================
    //            Section 4: Modules
    //=============================================

    fn export_names(&self, names: &[String], env: &Env) -> Result<(), RuntimeError> {
        let module = env
            .module_scope()
            .ok_or_else(|| RuntimeError::type_error("'pathao' is only valid inside a module"))?;
        for name in names {
            let value = env.lookup(name)?;
            module.exports.borrow_mut().insert(name.clone(), value);
        }
        Ok(())
    }

    async fn import_module(&self, decl: &ImportDecl, env: &Env) -> EvalResult<()> {
        let base = env
            .module_scope()
            .map(|module| module.base_dir())
            .unwrap_or_else(|| PathBuf::from("."));
        let path = self
            .modules()
            .borrow()
            .resolve(&decl.path, &base)
            .map_err(RuntimeError::from)?;
        let cached = self.modules().borrow().cached(&path);
        let exports = match cached {
            Some(exports) => exports,
            None => self.load_module(&path).await?,
        };

        match &decl.kind {
            ImportKind::Namespace(alias) => env.define(alias, exports)?,
            ImportKind::All => {
                let Value::Map(map) = &exports else {
                    return Err(RuntimeError::Module(format!(
                        "'{}' exports a {}; import it with 'hisabe'",
                        decl.path,
                        exports.type_name()
                    ))
                    .into());
                };
                let entries: Vec<(String, Value)> = map
                    .borrow()
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                for (name, value) in entries {
                    env.define(&name, value)?;
                }
            }
            ImportKind::Named(names) => {
                for name in names {
                    let value = match &exports {
                        Value::Map(map) => map.borrow().get(name).cloned(),
                        _ => None,
                    };
                    let value = value.ok_or_else(|| {
                        RuntimeError::Module(format!("'{}' has no export named '{}'", decl.path, name))
                    })?;
                    env.define(name, value)?;
                }
            }
        }
        Ok(())
    }

    async fn load_module(&self, path: &Path) -> EvalResult {
        if modules::is_json(path) {
            let value = modules::read_json(path).map_err(RuntimeError::from)?;
            self.modules()
                .borrow_mut()
                .register(path.to_path_buf(), value.clone(), true);
            return Ok(value);
        }

        let program = modules::read_program(path).map_err(RuntimeError::from)?;
        let exports = Rc::new(RefCell::new(OrderedMap::new()));
        let value = Value::Map(Rc::clone(&exports));
        // registered before execution so import cycles see partial exports
        self.modules()
            .borrow_mut()
            .register(path.to_path_buf(), value.clone(), false);
        debug!(module = %path.display(), "loading module");

        let module_env = self.module_env(Some(path.to_path_buf()), exports);
        if let Err(control) = self.exec_program(&program.statements, &module_env).await {
            self.modules().borrow_mut().forget(path);
            return Err(control);
        }
        self.modules().borrow_mut().mark_ready(path);
        Ok(value)
    }
}

/// Maps a loop body's outcome to "keep going?".
fn keep_looping(result: EvalResult) -> EvalResult<bool> {
    match result {
        Ok(_) | Err(Control::Continue) => Ok(true),
        Err(Control::Break) => Ok(false),
        Err(other) => Err(other),
    }
}

/// Items visited by `ghuriye`. Arrays are snapshotted.
fn iteration_items(kind: ForEachKind, collection: &Value) -> Result<Vec<Value>, RuntimeError> {
    let items = match (kind, collection) {
        (ForEachKind::Of, Value::Array(items)) => items.borrow().clone(),
        (ForEachKind::Of, Value::String(text)) => {
            text.chars().map(|c| Value::String(c.to_string())).collect()
        }
        (ForEachKind::Of, Value::Map(map)) => map
            .borrow()
            .iter()
            .map(|(key, value)| Value::array(vec![Value::String(key.clone()), value.clone()]))
            .collect(),
        (ForEachKind::In, Value::Map(map)) => {
            map.borrow().keys().cloned().map(Value::String).collect()
        }
        (ForEachKind::In, Value::Instance(instance)) => instance
            .fields
            .borrow()
            .keys()
            .cloned()
            .map(Value::String)
            .collect(),
        (ForEachKind::In, Value::Array(items)) => {
            (0..items.borrow().len() as i64).map(Value::Int).collect()
        }
        (ForEachKind::In, Value::String(text)) => {
            (0..text.chars().count() as i64).map(Value::Int).collect()
        }
        (_, other) => {
            return Err(RuntimeError::type_error(format!(
                "cannot iterate over {}",
                other.type_name()
            )));
        }
    };
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_iteration_yields_pairs_and_keys() {
        let map: OrderedMap = [("a".to_string(), Value::Int(1)), ("b".to_string(), Value::Int(2))]
            .into_iter()
            .collect();
        let map = Value::map(map);
        let pairs = iteration_items(ForEachKind::Of, &map).unwrap();
        assert_eq!(pairs[0].to_string(), "[\"a\", 1]");
        let keys = iteration_items(ForEachKind::In, &map).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[1].to_string(), "b");
    }

    #[test]
    fn numbers_are_not_iterable() {
        assert!(iteration_items(ForEachKind::Of, &Value::Int(3)).is_err());
    }

    #[test]
    fn loop_signals() {
        assert!(keep_looping(Ok(Value::Null)).unwrap());
        assert!(keep_looping(Err(Control::Continue)).unwrap());
        assert!(!keep_looping(Err(Control::Break)).unwrap());
        assert!(keep_looping(Err(Control::Return(Value::Null))).is_err());
    }
}

//=====================================================
// End of file
//=====================================================
