//=====================================================
// File: interpreter/expressions.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Expression evaluation for the tree-walking interpreter
// Objective: Operators, member/index access, assignment targets, calls,
//            object construction and the async/generator expressions
//=====================================================

use super::environment::Env;
use super::errors::{Control, EvalResult, RuntimeError};
use super::generator::Generator;
use super::operators;
use super::value::{LocalBoxFuture, OrderedMap, Value};
use super::Interpreter;
use crate::ast::{Expr, InfixOp, PrefixOp, TemplatePart};
use std::rc::Rc;

//=============================================
//            Section 1: Places
//=============================================

/// A resolved assignment target. Object and index operands are evaluated
/// exactly once, so compound assignment reads and writes the same slot.
enum Place {
    Variable(String),
    Member { object: Value, property: String },
    Index { object: Value, index: Value },
}

impl Interpreter {
    pub fn eval_expr<'a>(&'a self, expr: &'a Expr, env: &'a Env) -> LocalBoxFuture<'a, EvalResult> {
        Box::pin(self.eval_expr_inner(expr, env))
    }

    async fn eval_expr_inner(&self, expr: &Expr, env: &Env) -> EvalResult {
        match expr {
            Expr::Identifier { name, .. } => Ok(env.lookup(name)?),
            Expr::Int { value, .. } => Ok(Value::Int(*value)),
            Expr::Float { value, .. } => Ok(Value::Float(*value)),
            Expr::String { value, .. } => Ok(Value::String(value.clone())),
            Expr::Bool { value, .. } => Ok(Value::Bool(*value)),
            Expr::Null { .. } => Ok(Value::Null),
            Expr::Template { parts, .. } => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => out.push_str(text),
                        TemplatePart::Expr(expr) => {
                            let value = self.eval_expr(expr, env).await?;
                            out.push_str(&value.to_string());
                        }
                    }
                }
                Ok(Value::String(out))
            }
            Expr::This { .. } => env
                .get("ei")
                .ok_or_else(|| RuntimeError::type_error("'ei' is only available inside methods").into()),
            Expr::Array { elements, .. } => Ok(Value::array(self.eval_args(elements, env).await?)),
            Expr::Map { entries, .. } => {
                let mut map = OrderedMap::new();
                for (key, expr) in entries {
                    let value = self.eval_expr(expr, env).await?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::map(map))
            }
            Expr::Function { decl, .. } => Ok(self.make_function(decl, env)),
            Expr::Call { callee, args, .. } => self.eval_call(callee, args, env).await,
            Expr::Index { object, index, .. } => {
                let object = self.eval_expr(object, env).await?;
                let index = self.eval_expr(index, env).await?;
                self.get_index(&object, &index).await
            }
            Expr::Member {
                object, property, ..
            } => {
                let object = self.eval_expr(object, env).await?;
                self.get_member(&object, property).await
            }
            Expr::Infix {
                left, op, right, ..
            } => self.eval_infix(*op, left, right, env).await,
            Expr::Prefix { op, operand, .. } => {
                let value = self.eval_expr(operand, env).await?;
                match op {
                    PrefixOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    PrefixOp::Negate => match value {
                        Value::Int(n) => Ok(n
                            .checked_neg()
                            .map(Value::Int)
                            .unwrap_or(Value::Float(-(n as f64)))),
                        Value::Float(f) => Ok(Value::Float(-f)),
                        other => Err(RuntimeError::type_error(format!(
                            "cannot negate {}",
                            other.type_name()
                        ))
                        .into()),
                    },
                }
            }
            Expr::Assign {
                target, op, value, ..
            } => {
                let place = self.resolve_place(target, env).await?;
                let value = match op {
                    None => self.eval_expr(value, env).await?,
                    Some(op) => {
                        let current = self.read_place(&place, env).await?;
                        let rhs = self.eval_expr(value, env).await?;
                        operators::binary(*op, &current, &rhs)?
                    }
                };
                self.write_place(&place, value.clone(), env).await?;
                Ok(value)
            }
            Expr::Update {
                target,
                increment,
                prefix,
                ..
            } => {
                let place = self.resolve_place(target, env).await?;
                let old = self.read_place(&place, env).await?;
                if old.as_f64().is_none() {
                    return Err(RuntimeError::type_error(format!(
                        "cannot {} {}",
                        if *increment { "increment" } else { "decrement" },
                        old.type_name()
                    ))
                    .into());
                }
                let op = if *increment { InfixOp::Add } else { InfixOp::Subtract };
                let new = operators::binary(op, &old, &Value::Int(1))?;
                self.write_place(&place, new.clone(), env).await?;
                Ok(if *prefix { new } else { old })
            }
            Expr::Conditional {
                condition,
                then_expr,
                else_expr,
                ..
            } => {
                if self.eval_expr(condition, env).await?.is_truthy() {
                    self.eval_expr(then_expr, env).await
                } else {
                    self.eval_expr(else_expr, env).await
                }
            }
            Expr::New { class, args, .. } => {
                let class = self.eval_expr(class, env).await?;
                let args = self.eval_args(args, env).await?;
                match class {
                    Value::Class(class) => self.instantiate(class, args).await,
                    other => Err(RuntimeError::NotAClass(other.repr()).into()),
                }
            }
            Expr::Await { value, .. } => {
                let value = self.eval_expr(value, env).await?;
                self.await_value(value).await
            }
            Expr::Yield { value, .. } => {
                let yielder = env
                    .yielder()
                    .ok_or_else(|| RuntimeError::type_error("'utpadan' is only valid inside a generator"))?;
                let value = match value {
                    Some(expr) => self.eval_expr(expr, env).await?,
                    None => Value::Null,
                };
                yielder.yield_value(value).await
            }
            Expr::Delete { target, .. } => self.eval_delete(target, env).await,
        }
    }

    pub(crate) async fn eval_args(&self, args: &[Expr], env: &Env) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expr(arg, env).await?);
        }
        Ok(values)
    }

    //=============================================
    //            Section 2: Operators & Calls
    //=============================================

    async fn eval_infix(&self, op: InfixOp, left: &Expr, right: &Expr, env: &Env) -> EvalResult {
        let lhs = self.eval_expr(left, env).await?;
        match op {
            InfixOp::And if !lhs.is_truthy() => return Ok(lhs),
            InfixOp::Or if lhs.is_truthy() => return Ok(lhs),
            InfixOp::And | InfixOp::Or => return self.eval_expr(right, env).await,
            _ => {}
        }
        let rhs = self.eval_expr(right, env).await?;
        match op {
            InfixOp::InstanceOf => match (&lhs, &rhs) {
                (Value::Instance(instance), Value::Class(class)) => {
                    Ok(Value::Bool(Rc::ptr_eq(&instance.class, class)))
                }
                (_, Value::Class(_)) => Ok(Value::Bool(false)),
                (_, other) => Err(RuntimeError::type_error(format!(
                    "right side of 'instanceof' must be a class, got {}",
                    other.type_name()
                ))
                .into()),
            },
            InfixOp::In => Ok(Value::Bool(contains(&rhs, &lhs)?)),
            _ => Ok(operators::binary(op, &lhs, &rhs)?),
        }
    }

    async fn eval_call(&self, callee: &Expr, args: &[Expr], env: &Env) -> EvalResult {
        let function = match callee {
            Expr::Member {
                object, property, ..
            } => {
                let receiver = self.eval_expr(object, env).await?;
                if let Value::Generator(generator) = &receiver
                    && property == "next"
                {
                    let input = self.eval_args(args, env).await?.into_iter().next();
                    return self.resume_generator(generator, input.unwrap_or(Value::Null)).await;
                }
                let member = self.get_member(&receiver, property).await?;
                match (&receiver, member) {
                    (Value::Map(_), Value::Function(func)) if func.receiver.is_none() => {
                        Value::Function(func.bind(receiver.clone()))
                    }
                    (_, member) if member.is_callable() => member,
                    (_, other) => {
                        return Err(RuntimeError::NotCallable(format!(
                            "{} ({})",
                            property,
                            other.type_name()
                        ))
                        .into());
                    }
                }
            }
            other => self.eval_expr(other, env).await?,
        };
        let args = self.eval_args(args, env).await?;
        self.call_value(function, args).await
    }

    async fn resume_generator(&self, generator: &Rc<Generator>, input: Value) -> EvalResult {
        let (value, done) = generator.resume(self, input).await?;
        let mut result = OrderedMap::new();
        result.insert("value", value);
        result.insert("done", Value::Bool(done));
        Ok(Value::map(result))
    }

    //=============================================
    //            Section 3: Member & Index Access
    //=============================================

    pub(crate) async fn get_member(&self, object: &Value, property: &str) -> EvalResult {
        match object {
            Value::Map(map) => Ok(map.borrow().get(property).cloned().unwrap_or(Value::Null)),
            Value::Instance(instance) => {
                let field = instance.fields.borrow().get(property).cloned();
                if let Some(value) = field {
                    return Ok(value);
                }
                let class = &instance.class;
                if let Some(getter) = class.getters.get(property) {
                    let bound = class.bind(getter, object.clone());
                    return self.call_function(bound, Vec::new()).await;
                }
                if let Some(method) = class.methods.get(property) {
                    return Ok(Value::Function(class.bind(method, object.clone())));
                }
                Ok(Value::Null)
            }
            Value::Array(items) if property == "length" => Ok(Value::Int(items.borrow().len() as i64)),
            Value::String(text) if property == "length" => Ok(Value::Int(text.chars().count() as i64)),
            other => Err(RuntimeError::PropertyAccess {
                property: property.to_string(),
                type_name: other.type_name().to_string(),
            }
            .into()),
        }
    }

    pub(crate) async fn set_member(&self, object: &Value, property: &str, value: Value) -> EvalResult<()> {
        match object {
            Value::Map(map) => {
                map.borrow_mut().insert(property, value);
                Ok(())
            }
            Value::Instance(instance) => {
                if let Some(setter) = instance.class.setters.get(property) {
                    let bound = instance.class.bind(setter, object.clone());
                    self.call_function(bound, vec![value]).await?;
                } else {
                    instance.fields.borrow_mut().insert(property, value);
                }
                Ok(())
            }
            other => Err(RuntimeError::PropertyAccess {
                property: property.to_string(),
                type_name: other.type_name().to_string(),
            }
            .into()),
        }
    }

    pub(crate) async fn get_index(&self, object: &Value, index: &Value) -> EvalResult {
        match (object, index) {
            (Value::Array(items), Value::Int(idx)) => {
                let items = items.borrow();
                let slot = array_slot(*idx, items.len())?;
                Ok(items[slot].clone())
            }
            (Value::String(text), Value::Int(idx)) => {
                let length = text.chars().count();
                let slot = array_slot(*idx, length)?;
                Ok(text
                    .chars()
                    .nth(slot)
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or(Value::Null))
            }
            (Value::Map(_) | Value::Instance(_), key) => self.get_member(object, &property_key(key)?).await,
            (Value::Array(_) | Value::String(_), other) => Err(RuntimeError::type_error(format!(
                "index must be an integer, got {}",
                other.type_name()
            ))
            .into()),
            (other, _) => Err(RuntimeError::type_error(format!(
                "cannot index into {}",
                other.type_name()
            ))
            .into()),
        }
    }

    async fn set_index(&self, object: &Value, index: &Value, value: Value) -> EvalResult<()> {
        match (object, index) {
            (Value::Array(items), Value::Int(idx)) => {
                let mut items = items.borrow_mut();
                let slot = array_slot(*idx, items.len())?;
                items[slot] = value;
                Ok(())
            }
            (Value::Map(_) | Value::Instance(_), key) => {
                self.set_member(object, &property_key(key)?, value).await
            }
            (Value::String(_), _) => {
                Err(RuntimeError::type_error("strings cannot be modified in place").into())
            }
            (Value::Array(_), other) => Err(RuntimeError::type_error(format!(
                "index must be an integer, got {}",
                other.type_name()
            ))
            .into()),
            (other, _) => Err(RuntimeError::type_error(format!(
                "cannot index into {}",
                other.type_name()
            ))
            .into()),
        }
    }

    //=============================================
    //            Section 4: Assignment Targets
    //=============================================

    async fn resolve_place(&self, target: &Expr, env: &Env) -> EvalResult<Place> {
        match target {
            Expr::Identifier { name, .. } => Ok(Place::Variable(name.clone())),
            Expr::Member {
                object, property, ..
            } => Ok(Place::Member {
                object: self.eval_expr(object, env).await?,
                property: property.clone(),
            }),
            Expr::Index { object, index, .. } => Ok(Place::Index {
                object: self.eval_expr(object, env).await?,
                index: self.eval_expr(index, env).await?,
            }),
            _ => Err(RuntimeError::type_error("invalid assignment target").into()),
        }
    }

    async fn read_place(&self, place: &Place, env: &Env) -> EvalResult {
        match place {
            Place::Variable(name) => Ok(env.lookup(name)?),
            Place::Member { object, property } => self.get_member(object, property).await,
            Place::Index { object, index } => self.get_index(object, index).await,
        }
    }

    async fn write_place(&self, place: &Place, value: Value, env: &Env) -> EvalResult<()> {
        match place {
            Place::Variable(name) => Ok(env.assign(name, value)?),
            Place::Member { object, property } => self.set_member(object, property, value).await,
            Place::Index { object, index } => self.set_index(object, index, value).await,
        }
    }

    async fn eval_delete(&self, target: &Expr, env: &Env) -> EvalResult {
        let (object, key) = match target {
            Expr::Member {
                object, property, ..
            } => (self.eval_expr(object, env).await?, property.clone()),
            Expr::Index { object, index, .. } => {
                let object = self.eval_expr(object, env).await?;
                let index = self.eval_expr(index, env).await?;
                (object, property_key(&index)?)
            }
            _ => {
                return Err(RuntimeError::type_error("'delete' needs a property or index").into());
            }
        };
        let removed = match &object {
            Value::Map(map) => map.borrow_mut().remove(&key).is_some(),
            Value::Instance(instance) => instance.fields.borrow_mut().remove(&key).is_some(),
            other => {
                return Err(Control::from(RuntimeError::type_error(format!(
                    "cannot delete from {}",
                    other.type_name()
                ))));
            }
        };
        Ok(Value::Bool(removed))
    }
}

//=============================================
//            Section 5: Helpers
//=============================================

fn array_slot(index: i64, length: usize) -> Result<usize, RuntimeError> {
    usize::try_from(index)
        .ok()
        .filter(|&slot| slot < length)
        .ok_or(RuntimeError::IndexOutOfRange { index, length })
}

fn property_key(key: &Value) -> Result<String, RuntimeError> {
    match key {
        Value::String(text) => Ok(text.clone()),
        Value::Int(n) => Ok(n.to_string()),
        other => Err(RuntimeError::type_error(format!(
            "map keys must be strings, got {}",
            other.type_name()
        ))),
    }
}

/// `needle in collection`.
pub(crate) fn contains(collection: &Value, needle: &Value) -> Result<bool, RuntimeError> {
    match collection {
        Value::Map(map) => Ok(map.borrow().contains_key(&property_key(needle)?)),
        Value::Instance(instance) => Ok(instance.fields.borrow().contains_key(&property_key(needle)?)),
        Value::Array(items) => Ok(items.borrow().iter().any(|item| item.equals(needle))),
        Value::String(text) => match needle {
            Value::String(part) => Ok(text.contains(part.as_str())),
            other => Err(RuntimeError::type_error(format!(
                "cannot search a string for {}",
                other.type_name()
            ))),
        },
        other => Err(RuntimeError::type_error(format!(
            "'in' needs a map, array or string, got {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_slots_are_bounds_checked() {
        assert_eq!(array_slot(0, 2), Ok(0));
        assert_eq!(
            array_slot(2, 2),
            Err(RuntimeError::IndexOutOfRange { index: 2, length: 2 })
        );
        assert!(array_slot(-1, 2).is_err());
    }

    #[test]
    fn membership_rules() {
        let items = Value::array(vec![Value::Int(1), Value::from("a")]);
        assert!(contains(&items, &Value::Float(1.0)).unwrap());
        assert!(!contains(&items, &Value::from("b")).unwrap());
        assert!(contains(&Value::from("banglacode"), &Value::from("code")).unwrap());

        let mut map = OrderedMap::new();
        map.insert("key", Value::Null);
        assert!(contains(&Value::map(map), &Value::from("key")).unwrap());
        assert!(contains(&Value::Int(3), &Value::Int(3)).is_err());
    }
}

//=====================================================
// End of file
//=====================================================
