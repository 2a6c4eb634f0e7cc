//! Loading emitted images and invoking methods inside them.
//!
//! Loading builds a lookup table from namespace-qualified class names to
//! classes and from method names to invocable handles, once per load, and
//! links every symbolic native reference to its implementation. The loaded
//! unit is a plain owned value scoped to the `run` call that created it;
//! dropping it releases the executable context.

use emberscript_analysis::ir::{Chunk, Image, ImageClass, Op, Value};
use emberscript_foundation::ident::CaseInsensitive;
use indexmap::IndexMap;
use tracing::trace;

use crate::{error::InvokeError, natives};

pub(crate) type NativeImpl = fn(&[Value]) -> Result<Value, InvokeError>;

const MAX_CALL_DEPTH: usize = 256;

type QualifiedKey = (CaseInsensitive<String>, CaseInsensitive<String>);

/// An image loaded into an executable context.
pub(crate) struct LoadedUnit<'a> {
    classes: IndexMap<QualifiedKey, LoadedClass<'a>>,
    natives: Vec<NativeImpl>,
}

pub(crate) struct LoadedClass<'a> {
    class: &'a ImageClass,
    /// Method name to slot in `class.methods`. Fields are deliberately not
    /// in here: a field looked up as a method is indistinguishable from an
    /// absent method.
    methods: IndexMap<CaseInsensitive<String>, usize>,
}

impl<'a> LoadedClass<'a> {
    pub fn method_index(&self, name: &str) -> Option<usize> {
        self.methods.get(CaseInsensitive::new_ref(name)).copied()
    }
}

/// One class instance: its field values, in image field order.
pub(crate) struct Instance {
    fields: Vec<Value>,
}

impl<'a> LoadedUnit<'a> {
    /// Loads an image, resolving native references by symbol.
    pub fn load(image: &'a Image) -> Result<Self, InvokeError> {
        let natives = image
            .natives
            .iter()
            .map(|native| {
                natives::resolve(&native.symbol)
                    .ok_or_else(|| InvokeError::UnresolvedNative(native.symbol.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let classes = image
            .classes
            .iter()
            .map(|class| {
                let methods = class
                    .methods
                    .iter()
                    .enumerate()
                    .map(|(slot, method)| (CaseInsensitive::new(method.name.clone()), slot))
                    .collect();
                (
                    (
                        CaseInsensitive::new(class.namespace.clone()),
                        CaseInsensitive::new(class.name.clone()),
                    ),
                    LoadedClass { class, methods },
                )
            })
            .collect();

        trace!(unit_name = %image.unit_name, "loaded image into executable context");
        Ok(Self { classes, natives })
    }

    pub fn class(&self, namespace: &str, name: &str) -> Option<&LoadedClass<'a>> {
        self.classes.get(&(
            CaseInsensitive::new(namespace.to_owned()),
            CaseInsensitive::new(name.to_owned()),
        ))
    }

    /// Constructs an instance through the implicit no-argument constructor:
    /// zero values first, then the field initializers in declaration order.
    pub fn instantiate(&self, class: &LoadedClass<'a>) -> Result<Instance, InvokeError> {
        let mut instance = Instance {
            fields: class
                .class
                .fields
                .iter()
                .map(|field| field.default.clone())
                .collect(),
        };
        self.run_chunk(&class.class.initializer, class, &mut instance, vec![], 0)?;
        Ok(instance)
    }

    pub fn invoke(
        &self,
        class: &LoadedClass<'a>,
        instance: &mut Instance,
        method_index: usize,
        args: &[Value],
    ) -> Result<Value, InvokeError> {
        self.call_method(class, instance, method_index, args.to_vec(), 0)
    }

    fn call_method(
        &self,
        class: &LoadedClass<'a>,
        instance: &mut Instance,
        method_index: usize,
        args: Vec<Value>,
        depth: usize,
    ) -> Result<Value, InvokeError> {
        let method = class
            .class
            .methods
            .get(method_index)
            .ok_or(InvokeError::Malformed("method index out of range"))?;
        if args.len() != method.param_count as usize {
            return Err(InvokeError::ArityMismatch {
                expected: method.param_count as usize,
                got: args.len(),
            });
        }
        let mut locals = args;
        locals.resize(method.local_count as usize, Value::Void);
        self.run_chunk(&method.chunk, class, instance, locals, depth)
    }

    fn run_chunk(
        &self,
        chunk: &Chunk,
        class: &LoadedClass<'a>,
        instance: &mut Instance,
        mut locals: Vec<Value>,
        depth: usize,
    ) -> Result<Value, InvokeError> {
        if depth > MAX_CALL_DEPTH {
            return Err(InvokeError::CallDepthExceeded);
        }

        let mut stack: Vec<Value> = vec![];
        let mut pc = 0usize;
        while let Some(&op) = chunk.ops.get(pc) {
            pc += 1;
            match op {
                Op::PushConst(index) => {
                    let value = chunk
                        .consts
                        .get(index as usize)
                        .ok_or(InvokeError::Malformed("constant index out of range"))?;
                    stack.push(value.clone());
                }
                Op::LoadLocal(slot) => {
                    let value = locals
                        .get(slot as usize)
                        .ok_or(InvokeError::Malformed("local slot out of range"))?;
                    stack.push(value.clone());
                }
                Op::StoreLocal(slot) => {
                    let value = pop(&mut stack)?;
                    let local = locals
                        .get_mut(slot as usize)
                        .ok_or(InvokeError::Malformed("local slot out of range"))?;
                    *local = value;
                }
                Op::LoadField(slot) => {
                    let value = instance
                        .fields
                        .get(slot as usize)
                        .ok_or(InvokeError::Malformed("field slot out of range"))?;
                    stack.push(value.clone());
                }
                Op::StoreField(slot) => {
                    let value = pop(&mut stack)?;
                    let field = instance
                        .fields
                        .get_mut(slot as usize)
                        .ok_or(InvokeError::Malformed("field slot out of range"))?;
                    *field = value;
                }

                Op::Add => arithmetic(&mut stack, i32::checked_add, |a, b| a + b)?,
                Op::Sub => arithmetic(&mut stack, i32::checked_sub, |a, b| a - b)?,
                Op::Mul => arithmetic(&mut stack, i32::checked_mul, |a, b| a * b)?,
                Op::Div => {
                    let (lhs, rhs) = pop_pair(&mut stack)?;
                    match (lhs, rhs) {
                        (Value::Int(_), Value::Int(0)) => {
                            return Err(InvokeError::DivisionByZero)
                        }
                        (Value::Int(a), Value::Int(b)) => stack.push(Value::Int(
                            a.checked_div(b).ok_or(InvokeError::Overflow)?,
                        )),
                        (Value::Float(a), Value::Float(b)) => stack.push(Value::Float(a / b)),
                        (lhs, rhs) => return Err(mismatch(&lhs, &rhs)),
                    }
                }
                Op::Rem => {
                    let (lhs, rhs) = pop_pair(&mut stack)?;
                    match (lhs, rhs) {
                        (Value::Int(_), Value::Int(0)) => {
                            return Err(InvokeError::DivisionByZero)
                        }
                        (Value::Int(a), Value::Int(b)) => stack.push(Value::Int(
                            a.checked_rem(b).ok_or(InvokeError::Overflow)?,
                        )),
                        (Value::Float(a), Value::Float(b)) => stack.push(Value::Float(a % b)),
                        (lhs, rhs) => return Err(mismatch(&lhs, &rhs)),
                    }
                }
                Op::Neg => {
                    let value = pop(&mut stack)?;
                    match value {
                        Value::Int(x) => stack.push(Value::Int(
                            x.checked_neg().ok_or(InvokeError::Overflow)?,
                        )),
                        Value::Float(x) => stack.push(Value::Float(-x)),
                        other => {
                            return Err(InvokeError::Mismatch {
                                expected: "int",
                                found: other.type_name(),
                            })
                        }
                    }
                }
                Op::Concat => {
                    let (lhs, rhs) = pop_pair(&mut stack)?;
                    match (lhs, rhs) {
                        (Value::String(mut a), Value::String(b)) => {
                            a.push_str(&b);
                            stack.push(Value::String(a));
                        }
                        (lhs, rhs) => return Err(mismatch(&lhs, &rhs)),
                    }
                }

                Op::Eq | Op::Ne => {
                    let (lhs, rhs) = pop_pair(&mut stack)?;
                    if lhs.type_name() != rhs.type_name() {
                        return Err(mismatch(&lhs, &rhs));
                    }
                    let equal = lhs == rhs;
                    stack.push(Value::Bool(if matches!(op, Op::Eq) {
                        equal
                    } else {
                        !equal
                    }));
                }
                Op::Lt => comparison(&mut stack, |ordering| ordering.is_lt())?,
                Op::Le => comparison(&mut stack, |ordering| ordering.is_le())?,
                Op::Gt => comparison(&mut stack, |ordering| ordering.is_gt())?,
                Op::Ge => comparison(&mut stack, |ordering| ordering.is_ge())?,
                Op::Not => {
                    let value = pop(&mut stack)?;
                    match value {
                        Value::Bool(x) => stack.push(Value::Bool(!x)),
                        other => {
                            return Err(InvokeError::Mismatch {
                                expected: "bool",
                                found: other.type_name(),
                            })
                        }
                    }
                }

                Op::Jump(target) => pc = target as usize,
                Op::JumpIfFalse(target) => {
                    if !pop_bool(&mut stack)? {
                        pc = target as usize;
                    }
                }
                Op::JumpIfTrue(target) => {
                    if pop_bool(&mut stack)? {
                        pc = target as usize;
                    }
                }

                Op::Pop => {
                    pop(&mut stack)?;
                }

                Op::CallMethod { method, args } => {
                    let argv = pop_args(&mut stack, args)?;
                    let result =
                        self.call_method(class, instance, method as usize, argv, depth + 1)?;
                    if !matches!(result, Value::Void) {
                        stack.push(result);
                    }
                }
                Op::CallNative { native, args } => {
                    let argv = pop_args(&mut stack, args)?;
                    let function = self
                        .natives
                        .get(native as usize)
                        .ok_or(InvokeError::Malformed("native index out of range"))?;
                    let result = function(&argv)?;
                    if !matches!(result, Value::Void) {
                        stack.push(result);
                    }
                }

                Op::Return => return pop(&mut stack),
                Op::ReturnVoid => return Ok(Value::Void),
            }
        }
        Ok(Value::Void)
    }
}

fn pop(stack: &mut Vec<Value>) -> Result<Value, InvokeError> {
    stack.pop().ok_or(InvokeError::Malformed("stack underflow"))
}

fn pop_pair(stack: &mut Vec<Value>) -> Result<(Value, Value), InvokeError> {
    let rhs = pop(stack)?;
    let lhs = pop(stack)?;
    Ok((lhs, rhs))
}

fn pop_bool(stack: &mut Vec<Value>) -> Result<bool, InvokeError> {
    match pop(stack)? {
        Value::Bool(x) => Ok(x),
        other => Err(InvokeError::Mismatch {
            expected: "bool",
            found: other.type_name(),
        }),
    }
}

fn pop_args(stack: &mut Vec<Value>, count: u8) -> Result<Vec<Value>, InvokeError> {
    let count = count as usize;
    if stack.len() < count {
        return Err(InvokeError::Malformed("stack underflow"));
    }
    Ok(stack.split_off(stack.len() - count))
}

fn mismatch(lhs: &Value, rhs: &Value) -> InvokeError {
    InvokeError::Mismatch {
        expected: lhs.type_name(),
        found: rhs.type_name(),
    }
}

fn arithmetic(
    stack: &mut Vec<Value>,
    int: fn(i32, i32) -> Option<i32>,
    float: fn(f32, f32) -> f32,
) -> Result<(), InvokeError> {
    let (lhs, rhs) = pop_pair(stack)?;
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => {
            stack.push(Value::Int(int(a, b).ok_or(InvokeError::Overflow)?));
        }
        (Value::Float(a), Value::Float(b)) => stack.push(Value::Float(float(a, b))),
        (lhs, rhs) => return Err(mismatch(&lhs, &rhs)),
    }
    Ok(())
}

fn comparison(
    stack: &mut Vec<Value>,
    test: fn(std::cmp::Ordering) -> bool,
) -> Result<(), InvokeError> {
    let (lhs, rhs) = pop_pair(stack)?;
    let ordering = match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Float(a), Value::Float(b)) => a
            .partial_cmp(b)
            .unwrap_or(std::cmp::Ordering::Greater),
        _ => return Err(mismatch(&lhs, &rhs)),
    };
    stack.push(Value::Bool(test(ordering)));
    Ok(())
}
