//! A small interpreter for generated class types.

mod console;
mod value;

pub use console::{BufferConsole, Console, StdConsole};
pub use value::Value;

use crate::{
    codegen::{ClassType, Instr, MethodBody, Runtime},
    parse::ast::{ArithOp, LogicOp, Ty},
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::cmp::Ordering;
use thiserror::Error;

const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VmError {
    #[error("no method named `{0}`")]
    NoSuchMethod(String),
    #[error("`{method}` takes {expected} argument(s) but {found} were supplied")]
    ArgumentCount {
        method: String,
        expected: usize,
        found: usize,
    },
    #[error("stack underflow")]
    StackUnderflow,
    #[error("call depth exceeded {0}")]
    StackOverflow(usize),
    #[error("division by zero")]
    DivideByZero,
    #[error("cannot {op} {left} and {right}")]
    InvalidOperands {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("{0} cannot be used as a condition")]
    NotACondition(&'static str),
    #[error("input string `{0}` was not in a correct format")]
    Format(String),
    #[error("RandomInt bounds {min}..{max} are out of range")]
    RandomRange { min: i32, max: i32 },
    #[error("invalid {0} #{1}")]
    InvalidSlot(&'static str, usize),
    #[error("execution ran past the end of the method")]
    FellOffEnd,
}

pub type Result<T> = std::result::Result<T, VmError>;

/// A constructed object: its field values.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub fields: Vec<Value>,
}

pub struct Vm<'a, C: Console> {
    class: &'a ClassType,
    console: C,
    rng: StdRng,
    depth: usize,
}

impl<'a, C: Console> Vm<'a, C> {
    pub fn new(class: &'a ClassType, console: C) -> Self {
        Self {
            class,
            console,
            rng: StdRng::from_entropy(),
            depth: 0,
        }
    }

    /// Makes `RandomInt` deterministic.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn into_console(self) -> C {
        self.console
    }

    /// Runs the constructor on a fresh instance.
    pub fn instantiate(&mut self) -> Result<Instance> {
        let mut instance = Instance {
            fields: self.class.fields.iter().map(|f| Value::zero(f.ty)).collect(),
        };
        let class = self.class;
        self.run(&mut instance, &class.ctor, Ty::Void, vec![Value::This])?;
        Ok(instance)
    }

    pub fn invoke(&mut self, instance: &mut Instance, name: &str, args: Vec<Value>) -> Result<Value> {
        let class = self.class;
        let (_, method) = class
            .method(name)
            .ok_or_else(|| VmError::NoSuchMethod(name.to_string()))?;
        if method.params.len() != args.len() {
            return Err(VmError::ArgumentCount {
                method: name.to_string(),
                expected: method.params.len(),
                found: args.len(),
            });
        }

        let mut frame = Vec::with_capacity(args.len() + 1);
        frame.push(Value::This);
        frame.extend(args);
        self.run(instance, &method.body, method.ret, frame)
    }

    fn run(
        &mut self,
        instance: &mut Instance,
        body: &MethodBody,
        ret: Ty,
        mut args: Vec<Value>,
    ) -> Result<Value> {
        if self.depth >= MAX_DEPTH {
            return Err(VmError::StackOverflow(MAX_DEPTH));
        }

        let mut locals = vec![Value::Null; body.locals.len()];
        let mut stack: Vec<Value> = vec![];
        let mut pc = 0;

        loop {
            let instr = body.code.get(pc).ok_or(VmError::FellOffEnd)?;
            log::trace!("{:>3} IL_{:04}: {}", self.depth, pc, instr);
            pc += 1;

            match instr {
                Instr::LdArg(i) => stack.push(slot(&args, "argument", *i as usize)?.clone()),
                Instr::StArg(i) => {
                    let v = pop(&mut stack)?;
                    *slot_mut(&mut args, "argument", *i as usize)? = v;
                }
                Instr::LdLoc(i) => stack.push(slot(&locals, "local", *i as usize)?.clone()),
                Instr::StLoc(i) => {
                    let v = pop(&mut stack)?;
                    *slot_mut(&mut locals, "local", *i as usize)? = v;
                }
                Instr::LdFld(i) => {
                    pop(&mut stack)?;
                    stack.push(slot(&instance.fields, "field", *i)?.clone());
                }
                Instr::StFld(i) => {
                    let v = pop(&mut stack)?;
                    pop(&mut stack)?;
                    *slot_mut(&mut instance.fields, "field", *i)? = v;
                }
                Instr::LdcI4(v) => stack.push(Value::Int(*v)),
                Instr::LdStr(s) => stack.push(Value::Str(s.clone())),
                Instr::LdConst(lit) => stack.push(lit.clone().into()),

                Instr::Add => binary(&mut stack, |a, b| a.arith(ArithOp::Add, b))?,
                Instr::Sub => binary(&mut stack, |a, b| a.arith(ArithOp::Sub, b))?,
                Instr::Mul => binary(&mut stack, |a, b| a.arith(ArithOp::Mul, b))?,
                Instr::Div => binary(&mut stack, |a, b| a.arith(ArithOp::Div, b))?,
                Instr::Rem => binary(&mut stack, |a, b| a.arith(ArithOp::Rem, b))?,
                Instr::And => binary(&mut stack, |a, b| a.logic(LogicOp::And, b))?,
                Instr::Or => binary(&mut stack, |a, b| a.logic(LogicOp::Or, b))?,
                Instr::Xor => binary(&mut stack, |a, b| a.logic(LogicOp::Xor, b))?,
                Instr::Ceq => compare(&mut stack, |o| o == Some(Ordering::Equal))?,
                Instr::Cgt => compare(&mut stack, |o| o == Some(Ordering::Greater))?,
                Instr::Clt => compare(&mut stack, |o| o == Some(Ordering::Less))?,
                Instr::Not => {
                    let v = pop(&mut stack)?.is_true()?;
                    stack.push(Value::Bool(!v));
                }

                Instr::Br(l) => pc = target(body, *l)?,
                Instr::BrTrue(l) => {
                    if pop(&mut stack)?.is_true()? {
                        pc = target(body, *l)?;
                    }
                }
                Instr::BrFalse(l) => {
                    if !pop(&mut stack)?.is_true()? {
                        pc = target(body, *l)?;
                    }
                }
                Instr::Beq(l)
                | Instr::BneUn(l)
                | Instr::Bgt(l)
                | Instr::Bge(l)
                | Instr::Blt(l)
                | Instr::Ble(l) => {
                    let b = pop(&mut stack)?;
                    let a = pop(&mut stack)?;
                    let ord = a.compare(&b)?;
                    let taken = match instr {
                        Instr::Beq(_) => ord == Some(Ordering::Equal),
                        Instr::BneUn(_) => ord != Some(Ordering::Equal),
                        Instr::Bgt(_) => ord == Some(Ordering::Greater),
                        Instr::Bge(_) => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
                        Instr::Blt(_) => ord == Some(Ordering::Less),
                        _ => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
                    };
                    if taken {
                        pc = target(body, *l)?;
                    }
                }

                Instr::Call(id) => {
                    let class = self.class;
                    let method = class
                        .methods
                        .get(*id)
                        .ok_or(VmError::InvalidSlot("method", *id))?;
                    let argc = method.params.len() + 1;
                    if stack.len() < argc {
                        return Err(VmError::StackUnderflow);
                    }
                    let frame = stack.split_off(stack.len() - argc);

                    self.depth += 1;
                    let result = self.run(instance, &method.body, method.ret, frame);
                    self.depth -= 1;

                    let result = result?;
                    if method.ret != Ty::Void {
                        stack.push(result);
                    }
                }
                Instr::CallBase => {
                    pop(&mut stack)?;
                }
                Instr::CallRuntime(rt) => self.runtime(*rt, &mut stack)?,
                Instr::NewRandom => stack.push(Value::Random),
                Instr::Pop => {
                    pop(&mut stack)?;
                }
                Instr::Ret => {
                    return if ret == Ty::Void {
                        Ok(Value::Void)
                    } else {
                        pop(&mut stack)
                    };
                }
            }
        }
    }

    fn runtime(&mut self, rt: Runtime, stack: &mut Vec<Value>) -> Result<()> {
        match rt {
            Runtime::Write(_) => {
                let v = pop(stack)?;
                self.console.write(&v.to_string());
            }
            Runtime::WriteLine(Some(_)) => {
                let v = pop(stack)?;
                self.console.write(&format!("{}\n", v));
            }
            Runtime::WriteLine(None) => self.console.write("\n"),
            Runtime::ReadLine => {
                let line = self.console.read_line();
                stack.push(line.map_or(Value::Null, |l| Value::Str(l.into())));
            }
            Runtime::ParseInt => {
                let v = pop(stack)?;
                let text = v.to_string();
                let n = text
                    .trim()
                    .parse()
                    .map_err(|_| VmError::Format(text.clone()))?;
                stack.push(Value::Int(n));
            }
            Runtime::RandomNext(argc) => {
                let mut bounds = [0, i32::MAX];
                for i in (0..argc as usize).rev() {
                    bounds[i + 2 - argc as usize] = match pop(stack)? {
                        Value::Int(v) => v,
                        v => {
                            return Err(VmError::InvalidOperands {
                                op: "draw a random number from",
                                left: v.type_name(),
                                right: "int",
                            })
                        }
                    };
                }
                pop(stack)?;
                stack.push(Value::Int(self.next_random(bounds[0], bounds[1])?));
            }
            Runtime::Concat => {
                let b = pop(stack)?;
                let a = pop(stack)?;
                stack.push(a.concat(b));
            }
        }
        Ok(())
    }

    /// Draws from `[min, max)`. Equal bounds yield `min`.
    fn next_random(&mut self, min: i32, max: i32) -> Result<i32> {
        match min.cmp(&max) {
            Ordering::Greater => Err(VmError::RandomRange { min, max }),
            Ordering::Equal => Ok(min),
            Ordering::Less => Ok(self.rng.gen_range(min..max)),
        }
    }
}

fn pop(stack: &mut Vec<Value>) -> Result<Value> {
    stack.pop().ok_or(VmError::StackUnderflow)
}

fn binary(stack: &mut Vec<Value>, f: impl FnOnce(Value, Value) -> Result<Value>) -> Result<()> {
    let b = pop(stack)?;
    let a = pop(stack)?;
    stack.push(f(a, b)?);
    Ok(())
}

fn compare(stack: &mut Vec<Value>, f: impl FnOnce(Option<Ordering>) -> bool) -> Result<()> {
    let b = pop(stack)?;
    let a = pop(stack)?;
    stack.push(Value::Bool(f(a.compare(&b)?)));
    Ok(())
}

fn target(body: &MethodBody, label: crate::codegen::Label) -> Result<usize> {
    body.target(label)
        .ok_or(VmError::InvalidSlot("label", label.0 as usize))
}

fn slot<'v>(values: &'v [Value], what: &'static str, i: usize) -> Result<&'v Value> {
    values.get(i).ok_or(VmError::InvalidSlot(what, i))
}

fn slot_mut<'v>(values: &'v mut [Value], what: &'static str, i: usize) -> Result<&'v mut Value> {
    values.get_mut(i).ok_or(VmError::InvalidSlot(what, i))
}
