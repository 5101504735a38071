use super::{Generator, Instr, Runtime};
use crate::{
    err::{CompileError, Result},
    parse::ast::{Builtin, MethodCall, Ty},
};

impl<'a> Generator<'a> {
    /// Fixed instruction sequences for the built-in methods. Arity was
    /// checked by the parser.
    pub(super) fn builtin(&mut self, builtin: Builtin, call: &MethodCall) -> Result<Ty> {
        match builtin {
            Builtin::Print => {
                let ty = self.printable(call)?;
                self.emit(Instr::CallRuntime(Runtime::Write(ty.unwrap_or(Ty::Str))))?;
            }
            Builtin::PrintLine => {
                let ty = self.printable(call)?;
                self.emit(Instr::CallRuntime(Runtime::WriteLine(ty)))?;
            }
            Builtin::ReadLine => self.emit(Instr::CallRuntime(Runtime::ReadLine))?,
            Builtin::ReadInt => {
                self.emit(Instr::CallRuntime(Runtime::ReadLine))?;
                self.emit(Instr::CallRuntime(Runtime::ParseInt))?;
            }
            Builtin::RandomInt => {
                self.emit(Instr::NewRandom)?;
                for arg in &call.args {
                    let ty = self.expr(arg)?;
                    if ty != Ty::Int {
                        return Err(CompileError::TypeMismatch {
                            expected: Ty::Int,
                            found: ty,
                            context: "argument of `RandomInt`".into(),
                        });
                    }
                }
                self.emit(Instr::CallRuntime(Runtime::RandomNext(call.args.len() as u8)))?;
            }
        }
        Ok(builtin.ret())
    }

    /// Pushes the optional argument of a print call. `object` values are
    /// printed as strings.
    fn printable(&mut self, call: &MethodCall) -> Result<Option<Ty>> {
        let arg = match call.args.first() {
            Some(arg) => arg,
            None => return Ok(None),
        };

        match self.expr(arg)? {
            Ty::Void => Err(CompileError::VoidNotAllowed {
                what: format!("argument of `{}`", call.name),
                span: Some(call.span),
            }),
            Ty::Object => Ok(Some(Ty::Str)),
            ty => Ok(Some(ty)),
        }
    }
}
