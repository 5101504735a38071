use crate::{
    parse::ast::{Lit, Ty},
    symbol::Symbol,
};
use std::{fmt, rc::Rc};

/// A branch target inside one method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(pub u32);

/// Host services the generated code calls into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Runtime {
    Write(Ty),
    WriteLine(Option<Ty>),
    ReadLine,
    ParseInt,
    /// `Random.Next` with this many arguments.
    RandomNext(u8),
    Concat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    LdArg(u16),
    StArg(u16),
    LdLoc(u16),
    StLoc(u16),
    LdFld(usize),
    StFld(usize),
    LdcI4(i32),
    LdStr(Rc<str>),
    /// Any constant that has no dedicated load instruction.
    LdConst(Lit),

    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Ceq,
    Cgt,
    Clt,
    Not,

    Br(Label),
    BrTrue(Label),
    BrFalse(Label),
    Beq(Label),
    BneUn(Label),
    Bgt(Label),
    Bge(Label),
    Blt(Label),
    Ble(Label),

    /// Index into [`ClassType::methods`].
    Call(usize),
    CallBase,
    CallRuntime(Runtime),
    NewRandom,
    Pop,
    Ret,
}

impl Instr {
    pub fn label(&self) -> Option<Label> {
        use Instr::*;
        match *self {
            Br(l) | BrTrue(l) | BrFalse(l) | Beq(l) | BneUn(l) | Bgt(l) | Bge(l) | Blt(l)
            | Ble(l) => Some(l),
            _ => None,
        }
    }

    fn mnemonic(&self) -> &'static str {
        use Instr::*;
        match self {
            LdArg(_) => "ldarg",
            StArg(_) => "starg",
            LdLoc(_) => "ldloc",
            StLoc(_) => "stloc",
            LdFld(_) => "ldfld",
            StFld(_) => "stfld",
            LdcI4(_) => "ldc.i4",
            LdStr(_) => "ldstr",
            LdConst(_) => "ldconst",
            Add => "add",
            Sub => "sub",
            Mul => "mul",
            Div => "div",
            Rem => "rem",
            And => "and",
            Or => "or",
            Xor => "xor",
            Ceq => "ceq",
            Cgt => "cgt",
            Clt => "clt",
            Not => "not",
            Br(_) => "br",
            BrTrue(_) => "brtrue",
            BrFalse(_) => "brfalse",
            Beq(_) => "beq",
            BneUn(_) => "bne.un",
            Bgt(_) => "bgt",
            Bge(_) => "bge",
            Blt(_) => "blt",
            Ble(_) => "ble",
            Call(_) => "call",
            CallBase => "call",
            CallRuntime(_) => "call",
            NewRandom => "newobj",
            Pop => "pop",
            Ret => "ret",
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instr::*;
        let name = self.mnemonic();
        match self {
            LdArg(n) | StArg(n) | LdLoc(n) | StLoc(n) => write!(f, "{}.{}", name, n),
            LdFld(n) | StFld(n) => write!(f, "{} #{}", name, n),
            LdcI4(v) => write!(f, "{} {}", name, v),
            LdStr(s) => write!(f, "{} {:?}", name, s),
            LdConst(lit) => write!(f, "{} {} {}", name, lit.ty(), lit),
            Call(id) => write!(f, "{} method #{}", name, id),
            CallBase => write!(f, "{} object::.ctor", name),
            CallRuntime(rt) => write!(f, "{} {}", name, rt),
            NewRandom => write!(f, "{} Random::.ctor", name),
            _ => match self.label() {
                Some(Label(l)) => write!(f, "{} L{}", name, l),
                None => f.write_str(name),
            },
        }
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Runtime::Write(ty) => write!(f, "Console::Write({})", ty),
            Runtime::WriteLine(Some(ty)) => write!(f, "Console::WriteLine({})", ty),
            Runtime::WriteLine(None) => write!(f, "Console::WriteLine()"),
            Runtime::ReadLine => write!(f, "Console::ReadLine()"),
            Runtime::ParseInt => write!(f, "Int32::Parse(string)"),
            Runtime::RandomNext(0) => write!(f, "Random::Next()"),
            Runtime::RandomNext(1) => write!(f, "Random::Next(int)"),
            Runtime::RandomNext(_) => write!(f, "Random::Next(int, int)"),
            Runtime::Concat => write!(f, "String::Concat(string, string)"),
        }
    }
}

/// Finished instructions of one method, with every label resolved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MethodBody {
    pub code: Vec<Instr>,
    /// Instruction offset of each label.
    pub labels: Vec<usize>,
    pub locals: Vec<Ty>,
}

impl MethodBody {
    pub fn target(&self, label: Label) -> Option<usize> {
        self.labels.get(label.0 as usize).copied()
    }
}

impl fmt::Display for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.locals.is_empty() {
            let locals: Vec<_> = self.locals.iter().map(Ty::to_string).collect();
            writeln!(f, "    .locals ({})", locals.join(", "))?;
        }
        for (offset, instr) in self.code.iter().enumerate() {
            match instr.label().and_then(|l| self.target(l)) {
                Some(target) => {
                    writeln!(f, "    IL_{:04}: {} IL_{:04}", offset, instr.mnemonic(), target)?
                }
                None => writeln!(f, "    IL_{:04}: {}", offset, instr)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: Symbol,
    pub ty: Ty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    pub name: Symbol,
    pub ret: Ty,
    pub params: Vec<Ty>,
    pub body: MethodBody,
}

/// A constructible type: fields, a parameterless constructor and methods.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassType {
    pub name: Symbol,
    pub fields: Vec<FieldDef>,
    pub ctor: MethodBody,
    pub methods: Vec<MethodDef>,
}

impl ClassType {
    pub fn method(&self, name: &str) -> Option<(usize, &MethodDef)> {
        self.methods
            .iter()
            .enumerate()
            .find(|(_, m)| m.name.is(name))
    }
}

/// Disassembly listing.
impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, ".class {}", self.name)?;
        for (i, field) in self.fields.iter().enumerate() {
            writeln!(f, "  .field #{} {} {}", i, field.ty, field.name)?;
        }
        writeln!(f, "  .method void .ctor()")?;
        write!(f, "{}", self.ctor)?;
        for (i, method) in self.methods.iter().enumerate() {
            let params: Vec<_> = method.params.iter().map(Ty::to_string).collect();
            writeln!(
                f,
                "  .method #{} {} {}({})",
                i,
                method.ret,
                method.name,
                params.join(", ")
            )?;
            write!(f, "{}", method.body)?;
        }
        Ok(())
    }
}
