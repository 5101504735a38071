#[macro_use]
extern crate anyhow;

use self::{
    codegen::ClassType,
    err::Handler,
    parse::ast::{Lit, Ty},
    vm::{StdConsole, Value, Vm},
};
use std::rc::Rc;

pub mod codegen;
pub mod err;
pub mod lex;
pub mod parse;
pub mod print;
pub mod symbol;
mod util;
pub mod vm;

pub use util::Args;

#[derive(Debug, Clone)]
pub struct Options {
    /// Method invoked after construction.
    pub entry: String,
    pub dump_ast: bool,
    pub dump_il: bool,
    /// Arguments for the entry method, converted to its parameter types.
    pub args: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            entry: "Main".into(),
            dump_ast: false,
            dump_il: false,
            args: vec![],
        }
    }
}

#[derive(Default)]
pub struct Compiler {
    options: Options,
}

impl Compiler {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn compile(&self, src: &str) -> err::Result<ClassType> {
        let object = parse::parse(src)?;
        codegen::generate(&object)
    }

    /// Compiles `src`, then constructs the class and invokes the entry
    /// method. Diagnostics are printed against the source.
    pub fn run(&mut self, src: String) -> anyhow::Result<()> {
        let src: Rc<str> = src.into();
        let handler = Handler::new(&src);

        let object = parse::parse(&src).map_err(|e| {
            handler.report(&e);
            anyhow!("{:?} error", e.kind())
        })?;
        if self.options.dump_ast {
            print!("{}", print::to_source(&object));
        }

        let class = codegen::generate(&object).map_err(|e| {
            handler.report(&e);
            anyhow!("{:?} error", e.kind())
        })?;
        if self.options.dump_il {
            print!("{}", class);
        }

        let entry = &self.options.entry;
        let params = match class.method(entry) {
            Some((_, method)) => method.params.clone(),
            None => {
                log::info!("`{}` has no `{}` method, nothing to run", class.name, entry);
                return Ok(());
            }
        };
        let args = convert_args(entry, &params, &self.options.args)?;

        let mut vm = Vm::new(&class, StdConsole);
        let mut instance = vm.instantiate()?;
        let result = vm.invoke(&mut instance, entry, args)?;
        if result != Value::Void {
            println!("{}", result);
        }
        Ok(())
    }
}

fn convert_args(entry: &str, params: &[Ty], args: &[String]) -> anyhow::Result<Vec<Value>> {
    ensure!(
        params.len() == args.len(),
        "`{}` takes {} argument(s) but {} were supplied",
        entry,
        params.len(),
        args.len()
    );

    params
        .iter()
        .zip(args)
        .map(|(&ty, arg)| -> anyhow::Result<Value> {
            let lit = match ty {
                Ty::Object => Lit::infer(arg).unwrap_or_else(|| Lit::Str(arg.as_str().into())),
                ty => Lit::parse(arg, ty).ok_or_else(|| anyhow!("`{}` is not a valid {}", arg, ty))?,
            };
            Ok(Value::from(lit))
        })
        .collect()
}
