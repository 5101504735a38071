use crate::Options;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(name = "classc", about = "Compiles and runs a single-class program")]
pub struct Args {
    #[structopt(name = "FILE_NAME")]
    pub file_name: Option<PathBuf>,

    /// Method invoked after the class is constructed
    #[structopt(short, long, default_value = "Main")]
    pub entry: String,

    /// Print the parsed class back as source
    #[structopt(long)]
    pub dump_ast: bool,

    /// Print the generated instruction listing
    #[structopt(long)]
    pub dump_il: bool,

    /// Arguments passed to the entry method
    #[structopt(name = "ARGS", last = true)]
    pub args: Vec<String>,
}

impl Default for Args {
    fn default() -> Self {
        Self::new()
    }
}

impl Args {
    pub fn new() -> Self {
        Self::from_args()
    }

    pub fn options(&self) -> Options {
        Options {
            entry: self.entry.clone(),
            dump_ast: self.dump_ast,
            dump_il: self.dump_il,
            args: self.args.clone(),
        }
    }
}
