use classc::{Args, Compiler};
use rustyline::Editor;
use std::{fs, path::PathBuf, process};

fn main() {
    env_logger::init();
    let args = Args::new();
    let options = args.options();
    let mut c = Compiler::new(options);

    if let Some(file_name) = args.file_name {
        run_file(&mut c, file_name);
    } else {
        run_prompt(&mut c);
    }
}

fn run_file(c: &mut Compiler, file_name: PathBuf) {
    let source = match fs::read_to_string(&file_name) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("cannot read {}: {}", file_name.display(), e);
            process::exit(1);
        }
    };

    if let Err(e) = c.run(source) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run_prompt(c: &mut Compiler) {
    let mut editor = Editor::<()>::new();
    while let Ok(line) = editor.readline("$ ") {
        editor.add_history_entry(line.as_str());
        if let Err(e) = c.run(line) {
            eprintln!("{}", e);
        }
    }
}
