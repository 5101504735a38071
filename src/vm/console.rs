use std::{
    collections::VecDeque,
    io::{self, BufRead, Write},
};

/// Where `Print` writes to and `ReadLine` reads from.
pub trait Console {
    fn write(&mut self, text: &str);

    /// The next input line without its terminator, `None` at end of input.
    fn read_line(&mut self) -> Option<String>;
}

/// The process's standard streams.
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn write(&mut self, text: &str) {
        let mut out = io::stdout();
        if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
            log::warn!("failed to write to stdout: {}", e);
        }
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()),
            Err(e) => {
                log::warn!("failed to read from stdin: {}", e);
                None
            }
        }
    }
}

/// In-memory console for tests and embedding.
#[derive(Debug, Default)]
pub struct BufferConsole {
    pub output: String,
    input: VecDeque<String>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(lines: &[&str]) -> Self {
        Self {
            output: String::new(),
            input: lines.iter().map(|l| l.to_string()).collect(),
        }
    }
}

impl Console for BufferConsole {
    fn write(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn read_line(&mut self) -> Option<String> {
        self.input.pop_front()
    }
}
