// Macro preprocessor: expands mcro/endmcro blocks and writes the .am file.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};

use crate::assembler::{AsmError, AsmErrorKind, Diagnostic, Severity};
use crate::symbol_table::validate_label;

#[derive(Debug, Default)]
pub struct Preprocessor {
    macros: HashMap<String, Vec<String>>,
    diagnostics: Vec<Diagnostic>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expands `input` and writes the result next to it as `output`.
    /// Returns the expanded lines for the scan pass.
    pub fn process_file(&mut self, input: &str, output: &str) -> io::Result<Vec<String>> {
        let source = fs::read_to_string(input)?;
        let lines = self.process(&source);
        let mut out = File::create(output)?;
        for line in &lines {
            writeln!(out, "{line}")?;
        }
        Ok(lines)
    }

    /// Single pass: a macro must be defined before it is invoked.
    /// Errors are collected as diagnostics and the expansion continues so
    /// later lines still get checked.
    pub fn process(&mut self, source: &str) -> Vec<String> {
        let mut output = Vec::new();
        let mut current: Option<String> = None;
        let mut line_num: u32 = 0;

        for raw in source.lines() {
            line_num += 1;
            let line = strip_comment(raw.trim_end_matches('\r'));
            let mut words = line.split_whitespace();
            let first = words.next().unwrap_or("");

            match first {
                "mcro" => {
                    if current.is_some() {
                        self.error(line_num, "Nested macro definitions are not allowed", None);
                        continue;
                    }
                    let name = match words.next() {
                        Some(name) => name.to_string(),
                        None => {
                            self.error(line_num, "Macro definition is missing a name", None);
                            continue;
                        }
                    };
                    if words.next().is_some() {
                        self.error(line_num, "Unexpected text after macro name", Some(&name));
                        continue;
                    }
                    if let Err(msg) = validate_label(&name) {
                        self.error(line_num, msg, Some(&name));
                        continue;
                    }
                    if self.macros.contains_key(&name) {
                        self.error(line_num, "Macro defined more than once", Some(&name));
                    }
                    self.macros.insert(name.clone(), Vec::new());
                    current = Some(name);
                }
                "endmcro" => {
                    if words.next().is_some() {
                        self.error(line_num, "Unexpected text after endmcro", None);
                    }
                    if current.take().is_none() {
                        self.error(line_num, "endmcro without a matching mcro", None);
                    }
                }
                name if current.is_none() && self.macros.contains_key(name) => {
                    if words.next().is_some() {
                        self.error(line_num, "Unexpected text after macro invocation", Some(name));
                        continue;
                    }
                    output.extend(self.macros[name].iter().cloned());
                }
                _ => match &current {
                    Some(name) => {
                        if let Some(body) = self.macros.get_mut(name) {
                            body.push(line.to_string());
                        }
                    }
                    None => output.push(line.to_string()),
                },
            }
        }

        if let Some(name) = current {
            self.error(line_num, "Macro is never terminated", Some(&name));
        }
        output
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn error(&mut self, line: u32, msg: &str, param: Option<&str>) {
        self.diagnostics.push(Diagnostic::new(
            line,
            Severity::Error,
            AsmError::new(AsmErrorKind::Preprocess, msg, param),
        ));
    }
}

// A ';' inside a quoted string is data, not a comment.
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (i, b) in line.bytes().enumerate() {
        match b {
            b'"' => in_string = !in_string,
            b';' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}
