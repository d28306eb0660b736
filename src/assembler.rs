// Assembler core: per-line processing, encoding and the file pipeline.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};

use crate::imagestore::{
    resolve, ArePolicy, ImageStore, MachineWord, OutputOptions, ResolvedImage, BASE_ADDRESS,
};
use crate::instructions::{
    dest_mode_allowed, source_mode_allowed, OperandCount, MODE_DIRECT, MODE_IMMEDIATE, MODE_NONE,
    MODE_REGISTER,
};
use crate::preprocess::Preprocessor;
use crate::scanner::{Scanner, TokenType};
use crate::symbol_table::{SymbolTable, SymbolTableResult};

const VERSION: &str = "0.3.0";
const LONG_ABOUT: &str = "Assembler for a 12-bit, 1024-word teaching machine.

Each input file is macro-expanded to a sibling .am file and assembled.
A clean run writes <base>.obj next to the source, plus <base>.ent and
<base>.ext when the program declares entry labels or references
externals. Any error suppresses all three artifacts for that file.";

#[derive(Parser, Debug)]
#[command(
    name = "forge12",
    version = VERSION,
    about = "Assembler for a 12-bit, 1024-word teaching machine",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    #[arg(
        value_name = "FILE",
        required = true,
        help = "Input assembly files; must end with .as"
    )]
    pub infiles: Vec<PathBuf>,
    #[arg(
        long,
        value_name = "ADDR",
        default_value_t = BASE_ADDRESS,
        long_help = "Load base address applied to emitted code and data addresses."
    )]
    pub base: u16,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        long_help = "Keep raw instruction/data counter values instead of offsetting by the load base."
    )]
    pub raw: bool,
    #[arg(
        long = "relocation-info",
        action = ArgAction::SetTrue,
        long_help = "Tag relocatable and external operand words in the A,R,E field instead of emitting everything absolute."
    )]
    pub relocation_info: bool,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        long_help = "Emit diagnostics as JSON lines on stdout."
    )]
    pub json: bool,
}

impl Cli {
    pub fn output_options(&self) -> OutputOptions {
        OutputOptions {
            base_address: if self.raw { 0 } else { self.base },
            are_policy: if self.relocation_info {
                ArePolicy::Relocation
            } else {
                ArePolicy::Absolute
            },
        }
    }
}

pub fn run(cli: &Cli) -> Result<Vec<AsmRunReport>, AsmRunError> {
    if cli.infiles.is_empty() {
        return Err(AsmRunError::new(AsmError::new(
            AsmErrorKind::Cli,
            "No input files specified",
            None,
        )));
    }

    let options = cli.output_options();
    let mut reports = Vec::new();
    for path in &cli.infiles {
        reports.push(run_one(path, &options));
    }
    Ok(reports)
}

/// Drives one source file through preprocess, scan and resolution.
/// Everything is reported through the returned per-file report; only the
/// run-level argument check above is fatal.
fn run_one(path: &Path, options: &OutputOptions) -> AsmRunReport {
    let file = path.to_string_lossy().to_string();
    let mut report = AsmRunReport::new(&file);

    let base = match file.strip_suffix(".as") {
        Some(base) if !base.is_empty() => base.to_string(),
        _ => {
            report.diagnostics.push(Diagnostic::new(
                0,
                Severity::Warning,
                AsmError::new(
                    AsmErrorKind::Cli,
                    "Skipping file without the .as extension",
                    Some(&file),
                ),
            ));
            return report;
        }
    };

    let mut pp = Preprocessor::new();
    let lines = match pp.process_file(&file, &format!("{base}.am")) {
        Ok(lines) => lines,
        Err(err) => {
            report.diagnostics.push(Diagnostic::new(
                0,
                Severity::Error,
                AsmError::new(AsmErrorKind::Io, &err.to_string(), Some(&file)),
            ));
            return report;
        }
    };
    report.diagnostics.extend(
        pp.take_diagnostics()
            .into_iter()
            .map(|d| d.with_file(Some(file.clone()))),
    );

    let mut assembler = Assembler::new(*options);
    assembler.assemble(&lines);
    let resolved = assembler.finish();
    report.ic = assembler.image().ic();
    report.dc = assembler.image().dc();
    report.diagnostics.extend(
        assembler
            .take_diagnostics()
            .into_iter()
            .map(|d| d.with_file(Some(file.clone()))),
    );

    if report.error_count() > 0 {
        return report;
    }
    let resolved = match resolved {
        Some(resolved) => resolved,
        None => return report,
    };

    let obj_path = format!("{base}.obj");
    match write_artifact(&obj_path, |out| resolved.write_object(out)) {
        Ok(()) => report.artifacts.push(obj_path),
        Err(err) => report
            .diagnostics
            .push(Diagnostic::new(0, Severity::Error, err)),
    }
    if resolved.has_entries() {
        let ent_path = format!("{base}.ent");
        match write_artifact(&ent_path, |out| resolved.write_entries(out)) {
            Ok(()) => report.artifacts.push(ent_path),
            Err(err) => report
                .diagnostics
                .push(Diagnostic::new(0, Severity::Error, err)),
        }
    }
    if resolved.has_externals() {
        let ext_path = format!("{base}.ext");
        match write_artifact(&ext_path, |out| resolved.write_externals(out)) {
            Ok(()) => report.artifacts.push(ext_path),
            Err(err) => report
                .diagnostics
                .push(Diagnostic::new(0, Severity::Error, err)),
        }
    }

    report
}

fn write_artifact(
    path: &str,
    write: impl FnOnce(&mut File) -> io::Result<()>,
) -> Result<(), AsmError> {
    let mut file = File::create(path)
        .map_err(|_| AsmError::new(AsmErrorKind::Io, "Error opening file for write", Some(path)))?;
    write(&mut file).map_err(|err| AsmError::new(AsmErrorKind::Io, &err.to_string(), Some(path)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsmErrorKind {
    Cli,
    Directive,
    Instruction,
    Io,
    Label,
    Memory,
    Preprocess,
    Scanner,
}

#[derive(Debug, Clone)]
pub struct AsmError {
    kind: AsmErrorKind,
    message: String,
}

impl AsmError {
    pub fn new(kind: AsmErrorKind, msg: &str, param: Option<&str>) -> Self {
        Self {
            kind,
            message: format_error(msg, param),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> AsmErrorKind {
        self.kind
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AsmError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    line: u32,
    severity: Severity,
    error: AsmError,
    file: Option<String>,
}

impl Diagnostic {
    pub fn new(line: u32, severity: Severity, error: AsmError) -> Self {
        Self {
            line,
            severity,
            error,
            file: None,
        }
    }

    pub fn with_file(mut self, file: Option<String>) -> Self {
        self.file = file;
        self
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        self.error.message()
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// One-line form for terminal output. Line 0 marks file-level
    /// diagnostics with no source position.
    pub fn format(&self) -> String {
        let sev = match self.severity {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        match (&self.file, self.line) {
            (Some(file), 0) => format!("{file}: {sev} - {}", self.error.message()),
            (Some(file), line) => format!("{file}:{line}: {sev} - {}", self.error.message()),
            (None, 0) => format!("{sev} - {}", self.error.message()),
            (None, line) => format!("{line}: {sev} - {}", self.error.message()),
        }
    }
}

/// Outcome of one input file: its diagnostics, final counters and the
/// artifacts written on a clean run.
#[derive(Debug)]
pub struct AsmRunReport {
    file: String,
    diagnostics: Vec<Diagnostic>,
    ic: u16,
    dc: u16,
    artifacts: Vec<String>,
}

impl AsmRunReport {
    fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            diagnostics: Vec::new(),
            ic: 0,
            dc: 0,
            artifacts: Vec::new(),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn counts(&self) -> (u16, u16) {
        (self.ic, self.dc)
    }

    pub fn artifacts(&self) -> &[String] {
        &self.artifacts
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }
}

#[derive(Debug)]
pub struct AsmRunError {
    error: AsmError,
}

impl AsmRunError {
    fn new(error: AsmError) -> Self {
        Self { error }
    }
}

impl fmt::Display for AsmRunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for AsmRunError {}

/// One scan pass over the expanded source, then a single resolution step
/// against the finished symbol table. Diagnostics accumulate; scanning
/// never stops at an error.
#[derive(Debug)]
pub struct Assembler {
    symbols: SymbolTable,
    image: ImageStore,
    diagnostics: Vec<Diagnostic>,
    options: OutputOptions,
}

impl Assembler {
    pub fn new(options: OutputOptions) -> Self {
        Self {
            symbols: SymbolTable::new(),
            image: ImageStore::new(),
            diagnostics: Vec::new(),
            options,
        }
    }

    pub fn assemble(&mut self, lines: &[String]) {
        let diagnostics = &mut self.diagnostics;
        let mut asm_line = AsmLine::new(&mut self.symbols, &mut self.image);
        let mut line_num: u32 = 1;

        for src in lines {
            let status = asm_line.process(src, line_num);
            if status == LineStatus::Failed {
                if let Some(err) = asm_line.error() {
                    diagnostics.push(Diagnostic::new(line_num, Severity::Error, err.clone()));
                }
            }
            line_num += 1;
        }
    }

    /// Relocates the symbol table and binds deferred references. None
    /// when any error was diagnosed; resolution errors are appended to
    /// the diagnostics.
    pub fn finish(&mut self) -> Option<ResolvedImage> {
        if self.has_errors() {
            return None;
        }
        let final_ic = self.image.ic();
        self.symbols.relocate(final_ic, self.options.base_address);
        match resolve(&self.image, &self.symbols, &self.options) {
            Ok(resolved) => Some(resolved),
            Err(errors) => {
                self.diagnostics.extend(errors);
                None
            }
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn image(&self) -> &ImageStore {
        &self.image
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineStatus {
    Ok,
    Empty,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Immediate(i16),
    Direct(String),
    Register(u8),
}

impl Operand {
    fn mode(&self) -> u8 {
        match self {
            Operand::Immediate(_) => MODE_IMMEDIATE,
            Operand::Direct(_) => MODE_DIRECT,
            Operand::Register(_) => MODE_REGISTER,
        }
    }
}

struct AsmLine<'a> {
    symbols: &'a mut SymbolTable,
    image: &'a mut ImageStore,
    scanner: Scanner,
    line_num: u32,
    last_error: Option<AsmError>,
}

impl<'a> AsmLine<'a> {
    fn new(symbols: &'a mut SymbolTable, image: &'a mut ImageStore) -> Self {
        Self {
            symbols,
            image,
            scanner: Scanner::new(),
            line_num: 0,
            last_error: None,
        }
    }

    fn error(&self) -> Option<&AsmError> {
        self.last_error.as_ref()
    }

    fn process(&mut self, line: &str, line_num: u32) -> LineStatus {
        self.line_num = line_num;
        self.last_error = None;

        let mut t = self.scanner.init(line);
        if t == TokenType::Error {
            return self.scan_failure();
        }
        if t == TokenType::EndOfLine {
            return LineStatus::Empty;
        }

        let mut label: Option<String> = None;
        if t == TokenType::LabelDecl {
            label = Some(self.scanner.get_text().to_string());
            t = self.scanner.next_token();
            if t == TokenType::Error {
                return self.scan_failure();
            }
        }

        match t {
            TokenType::Directive => {
                let name = self.scanner.get_text().to_string();
                self.process_directive(&name, label)
            }
            TokenType::TwoOperandOp | TokenType::OneOperandOp | TokenType::NoOperandOp => {
                let opcode = self.scanner.get_value() as u8;
                let mnemonic = self.scanner.get_text().to_string();
                let count = match t {
                    TokenType::TwoOperandOp => OperandCount::Two,
                    TokenType::OneOperandOp => OperandCount::One,
                    _ => OperandCount::None,
                };
                if let Some(name) = &label {
                    if !self.define_label(name, false) {
                        return LineStatus::Failed;
                    }
                }
                self.process_instruction(opcode, count, &mnemonic)
            }
            TokenType::EndOfLine => self.failure(
                AsmErrorKind::Label,
                "Label is not attached to a statement",
                label.as_deref(),
            ),
            TokenType::Label => {
                let text = self.scanner.get_text().to_string();
                self.failure(AsmErrorKind::Instruction, "Unknown mnemonic", Some(&text))
            }
            _ => {
                let text = self.scanner.get_text().to_string();
                self.failure(
                    AsmErrorKind::Instruction,
                    "Statement must begin with a label, mnemonic, or directive",
                    Some(&text),
                )
            }
        }
    }

    fn process_directive(&mut self, name: &str, label: Option<String>) -> LineStatus {
        match name {
            ".data" => {
                if let Some(name) = &label {
                    if !self.define_label(name, true) {
                        return LineStatus::Failed;
                    }
                }
                self.data_directive()
            }
            ".string" => {
                if let Some(name) = &label {
                    if !self.define_label(name, true) {
                        return LineStatus::Failed;
                    }
                }
                self.string_directive()
            }
            ".entry" | ".extern" => {
                if label.is_some() {
                    return self.failure(
                        AsmErrorKind::Directive,
                        "A label may not precede this directive",
                        Some(name),
                    );
                }
                self.mark_directive(name)
            }
            _ => self.failure(AsmErrorKind::Directive, "Unknown directive", Some(name)),
        }
    }

    fn data_directive(&mut self) -> LineStatus {
        let mut count = 0usize;
        let mut expect_value = true;
        loop {
            match self.scanner.next_token() {
                TokenType::EndOfLine => break,
                TokenType::Comma => {
                    if expect_value {
                        return self.failure(AsmErrorKind::Directive, "Illegal comma in '.data'", None);
                    }
                    expect_value = true;
                }
                TokenType::Number => {
                    if !expect_value {
                        return self.failure(
                            AsmErrorKind::Directive,
                            "Missing comma between '.data' values",
                            None,
                        );
                    }
                    let value = self.scanner.get_value() as i16;
                    let word = MachineWord::Data {
                        value,
                        line: self.line_num,
                    };
                    if !self.image.push_data(word) {
                        return self.overflow_failure();
                    }
                    count += 1;
                    expect_value = false;
                }
                TokenType::Error => return self.scan_failure(),
                _ => {
                    let text = self.scanner.get_text().to_string();
                    return self.failure(
                        AsmErrorKind::Directive,
                        "'.data' accepts only numbers",
                        Some(&text),
                    );
                }
            }
        }
        if count == 0 {
            return self.failure(
                AsmErrorKind::Directive,
                "'.data' expects at least one value",
                None,
            );
        }
        if expect_value {
            return self.failure(AsmErrorKind::Directive, "Trailing comma in '.data'", None);
        }
        LineStatus::Ok
    }

    fn string_directive(&mut self) -> LineStatus {
        let t = self.scanner.next_token();
        if t == TokenType::Error {
            return self.scan_failure();
        }
        if t != TokenType::StringData {
            let text = self.scanner.get_text().to_string();
            return self.failure(
                AsmErrorKind::Directive,
                "'.string' expects a quoted string",
                Some(&text),
            );
        }
        let text = self.scanner.get_text().to_string();
        let bytes = text.as_bytes();
        if bytes.len() < 2 || bytes[0] != b'"' || bytes[bytes.len() - 1] != b'"' {
            return self.failure(
                AsmErrorKind::Directive,
                "String must be enclosed in double quotes",
                Some(&text),
            );
        }

        let t = self.scanner.next_token();
        if t == TokenType::Error {
            return self.scan_failure();
        }
        if t != TokenType::EndOfLine {
            let extra = self.scanner.get_text().to_string();
            return self.failure(
                AsmErrorKind::Directive,
                "Unexpected token after string",
                Some(&extra),
            );
        }

        for &b in &bytes[1..bytes.len() - 1] {
            let word = MachineWord::Data {
                value: b as i16,
                line: self.line_num,
            };
            if !self.image.push_data(word) {
                return self.overflow_failure();
            }
        }
        // Zero terminator.
        let word = MachineWord::Data {
            value: 0,
            line: self.line_num,
        };
        if !self.image.push_data(word) {
            return self.overflow_failure();
        }
        LineStatus::Ok
    }

    fn mark_directive(&mut self, directive: &str) -> LineStatus {
        let t = self.scanner.next_token();
        if t == TokenType::Error {
            return self.scan_failure();
        }
        if t != TokenType::Label {
            return self.failure(
                AsmErrorKind::Directive,
                "Expecting a label name after",
                Some(directive),
            );
        }
        let name = self.scanner.get_text().to_string();
        let t = self.scanner.next_token();
        if t == TokenType::Error {
            return self.scan_failure();
        }
        if t != TokenType::EndOfLine {
            return self.failure(
                AsmErrorKind::Directive,
                "Takes exactly one label",
                Some(directive),
            );
        }

        let result = if directive == ".extern" {
            self.symbols.mark_external(&name, self.line_num)
        } else {
            self.symbols.mark_entry(&name, self.line_num)
        };
        match result {
            SymbolTableResult::Ok => LineStatus::Ok,
            SymbolTableResult::Duplicate => self.failure(
                AsmErrorKind::Label,
                "External label is defined in this file",
                Some(&name),
            ),
            SymbolTableResult::EntryExternConflict => self.failure(
                AsmErrorKind::Label,
                "Label cannot be both entry and external",
                Some(&name),
            ),
        }
    }

    fn process_instruction(
        &mut self,
        opcode: u8,
        count: OperandCount,
        mnemonic: &str,
    ) -> LineStatus {
        let operands = match self.collect_operands() {
            Ok(operands) => operands,
            Err(status) => return status,
        };

        match count {
            OperandCount::Two => {
                if operands.len() != 2 {
                    return self.failure(
                        AsmErrorKind::Instruction,
                        "Instruction takes two operands",
                        Some(mnemonic),
                    );
                }
                self.encode_two(opcode, mnemonic, &operands[0], &operands[1])
            }
            OperandCount::One => {
                if operands.len() != 1 {
                    return self.failure(
                        AsmErrorKind::Instruction,
                        "Instruction takes one operand",
                        Some(mnemonic),
                    );
                }
                self.encode_one(opcode, mnemonic, &operands[0])
            }
            OperandCount::None => {
                if !operands.is_empty() {
                    return self.failure(
                        AsmErrorKind::Instruction,
                        "Instruction takes no operands",
                        Some(mnemonic),
                    );
                }
                let first = MachineWord::First {
                    are: 0,
                    dst_mode: MODE_NONE,
                    src_mode: MODE_NONE,
                    opcode,
                };
                if !self.image.push_code(first) {
                    return self.overflow_failure();
                }
                LineStatus::Ok
            }
        }
    }

    /// Collects operands up to end of line with strict comma discipline:
    /// exactly one comma between adjacent operands, none anywhere else.
    fn collect_operands(&mut self) -> Result<Vec<Operand>, LineStatus> {
        let mut operands = Vec::new();
        let mut expect_operand = true;
        loop {
            match self.scanner.next_token() {
                TokenType::EndOfLine => break,
                TokenType::Comma => {
                    if expect_operand {
                        return Err(self.failure(AsmErrorKind::Instruction, "Illegal comma", None));
                    }
                    expect_operand = true;
                }
                TokenType::Number => {
                    if !expect_operand {
                        return Err(self.missing_comma());
                    }
                    operands.push(Operand::Immediate(self.scanner.get_value() as i16));
                    expect_operand = false;
                }
                TokenType::Register => {
                    if !expect_operand {
                        return Err(self.missing_comma());
                    }
                    operands.push(Operand::Register(self.scanner.get_value() as u8));
                    expect_operand = false;
                }
                TokenType::Label => {
                    if !expect_operand {
                        return Err(self.missing_comma());
                    }
                    operands.push(Operand::Direct(self.scanner.get_text().to_string()));
                    expect_operand = false;
                }
                TokenType::Error => return Err(self.scan_failure()),
                _ => {
                    let text = self.scanner.get_text().to_string();
                    return Err(self.failure(
                        AsmErrorKind::Instruction,
                        "Invalid operand",
                        Some(&text),
                    ));
                }
            }
        }
        if expect_operand && !operands.is_empty() {
            return Err(self.failure(AsmErrorKind::Instruction, "Trailing comma", None));
        }
        Ok(operands)
    }

    fn encode_two(
        &mut self,
        opcode: u8,
        mnemonic: &str,
        src: &Operand,
        dst: &Operand,
    ) -> LineStatus {
        let src_mode = src.mode();
        let dst_mode = dst.mode();
        if !source_mode_allowed(opcode, src_mode) {
            return self.failure(
                AsmErrorKind::Instruction,
                "Illegal source addressing mode for",
                Some(mnemonic),
            );
        }
        if !dest_mode_allowed(opcode, dst_mode) {
            return self.failure(
                AsmErrorKind::Instruction,
                "Illegal destination addressing mode for",
                Some(mnemonic),
            );
        }

        // Two register operands share a single word; the first word marks
        // only the destination field.
        if let (Operand::Register(src_reg), Operand::Register(dst_reg)) = (src, dst) {
            let first = MachineWord::First {
                are: 0,
                dst_mode: MODE_REGISTER,
                src_mode: MODE_NONE,
                opcode,
            };
            let pair = MachineWord::Registers {
                are: 0,
                dst_reg: *dst_reg,
                src_reg: *src_reg,
            };
            if !self.image.push_code(first) || !self.image.push_code(pair) {
                return self.overflow_failure();
            }
            return LineStatus::Ok;
        }

        let first = MachineWord::First {
            are: 0,
            dst_mode,
            src_mode,
            opcode,
        };
        if !self.image.push_code(first) {
            return self.overflow_failure();
        }
        if let Err(status) = self.emit_operand(src, true) {
            return status;
        }
        if let Err(status) = self.emit_operand(dst, false) {
            return status;
        }
        LineStatus::Ok
    }

    fn encode_one(&mut self, opcode: u8, mnemonic: &str, dst: &Operand) -> LineStatus {
        let dst_mode = dst.mode();
        if !dest_mode_allowed(opcode, dst_mode) {
            return self.failure(
                AsmErrorKind::Instruction,
                "Illegal destination addressing mode for",
                Some(mnemonic),
            );
        }
        let first = MachineWord::First {
            are: 0,
            dst_mode,
            src_mode: MODE_NONE,
            opcode,
        };
        if !self.image.push_code(first) {
            return self.overflow_failure();
        }
        if let Err(status) = self.emit_operand(dst, false) {
            return status;
        }
        LineStatus::Ok
    }

    fn emit_operand(&mut self, operand: &Operand, is_source: bool) -> Result<(), LineStatus> {
        let word = match operand {
            Operand::Immediate(value) => MachineWord::Operand {
                are: 0,
                value: *value,
            },
            Operand::Direct(label) => MachineWord::DirectRef {
                label: label.clone(),
                line: self.line_num,
            },
            Operand::Register(reg) => MachineWord::Registers {
                are: 0,
                dst_reg: if is_source { 0 } else { *reg },
                src_reg: if is_source { *reg } else { 0 },
            },
        };
        if self.image.push_code(word) {
            Ok(())
        } else {
            Err(self.overflow_failure())
        }
    }

    fn define_label(&mut self, name: &str, is_data: bool) -> bool {
        let addr = if is_data {
            self.image.dc()
        } else {
            self.image.ic()
        };
        match self.symbols.define(name, addr, is_data, self.line_num) {
            SymbolTableResult::Ok => true,
            _ => {
                self.failure(
                    AsmErrorKind::Label,
                    "Label defined more than once",
                    Some(name),
                );
                false
            }
        }
    }

    fn missing_comma(&mut self) -> LineStatus {
        self.failure(
            AsmErrorKind::Instruction,
            "Missing comma between operands",
            None,
        )
    }

    fn overflow_failure(&mut self) -> LineStatus {
        self.failure(
            AsmErrorKind::Memory,
            "Program exceeds the 1024-word memory",
            None,
        )
    }

    fn scan_failure(&mut self) -> LineStatus {
        let msg = self.scanner.get_error_msg().to_string();
        self.failure(AsmErrorKind::Scanner, &msg, None)
    }

    fn failure(&mut self, kind: AsmErrorKind, msg: &str, param: Option<&str>) -> LineStatus {
        self.last_error = Some(AsmError::new(kind, msg, param));
        LineStatus::Failed
    }
}

fn format_error(msg: &str, param: Option<&str>) -> String {
    match param {
        Some(p) => format!("{msg}: {p}"),
        None => msg.to_string(),
    }
}
