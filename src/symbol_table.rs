// Symbol table for labels, entry marks and externals.

use std::collections::HashMap;

use crate::instructions::is_reserved_word;

pub const MAX_LABEL_LENGTH: usize = 31;

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    /// Raw counter value at definition; None until the label is defined.
    /// `relocate` rewrites it to the final load address.
    pub address: Option<u16>,
    pub is_external: bool,
    pub is_entry: bool,
    pub is_data: bool,
    /// 1-based source line of the first mention, for diagnostics.
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolTableResult {
    Ok,
    Duplicate,
    EntryExternConflict,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    index: HashMap<String, usize>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a label at its raw counter address. Redefinition, or
    /// defining a label previously declared external, is a duplicate.
    pub fn define(&mut self, name: &str, address: u16, is_data: bool, line: u32) -> SymbolTableResult {
        if let Some(&i) = self.index.get(name) {
            let sym = &mut self.symbols[i];
            if sym.address.is_some() || sym.is_external {
                return SymbolTableResult::Duplicate;
            }
            sym.address = Some(address);
            sym.is_data = is_data;
            return SymbolTableResult::Ok;
        }
        self.insert(Symbol {
            name: name.to_string(),
            address: Some(address),
            is_external: false,
            is_entry: false,
            is_data,
            line,
        });
        SymbolTableResult::Ok
    }

    pub fn mark_entry(&mut self, name: &str, line: u32) -> SymbolTableResult {
        if let Some(&i) = self.index.get(name) {
            let sym = &mut self.symbols[i];
            if sym.is_external {
                return SymbolTableResult::EntryExternConflict;
            }
            sym.is_entry = true;
            return SymbolTableResult::Ok;
        }
        self.insert(Symbol {
            name: name.to_string(),
            address: None,
            is_external: false,
            is_entry: true,
            is_data: false,
            line,
        });
        SymbolTableResult::Ok
    }

    pub fn mark_external(&mut self, name: &str, line: u32) -> SymbolTableResult {
        if let Some(&i) = self.index.get(name) {
            let sym = &mut self.symbols[i];
            if sym.is_entry {
                return SymbolTableResult::EntryExternConflict;
            }
            if sym.address.is_some() {
                return SymbolTableResult::Duplicate;
            }
            sym.is_external = true;
            return SymbolTableResult::Ok;
        }
        self.insert(Symbol {
            name: name.to_string(),
            address: None,
            is_external: true,
            is_entry: false,
            is_data: false,
            line,
        });
        SymbolTableResult::Ok
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.index.get(name).map(|&i| &self.symbols[i])
    }

    /// Rewrites raw counter addresses to final load addresses: every
    /// defined label gains the load base, data labels additionally gain
    /// the final instruction count.
    pub fn relocate(&mut self, final_ic: u16, base: u16) {
        for sym in &mut self.symbols {
            if let Some(addr) = sym.address {
                let offset = if sym.is_data { final_ic } else { 0 };
                sym.address = Some(addr + base + offset);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    fn insert(&mut self, sym: Symbol) {
        self.index.insert(sym.name.clone(), self.symbols.len());
        self.symbols.push(sym);
    }
}

/// Shape check shared by the scanner, the directives and the macro
/// preprocessor: a letter, then letters and digits, at most 31
/// characters, and not a reserved word.
pub fn validate_label(name: &str) -> Result<(), &'static str> {
    let first = name.as_bytes().first().copied().unwrap_or(b'\0');
    if !first.is_ascii_alphabetic() {
        return Err("Label must start with a letter");
    }
    if name.len() > MAX_LABEL_LENGTH {
        return Err("Label exceeds 31 characters");
    }
    if !name.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err("Label may only contain letters and digits");
    }
    if is_reserved_word(name) {
        return Err("Label name is a reserved word");
    }
    Ok(())
}
