// Machine image: word packing, deferred-label resolution and output files.

use std::io::{self, Write};

use crate::assembler::{AsmError, AsmErrorKind, Diagnostic, Severity};
use crate::symbol_table::SymbolTable;

/// Total addressable words.
pub const MEMORY_SIZE: usize = 1024;
/// Default load address of the first code word.
pub const BASE_ADDRESS: u16 = 100;

pub const ARE_ABSOLUTE: u8 = 0;
pub const ARE_EXTERNAL: u8 = 1;
pub const ARE_RELOCATABLE: u8 = 2;

const BASE64_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// One 12-bit machine word. `DirectRef` is the provisional form of a
/// label operand; it carries the referenced name and the use line and is
/// bound by `resolve` once the whole source has been scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineWord {
    First {
        are: u8,
        dst_mode: u8,
        src_mode: u8,
        opcode: u8,
    },
    Operand {
        are: u8,
        value: i16,
    },
    DirectRef {
        label: String,
        line: u32,
    },
    Registers {
        are: u8,
        dst_reg: u8,
        src_reg: u8,
    },
    Data {
        value: i16,
        line: u32,
    },
}

impl MachineWord {
    /// Packs the word into 12 bits, fields in big-endian order. Operand
    /// values are 10-bit two's complement.
    pub fn pack(&self) -> u16 {
        match self {
            MachineWord::First {
                are,
                dst_mode,
                src_mode,
                opcode,
            } => {
                ((*are as u16 & 0x3) << 10)
                    | ((*dst_mode as u16 & 0x7) << 7)
                    | ((*src_mode as u16 & 0x7) << 4)
                    | (*opcode as u16 & 0xf)
            }
            MachineWord::Operand { are, value } => {
                ((*are as u16 & 0x3) << 10) | (*value as u16 & 0x3ff)
            }
            MachineWord::Registers {
                are,
                dst_reg,
                src_reg,
            } => {
                ((*are as u16 & 0x3) << 10)
                    | ((*dst_reg as u16 & 0x1f) << 5)
                    | (*src_reg as u16 & 0x1f)
            }
            MachineWord::Data { value, .. } => *value as u16 & 0xfff,
            // Bound by resolve before packing is ever reached.
            MachineWord::DirectRef { .. } => 0,
        }
    }
}

/// How emitted addresses and A,R,E bits are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArePolicy {
    /// Every word is absolute, as the loader for this machine expects.
    Absolute,
    /// Tag resolved label operands relocatable and external references
    /// external.
    Relocation,
}

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub base_address: u16,
    pub are_policy: ArePolicy,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            base_address: BASE_ADDRESS,
            are_policy: ArePolicy::Absolute,
        }
    }
}

/// Separate code and data images filled during the scan pass. The data
/// image is placed after the code image at output time.
#[derive(Debug, Default)]
pub struct ImageStore {
    code: Vec<MachineWord>,
    data: Vec<MachineWord>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ic(&self) -> u16 {
        self.code.len() as u16
    }

    pub fn dc(&self) -> u16 {
        self.data.len() as u16
    }

    pub fn code(&self) -> &[MachineWord] {
        &self.code
    }

    pub fn data(&self) -> &[MachineWord] {
        &self.data
    }

    /// Appends a code word; false once the 1024-word space is exhausted.
    pub fn push_code(&mut self, word: MachineWord) -> bool {
        if self.is_full() {
            return false;
        }
        self.code.push(word);
        true
    }

    pub fn push_data(&mut self, word: MachineWord) -> bool {
        if self.is_full() {
            return false;
        }
        self.data.push(word);
        true
    }

    pub fn is_full(&self) -> bool {
        self.code.len() + self.data.len() >= MEMORY_SIZE
    }
}

/// The fully bound image: addressed, packed words plus the entry and
/// external records the label files are written from.
#[derive(Debug)]
pub struct ResolvedImage {
    pub ic: u16,
    pub dc: u16,
    pub words: Vec<(u16, u16)>,
    pub entries: Vec<(String, u16)>,
    pub externals: Vec<(String, u16)>,
}

/// Binds every deferred label reference against the relocated symbol
/// table. External references resolve to operand 0 and record an
/// occurrence; an unknown name or an undefined entry label is an error
/// carrying the relevant source line.
pub fn resolve(
    image: &ImageStore,
    symbols: &SymbolTable,
    options: &OutputOptions,
) -> Result<ResolvedImage, Vec<Diagnostic>> {
    let mut errors = Vec::new();
    let mut words = Vec::with_capacity(image.code.len() + image.data.len());
    let mut externals = Vec::new();

    for (i, word) in image.code.iter().chain(image.data.iter()).enumerate() {
        let addr = options.base_address + i as u16;
        let packed = match word {
            MachineWord::DirectRef { label, line } => match symbols.lookup(label) {
                Some(sym) if sym.is_external => {
                    externals.push((label.clone(), addr));
                    let are = match options.are_policy {
                        ArePolicy::Absolute => ARE_ABSOLUTE,
                        ArePolicy::Relocation => ARE_EXTERNAL,
                    };
                    MachineWord::Operand { are, value: 0 }.pack()
                }
                Some(sym) => match sym.address {
                    // The base offset can push a label past the operand
                    // field even though the raw counters fit the image.
                    Some(target) if target > 0x3ff => {
                        errors.push(Diagnostic::new(
                            *line,
                            Severity::Error,
                            AsmError::new(
                                AsmErrorKind::Memory,
                                "Label address does not fit the 10-bit operand field",
                                Some(label),
                            ),
                        ));
                        0
                    }
                    Some(target) => {
                        let are = match options.are_policy {
                            ArePolicy::Absolute => ARE_ABSOLUTE,
                            ArePolicy::Relocation => ARE_RELOCATABLE,
                        };
                        MachineWord::Operand {
                            are,
                            value: target as i16,
                        }
                        .pack()
                    }
                    None => {
                        errors.push(Diagnostic::new(
                            *line,
                            Severity::Error,
                            AsmError::new(AsmErrorKind::Label, "Undefined label", Some(label)),
                        ));
                        0
                    }
                },
                None => {
                    errors.push(Diagnostic::new(
                        *line,
                        Severity::Error,
                        AsmError::new(AsmErrorKind::Label, "Undefined label", Some(label)),
                    ));
                    0
                }
            },
            other => other.pack(),
        };
        words.push((addr, packed));
    }

    let mut entries = Vec::new();
    for sym in symbols.iter() {
        if !sym.is_entry {
            continue;
        }
        match sym.address {
            Some(addr) => entries.push((sym.name.clone(), addr)),
            None => errors.push(Diagnostic::new(
                sym.line,
                Severity::Error,
                AsmError::new(
                    AsmErrorKind::Label,
                    "Entry label is never defined",
                    Some(&sym.name),
                ),
            )),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ResolvedImage {
        ic: image.ic(),
        dc: image.dc(),
        words,
        entries,
        externals,
    })
}

impl ResolvedImage {
    /// Writes the object file: an `IC DC` header line, then one
    /// `address: code` line per word, code image first.
    pub fn write_object<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{} {}", self.ic, self.dc)?;
        for (addr, word) in &self.words {
            writeln!(out, "{}: {}", addr, word_to_base64(*word))?;
        }
        Ok(())
    }

    /// Writes one `NAME ADDRESS` line per entry label, in declaration
    /// order.
    pub fn write_entries<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for (name, addr) in &self.entries {
            writeln!(out, "{name} {addr}")?;
        }
        Ok(())
    }

    /// Writes one `NAME ADDRESS` line per external reference occurrence,
    /// in image order; ADDRESS is the address of the referencing word.
    pub fn write_externals<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for (name, addr) in &self.externals {
            writeln!(out, "{name} {addr}")?;
        }
        Ok(())
    }

    pub fn has_entries(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn has_externals(&self) -> bool {
        !self.externals.is_empty()
    }
}

/// Encodes a 12-bit word as two symbols from the 64-character alphabet,
/// high six bits first.
pub fn word_to_base64(word: u16) -> String {
    let word = word & 0xfff;
    let hi = BASE64_ALPHABET[(word >> 6) as usize] as char;
    let lo = BASE64_ALPHABET[(word & 0x3f) as usize] as char;
    let mut out = String::with_capacity(2);
    out.push(hi);
    out.push(lo);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_word_field_layout() {
        let word = MachineWord::First {
            are: 0,
            dst_mode: 5,
            src_mode: 0,
            opcode: 0,
        };
        assert_eq!(word.pack(), 0b001010000000);

        let word = MachineWord::First {
            are: 0,
            dst_mode: 3,
            src_mode: 0,
            opcode: 9,
        };
        assert_eq!(word.pack(), (3 << 7) | 9);
    }

    #[test]
    fn shared_register_word_decodes_both_registers() {
        let word = MachineWord::Registers {
            are: 0,
            dst_reg: 5,
            src_reg: 3,
        };
        let packed = word.pack();
        assert_eq!((packed >> 5) & 0x1f, 5);
        assert_eq!(packed & 0x1f, 3);
        assert_eq!((packed >> 10) & 0x3, 0);
    }

    #[test]
    fn operand_word_is_ten_bit_twos_complement() {
        let word = MachineWord::Operand { are: 0, value: -1 };
        assert_eq!(word.pack(), 0x3ff);
        let word = MachineWord::Operand { are: 0, value: 5 };
        assert_eq!(word.pack(), 5);
    }

    #[test]
    fn data_word_is_twelve_bit_twos_complement() {
        let word = MachineWord::Data { value: -9, line: 1 };
        assert_eq!(word.pack(), 0xff7);
        let word = MachineWord::Data { value: 6, line: 1 };
        assert_eq!(word.pack(), 6);
    }

    #[test]
    fn base64_pairs() {
        assert_eq!(word_to_base64(0), "AA");
        assert_eq!(word_to_base64(0xfff), "//");
        assert_eq!(word_to_base64(640), "KA");
        assert_eq!(word_to_base64(163), "Cj");
        assert_eq!(word_to_base64(97), "Bh");
    }

    #[test]
    fn image_is_bounded_at_1024_words() {
        let mut image = ImageStore::new();
        for _ in 0..1023 {
            assert!(image.push_data(MachineWord::Data { value: 0, line: 1 }));
        }
        assert!(image.push_code(MachineWord::First {
            are: 0,
            dst_mode: 0,
            src_mode: 0,
            opcode: 15,
        }));
        assert!(image.is_full());
        assert!(!image.push_data(MachineWord::Data { value: 0, line: 2 }));
    }

    #[test]
    fn resolve_binds_references_and_records_externals() {
        let mut image = ImageStore::new();
        image.push_code(MachineWord::First {
            are: 0,
            dst_mode: 3,
            src_mode: 0,
            opcode: 9,
        });
        image.push_code(MachineWord::DirectRef {
            label: "MAIN".to_string(),
            line: 1,
        });
        image.push_code(MachineWord::DirectRef {
            label: "OUTSIDE".to_string(),
            line: 2,
        });

        let mut symbols = SymbolTable::new();
        symbols.define("MAIN", 0, false, 3);
        symbols.mark_external("OUTSIDE", 4);
        symbols.relocate(3, 100);

        let resolved = resolve(&image, &symbols, &OutputOptions::default()).unwrap();
        assert_eq!(resolved.words[1], (101, 100));
        assert_eq!(resolved.words[2], (102, 0));
        assert_eq!(resolved.externals, vec![("OUTSIDE".to_string(), 102)]);
    }

    #[test]
    fn resolve_reports_undefined_label_with_use_line() {
        let mut image = ImageStore::new();
        image.push_code(MachineWord::DirectRef {
            label: "NOWHERE".to_string(),
            line: 7,
        });
        let symbols = SymbolTable::new();
        let errors = resolve(&image, &symbols, &OutputOptions::default()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line(), 7);
        assert!(errors[0].format().contains("Undefined label: NOWHERE"));
    }

    #[test]
    fn resolve_rejects_address_beyond_operand_field() {
        let mut image = ImageStore::new();
        image.push_code(MachineWord::First {
            are: 0,
            dst_mode: 3,
            src_mode: 0,
            opcode: 9,
        });
        image.push_code(MachineWord::DirectRef {
            label: "FAR".to_string(),
            line: 4,
        });

        let mut symbols = SymbolTable::new();
        symbols.define("NEAR", 921, true, 1);
        symbols.define("FAR", 930, true, 2);
        symbols.relocate(2, 100);

        // NEAR lands on the last encodable address, FAR just past it.
        assert_eq!(symbols.lookup("NEAR").unwrap().address, Some(1023));
        assert_eq!(symbols.lookup("FAR").unwrap().address, Some(1032));
        let errors = resolve(&image, &symbols, &OutputOptions::default()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line(), 4);
        assert!(errors[0].format().contains("operand field"));
    }

    #[test]
    fn resolve_reports_undefined_entry() {
        let image = ImageStore::new();
        let mut symbols = SymbolTable::new();
        symbols.mark_entry("GHOST", 2);
        let errors = resolve(&image, &symbols, &OutputOptions::default()).unwrap_err();
        assert!(errors[0].format().contains("Entry label is never defined"));
    }

    #[test]
    fn relocation_policy_tags_are_bits() {
        let mut image = ImageStore::new();
        image.push_code(MachineWord::DirectRef {
            label: "HERE".to_string(),
            line: 1,
        });
        image.push_code(MachineWord::DirectRef {
            label: "AWAY".to_string(),
            line: 2,
        });
        let mut symbols = SymbolTable::new();
        symbols.define("HERE", 0, false, 1);
        symbols.mark_external("AWAY", 2);
        symbols.relocate(2, 100);

        let options = OutputOptions {
            base_address: 100,
            are_policy: ArePolicy::Relocation,
        };
        let resolved = resolve(&image, &symbols, &options).unwrap();
        assert_eq!(resolved.words[0].1 >> 10, ARE_RELOCATABLE as u16);
        assert_eq!(resolved.words[1].1 >> 10, ARE_EXTERNAL as u16);
    }

    #[test]
    fn object_file_layout() {
        let resolved = ResolvedImage {
            ic: 2,
            dc: 1,
            words: vec![(100, 640), (101, 163), (102, 0xfff)],
            entries: vec![("MAIN".to_string(), 100)],
            externals: Vec::new(),
        };
        let mut obj = Vec::new();
        resolved.write_object(&mut obj).unwrap();
        assert_eq!(
            String::from_utf8(obj).unwrap(),
            "2 1\n100: KA\n101: Cj\n102: //\n"
        );

        let mut ent = Vec::new();
        resolved.write_entries(&mut ent).unwrap();
        assert_eq!(String::from_utf8(ent).unwrap(), "MAIN 100\n");
        assert!(resolved.has_entries());
        assert!(!resolved.has_externals());
    }
}
