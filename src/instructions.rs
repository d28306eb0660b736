// Instruction set table and addressing-mode rules.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandCount {
    Two,
    One,
    None,
}

#[derive(Debug, Clone, Copy)]
pub struct Instruction {
    pub mnemonic: &'static str,
    pub opcode: u8,
    pub operands: OperandCount,
}

pub const INSTRUCTION_TABLE: [Instruction; 16] = [
    Instruction { mnemonic: "mov", opcode: 0, operands: OperandCount::Two },
    Instruction { mnemonic: "cmp", opcode: 1, operands: OperandCount::Two },
    Instruction { mnemonic: "add", opcode: 2, operands: OperandCount::Two },
    Instruction { mnemonic: "sub", opcode: 3, operands: OperandCount::Two },
    Instruction { mnemonic: "not", opcode: 4, operands: OperandCount::One },
    Instruction { mnemonic: "clr", opcode: 5, operands: OperandCount::One },
    Instruction { mnemonic: "lea", opcode: 6, operands: OperandCount::Two },
    Instruction { mnemonic: "inc", opcode: 7, operands: OperandCount::One },
    Instruction { mnemonic: "dec", opcode: 8, operands: OperandCount::One },
    Instruction { mnemonic: "jmp", opcode: 9, operands: OperandCount::One },
    Instruction { mnemonic: "bne", opcode: 10, operands: OperandCount::One },
    Instruction { mnemonic: "red", opcode: 11, operands: OperandCount::One },
    Instruction { mnemonic: "prn", opcode: 12, operands: OperandCount::One },
    Instruction { mnemonic: "jsr", opcode: 13, operands: OperandCount::One },
    Instruction { mnemonic: "rts", opcode: 14, operands: OperandCount::None },
    Instruction { mnemonic: "stop", opcode: 15, operands: OperandCount::None },
];

/// Addressing mode field values as they appear in the first word.
pub const MODE_NONE: u8 = 0;
pub const MODE_IMMEDIATE: u8 = 1;
pub const MODE_DIRECT: u8 = 3;
pub const MODE_REGISTER: u8 = 5;

const DIRECTIVE_NAMES: [&str; 4] = ["data", "string", "entry", "extern"];
const MACRO_KEYWORDS: [&str; 2] = ["mcro", "endmcro"];

pub fn find_instruction(name: &str) -> Option<&'static Instruction> {
    INSTRUCTION_TABLE.iter().find(|inst| inst.mnemonic == name)
}

/// Source-operand legality for the two-operand group. Immediate and
/// register sources are limited to mov/cmp/add/sub; lea takes only a
/// label source.
pub fn source_mode_allowed(opcode: u8, mode: u8) -> bool {
    match mode {
        MODE_DIRECT => true,
        MODE_IMMEDIATE | MODE_REGISTER => opcode <= 3,
        _ => false,
    }
}

/// Destination-operand legality. An immediate destination is legal only
/// for cmp among the two-operand group and prn among the one-operand
/// group.
pub fn dest_mode_allowed(opcode: u8, mode: u8) -> bool {
    match mode {
        MODE_DIRECT | MODE_REGISTER => true,
        MODE_IMMEDIATE => opcode == 1 || opcode == 12,
        _ => false,
    }
}

pub fn is_reserved_word(name: &str) -> bool {
    find_instruction(name).is_some()
        || DIRECTIVE_NAMES.contains(&name)
        || MACRO_KEYWORDS.contains(&name)
}
