// Crate root; modules follow the pipeline from source line to image.
pub mod assembler;
pub mod imagestore;
pub mod instructions;
pub mod preprocess;
pub mod scanner;
pub mod symbol_table;
