use tracing::{error, warn};

use crate::catalog::{Catalog, Register};
use crate::codec;
use crate::error::{Error, Result};
use crate::reader::RegisterReader;

/// Column at which the decoded value starts, relative to the description.
pub const VALUE_COLUMN: usize = 64;

/// Longest description fragment per line. Leaves room for the separator
/// between description and value.
const WRAP_WIDTH: usize = VALUE_COLUMN - 3;

/// Safety bound on the unwrapped remainder of a description.
const MAX_REMAINDER: usize = 1024;

/// Aligns continuation lines under the `NNNN : ` address prefix.
const CONTINUATION_INDENT: &str = "       ";

/// Render one register as an aligned console line, wrapping long
/// descriptions onto continuation lines.
pub fn render(register: &Register, value: f32) -> Result<String> {
    let mut value_text = format!("{value:.6}");
    if let Some(unit) = register.unit {
        value_text.push(' ');
        value_text.push_str(unit);
    }

    let mut out = format!("{:04} : ", register.address);
    let mut rest = register.description;
    while rest.len() > WRAP_WIDTH {
        let cut = split_point(rest);
        out.push_str(&rest[..cut]);
        out.push('\n');
        out.push_str(CONTINUATION_INDENT);
        rest = rest[cut..].strip_prefix(' ').unwrap_or(&rest[cut..]);
        if rest.len() > MAX_REMAINDER {
            return Err(Error::Format);
        }
    }
    out.push_str(rest);
    for _ in rest.len()..VALUE_COLUMN {
        out.push(' ');
    }
    out.push_str(&value_text);
    Ok(out)
}

/// Index of the last space at or before the wrap width. A fragment with
/// no usable space breaks hard at the width, so a single oversized word
/// cannot stall the wrap.
fn split_point(text: &str) -> usize {
    match text[..=WRAP_WIDTH].rfind(' ') {
        Some(0) | None => WRAP_WIDTH,
        Some(pos) => pos,
    }
}

/// Print one catalog register to stdout. An unknown address prints
/// nothing; a wrap failure skips only this entry.
pub fn print_register(reader: &mut RegisterReader, catalog: &Catalog, address: u16) -> Result<()> {
    let Some(register) = catalog.lookup(address) else {
        warn!(address, "register not in catalog");
        return Ok(());
    };
    let words = reader.read_one(register)?;
    print_line(register, words);
    Ok(())
}

pub fn print_all_registers(reader: &mut RegisterReader, catalog: &Catalog) -> Result<()> {
    print_register_range(reader, catalog, 0, u16::MAX)
}

pub fn print_register_range(
    reader: &mut RegisterReader,
    catalog: &Catalog,
    begin: u16,
    end: u16,
) -> Result<()> {
    for (register, words) in reader.read_range(catalog, begin, end)? {
        print_line(register, words);
    }
    Ok(())
}

fn print_line(register: &Register, words: [u16; 2]) {
    match render(register, codec::decode(words[0], words[1])) {
        Ok(line) => println!("{line}"),
        Err(err) => error!(address = register.address, "{err}"),
    }
}
