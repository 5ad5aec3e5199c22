use crate::decoder::{decode_stream, Decoded, Operands, WordDecoder};
use crate::error::SyntaxError;

/// `MNEMONIC arg[, arg]*`, upper-case mnemonic, unsigned decimal immediates.
pub fn fmt_decoded(d: &Decoded) -> String {
    fmt_operands(d.op.name(), &d.operands)
}

pub fn fmt_decoded_lower(d: &Decoded) -> String {
    fmt_operands(&d.op.name().to_ascii_lowercase(), &d.operands)
}

fn fmt_operands(mn: &str, ops: &Operands) -> String {
    match *ops {
        Operands::Dss { rd, rs1, rs2 } => format!("{mn} r{rd}, r{rs1}, r{rs2}"),
        Operands::Dsi { rd, rs, imm } => format!("{mn} r{rd}, r{rs}, {imm}"),
        Operands::Ds { rd, rs } => format!("{mn} r{rd}, r{rs}"),
        Operands::Di { rd, imm } => format!("{mn} r{rd}, {imm}"),
        Operands::I { imm } => format!("{mn} {imm}"),
    }
}

impl std::fmt::Display for Decoded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&fmt_decoded(self))
    }
}

/// Turns a binary instruction stream back into assembly text, one line per
/// word. Labels are not recovered.
pub fn disassemble(bytes: &[u8], lower_case: bool) -> Result<String, SyntaxError> {
    let decoded = decode_stream(&WordDecoder::new(), bytes)?;
    let mut text = String::with_capacity(decoded.len() * 16);
    for d in &decoded {
        if lower_case {
            text.push_str(&fmt_decoded_lower(d));
        } else {
            text.push_str(&fmt_decoded(d));
        }
        text.push('\n');
    }
    Ok(text)
}
