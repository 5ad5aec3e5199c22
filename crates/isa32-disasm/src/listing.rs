use std::fmt::Write as _;

use anyhow::{Context, Result};
use serde::Serialize;

use isa32::decoder::{Decoder, WordDecoder};
use isa32::disasm::{fmt_decoded, fmt_decoded_lower};

use crate::model::{read_u8, read_u32, Image};

#[derive(Debug, Clone, Serialize)]
pub struct InsnOut {
    pub addr: u32,
    pub raw: u32,
    pub text: String,
}

/// Addressed listing of `[start, end)`. Words that fail to decode are shown
/// as `.word` and do not stop the listing.
pub fn render_range(img: &Image, start: u32, end: u32, show_bytes: bool, lower: bool) -> String {
    let dec = WordDecoder::new();
    let mut buf = String::new();
    let mut pc = start;
    while pc < end {
        let Some(raw32) = read_u32(img, pc) else {
            let _ = writeln!(buf, "{pc:#010x}: <oob>");
            break;
        };
        let _ = write!(buf, "{pc:#010x}: ");
        if show_bytes {
            for i in 0..4 {
                let _ = write!(buf, "{:02x} ", read_u8(img, pc + i).unwrap_or(0));
            }
            buf.push_str("  ");
        }
        match dec.decode(raw32) {
            Ok(d) if lower => { let _ = writeln!(buf, "{}", fmt_decoded_lower(&d)); }
            Ok(d) => { let _ = writeln!(buf, "{}", fmt_decoded(&d)); }
            Err(fault) => { let _ = writeln!(buf, ".word {raw32:#010x}  ; {fault}"); }
        }
        pc = pc.wrapping_add(4);
    }
    buf
}

/// Every word of the image as a JSON-ready record. Unlike the listing this
/// fails on the first undecodable word.
pub fn decode_records(img: &Image) -> Result<Vec<InsnOut>> {
    let dec = WordDecoder::new();
    let mut out = Vec::with_capacity(img.word_count());
    for i in 0..img.word_count() {
        let addr = (i * 4) as u32;
        let raw = read_u32(img, addr).context("short read")?;
        let d = dec
            .decode(raw)
            .with_context(|| format!("byte offset {addr}"))?;
        out.push(InsnOut { addr, raw, text: fmt_decoded(&d) });
    }
    Ok(out)
}
