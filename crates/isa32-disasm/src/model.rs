use anyhow::Result;
use std::path::Path;

/// A raw instruction stream loaded from disk.
#[derive(Debug, Clone)]
pub struct Image {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Image {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.bytes.len() / 4
    }
}

pub fn load_raw_bin(path: &Path, skip: usize, len: Option<usize>) -> Result<Image> {
    let file = std::fs::read(path)?;
    anyhow::ensure!(skip <= file.len(), "--skip exceeds file size");
    let mut payload = &file[skip..];
    if let Some(lim) = len {
        anyhow::ensure!(lim <= payload.len(), "--len exceeds remaining file size after skip");
        payload = &payload[..lim];
    }
    anyhow::ensure!(
        payload.len() % 4 == 0,
        "instruction stream is {} bytes, not a whole number of words",
        payload.len()
    );
    Ok(Image {
        name: path.display().to_string(),
        bytes: payload.to_vec(),
    })
}

pub fn read_u8(img: &Image, addr: u32) -> Option<u8> {
    img.bytes.get(addr as usize).copied()
}

/// Big-endian word at `addr`.
pub fn read_u32(img: &Image, addr: u32) -> Option<u32> {
    let start = addr as usize;
    let b = img.bytes.get(start..start.checked_add(4)?)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}
