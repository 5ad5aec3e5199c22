use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MEMORY_SIZE: usize = 256;

/// Data memory seen by loads and stores. Multi-byte accesses are big-endian.
pub trait Bus {
    fn read_u8(&mut self, addr: u32) -> Result<u8>;
    fn read_u16(&mut self, addr: u32) -> Result<u16>;
    fn read_u32(&mut self, addr: u32) -> Result<u32>;
    fn write_u8(&mut self, addr: u32, val: u8) -> Result<()>;
    fn write_u16(&mut self, addr: u32, val: u16) -> Result<()>;
    fn write_u32(&mut self, addr: u32, val: u32) -> Result<()>;

    /// Raw contents for trace dumps, if the bus can expose them.
    fn contents(&self) -> Option<&[u8]> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearMemory {
    pub mem: Vec<u8>,
}

impl LinearMemory {
    pub fn new(size: usize) -> Self {
        Self { mem: vec![0; size] }
    }

    pub fn len(&self) -> usize {
        self.mem.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mem.is_empty()
    }

    fn range(&self, addr: u32, width: usize) -> Result<std::ops::Range<usize>> {
        let start = addr as usize;
        match start.checked_add(width) {
            Some(end) if end <= self.mem.len() => Ok(start..end),
            _ => bail!(
                "{width}-byte access at {addr:#x} outside {} bytes of memory",
                self.mem.len()
            ),
        }
    }
}

impl Default for LinearMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_SIZE)
    }
}

impl Bus for LinearMemory {
    fn read_u8(&mut self, addr: u32) -> Result<u8> {
        let r = self.range(addr, 1)?;
        Ok(self.mem[r.start])
    }
    fn read_u16(&mut self, addr: u32) -> Result<u16> {
        let r = self.range(addr, 2)?;
        Ok(u16::from_be_bytes([self.mem[r.start], self.mem[r.start + 1]]))
    }
    fn read_u32(&mut self, addr: u32) -> Result<u32> {
        let r = self.range(addr, 4)?;
        let b = &self.mem[r];
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
    fn write_u8(&mut self, addr: u32, val: u8) -> Result<()> {
        let r = self.range(addr, 1)?;
        self.mem[r.start] = val;
        Ok(())
    }
    fn write_u16(&mut self, addr: u32, val: u16) -> Result<()> {
        let r = self.range(addr, 2)?;
        self.mem[r].copy_from_slice(&val.to_be_bytes());
        Ok(())
    }
    fn write_u32(&mut self, addr: u32, val: u32) -> Result<()> {
        let r = self.range(addr, 4)?;
        self.mem[r].copy_from_slice(&val.to_be_bytes());
        Ok(())
    }
    fn contents(&self) -> Option<&[u8]> {
        Some(&self.mem)
    }
}
