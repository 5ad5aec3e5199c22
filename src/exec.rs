use crate::cpu::{Cpu, Trap};
use crate::decoder::{Decoded, Operands};
use crate::memory::Bus;
use crate::opcode::{Opcode, Shape};
use tracing::trace;

/// Runs one decoded instruction located at `pc`.
///
/// Returns `Some(next)` when control flow changes. `next` is the address the
/// caller adds 4 to, so branch targets come back as `target - 4`.
pub trait Executor {
    fn exec<B: Bus>(
        &self,
        cpu: &mut Cpu,
        bus: &mut B,
        pc: u32,
        d: Decoded,
    ) -> Result<Option<u32>, Trap>;
}

/// Widens `value` from `from_bits` to `to_bits`, copying the sign bit up.
pub fn sign_extend(value: u32, from_bits: u32, to_bits: u32) -> u32 {
    let mask = |bits: u32| if bits >= 32 { u32::MAX } else { (1u32 << bits) - 1 };
    let sign = 1u32 << (from_bits - 1);
    if value & sign != 0 {
        (value | (mask(to_bits) & !mask(from_bits))) & mask(to_bits)
    } else {
        value
    }
}

fn shl(a: u32, n: u32) -> u32 {
    a.checked_shl(n).unwrap_or(0)
}

fn shr(a: u32, n: u32) -> u32 {
    a.checked_shr(n).unwrap_or(0)
}

/// Arithmetic right shift that shifts the magnitude of negative values, so
/// results round toward zero.
fn sra(a: u32, n: u32) -> u32 {
    let v = i64::from(a as i32);
    let n = n.min(63);
    let r = if v >= 0 { v >> n } else { -((-v) >> n) };
    r as u32
}

fn branch(taken: bool, target: u32) -> Option<u32> {
    taken.then(|| target.wrapping_sub(4))
}

pub struct IntExecutor;

impl IntExecutor {
    fn exec_dss(
        &self,
        cpu: &mut Cpu,
        pc: u32,
        op: Opcode,
        rd: u8,
        rs1: u8,
        rs2: u8,
    ) -> Result<Option<u32>, Trap> {
        let a = cpu.reg(rs1);
        let b = cpu.reg(rs2);
        let res = match op {
            Opcode::Nop => return Ok(None),
            Opcode::Add => a.wrapping_add(b),
            Opcode::Mul => a.wrapping_mul(b) & 0x0000_FFFF,
            // low half of the product lands in the high half
            Opcode::Mulh => a.wrapping_mul(b) << 16,
            Opcode::Div => a.checked_div(b).ok_or(Trap::DivisionByZero { pc, op })?,
            Opcode::Rem => a.checked_rem(b).ok_or(Trap::DivisionByZero { pc, op })?,
            Opcode::And => a & b,
            Opcode::Or => a | b,
            Opcode::Xor => a ^ b,
            Opcode::Not => !a,
            Opcode::Sll => shl(a, b),
            Opcode::Srl => shr(a, b),
            Opcode::Sra => sra(a, b),
            Opcode::Slt => u32::from(a < b),
            Opcode::Slts => u32::from((a as i32) < (b as i32)),
            // opcodes of other shapes are spelled out so new ones fail to compile here
            Opcode::Addi
            | Opcode::Andi
            | Opcode::Ori
            | Opcode::Xori
            | Opcode::Slli
            | Opcode::Srli
            | Opcode::Srai
            | Opcode::Slti
            | Opcode::Sltsi
            | Opcode::Sb
            | Opcode::Sh
            | Opcode::Sw
            | Opcode::Lb
            | Opcode::Lh
            | Opcode::Lw
            | Opcode::Beq
            | Opcode::Bneq
            | Opcode::Blt
            | Opcode::Ble
            | Opcode::Blts
            | Opcode::Bltes
            | Opcode::Jalr
            | Opcode::Seqz
            | Opcode::Jal
            | Opcode::Lui
            | Opcode::Lli
            | Opcode::J => return Err(Trap::Unimplemented { op, shape: Shape::Dss }),
        };
        cpu.write_reg(rd, res);
        Ok(None)
    }

    #[allow(clippy::too_many_arguments)]
    fn exec_dsi<B: Bus>(
        &self,
        cpu: &mut Cpu,
        bus: &mut B,
        pc: u32,
        op: Opcode,
        rd: u8,
        rs: u8,
        imm: u8,
    ) -> Result<Option<u32>, Trap> {
        let imm = u32::from(imm);
        let simm = sign_extend(imm, 8, 32);
        let d = cpu.reg(rd);
        let s = cpu.reg(rs);

        match op {
            Opcode::Addi => cpu.write_reg(rd, s.wrapping_add(simm)),
            Opcode::Andi => cpu.write_reg(rd, s & imm),
            Opcode::Ori => cpu.write_reg(rd, s | imm),
            Opcode::Xori => cpu.write_reg(rd, s ^ imm),
            Opcode::Slli => cpu.write_reg(rd, shl(s, imm)),
            Opcode::Srli => cpu.write_reg(rd, shr(s, imm)),
            Opcode::Srai => cpu.write_reg(rd, sra(s, imm)),
            Opcode::Slti => cpu.write_reg(rd, u32::from(s < imm)),
            Opcode::Sltsi => cpu.write_reg(rd, u32::from((s as i32) < (simm as i32))),

            // loads: rd <- mem[rs + imm]
            Opcode::Lb => {
                let addr = s.wrapping_add(imm);
                let v = bus
                    .read_u8(addr)
                    .map_err(|source| Trap::Bus { addr, source })?;
                cpu.write_reg(rd, u32::from(v));
            }
            Opcode::Lh => {
                let addr = s.wrapping_add(simm);
                let v = bus
                    .read_u16(addr)
                    .map_err(|source| Trap::Bus { addr, source })?;
                cpu.write_reg(rd, u32::from(v));
            }
            Opcode::Lw => {
                let addr = s.wrapping_add(simm);
                let v = bus
                    .read_u32(addr)
                    .map_err(|source| Trap::Bus { addr, source })?;
                cpu.write_reg(rd, v);
            }

            // stores: mem[rd + imm] <- rs
            Opcode::Sb => {
                let addr = d.wrapping_add(imm);
                bus.write_u8(addr, s as u8)
                    .map_err(|source| Trap::Bus { addr, source })?;
            }
            Opcode::Sh => {
                let addr = d.wrapping_add(simm);
                bus.write_u16(addr, s as u16)
                    .map_err(|source| Trap::Bus { addr, source })?;
            }
            Opcode::Sw => {
                let addr = d.wrapping_add(simm);
                bus.write_u32(addr, s)
                    .map_err(|source| Trap::Bus { addr, source })?;
            }

            // branch immediates are absolute label offsets, never sign-extended
            Opcode::Beq => return Ok(branch(d == s, imm)),
            Opcode::Bneq => return Ok(branch(d != s, imm)),
            Opcode::Blt => return Ok(branch(d < s, imm)),
            Opcode::Ble => return Ok(branch(d <= s, imm)),
            Opcode::Blts => return Ok(branch((d as i32) < (s as i32), imm)),
            Opcode::Bltes => return Ok(branch((d as i32) <= (s as i32), imm)),

            Opcode::Jalr => {
                let base = s.wrapping_add(imm);
                cpu.write_reg(rd, pc);
                trace!(pc, base, "jalr");
                return Ok(Some(base));
            }
            Opcode::Nop
            | Opcode::Add
            | Opcode::Mul
            | Opcode::Mulh
            | Opcode::Div
            | Opcode::Rem
            | Opcode::And
            | Opcode::Or
            | Opcode::Not
            | Opcode::Xor
            | Opcode::Sll
            | Opcode::Srl
            | Opcode::Sra
            | Opcode::Slt
            | Opcode::Slts
            | Opcode::Seqz
            | Opcode::Jal
            | Opcode::Lui
            | Opcode::Lli
            | Opcode::J => return Err(Trap::Unimplemented { op, shape: Shape::Dsi }),
        }
        Ok(None)
    }

    fn exec_ds(&self, cpu: &mut Cpu, op: Opcode, rd: u8, rs: u8) -> Result<Option<u32>, Trap> {
        match op {
            Opcode::Seqz => {
                let v = u32::from(cpu.reg(rs) == 0);
                cpu.write_reg(rd, v);
                Ok(None)
            }
            Opcode::Nop
            | Opcode::Add
            | Opcode::Mul
            | Opcode::Mulh
            | Opcode::Div
            | Opcode::Rem
            | Opcode::And
            | Opcode::Or
            | Opcode::Not
            | Opcode::Xor
            | Opcode::Sll
            | Opcode::Srl
            | Opcode::Sra
            | Opcode::Slt
            | Opcode::Slts
            | Opcode::Addi
            | Opcode::Andi
            | Opcode::Ori
            | Opcode::Xori
            | Opcode::Slli
            | Opcode::Srli
            | Opcode::Srai
            | Opcode::Slti
            | Opcode::Sltsi
            | Opcode::Sb
            | Opcode::Sh
            | Opcode::Sw
            | Opcode::Lb
            | Opcode::Lh
            | Opcode::Lw
            | Opcode::Beq
            | Opcode::Bneq
            | Opcode::Blt
            | Opcode::Ble
            | Opcode::Blts
            | Opcode::Bltes
            | Opcode::Jalr
            | Opcode::Jal
            | Opcode::Lui
            | Opcode::Lli
            | Opcode::J => Err(Trap::Unimplemented { op, shape: Shape::Ds }),
        }
    }

    fn exec_di(
        &self,
        cpu: &mut Cpu,
        pc: u32,
        op: Opcode,
        rd: u8,
        imm: u16,
    ) -> Result<Option<u32>, Trap> {
        let imm = u32::from(imm);
        match op {
            Opcode::Jal => {
                cpu.write_reg(rd, pc);
                Ok(branch(true, imm))
            }
            Opcode::Lui => {
                let v = (cpu.reg(rd) & 0x0000_FFFF) | (imm << 16);
                cpu.write_reg(rd, v);
                Ok(None)
            }
            Opcode::Lli => {
                let v = (cpu.reg(rd) & 0xFFFF_0000) | imm;
                cpu.write_reg(rd, v);
                Ok(None)
            }
            Opcode::Nop
            | Opcode::Add
            | Opcode::Mul
            | Opcode::Mulh
            | Opcode::Div
            | Opcode::Rem
            | Opcode::And
            | Opcode::Or
            | Opcode::Not
            | Opcode::Xor
            | Opcode::Sll
            | Opcode::Srl
            | Opcode::Sra
            | Opcode::Slt
            | Opcode::Slts
            | Opcode::Addi
            | Opcode::Andi
            | Opcode::Ori
            | Opcode::Xori
            | Opcode::Slli
            | Opcode::Srli
            | Opcode::Srai
            | Opcode::Slti
            | Opcode::Sltsi
            | Opcode::Sb
            | Opcode::Sh
            | Opcode::Sw
            | Opcode::Lb
            | Opcode::Lh
            | Opcode::Lw
            | Opcode::Beq
            | Opcode::Bneq
            | Opcode::Blt
            | Opcode::Ble
            | Opcode::Blts
            | Opcode::Bltes
            | Opcode::Jalr
            | Opcode::Seqz
            | Opcode::J => Err(Trap::Unimplemented { op, shape: Shape::Di }),
        }
    }

    fn exec_i(&self, op: Opcode, imm: u32) -> Result<Option<u32>, Trap> {
        match op {
            Opcode::J => Ok(branch(true, imm)),
            Opcode::Nop
            | Opcode::Add
            | Opcode::Mul
            | Opcode::Mulh
            | Opcode::Div
            | Opcode::Rem
            | Opcode::And
            | Opcode::Or
            | Opcode::Not
            | Opcode::Xor
            | Opcode::Sll
            | Opcode::Srl
            | Opcode::Sra
            | Opcode::Slt
            | Opcode::Slts
            | Opcode::Addi
            | Opcode::Andi
            | Opcode::Ori
            | Opcode::Xori
            | Opcode::Slli
            | Opcode::Srli
            | Opcode::Srai
            | Opcode::Slti
            | Opcode::Sltsi
            | Opcode::Sb
            | Opcode::Sh
            | Opcode::Sw
            | Opcode::Lb
            | Opcode::Lh
            | Opcode::Lw
            | Opcode::Beq
            | Opcode::Bneq
            | Opcode::Blt
            | Opcode::Ble
            | Opcode::Blts
            | Opcode::Bltes
            | Opcode::Jalr
            | Opcode::Seqz
            | Opcode::Jal
            | Opcode::Lui
            | Opcode::Lli => Err(Trap::Unimplemented { op, shape: Shape::I }),
        }
    }
}

impl Executor for IntExecutor {
    fn exec<B: Bus>(
        &self,
        cpu: &mut Cpu,
        bus: &mut B,
        pc: u32,
        d: Decoded,
    ) -> Result<Option<u32>, Trap> {
        let next = match d.operands {
            Operands::Dss { rd, rs1, rs2 } => self.exec_dss(cpu, pc, d.op, rd, rs1, rs2)?,
            Operands::Dsi { rd, rs, imm } => self.exec_dsi(cpu, bus, pc, d.op, rd, rs, imm)?,
            Operands::Ds { rd, rs } => self.exec_ds(cpu, d.op, rd, rs)?,
            Operands::Di { rd, imm } => self.exec_di(cpu, pc, d.op, rd, imm)?,
            Operands::I { imm } => self.exec_i(d.op, imm)?,
        };
        if let Some(next) = next {
            trace!(pc, next, op = %d.op, "control transfer");
        }
        Ok(next)
    }
}
