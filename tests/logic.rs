use isa32::exec::IntExecutor;
use isa32::{assemble, Cpu, CpuConfig, Halt, LinearMemory, Opcode, Trap, WordDecoder};

/// Assembles `src` and runs it to the end of the program.
fn run(src: &str) -> Cpu {
    let prog = assemble(src).unwrap();
    let mut mem = LinearMemory::default();
    let mut cpu = Cpu::new(CpuConfig { max_steps: Some(1000), ..CpuConfig::default() });
    let out = cpu.run(&prog, &mut mem, &WordDecoder::new(), &IntExecutor).unwrap();
    assert_eq!(out.halt, Halt::EndOfProgram);
    cpu
}

fn run_err(src: &str) -> Trap {
    let prog = assemble(src).unwrap();
    let mut mem = LinearMemory::default();
    let mut cpu = Cpu::new(CpuConfig::default());
    cpu.run(&prog, &mut mem, &WordDecoder::new(), &IntExecutor).unwrap_err()
}

#[test]
fn add_wraps() {
    let cpu = run("lui r1, 0xFFFF\nlli r1, 0xFFFF\naddi r2, r0, 1\nadd r3, r1, r2");
    assert_eq!(cpu.gpr[1], 0xFFFF_FFFF);
    assert_eq!(cpu.gpr[3], 0);
}

#[test]
fn mul_keeps_low_half_and_mulh_moves_it_up() {
    // 300 * 300 = 0x15F90
    let cpu = run("lli r1, 300\nlli r2, 300\nmul r3, r1, r2\nmulh r4, r1, r2");
    assert_eq!(cpu.gpr[3], 0x5F90);
    assert_eq!(cpu.gpr[4], 0x5F90_0000);
}

#[test]
fn div_and_rem() {
    let cpu = run("lli r1, 17\nlli r2, 5\ndiv r3, r1, r2\nrem r4, r1, r2");
    assert_eq!(cpu.gpr[3], 3);
    assert_eq!(cpu.gpr[4], 2);
}

#[test]
fn division_by_zero_traps() {
    let trap = run_err("lli r1, 17\ndiv r3, r1, r0");
    assert!(matches!(trap, Trap::DivisionByZero { pc: 4, op: Opcode::Div }), "{trap}");
    let trap = run_err("rem r3, r1, r2");
    assert!(matches!(trap, Trap::DivisionByZero { pc: 0, op: Opcode::Rem }), "{trap}");
}

#[test]
fn bitwise_ops() {
    let cpu = run(
        "lli r1, 0xF0F0\nlli r2, 0x0FF0\n\
         and r3, r1, r2\nor r4, r1, r2\nxor r5, r1, r2\nnot r6, r1, r0",
    );
    assert_eq!(cpu.gpr[3], 0x00F0);
    assert_eq!(cpu.gpr[4], 0xFFF0);
    assert_eq!(cpu.gpr[5], 0xFF00);
    assert_eq!(cpu.gpr[6], 0xFFFF_0F0F);
}

#[test]
fn shifts() {
    let cpu = run(
        "addi r1, r0, -16\naddi r2, r0, 2\n\
         sll r3, r1, r2\nsrl r4, r1, r2\nsra r5, r1, r2\n\
         addi r6, r0, 32\nsll r7, r1, r6\nsrl r8, r1, r6",
    );
    assert_eq!(cpu.gpr[1], 0xFFFF_FFF0);
    assert_eq!(cpu.gpr[3], 0xFFFF_FFC0);
    assert_eq!(cpu.gpr[4], 0x3FFF_FFFC);
    assert_eq!(cpu.gpr[5] as i32, -4);
    assert_eq!(cpu.gpr[7], 0);
    assert_eq!(cpu.gpr[8], 0);
}

#[test]
fn arithmetic_shift_rounds_toward_zero() {
    let cpu = run("addi r1, r0, -7\nsrai r2, r1, 1\naddi r3, r0, 7\nsrai r4, r3, 1\nsrai r5, r1, 40");
    assert_eq!(cpu.gpr[2] as i32, -3);
    assert_eq!(cpu.gpr[4], 3);
    assert_eq!(cpu.gpr[5], 0);
}

#[test]
fn set_less_than_signed_and_unsigned() {
    let cpu = run(
        "addi r1, r0, -16\naddi r2, r0, 2\n\
         slt r3, r2, r1\nslts r4, r2, r1\nslts r5, r1, r2\nslt r6, r1, r1",
    );
    assert_eq!(cpu.gpr[3], 1, "2 < 0xFFFFFFF0 unsigned");
    assert_eq!(cpu.gpr[4], 0, "2 < -16 signed");
    assert_eq!(cpu.gpr[5], 1, "-16 < 2 signed");
    assert_eq!(cpu.gpr[6], 0);
}

#[test]
fn immediate_forms() {
    let cpu = run(
        "addi r1, r0, -1\naddi r2, r1, 2\n\
         andi r3, r1, 0x0F\nori r4, r0, 0x80\nxori r5, r1, 0xFF\n\
         slli r6, r2, 4\nsrli r7, r1, 28",
    );
    assert_eq!(cpu.gpr[1], 0xFFFF_FFFF);
    assert_eq!(cpu.gpr[2], 1);
    // logic immediates are zero-extended
    assert_eq!(cpu.gpr[3], 0x0F);
    assert_eq!(cpu.gpr[4], 0x80);
    assert_eq!(cpu.gpr[5], 0xFFFF_FF00);
    assert_eq!(cpu.gpr[6], 16);
    assert_eq!(cpu.gpr[7], 0xF);
}

#[test]
fn set_less_than_immediate() {
    let cpu = run(
        "addi r1, r0, 5\naddi r3, r0, -1\n\
         slti r2, r1, 6\nsltsi r4, r3, 0\nsltsi r5, r1, -1\nslti r6, r3, 200",
    );
    assert_eq!(cpu.gpr[2], 1);
    assert_eq!(cpu.gpr[4], 1);
    assert_eq!(cpu.gpr[5], 0);
    assert_eq!(cpu.gpr[6], 0);
}

#[test]
fn seqz_tests_for_zero() {
    let cpu = run("seqz r1, r0\nseqz r2, r1");
    assert_eq!(cpu.gpr[1], 1);
    assert_eq!(cpu.gpr[2], 0);
}

#[test]
fn upper_and_lower_halves_are_independent() {
    let cpu = run("lli r1, 0x1234\nlui r1, 0xABCD\nlli r1, 0x5678\nlui r2, 1");
    assert_eq!(cpu.gpr[1], 0xABCD_5678);
    assert_eq!(cpu.gpr[2], 0x0001_0000);
}

#[test]
fn nop_changes_nothing() {
    let cpu = run("addi r1, r0, 9\nnop r1, r1, r1");
    assert_eq!(cpu.gpr[1], 9);
    assert_eq!(cpu.pc, 8);
}

#[test]
fn r0_stays_zero_after_every_step() {
    let prog = assemble(
        "addi r0, r0, 5\nlui r0, 1\nseqz r0, r0\nnot r0, r0, r0\nlw r0, r0, 0\njal r0, 24\nj 28\n",
    )
    .unwrap();
    let mut mem = LinearMemory::default();
    mem.mem[..4].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    let mut cpu = Cpu::new(CpuConfig::default());
    let (dec, exec) = (WordDecoder::new(), IntExecutor);
    while (cpu.pc as usize) < prog.len() {
        cpu.step(&prog, &mut mem, &dec, &exec).unwrap();
        assert_eq!(cpu.gpr[0], 0, "after pc {:#x}", cpu.pc);
    }
    assert_eq!(cpu.steps, 7);
}
