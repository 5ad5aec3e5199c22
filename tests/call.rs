use isa32::decoder::Operands;
use isa32::exec::{Executor, IntExecutor};
use isa32::{assemble, simulate, Cpu, CpuConfig, Decoded, Halt, LinearMemory, Opcode, Shape, Trap, WordDecoder};

#[test]
fn call_and_return() {
    let src = "
        jal r31, func       ; link holds this instruction's address
        addi r2, r0, 2
        j end
    func:
        addi r1, r0, 1
        jalr r0, r31, 0     ; resumes after the call
    end:
    ";
    let (out, snap) = simulate(&assemble(src).unwrap(), CpuConfig::default()).unwrap();
    assert_eq!(out.halt, Halt::EndOfProgram);
    assert_eq!(out.steps, 5);
    assert_eq!(snap.registers[31], 0);
    assert_eq!(snap.registers[1], 1);
    assert_eq!(snap.registers[2], 2);
    assert_eq!(snap.pc, 20);
}

#[test]
fn jal_links_own_address() {
    let prog = assemble("nop r0, r0, r0\njal r5, 12\nnop r0, r0, r0\nnop r0, r0, r0").unwrap();
    let mut cpu = Cpu::new(CpuConfig::default());
    let mut mem = LinearMemory::default();
    let (dec, exec) = (WordDecoder::new(), IntExecutor);
    cpu.step(&prog, &mut mem, &dec, &exec).unwrap();
    cpu.step(&prog, &mut mem, &dec, &exec).unwrap();
    assert_eq!(cpu.gpr[5], 4);
    assert_eq!(cpu.pc, 12);
}

#[test]
fn jalr_resumes_one_word_past_base() {
    let prog = assemble("addi r1, r0, 8\njalr r5, r1, 4\nnop r0, r0, r0\nnop r0, r0, r0\nnop r0, r0, r0")
        .unwrap();
    let mut cpu = Cpu::new(CpuConfig::default());
    let mut mem = LinearMemory::default();
    let (dec, exec) = (WordDecoder::new(), IntExecutor);
    cpu.step(&prog, &mut mem, &dec, &exec).unwrap();
    cpu.step(&prog, &mut mem, &dec, &exec).unwrap();
    assert_eq!(cpu.gpr[5], 4);
    assert_eq!(cpu.pc, 16);
}

#[test]
fn jalr_to_odd_address_traps_unaligned() {
    let prog = assemble("jalr r0, r0, 1\nnop r0, r0, r0\nnop r0, r0, r0").unwrap();
    let err = simulate(&prog, CpuConfig::default()).unwrap_err();
    assert!(matches!(err, Trap::Unaligned { pc: 5 }), "{err}");
}

#[test]
fn undecodable_word_traps_with_pc() {
    let mut prog = assemble("nop r0, r0, r0").unwrap();
    prog.extend_from_slice(&[0xFF, 0, 0, 0]);
    let err = simulate(&prog, CpuConfig::default()).unwrap_err();
    assert!(matches!(err, Trap::InvalidInstruction { pc: 4, .. }), "{err}");
}

#[test]
fn partial_trailing_word_traps() {
    let mut prog = assemble("nop r0, r0, r0").unwrap();
    prog.push(0);
    let err = simulate(&prog, CpuConfig::default()).unwrap_err();
    assert!(matches!(err, Trap::Truncated { pc: 4, len: 5 }), "{err}");
}

#[test]
fn mismatched_operands_are_unimplemented() {
    let mut cpu = Cpu::new(CpuConfig::default());
    let mut mem = LinearMemory::default();
    let d = Decoded { op: Opcode::Add, operands: Operands::I { imm: 0 }, raw: 0 };
    let err = IntExecutor.exec(&mut cpu, &mut mem, 0, d).unwrap_err();
    assert!(matches!(err, Trap::Unimplemented { op: Opcode::Add, shape: Shape::I }), "{err}");
}
