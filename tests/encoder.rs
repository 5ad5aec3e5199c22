use isa32::encoder::LabelKV;
use isa32::{assemble, collect_labels, encode, tokenize, AsmError, Opcode, Pos, Shape, SyntaxError};
use pretty_assertions::assert_eq;

fn syntax(src: &str) -> SyntaxError {
    match assemble(src) {
        Err(AsmError::Syntax(e)) => e,
        other => panic!("expected syntax error, got {other:?}"),
    }
}

fn words(bin: &[u8]) -> Vec<u32> {
    bin.chunks_exact(4)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[test]
fn label_offsets_count_preceding_opcodes() {
    let src = "a:\nb:\n  nop r0, r0, r0\nc: addi r1, r0, 1\n  j b\n  j c\n  j d\nd:\n";
    let labels = collect_labels(&tokenize(src).unwrap()).unwrap();
    assert_eq!(labels.len(), 4);
    assert_eq!(labels.get("a"), Some(0));
    assert_eq!(labels.get("b"), Some(0));
    assert_eq!(labels.get("c"), Some(4));
    assert_eq!(labels.get("d"), Some(20));
    assert_eq!(labels.get("e"), None);
    assert_eq!(
        labels.entries(),
        vec![
            LabelKV { addr: 0, name: "a".into() },
            LabelKV { addr: 0, name: "b".into() },
            LabelKV { addr: 4, name: "c".into() },
            LabelKV { addr: 20, name: "d".into() },
        ]
    );

    // forward and backward references resolve to the same table
    let bin = assemble(src).unwrap();
    assert_eq!(&words(&bin)[2..], &[0xF200_0000, 0xF200_0004, 0xF200_0014]);
}

#[test]
fn labels_fill_immediate_fields_of_any_shape() {
    let src = "\
        jal r31, fn\n\
        beq r1, r2, fn\n\
        lli r3, fn\n\
        fn:\n\
        jalr r0, r31, 0\n";
    assert_eq!(
        words(&assemble(src).unwrap()),
        vec![0xF11F_000C, 0xE001_020C, 0xD403_000C, 0xF000_1F00]
    );
}

#[test]
fn signed_and_hex_immediates() {
    assert_eq!(words(&assemble("addi r1, r0, -1").unwrap()), vec![0x8101_00FF]);
    assert_eq!(words(&assemble("lw r2, r3, -4").unwrap()), vec![0xD202_03FC]);
    assert_eq!(words(&assemble("lli r4, -2").unwrap()), vec![0xD404_FFFE]);
    assert_eq!(words(&assemble("andi r1, r1, 0xF0").unwrap()), vec![0xA001_01F0]);
    assert_eq!(words(&assemble("j 0xFFFFFF").unwrap()), vec![0xF2FF_FFFF]);
}

#[test]
fn mnemonics_and_registers_ignore_case() {
    assert_eq!(assemble("AdD R1, r2, R3").unwrap(), assemble("add r1, r2, r3").unwrap());
}

#[test]
fn missing_operand_reports_shape_and_counts() {
    assert_eq!(
        syntax("add r1, r2"),
        SyntaxError::MissingOperand {
            pos: Pos::new(1, 1),
            op: Opcode::Add,
            shape: Shape::Dss,
            expected: 3,
            found: 2,
        }
    );
    // the next instruction does not lend its words
    assert!(matches!(
        syntax("addi r1, r2\nnop r0, r0, r0"),
        SyntaxError::MissingOperand { expected: 3, found: 2, .. }
    ));
}

#[test]
fn unresolved_label() {
    assert_eq!(
        syntax("start:\n  j nowhere"),
        SyntaxError::UnresolvedLabel { pos: Pos::new(2, 2), name: "nowhere".into() }
    );
}

#[test]
fn duplicate_label_points_at_both_declarations() {
    assert_eq!(
        syntax("x:\nnop r0, r0, r0\nx:"),
        SyntaxError::DuplicateLabel { pos: Pos::new(3, 1), name: "x".into(), first: Pos::new(1, 1) }
    );
}

#[test]
fn register_out_of_range() {
    assert_eq!(
        syntax("add r1, r2, r32"),
        SyntaxError::RegisterOutOfRange { pos: Pos::new(1, 4), name: "r32".into() }
    );
}

#[test]
fn unknown_mnemonic() {
    assert_eq!(
        syntax("mov r1, r2"),
        SyntaxError::UnknownMnemonic { pos: Pos::new(1, 1), name: "mov".into() }
    );
}

#[test]
fn stray_operands_are_rejected() {
    assert!(matches!(
        syntax("add r1, r2, r3, r4"),
        SyntaxError::UnexpectedToken { pos: Pos { line: 1, word: 5 }, expected: "opcode or label", .. }
    ));
    assert!(matches!(
        syntax("add r1, 5, r3"),
        SyntaxError::UnexpectedToken { expected: "register", .. }
    ));
    assert!(matches!(
        syntax("addi r1, r2, r3"),
        SyntaxError::UnexpectedToken { expected: "immediate or label", .. }
    ));
}

#[test]
fn immediates_must_fit_their_field() {
    assert_eq!(
        syntax("addi r1, r0, 256"),
        SyntaxError::ImmediateOutOfRange { pos: Pos::new(1, 4), value: 256, bits: 8 }
    );
    assert_eq!(
        syntax("addi r1, r0, -129"),
        SyntaxError::ImmediateOutOfRange { pos: Pos::new(1, 4), value: -129, bits: 8 }
    );
    assert!(matches!(syntax("lui r1, 0x10000"), SyntaxError::ImmediateOutOfRange { bits: 16, .. }));
    assert!(matches!(syntax("j 16777216"), SyntaxError::ImmediateOutOfRange { bits: 24, .. }));
}

#[test]
fn far_label_overflows_branch_field() {
    let mut src = "beq r0, r0, far\n".to_string();
    src.push_str(&"nop r0, r0, r0\n".repeat(64));
    src.push_str("far:\n");
    assert!(matches!(
        syntax(&src),
        SyntaxError::ImmediateOutOfRange { value: 260, bits: 8, .. }
    ));
    // the same label is reachable from a 24-bit jump
    assert!(assemble(&src.replacen("beq r0, r0, far", "j far", 1)).is_ok());
}

#[test]
fn encoding_is_deterministic() {
    let toks = tokenize("loop: addi r1, r1, 1\n blt r1, r2, loop\n").unwrap();
    assert_eq!(encode(&toks).unwrap(), encode(&toks).unwrap());
    assert_eq!(encode(&toks).unwrap().len(), 8);
}

#[test]
fn lex_errors_pass_through_assemble() {
    assert!(matches!(assemble("j 0xG"), Err(AsmError::Lex(_))));
}
