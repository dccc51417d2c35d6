#![no_main]

use lc2k_core::{decode, disassemble_word, run, MachineConfig, MachineState, NullTrace};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let program: Vec<i32> = data
        .chunks_exact(4)
        .map(|chunk| i32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    for &word in &program {
        let _ = decode(word);
        let _ = disassemble_word(word);
    }

    let mut state = MachineState::new(program);
    let config = MachineConfig {
        step_limit: Some(10_000),
        stack_limit: 1 << 16,
        ..MachineConfig::default()
    };
    let _ = run(&mut state, &config, &mut NullTrace);
});
