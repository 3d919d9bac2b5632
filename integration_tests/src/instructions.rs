#[cfg(test)]
mod instructions {
    use std::sync::Arc;

    use crate::helpers::machine;
    use common::asm::*;
    use emu_lib::io::TapeSource;

    #[test]
    fn auto_index_store() {
        let mut m = machine();
        // TAD 250; DCA I Z 10; HLT
        m.emu.load_image(&[0o1250, 0o3410, HLT], 0o200);
        m.emu.mem_write(0o250, 0o4321);
        m.emu.mem_write(0o10, 0o377);
        m.emu.set_pc(0o200);
        let (halted, _) = m.emu.run(100).unwrap();
        assert!(halted);
        // The register pre-incremented to 0400 before the deposit.
        assert_eq!(m.emu.mem_read(0o10), 0o400);
        assert_eq!(m.emu.mem_read(0o400), 0o4321);
        assert_eq!(m.emu.mem_read(0o377), 0);
    }

    // Block copy driven by two auto-index registers and an ISZ counter.
    #[test]
    fn auto_index_copy_loop() {
        let mut m = machine();
        // loop: TAD I Z 10; DCA I Z 11; ISZ Z 20; JMP loop; HLT
        m.emu.load_image(&[0o1410, 0o3411, 0o2020, 0o5200, HLT], 0o200);
        m.emu.mem_write(0o10, 0o377); // Source pointer, pre-increments to 0400
        m.emu.mem_write(0o11, 0o477); // Destination pointer
        m.emu.mem_write(0o20, 0o7775); // -3
        m.emu.load_image(&[0o1111, 0o2222, 0o3333], 0o400);
        m.emu.set_pc(0o200);
        let (halted, _) = m.emu.run(1000).unwrap();
        assert!(halted);
        assert_eq!(m.emu.mem_read(0o500), 0o1111);
        assert_eq!(m.emu.mem_read(0o501), 0o2222);
        assert_eq!(m.emu.mem_read(0o502), 0o3333);
        assert_eq!(m.emu.mem_read(0o10), 0o402);
        assert_eq!(m.emu.mem_read(0o11), 0o502);
    }

    #[test]
    fn cma_twice_is_identity() {
        let mut m = machine();
        m.emu.load_image(&[0o1250, CMA, CMA, HLT], 0o200);
        m.emu.mem_write(0o250, 0o2525);
        m.emu.set_pc(0o200);
        let (halted, _) = m.emu.run(100).unwrap();
        assert!(halted);
        assert_eq!(m.emu.lac(), 0o2525);
    }

    #[test]
    fn cml_twice_is_identity() {
        let mut m = machine();
        m.emu.load_image(&[CLL, CML, CML, HLT], 0o200);
        m.emu.set_pc(0o200);
        let (halted, _) = m.emu.run(100).unwrap();
        assert!(halted);
        assert_eq!(m.emu.lac(), 0);
    }

    #[test]
    fn rotate_round_trips() {
        for pair in [[RAR, RAL], [RAL, RAR]] {
            let mut m = machine();
            // CLL CML so the link takes part in the rotation too.
            m.emu.load_image(&[0o1250, 0o7120, pair[0], pair[1], HLT], 0o200);
            m.emu.mem_write(0o250, 0o2525);
            m.emu.set_pc(0o200);
            let (halted, _) = m.emu.run(100).unwrap();
            assert!(halted);
            assert_eq!(m.emu.lac(), 0o12525);
        }
    }

    // A reader interrupt stores the PC at 0 and vectors to 1 with
    // interrupts off.
    #[test]
    fn interrupt_stores_pc_and_vectors() {
        let mut m = machine();
        {
            let mut tty = m.tty.lock().unwrap();
            tty.reader_attach_tape(Arc::new(TapeSource::new(vec![0o42])));
            tty.reader_start();
        }
        // KCC arms the reader; ION; spin. The service routine is a HLT
        // at the vector.
        m.emu.load_image(&[KCC, ION, 0o5202], 0o200);
        m.emu.mem_write(1, HLT);
        m.emu.set_pc(0o200);
        let (halted, _) = m.emu.run(100).unwrap();
        assert!(halted);
        assert_eq!(m.emu.mem_read(0), 0o202);
        assert_eq!(m.emu.pc(), 2);
        assert!(!m.emu.interrupts_enabled());
        assert_eq!(m.tty.lock().unwrap().reader_pos(), 1);
    }
}
