// DEC's own diagnostics, run as ground truth. The tapes aren't ours to
// redistribute, so these tests skip when fixtures/ hasn't been populated;
// see fixtures/README.md.

#[cfg(test)]
mod maindec {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use crate::helpers::{machine, Machine};
    use common::word::mask12;
    use emu_lib::io::{PipeSink, TapeSource};

    fn fixture(name: &str) -> Option<PathBuf> {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures")
            .join(name);
        if path.exists() {
            Some(path)
        } else {
            eprintln!("skipping: missing fixture {}", path.display());
            None
        }
    }

    // BIN-load a MAINDEC tape through the real BIN loader, itself
    // RIM-loaded from dec-08-lbaa.
    fn load_maindec(name: &str) -> Option<Machine> {
        let bin_loader = fixture("dec-08-lbaa.rim")?;
        let tape = fixture(name)?;
        let mut m = machine();
        m.emu
            .load_bin_tape(
                &m.tty,
                Arc::new(TapeSource::from_file(bin_loader).expect("read BIN loader")),
                Arc::new(TapeSource::from_file(tape).expect("read tape")),
            )
            .expect("BIN load");
        Some(m)
    }

    // Instruction test part 2A: first HLT after the short preamble, then
    // a clean pass ending at 4771.
    #[test]
    fn maindec_08_d01a_instruction_test() {
        let Some(mut m) = load_maindec("maindec-08-d01a-pb.bin") else {
            return;
        };
        m.emu.set_pc(0o1200);
        m.emu.set_sr(0o7777);

        let (halted, _) = m.emu.run(500_000).unwrap();
        assert!(halted, "no first HLT");
        assert_eq!(mask12(m.emu.lac()), 0);
        assert_eq!(mask12(m.emu.pc().wrapping_sub(1)), 0o1202);

        let (halted, _) = m.emu.run(50_000_000).unwrap();
        assert!(halted, "no final HLT");
        assert_eq!(mask12(m.emu.pc().wrapping_sub(1)), 0o4771);
    }

    // Instruction test part 2B loops forever when healthy; the HLTs at
    // 406 (TAD) and 2433 (ROT) are failure reports.
    #[test]
    fn maindec_08_d02b_instruction_test() {
        let Some(mut m) = load_maindec("maindec-08-d02b-pb.bin") else {
            return;
        };
        m.emu.set_pc(0o200);
        m.emu.set_sr(0o4400);

        let (halted, _) = m.emu.run(500_000).unwrap();
        let stop = mask12(m.emu.pc().wrapping_sub(1));
        assert_ne!(stop, 0o406, "TAD test failed");
        assert_ne!(stop, 0o2433, "ROT test failed");
        assert!(!halted, "unexpected HLT at {stop:04o}");
    }

    // The tape-punch half of the reader/punch test emits the binary
    // count pattern; every byte and every bit of the punch path shows up
    // in the output.
    #[test]
    fn maindec_08_d2ba_punch_binary_count() {
        let Some(mut m) = load_maindec("maindec-08-d2ba-pb.bin") else {
            return;
        };
        let punch = Arc::new(PipeSink::default());
        {
            let mut tty = m.tty.lock().unwrap();
            tty.punch_attach(punch.clone());
            tty.punch_start();
        }
        m.emu.set_pc(0o200);
        m.emu.set_sr(0o2000);

        let mut halted = false;
        for _ in 0..2_000 {
            (halted, _) = m.emu.run(50_000).unwrap();
            if halted || punch.len() > 5000 {
                break;
            }
        }
        assert!(!halted, "HLT at {:04o}", mask12(m.emu.pc().wrapping_sub(1)));
        assert!(punch.len() > 5000, "punch produced {} bytes", punch.len());
        for (i, val) in punch.take().iter().enumerate() {
            assert_eq!(*val, (i & 0xff) as u8, "punch byte {i}");
        }
    }

    // The reader half consumes a binary count tape: a sync HLT at 1663,
    // then a full 4096-byte pass with no failure HLT.
    #[test]
    fn maindec_08_d2ba_reader_binary_count() {
        let Some(mut m) = load_maindec("maindec-08-d2ba-pb.bin") else {
            return;
        };
        let count_tape: Vec<u8> = (0..8192usize).map(|i| (i & 0xff) as u8).collect();
        {
            let mut tty = m.tty.lock().unwrap();
            tty.reader_attach_tape(Arc::new(TapeSource::new(count_tape)));
            tty.reader_start();
        }
        m.emu.set_pc(0o1625);
        m.emu.set_sr(0o4002);

        let (halted, _) = m.emu.run(500_000).unwrap();
        assert!(halted, "no sync HLT");
        assert_eq!(mask12(m.emu.pc().wrapping_sub(1)), 0o1663);

        for _ in 0..2_000 {
            if m.tty.lock().unwrap().reader_pos() >= 4096 {
                break;
            }
            let (halted, _) = m.emu.run(50_000).unwrap();
            assert!(
                !halted,
                "HLT at {:04o} after {} reader bytes",
                mask12(m.emu.pc().wrapping_sub(1)),
                m.tty.lock().unwrap().reader_pos()
            );
        }
        assert!(m.tty.lock().unwrap().reader_pos() >= 4096);
    }
}
