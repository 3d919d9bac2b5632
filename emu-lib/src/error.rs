use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmuError {
    #[error("device number conflict: {0:02o}")]
    DeviceConflict(u16),

    #[error("device i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected HLT at PC {0:04o}")]
    UnexpectedHalt(u16),

    #[error("RIM loader didn't finish, PC: {0:04o}")]
    RimLoaderStalled(u16),

    #[error("BIN loader failed, PC: {pc:04o}, LAC: {lac:05o}")]
    BinLoadFailed { pc: u16, lac: u16 },
}
