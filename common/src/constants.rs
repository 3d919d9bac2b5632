pub const MEM_SIZE: usize = 4096; // Words

// Locations 0o10-0o17 pre-increment when referenced indirectly.
pub const AUTOINDEX_MASK: u16 = 0o7770;
pub const AUTOINDEX_BASE: u16 = 0o10;

// An accepted interrupt stores PC here and resumes at the vector.
pub const INTERRUPT_SAVE: u16 = 0o0;
pub const INTERRUPT_VECTOR: u16 = 0o1;

// IOT device selectors. 0o0 belongs to the CPU (ION/IOF) and is not
// claimable by devices.
pub const DEV_CPU: u16 = 0o0;
pub const DEV_TTY_KEYBOARD: u16 = 0o3;
pub const DEV_TTY_PRINTER: u16 = 0o4;

// Entry points of the paper-tape loaders in high memory.
pub const RIM_LOADER_START: u16 = 0o7756;
pub const BIN_LOADER_START: u16 = 0o7777;
