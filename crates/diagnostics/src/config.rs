//! Compile-time configuration of the crash store and the target memory map.

use platform::CodeRegion;

/// Number of fault records the retained store can hold.
///
/// Once full, further faults are not recorded until the store is exported
/// and cleared. There is no overwrite and no wraparound.
pub const MAX_RECORDS: usize = 4;

/// Maximum number of return addresses kept per fault.
pub const CALL_DEPTH: usize = 6;

/// Magic number marking the retained area as initialised.
///
/// The value sits at a link-time address; a rebuilt image usually moves
/// it, so flashing new firmware (a hardware reset, not a power-on reset)
/// does not resurrect records written by the previous image.
pub const SENTINEL: u32 = 0x01C2_8122;

/// Header tag returned with a store snapshot.
pub const SNAPSHOT_TAG: u16 = 0xDC1D;

/// Bytes reserved for the retained, uninitialised linker section.
///
/// Must not exceed the `RETAINED` region reserved in the firmware's `memory.x`.
pub const RETAINED_UNINIT_SIZE: usize = 512;

/// Where code lives and where the boot vector table can be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MemoryMap {
    /// Code executing from SysRAM.
    pub ram_code: CodeRegion,
    /// Code executing from the boot ROM (BLE stack, SDK routines).
    pub rom_code: CodeRegion,
    /// Boot vector table location with the default remap.
    pub boot_vector: u32,
    /// Boot vector table location when SysRAM3 is mapped at address 0.
    pub boot_vector_remapped: u32,
}

impl MemoryMap {
    /// DA14531 memory map.
    ///
    /// The RAM code region starts after the vector table and the retained
    /// jump-table block at the bottom of SysRAM1.
    pub const DA14531: Self = Self {
        ram_code: CodeRegion::new(0x07FC_0000 + 0xC0 + 80, 0x07FC_BFFF),
        rom_code: CodeRegion::new(0x07F0_0000, 0x07F2_4000),
        boot_vector: 0x07FC_0000,
        boot_vector_remapped: 0x07FC_7000,
    };

    /// Address of the word holding the initial stack pointer, which is also
    /// the top of the stack the scan must not read past.
    pub const fn boot_vector_addr(&self, remapped: bool) -> u32 {
        if remapped {
            self.boot_vector_remapped
        } else {
            self.boot_vector
        }
    }

    /// Returns `true` if `value` looks like a Thumb return address: odd,
    /// and pointing into one of the code regions.
    pub const fn is_return_address(&self, value: u32) -> bool {
        value & 1 == 1 && (self.ram_code.contains(value) || self.rom_code.contains(value))
    }
}
