use crate::flash::FlashDriver;

/// Flash emulation on a RAM array with NOR semantics: erase sets a whole
/// sector to 0xFF, writes copy bytes as-is.
///
/// Useful for host-side tests and for bring-up on boards where the real
/// flash region is still owned by something else.
pub struct RamFlash<const SECTOR_SIZE: usize, const TOTAL_SIZE: usize> {
    base_address: u32,
    data: [u8; TOTAL_SIZE],
}

impl<const SECTOR_SIZE: usize, const TOTAL_SIZE: usize> RamFlash<SECTOR_SIZE, TOTAL_SIZE> {
    /// Create a fully erased device mapped at `base_address`.
    pub fn new(base_address: u32) -> Self {
        Self {
            base_address,
            data: [0xFF; TOTAL_SIZE],
        }
    }

    /// Place `data` at `offset_bytes`, bypassing erase semantics.
    pub fn set_data<const N: usize>(&mut self, offset_bytes: usize, data: &[u8; N]) {
        self.data[offset_bytes..offset_bytes + N].copy_from_slice(data);
    }

    /// Raw view of `N` bytes at `offset_bytes`.
    pub fn get_data<const N: usize>(&self, offset_bytes: usize) -> &[u8] {
        &self.data[offset_bytes..offset_bytes + N]
    }

    fn offset(&self, address: u32) -> usize {
        (address - self.base_address) as usize
    }
}

impl<const SECTOR_SIZE: usize, const TOTAL_SIZE: usize> FlashDriver
    for RamFlash<SECTOR_SIZE, TOTAL_SIZE>
{
    fn read_block(&mut self, address: u32, buf: &mut [u8]) {
        let start = self.offset(address);
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
    }

    fn erase_sector(&mut self, address: u32) {
        // whole sector containing the address, aligned down
        let start = self.offset(address) / SECTOR_SIZE * SECTOR_SIZE;
        self.data[start..start + SECTOR_SIZE].fill(0xFF);
    }

    fn write_block(&mut self, address: u32, data: &[u8]) {
        let start = self.offset(address);
        self.data[start..start + data.len()].copy_from_slice(data);
    }
}
