/// Block-level flash primitives consumed by the command handlers.
///
/// The contract mirrors internal-flash HAL drivers: every call blocks until
/// the operation completes and reports no failure mode. Erase granularity is
/// one sector (= one logical block of the exposed geometry), and a sector
/// must have been erased since its last write before any byte in it is
/// written again.
///
/// Addresses are absolute physical flash addresses; the handlers compute
/// them through [`crate::geometry::BlockGeometry`] and never hand an
/// out-of-region address to this trait.
pub trait FlashDriver {
    /// Copy `buf.len()` bytes starting at `address` into `buf`.
    fn read_block(&mut self, address: u32, buf: &mut [u8]);

    /// Erase the one sector containing `address`. Blocking.
    fn erase_sector(&mut self, address: u32);

    /// Write `data` starting at `address`. Every covered sector must have
    /// been erased first. Blocking.
    fn write_block(&mut self, address: u32, data: &[u8]);
}
