use alloc::vec::Vec;

use crate::Result;
use crate::driver::Driver;

/// 位图区域，每一位记录其指示区域中一个槽位是否已被占用。
///
/// 只分配不回收：槽位一旦置位就一直占用到文件系统的生命尽头，
/// 因此 `capacity` 就是能创建的索引节点(或数据块)的总数上限。
#[derive(Debug)]
pub struct Bitmap {
    /// 位图的起始地址(字节)
    offset: u32,
    /// 位图占用逻辑块数
    blocks: u32,
    /// 可分配的槽位数
    capacity: u32,
    /// 挂载期间驻留内存的位图
    bits: Vec<u8>,
}

impl Bitmap {
    #[inline]
    pub fn new(offset: u32, blocks: u32, capacity: u32) -> Self {
        Self {
            offset,
            blocks,
            capacity,
            bits: Vec::new(),
        }
    }

    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    #[inline]
    pub fn blocks(&self) -> u32 {
        self.blocks
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// 从磁盘读入整个位图
    pub fn load(&mut self, driver: &Driver) -> Result<()> {
        self.bits = driver.read(self.offset as usize, driver.blocks(self.blocks as usize))?;
        Ok(())
    }

    /// 将位图写回磁盘
    pub fn store(&self, driver: &Driver) -> Result<()> {
        driver.write(self.offset as usize, &self.bits)
    }

    /// 卸载后不再需要驻留内存
    #[inline]
    pub fn release(&mut self) {
        self.bits = Vec::new();
    }

    /// 按字节、再按位升序寻找第一个空闲槽位，置位后返回其编号。
    /// 空闲位不在容量之内时位图保持原样并返回空。
    pub fn alloc(&mut self) -> Option<u32> {
        let (byte_index, bit) = self
            .bits
            .iter()
            .enumerate()
            .find_map(|(i, &byte)| (byte != u8::MAX).then_some((i, byte.trailing_ones())))?;

        let slot = byte_index as u32 * 8 + bit;
        if slot >= self.capacity {
            return None;
        }

        self.bits[byte_index] |= 1 << bit;
        Some(slot)
    }

    pub fn is_allocated(&self, slot: u32) -> bool {
        self.bits
            .get(slot as usize / 8)
            .is_some_and(|&byte| (byte >> (slot % 8)) & 1 == 1)
    }

    /// 已占用的槽位数
    pub fn count(&self) -> u32 {
        self.bits.iter().map(|byte| byte.count_ones()).sum()
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use block_dev::RamDisk;

    use super::*;

    fn driver() -> Driver {
        Driver::open(Arc::new(RamDisk::new(8 * 1024, 512))).unwrap()
    }

    #[test]
    fn alloc_until_capacity() {
        let driver = driver();
        let mut bitmap = Bitmap::new(1024, 1, 20);
        bitmap.load(&driver).unwrap();

        let slots: Vec<u32> = (0..20).map(|_| bitmap.alloc().unwrap()).collect();
        assert_eq!(slots, (0..20).collect::<Vec<_>>());
        assert!(slots.iter().all(|&slot| bitmap.is_allocated(slot)));

        let before = bitmap.bits.clone();
        assert_eq!(bitmap.alloc(), None);
        assert_eq!(bitmap.bits, before);
        assert_eq!(bitmap.count(), 20);
    }

    #[test]
    fn skip_occupied_bits() {
        let driver = driver();
        driver.write(2048, &[0b1011_1111, 0xFF, 0b0000_0001]).unwrap();

        let mut bitmap = Bitmap::new(2048, 1, 8 * 1024);
        bitmap.load(&driver).unwrap();
        assert_eq!(bitmap.alloc(), Some(6));
        assert_eq!(bitmap.alloc(), Some(17));
        assert_eq!(bitmap.alloc(), Some(18));
        assert!(bitmap.is_allocated(16));
        assert!(!bitmap.is_allocated(19));
    }

    #[test]
    fn store_then_load() {
        let driver = driver();
        let mut bitmap = Bitmap::new(1024, 1, 100);
        bitmap.load(&driver).unwrap();
        for _ in 0..10 {
            bitmap.alloc();
        }
        bitmap.store(&driver).unwrap();
        bitmap.release();
        assert_eq!(bitmap.count(), 0);

        let mut reloaded = Bitmap::new(1024, 1, 100);
        reloaded.load(&driver).unwrap();
        assert_eq!(reloaded.count(), 10);
        assert_eq!(reloaded.alloc(), Some(10));
    }

    #[test]
    fn unloaded_bitmap_is_full() {
        let mut bitmap = Bitmap::new(0, 1, 8);
        assert_eq!(bitmap.alloc(), None);
        assert!(!bitmap.is_allocated(0));
    }
}
