//! # 块 I/O 适配层
//!
//! 上层以字节偏移与长度读写磁盘，此处将其扩展到逻辑块的边界，
//! 再拆成一个个 I/O 单元交给块设备驱动。
//!
//! 写操作先读出整个对齐窗口，只覆盖请求的那一段再整体写回，
//! 以免破坏同一块中的其它数据。

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Range;

use block_dev::{BlockDevice, Query};

use crate::{Error, Result};

pub struct Driver {
    device: Arc<dyn BlockDevice>,
    /// 设备容量(字节)
    capacity: usize,
    /// 单次 I/O 大小(字节)
    io_size: usize,
}

impl Driver {
    pub fn open(device: Arc<dyn BlockDevice>) -> Result<Self> {
        let capacity = device.query(Query::Capacity)?;
        let io_size = device.query(Query::IoSize)?;
        if io_size == 0 {
            return Err(Error::InvalidArgument("device reports a zero I/O unit"));
        }

        Ok(Self {
            device,
            capacity,
            io_size,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn io_size(&self) -> usize {
        self.io_size
    }

    /// 逻辑块大小，为两个 I/O 单元
    #[inline]
    pub fn block_size(&self) -> usize {
        2 * self.io_size
    }

    /// `count` 个逻辑块的字节数
    #[inline]
    pub fn blocks(&self, count: usize) -> usize {
        count * self.block_size()
    }

    /// 读出 `[offset, offset + len)`
    pub fn read(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        let window = self.window(offset, len);
        let buf = self.read_window(&window)?;
        let bias = offset - window.start;

        Ok(buf[bias..bias + len].to_vec())
    }

    /// 将 `data` 写到 `offset` 处
    pub fn write(&self, offset: usize, data: &[u8]) -> Result<()> {
        let window = self.window(offset, data.len());
        let mut buf = self.read_window(&window)?;
        let bias = offset - window.start;
        buf[bias..bias + data.len()].copy_from_slice(data);

        let first = window.start / self.io_size;
        for (i, unit) in buf.chunks(self.io_size).enumerate() {
            self.device
                .write_block(first + i, unit)
                .inspect_err(|err| log::error!("writing I/O unit {}: {err}", first + i))?;
        }

        Ok(())
    }

    pub fn close(&self) -> Result<()> {
        self.device
            .close()
            .inspect_err(|err| log::error!("closing device: {err}"))?;
        Ok(())
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("capacity", &self.capacity)
            .field("io_size", &self.io_size)
            .finish_non_exhaustive()
    }
}

impl Driver {
    /// 覆盖 `[offset, offset + len)` 的最小逻辑块窗口
    fn window(&self, offset: usize, len: usize) -> Range<usize> {
        let block_size = self.block_size();
        let start = offset / block_size * block_size;
        let end = (offset + len).next_multiple_of(block_size);

        start..end
    }

    fn read_window(&self, window: &Range<usize>) -> Result<Vec<u8>> {
        let mut buf = vec![0; window.len()];
        let first = window.start / self.io_size;
        for (i, unit) in buf.chunks_mut(self.io_size).enumerate() {
            self.device
                .read_block(first + i, unit)
                .inspect_err(|err| log::error!("reading I/O unit {}: {err}", first + i))?;
        }

        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use block_dev::{DeviceError, RamDisk};

    use super::*;

    fn driver() -> (Arc<RamDisk>, Driver) {
        let disk = Arc::new(RamDisk::new(16 * 1024, 512));
        let driver = Driver::open(disk.clone()).unwrap();
        (disk, driver)
    }

    #[test]
    fn geometry() {
        let (_, driver) = driver();
        assert_eq!(driver.capacity(), 16 * 1024);
        assert_eq!(driver.io_size(), 512);
        assert_eq!(driver.block_size(), 1024);
        assert_eq!(driver.blocks(3), 3072);
        assert_eq!(driver.window(1022, 3), 0..2048);
        assert_eq!(driver.window(2048, 1024), 2048..3072);
    }

    #[test]
    fn unaligned_write_keeps_neighbours() {
        let (disk, driver) = driver();
        let pattern: Vec<u8> = (0..4096).map(|i| (i % 251) as u8).collect();
        driver.write(0, &pattern).unwrap();

        // 跨越第 0、1 块的边界
        driver.write(1022, &[0xEE; 4]).unwrap();

        let mut expected = pattern.clone();
        expected[1022..1026].fill(0xEE);
        assert_eq!(driver.read(0, 4096).unwrap(), expected);
        assert_eq!(disk.peek(1020, 8), expected[1020..1028]);
    }

    #[test]
    fn read_copies_out_requested_slice() {
        let (_, driver) = driver();
        driver.write(3000, b"newfs").unwrap();

        assert_eq!(driver.read(3000, 5).unwrap(), b"newfs");
        assert_eq!(driver.read(3001, 3).unwrap(), b"ewf");
        assert!(driver.read(3000, 0).unwrap().is_empty());
    }

    #[test]
    fn device_failure_aborts_call() {
        let (disk, driver) = driver();
        disk.set_faulty(true);

        assert!(matches!(
            driver.read(0, 16),
            Err(Error::Io(DeviceError::Read))
        ));
        // 写之前要先读出整个窗口
        assert!(matches!(
            driver.write(0, &[1; 16]),
            Err(Error::Io(DeviceError::Read))
        ));
    }

    #[test]
    fn out_of_range_is_io_error() {
        let (_, driver) = driver();
        assert!(matches!(
            driver.read(16 * 1024, 1),
            Err(Error::Io(DeviceError::OutOfRange(32)))
        ));
    }
}
