use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use spin::Mutex;

use crate::{BlockDevice, DeviceError, Query};

/// 内存盘：以一段全零内存模拟块设备。
///
/// 打开 `faulty` 后所有读写都会失败，用来观察上层如何传播 I/O 错误。
#[derive(Debug)]
pub struct RamDisk {
    data: Mutex<Vec<u8>>,
    io_size: usize,
    faulty: AtomicBool,
}

impl RamDisk {
    pub fn new(capacity: usize, io_size: usize) -> Self {
        assert!(io_size > 0 && capacity % io_size == 0);

        Self {
            data: Mutex::new(vec![0; capacity]),
            io_size,
            faulty: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn set_faulty(&self, faulty: bool) {
        self.faulty.store(faulty, Ordering::Relaxed);
    }

    /// 直接窥视底层字节，不经过块接口
    pub fn peek(&self, offset: usize, len: usize) -> Vec<u8> {
        self.data.lock()[offset..offset + len].to_vec()
    }

    fn range(&self, block_id: usize, len: usize) -> Result<core::ops::Range<usize>, DeviceError> {
        if len != self.io_size {
            return Err(DeviceError::Misaligned(len));
        }
        let start = block_id * self.io_size;
        if start + len > self.data.lock().len() {
            return Err(DeviceError::OutOfRange(block_id));
        }

        Ok(start..start + len)
    }
}

impl BlockDevice for RamDisk {
    fn query(&self, query: Query) -> Result<usize, DeviceError> {
        match query {
            Query::Capacity => Ok(self.data.lock().len()),
            Query::IoSize => Ok(self.io_size),
        }
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        if self.faulty.load(Ordering::Relaxed) {
            return Err(DeviceError::Read);
        }
        let range = self.range(block_id, buf.len())?;
        buf.copy_from_slice(&self.data.lock()[range]);

        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError> {
        if self.faulty.load(Ordering::Relaxed) {
            return Err(DeviceError::Write);
        }
        let range = self.range(block_id, buf.len())?;
        self.data.lock()[range].copy_from_slice(buf);

        Ok(())
    }
}
