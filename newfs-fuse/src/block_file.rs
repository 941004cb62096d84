use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use block_dev::{BlockDevice, DeviceError, Query};

/// 以宿主机上的磁盘镜像文件充当块设备
#[derive(Debug)]
pub struct BlockFile {
    file: Mutex<File>,
    io_size: usize,
    capacity: usize,
}

impl BlockFile {
    /// 打开已有的镜像，容量即文件长度
    pub fn open(path: impl AsRef<Path>, io_size: usize) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let capacity = file.metadata()?.len() as usize;

        Ok(Self::new(file, io_size, capacity))
    }

    /// 新建(或截断)一个全零的镜像
    pub fn create(path: impl AsRef<Path>, size: u64, io_size: usize) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(size)?;

        Ok(Self::new(file, io_size, size as usize))
    }

    fn new(file: File, io_size: usize, capacity: usize) -> Self {
        Self {
            file: Mutex::new(file),
            io_size,
            capacity,
        }
    }

    fn seek(&self, file: &mut File, block_id: usize, len: usize) -> Result<(), DeviceError> {
        if len != self.io_size {
            return Err(DeviceError::Misaligned(len));
        }
        let offset = block_id * self.io_size;
        if offset + len > self.capacity {
            return Err(DeviceError::OutOfRange(block_id));
        }

        file.seek(SeekFrom::Start(offset as u64))
            .inspect_err(|err| log::error!("seeking to I/O unit {block_id}: {err}"))
            .map_err(|_| DeviceError::Seek)?;
        Ok(())
    }
}

impl BlockDevice for BlockFile {
    fn query(&self, query: Query) -> Result<usize, DeviceError> {
        match query {
            Query::Capacity => Ok(self.capacity),
            Query::IoSize => Ok(self.io_size),
        }
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        let mut file = self.file.lock().map_err(|_| DeviceError::Read)?;
        self.seek(&mut file, block_id, buf.len())?;
        file.read_exact(buf)
            .inspect_err(|err| log::error!("reading I/O unit {block_id}: {err}"))
            .map_err(|_| DeviceError::Read)
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError> {
        let mut file = self.file.lock().map_err(|_| DeviceError::Write)?;
        self.seek(&mut file, block_id, buf.len())?;
        file.write_all(buf)
            .inspect_err(|err| log::error!("writing I/O unit {block_id}: {err}"))
            .map_err(|_| DeviceError::Write)
    }

    fn close(&self) -> Result<(), DeviceError> {
        let file = self.file.lock().map_err(|_| DeviceError::Close)?;
        file.sync_all()
            .inspect_err(|err| log::error!("flushing image: {err}"))
            .map_err(|_| DeviceError::Close)
    }
}
