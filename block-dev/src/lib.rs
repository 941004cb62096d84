//! # 块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备，例如磁盘、光盘、U盘等；
//! [`BlockDevice`] 就是对读写块设备的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 这里的“块”指设备的原生 I/O 单元，文件系统的逻辑块由上层自行组合。

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod ram;

use core::any::Any;

use derive_more::Display;

pub use self::ram::RamDisk;

/// 块设备驱动特质
pub trait BlockDevice: Send + Sync + Any {
    /// 查询设备参数，对应 ioctl 请求
    fn query(&self, query: Query) -> Result<usize, DeviceError>;

    /// 读出第 `block_id` 个 I/O 单元，`buf` 的长度必须恰为一个 I/O 单元
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError>;

    /// 写入第 `block_id` 个 I/O 单元，`buf` 的长度必须恰为一个 I/O 单元
    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError>;

    /// 关闭设备，刷出尚未落盘的数据
    fn close(&self) -> Result<(), DeviceError> {
        Ok(())
    }
}

/// 设备参数查询请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    /// 设备总容量(字节)
    Capacity,
    /// 单次 I/O 的大小(字节)
    IoSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DeviceError {
    #[display(fmt = "block {} is out of range", _0)]
    OutOfRange(usize),
    #[display(fmt = "buffer of {} bytes is not one I/O unit", _0)]
    Misaligned(usize),
    #[display(fmt = "seek failed")]
    Seek,
    #[display(fmt = "read failed")]
    Read,
    #[display(fmt = "write failed")]
    Write,
    #[display(fmt = "close failed")]
    Close,
    #[display(fmt = "query failed")]
    Query,
}
