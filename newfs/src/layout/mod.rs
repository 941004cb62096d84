//! # 磁盘数据结构层
//!
//! newfs 的磁盘布局，逻辑块为两个 I/O 单元：
//! 超级块 | 索引节点位图 | 数据块位图 | 索引节点区域 | 数据块区域
//!
//! 磁盘记录一律小端、紧凑排列，只保存能落盘的字段，
//! 内存中的交叉引用都不写入。

/// 为磁盘记录生成定长编解码
macro_rules! record {
    ($ty:ty, $size:expr) => {
        impl $ty {
            /// 记录在磁盘上的字节数
            pub const SIZE: usize = $size;

            pub fn decode(bytes: &[u8]) -> $crate::Result<Self> {
                let mut reader = binrw::io::Cursor::new(bytes);
                Ok(<Self as binrw::BinRead>::read_le(&mut reader)?)
            }

            pub fn encode(&self) -> $crate::Result<alloc::vec::Vec<u8>> {
                let mut buf = alloc::vec![0; Self::SIZE];
                let mut writer = binrw::io::Cursor::new(&mut buf[..]);
                binrw::BinWrite::write_le(self, &mut writer)?;
                Ok(buf)
            }
        }
    };
}

mod super_block;
pub use super_block::SuperBlock;

mod bitmap;
pub use bitmap::Bitmap;

mod inode;
pub use inode::{DiskFileType, DiskInode};

/// 目录项，存放在目录所拥有的数据块中
mod dir_entry;
pub use dir_entry::DiskDirEntry;
