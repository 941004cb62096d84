use alloc::vec::Vec;

use binrw::binrw;
use vfs::DirEntryType;

use crate::tree::{DentryId, Inode};
use crate::{DATA_PER_FILE, Error, Result};

/// 索引节点的磁盘记录
#[binrw]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiskInode {
    /// 在索引节点位图中的下标
    pub ino: u32,
    /// 已占用的字节数
    pub size: u32,
    /// 目录项个数
    pub dir_cnt: u32,
    /// 已分配的数据块数
    pub block_num: u32,
    /// 只有前 `block_num` 个有效，其余恒为 0
    pub block_index: [u32; DATA_PER_FILE],
    pub ftype: DiskFileType,
}

record!(DiskInode, 44);

#[binrw]
#[brw(repr = u32)]
#[repr(u32)]
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum DiskFileType {
    #[default]
    Regular = 0,
    Directory = 1,
}

impl DiskInode {
    /// 只拷贝有效的块编号，避免把过期的编号写上磁盘
    pub fn new(ino: u32, size: u32, dir_cnt: u32, blocks: &[u32], ftype: DiskFileType) -> Self {
        debug_assert!(blocks.len() <= DATA_PER_FILE);
        let mut block_index = [0; DATA_PER_FILE];
        block_index[..blocks.len()].copy_from_slice(blocks);

        Self {
            ino,
            size,
            dir_cnt,
            block_num: blocks.len() as u32,
            block_index,
            ftype,
        }
    }

    /// 有效的块编号
    pub fn blocks(&self) -> Result<&[u32]> {
        self.block_index
            .get(..self.block_num as usize)
            .ok_or(Error::Corrupted("inode owns more than 6 blocks"))
    }

    /// 还原为内存中的索引节点，子目录项与数据缓冲区留空
    pub fn into_inode(self, dentry: DentryId) -> Result<Inode> {
        let blocks: Vec<u32> = self.blocks()?.to_vec();
        Ok(Inode::restore(
            self.ino,
            self.size,
            self.dir_cnt,
            blocks,
            self.ftype.into(),
            dentry,
        ))
    }
}

impl From<&Inode> for DiskInode {
    fn from(inode: &Inode) -> Self {
        Self::new(
            inode.ino(),
            inode.size(),
            inode.dir_count(),
            inode.blocks(),
            inode.kind().into(),
        )
    }
}

impl From<DiskFileType> for DirEntryType {
    #[inline]
    fn from(ftype: DiskFileType) -> Self {
        match ftype {
            DiskFileType::Regular => Self::Regular,
            DiskFileType::Directory => Self::Directory,
        }
    }
}

impl From<DirEntryType> for DiskFileType {
    #[inline]
    fn from(ty: DirEntryType) -> Self {
        match ty {
            DirEntryType::Regular => Self::Regular,
            DirEntryType::Directory => Self::Directory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_only_valid_block_prefix() {
        let disk_inode = DiskInode::new(9, 272, 2, &[5, 9, 13], DiskFileType::Directory);
        let bytes = disk_inode.encode().unwrap();
        assert_eq!(bytes.len(), DiskInode::SIZE);

        let decoded = DiskInode::decode(&bytes).unwrap();
        assert_eq!(decoded.ino, 9);
        assert_eq!(decoded.size, 272);
        assert_eq!(decoded.dir_cnt, 2);
        assert_eq!(decoded.ftype, DiskFileType::Directory);
        assert_eq!(decoded.blocks().unwrap(), [5, 9, 13]);
        assert_eq!(decoded.block_index[3..], [0; 3]);
    }

    #[test]
    fn stale_indices_are_not_written() {
        let mut disk_inode = DiskInode::new(1, 0, 0, &[], DiskFileType::Regular);
        disk_inode.block_index = [7; DATA_PER_FILE];
        disk_inode.block_num = 2;

        let from_prefix =
            DiskInode::new(1, 0, 0, disk_inode.blocks().unwrap(), DiskFileType::Regular);
        assert_eq!(from_prefix.block_index, [7, 7, 0, 0, 0, 0]);
    }

    #[test]
    fn little_endian_layout() {
        let bytes = DiskInode::new(0x0102_0304, 0, 0, &[0xAA], DiskFileType::Directory)
            .encode()
            .unwrap();
        assert_eq!(bytes[..4], [4, 3, 2, 1]);
        assert_eq!(bytes[12..16], [1, 0, 0, 0]);
        assert_eq!(bytes[16..20], [0xAA, 0, 0, 0]);
        assert_eq!(bytes[40..44], [1, 0, 0, 0]);
    }

    #[test]
    fn reject_bad_records() {
        let mut bytes = DiskInode::new(3, 0, 0, &[], DiskFileType::Regular)
            .encode()
            .unwrap();
        bytes[40] = 7;
        assert!(matches!(DiskInode::decode(&bytes), Err(Error::Codec(_))));

        let mut oversized = DiskInode::default();
        oversized.block_num = 7;
        assert!(matches!(oversized.blocks(), Err(Error::Corrupted(_))));
        assert!(matches!(
            DiskInode::decode(&[0; 10]),
            Err(Error::Codec(_))
        ));
    }
}
