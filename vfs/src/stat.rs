use enumflags2::{BitFlags, bitflags};

use crate::DirEntryType;

/// 新建文件与目录的默认权限
pub const DEFAULT_PERM: u32 = 0o777;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    /// Inode number
    pub inode: u64,
    pub mode: DirEntryType,
    /// Optimal I/O block size
    pub block_size: u64,
    /// Occupying blocks
    pub blocks: u64,
    /// File size
    pub size: u64,
}

#[allow(clippy::upper_case_acronyms)]
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    DIR = 0o040000,
    FILE = 0o100000,
}

impl Stat {
    /// `st_mode`：类型位与默认权限
    pub fn st_mode(&self) -> u32 {
        BitFlags::from(StatKind::from(self.mode)).bits() | DEFAULT_PERM
    }

    /// 目录自带 `.` 与父目录中的项，文件只被父目录引用
    pub fn nlink(&self) -> u32 {
        match self.mode {
            DirEntryType::Directory => 2,
            DirEntryType::Regular => 1,
        }
    }
}

impl From<DirEntryType> for StatKind {
    #[inline]
    fn from(ty: DirEntryType) -> Self {
        match ty {
            DirEntryType::Directory => Self::DIR,
            DirEntryType::Regular => Self::FILE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_carries_kind_and_permission() {
        let dir = Stat {
            inode: 0,
            mode: DirEntryType::Directory,
            block_size: 1024,
            blocks: 1,
            size: 136,
        };
        assert_eq!(dir.st_mode(), 0o040777);
        assert_eq!(dir.nlink(), 2);

        let file = Stat {
            mode: DirEntryType::Regular,
            ..dir
        };
        assert_eq!(file.st_mode(), 0o100777);
        assert_eq!(file.nlink(), 1);
    }
}
