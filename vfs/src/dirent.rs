use alloc::string::String;

/// 目录列举时交给上层的目录项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Inode number
    pub inode: u64,
    pub ty: DirEntryType,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DirEntryType {
    Directory,
    #[default]
    Regular,
}

impl DirEntryType {
    #[inline]
    pub fn is_dir(self) -> bool {
        self == Self::Directory
    }
}
