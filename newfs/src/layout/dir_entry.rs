use core::str;

use binrw::binrw;

use crate::layout::DiskFileType;
use crate::{Error, MAX_NAME_LEN, Result};

/// 目录项的磁盘记录
#[binrw]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskDirEntry {
    // 最后一字节留给 \0
    name: [u8; MAX_NAME_LEN],
    pub ino: u32,
    pub ftype: DiskFileType,
}

record!(DiskDirEntry, 136);

impl DiskDirEntry {
    /// 名字放不下(还要留出 \0)时拒绝，不做截断
    pub fn new(name: &str, ino: u32, ftype: DiskFileType) -> Result<Self> {
        let bytes = name.as_bytes();
        if bytes.len() >= MAX_NAME_LEN {
            return Err(Error::InvalidArgument("name too long"));
        }
        let mut buf = [0; MAX_NAME_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);

        Ok(Self {
            name: buf,
            ino,
            ftype,
        })
    }

    pub fn name(&self) -> Result<&str> {
        let len = self
            .name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(MAX_NAME_LEN);
        str::from_utf8(&self.name[..len]).map_err(|_| Error::Corrupted("entry name is not UTF-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_survives_encoding() {
        let dir_entry = DiskDirEntry::new("hello.txt", 42, DiskFileType::Regular).unwrap();
        let bytes = dir_entry.encode().unwrap();
        assert_eq!(bytes.len(), DiskDirEntry::SIZE);
        assert_eq!(bytes[128..132], 42u32.to_le_bytes());

        let decoded = DiskDirEntry::decode(&bytes).unwrap();
        assert_eq!(decoded.name().unwrap(), "hello.txt");
        assert_eq!(decoded.ino, 42);
        assert_eq!(decoded.ftype, DiskFileType::Regular);
    }

    #[test]
    fn long_name_is_rejected() {
        let longest = "x".repeat(MAX_NAME_LEN - 1);
        let dir_entry = DiskDirEntry::new(&longest, 1, DiskFileType::Directory).unwrap();
        assert_eq!(dir_entry.name().unwrap(), longest);

        // 截断会切开多字节字符，只能拒绝
        let wide = "é".repeat(64);
        assert!(matches!(
            DiskDirEntry::new(&wide, 1, DiskFileType::Directory),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn invalid_utf8_is_corruption() {
        let mut bytes = DiskDirEntry::new("ok", 1, DiskFileType::Regular)
            .unwrap()
            .encode()
            .unwrap();
        bytes[0] = 0xFF;
        let decoded = DiskDirEntry::decode(&bytes).unwrap();
        assert!(matches!(decoded.name(), Err(Error::Corrupted(_))));
    }
}
