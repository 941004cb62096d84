//! newfs 的常量与挂载配置

/// 超级块中的魔数，不匹配即视为未格式化的设备
pub const MAGIC: u32 = 0x22011022;
/// 超级块固定位于设备开头
pub const SUPER_OFFSET: usize = 0;
/// 根目录的索引节点编号
pub const ROOT_INO: u32 = 0;

/// 目录项名字缓冲区的长度，最后一字节留给 \0
pub const MAX_NAME_LEN: usize = 128;
/// 每个文件最多直接索引的数据块数
pub const DATA_PER_FILE: usize = 6;
/// 每个逻辑块存放的索引节点数
pub const INODES_PER_BLOCK: usize = 8;

pub const SUPER_BLOCKS: u32 = 1;
pub const INODE_MAP_BLOCKS: u32 = 1;
pub const DATA_MAP_BLOCKS: u32 = 1;
/// 4 MiB 的盘、1 KiB 的逻辑块下，每 8 个文件约占 49 KiB，
/// 最多约 664 个文件，即 83 个逻辑块的索引节点
pub const INODE_BLOCKS: u32 = 83;

/// 格式化时使用的配置；挂载已有的文件系统时忽略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// 索引节点区域占用的逻辑块数
    pub inode_blocks: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inode_blocks: INODE_BLOCKS,
        }
    }
}
