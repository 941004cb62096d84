use binrw::binrw;

use crate::MAGIC;

/// 超级块：
/// - 提供文件系统合法性校验；
/// - 定位其它连续区域
///
/// 偏移量均为字节数，块数均为逻辑块数。
#[binrw]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SuperBlock {
    /// 魔数：用于校验文件系统合法性
    pub magic: u32,
    pub usage: u32,

    /// 索引节点数目上限
    pub max_ino: u32,
    pub inode_map_offset: u32,
    pub inode_map_blocks: u32,

    /// 数据块数目上限
    pub max_data: u32,
    pub data_map_blocks: u32,
    pub data_map_offset: u32,

    pub inode_offset: u32,
    pub data_offset: u32,
}

record!(SuperBlock, 40);

impl SuperBlock {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC
    }
}
