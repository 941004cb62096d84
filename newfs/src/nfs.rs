//! # 文件系统层
//!
//! 一次挂载对应一个 [`NewFileSystem`]：它独占块设备、两张位图与目录树，
//! 负责格式化或载入磁盘布局、按需载入索引节点、分配，
//! 以及在卸载时把整棵缓存的树写回磁盘。

use alloc::string::ToString;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use block_dev::BlockDevice;
use vfs::{DirEntry, DirEntryType, Stat};

use crate::driver::Driver;
use crate::layout::{Bitmap, DiskDirEntry, DiskInode, SuperBlock};
use crate::path;
use crate::tree::{DentryId, Inode, InodeId, Tree};
use crate::{
    Config, DATA_MAP_BLOCKS, Error, INODE_MAP_BLOCKS, INODES_PER_BLOCK, MAGIC, ROOT_INO, Result,
    SUPER_BLOCKS, SUPER_OFFSET,
};

#[derive(Debug)]
pub struct NewFileSystem {
    driver: Driver,
    usage: u32,
    inode_map: Bitmap,
    data_map: Bitmap,
    /// 索引节点区域的起始地址(字节)
    inode_offset: u32,
    /// 数据块区域的起始地址(字节)
    data_offset: u32,
    tree: Tree,
    /// 根目录项，每次挂载新建，从不写入磁盘
    root: DentryId,
    mounted: bool,
}

/// 路径查找的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup {
    /// 命中时为目标目录项，否则为能解析到的最深的目录项；
    /// 其索引节点总是已经载入
    pub dentry: DentryId,
    pub found: bool,
    /// 路径所指即根目录
    pub is_root: bool,
}

impl NewFileSystem {
    /// 挂载设备：魔数不匹配时按 `config` 格式化，否则载入已有的布局
    pub fn mount(device: Arc<dyn BlockDevice>, config: &Config) -> Result<Self> {
        let driver = Driver::open(device)?;
        let block_size = driver.block_size();
        if block_size < INODES_PER_BLOCK * DiskInode::SIZE || block_size < DiskDirEntry::SIZE {
            return Err(Error::InvalidArgument("logical block is too small"));
        }

        let mut tree = Tree::default();
        let root = tree.new_dentry("/", DirEntryType::Directory);

        let bytes = driver.read(SUPER_OFFSET, SuperBlock::SIZE)?;
        let super_block = SuperBlock::decode(&bytes)?;
        let format = !super_block.is_valid();
        let super_block = if format {
            log::info!("no newfs found, formatting {} bytes", driver.capacity());
            Self::layout(&driver, config)?
        } else {
            if super_block.data_offset as usize > driver.capacity() {
                log::error!("superblock describes regions beyond the device");
                return Err(Error::Corrupted("regions exceed the device"));
            }
            super_block
        };

        let mut inode_map = Bitmap::new(
            super_block.inode_map_offset,
            super_block.inode_map_blocks,
            super_block.max_ino,
        );
        let mut data_map = Bitmap::new(
            super_block.data_map_offset,
            super_block.data_map_blocks,
            super_block.max_data,
        );
        inode_map.load(&driver)?;
        data_map.load(&driver)?;

        let mut fs = Self {
            driver,
            usage: super_block.usage,
            inode_map,
            data_map,
            inode_offset: super_block.inode_offset,
            data_offset: super_block.data_offset,
            tree,
            root,
            mounted: false,
        };

        if format {
            let inode = fs.alloc_inode(root)?;
            if fs.tree.inode(inode).ino() != ROOT_INO {
                log::error!("inode bitmap of an unformatted device is not empty");
                return Err(Error::InvalidArgument("root inode slot is occupied"));
            }
            fs.sync_inode(inode)?;
        }
        fs.read_inode(root, ROOT_INO)?;
        fs.mounted = true;

        log::info!(
            "mounted: {}/{} inodes, {}/{} data blocks in use",
            fs.inode_map.count(),
            super_block.max_ino,
            fs.data_map.count(),
            super_block.max_data,
        );
        Ok(fs)
    }

    /// 按设备几何计算新的布局
    fn layout(driver: &Driver, config: &Config) -> Result<SuperBlock> {
        if config.inode_blocks == 0 {
            return Err(Error::InvalidArgument("no inode blocks"));
        }

        let total_blocks = driver.capacity() / driver.block_size();
        let reserved = (SUPER_BLOCKS + INODE_MAP_BLOCKS + DATA_MAP_BLOCKS + config.inode_blocks)
            as usize;
        if total_blocks <= reserved {
            return Err(Error::InvalidArgument("device is too small"));
        }

        // 一个逻辑块的位图能管理的槽位数
        let map_bits = driver.block_size() * 8;
        let max_ino = (config.inode_blocks as usize * INODES_PER_BLOCK)
            .min(INODE_MAP_BLOCKS as usize * map_bits);
        let max_data = (total_blocks - reserved).min(DATA_MAP_BLOCKS as usize * map_bits);

        let inode_map_offset = SUPER_OFFSET + driver.blocks(SUPER_BLOCKS as usize);
        let data_map_offset = inode_map_offset + driver.blocks(INODE_MAP_BLOCKS as usize);
        let inode_offset = data_map_offset + driver.blocks(DATA_MAP_BLOCKS as usize);
        let data_offset = inode_offset + driver.blocks(config.inode_blocks as usize);

        Ok(SuperBlock {
            magic: MAGIC,
            usage: 0,
            max_ino: narrow(max_ino)?,
            inode_map_offset: narrow(inode_map_offset)?,
            inode_map_blocks: INODE_MAP_BLOCKS,
            max_data: narrow(max_data)?,
            data_map_blocks: DATA_MAP_BLOCKS,
            data_map_offset: narrow(data_map_offset)?,
            inode_offset: narrow(inode_offset)?,
            data_offset: narrow(data_offset)?,
        })
    }

    /// 写回整棵树、超级块与位图，然后关闭设备。
    ///
    /// 中途失败不回滚，文件系统也不再视为已挂载。
    pub fn unmount(&mut self) -> Result<()> {
        if !self.mounted {
            return Ok(());
        }
        self.mounted = false;

        let root = self
            .tree
            .dentry(self.root)
            .inode()
            .ok_or(Error::Corrupted("root inode is not cached"))?;
        self.sync_inode(root)?;

        self.driver
            .write(SUPER_OFFSET, &self.super_block().encode()?)?;
        self.inode_map.store(&self.driver)?;
        self.data_map.store(&self.driver)?;
        self.inode_map.release();
        self.data_map.release();
        self.driver.close()?;

        log::info!("unmounted");
        Ok(())
    }

    /// 当前布局对应的超级块记录
    pub fn super_block(&self) -> SuperBlock {
        SuperBlock {
            magic: MAGIC,
            usage: self.usage,
            max_ino: self.inode_map.capacity(),
            inode_map_offset: self.inode_map.offset(),
            inode_map_blocks: self.inode_map.blocks(),
            max_data: self.data_map.capacity(),
            data_map_blocks: self.data_map.blocks(),
            data_map_offset: self.data_map.offset(),
            inode_offset: self.inode_offset,
            data_offset: self.data_offset,
        }
    }
}

impl NewFileSystem {
    /// 为目录项分配一个空的索引节点，类型随目录项
    pub fn alloc_inode(&mut self, dentry: DentryId) -> Result<InodeId> {
        let ino = self.inode_map.alloc().ok_or(Error::NoSpace("inode bitmap"))?;
        let ty = self.tree.dentry(dentry).kind();
        let inode = self.tree.attach(dentry, Inode::new(ino, ty, dentry));

        log::debug!("allocated inode {ino} for {:?}", self.tree.dentry(dentry).name());
        Ok(inode)
    }

    /// 为索引节点追加一个数据块，返回其编号
    pub fn alloc_data(&mut self, inode: InodeId) -> Result<u32> {
        if self.tree.inode(inode).is_full() {
            return Err(Error::NoSpace("direct index"));
        }
        let block = self.data_map.alloc().ok_or(Error::NoSpace("data bitmap"))?;

        let block_size = self.block_size();
        let inode = self.tree.inode_mut(inode);
        inode.push_block(block);
        if !inode.is_dir() {
            inode.push_data(vec![0; block_size].into_boxed_slice());
        }

        log::debug!("allocated data block {block} for inode {}", inode.ino());
        Ok(block)
    }

    /// 将目录项加入目录，返回目录现有的目录项个数。
    ///
    /// 已有的数据块装满时先分配新块，分配失败则目录保持原样。
    pub fn alloc_dentry(&mut self, dir: InodeId, dentry: DentryId) -> Result<u32> {
        let inode = self.tree.inode(dir);
        if !inode.is_dir() {
            return Err(Error::NotADirectory);
        }
        path::validate_name(self.tree.dentry(dentry).name())?;
        if inode.dir_count() as usize >= inode.block_count() * self.entries_per_block() {
            self.alloc_data(dir)?;
        }

        self.tree.link(dir, dentry);
        Ok(self
            .tree
            .inode_mut(dir)
            .count_entry(DiskDirEntry::SIZE as u32))
    }

    /// 新建一个尚未挂入目录树的目录项；名字必须能原样写入磁盘
    pub fn new_dentry(&mut self, name: &str, ty: DirEntryType) -> Result<DentryId> {
        path::validate_name(name)?;
        Ok(self.tree.new_dentry(name, ty))
    }

    /// 目录项所指的索引节点，未缓存时从磁盘载入
    pub fn inode_of(&mut self, dentry: DentryId) -> Result<InodeId> {
        let entry = self.tree.dentry(dentry);
        if let Some(inode) = entry.inode() {
            return Ok(inode);
        }

        let ino = entry.ino().ok_or(Error::Corrupted("entry has no inode"))?;
        self.read_inode(dentry, ino)
    }

    /// 从磁盘读出索引节点并挂到目录项上。
    ///
    /// 目录按磁盘顺序载入全部子目录项(不载入它们的索引节点)，
    /// 文件载入全部数据块；都不分配任何槽位。
    fn read_inode(&mut self, dentry: DentryId, ino: u32) -> Result<InodeId> {
        let bytes = self.driver.read(self.inode_pos(ino), DiskInode::SIZE)?;
        let disk_inode = DiskInode::decode(&bytes)
            .inspect_err(|err| log::error!("decoding inode {ino}: {err}"))?;
        if disk_inode.ino != ino {
            log::error!("slot {ino} holds the record of inode {}", disk_inode.ino);
            return Err(Error::Corrupted("inode record is misplaced"));
        }
        let inode = self.tree.attach(dentry, disk_inode.into_inode(dentry)?);

        let blocks = self.tree.inode(inode).blocks().to_vec();
        if self.tree.inode(inode).is_dir() {
            let mut remaining = self.tree.inode(inode).dir_count() as usize;
            let mut children = Vec::with_capacity(remaining);
            for &block in &blocks {
                if remaining == 0 {
                    break;
                }
                let bytes = self.driver.read(self.data_pos(block), self.block_size())?;
                for record in bytes.chunks_exact(DiskDirEntry::SIZE).take(remaining) {
                    let entry = DiskDirEntry::decode(record)?;
                    let child = self.tree.new_dentry(entry.name()?, entry.ftype.into());
                    self.tree.dentry_mut(child).set_ino(entry.ino);
                    children.push(child);
                    remaining -= 1;
                }
            }
            if remaining > 0 {
                return Err(Error::Corrupted("entries exceed the owned blocks"));
            }

            // 头插，逆序链入才能保持磁盘上的顺序
            for &child in children.iter().rev() {
                self.tree.link(inode, child);
            }
        } else {
            let data = blocks
                .iter()
                .map(|&block| {
                    self.driver
                        .read(self.data_pos(block), self.block_size())
                        .map(Vec::into_boxed_slice)
                })
                .collect::<Result<Vec<_>>>()?;
            self.tree.inode_mut(inode).set_data(data);
        }

        log::debug!("loaded inode {ino}");
        Ok(inode)
    }

    /// 将索引节点及其下所有已缓存的索引节点写回磁盘
    pub fn sync_inode(&self, inode: InodeId) -> Result<()> {
        let entries_per_block = self.entries_per_block();
        let mut pending = vec![inode];

        while let Some(id) = pending.pop() {
            let inode = self.tree.inode(id);
            self.driver
                .write(self.inode_pos(inode.ino()), &DiskInode::from(inode).encode()?)?;

            if inode.is_dir() {
                let children: Vec<DentryId> = self.tree.children(id).collect();
                if children.len() > inode.block_count() * entries_per_block {
                    return Err(Error::Corrupted("entries exceed the owned blocks"));
                }

                for (chunk, &block) in children.chunks(entries_per_block).zip(inode.blocks()) {
                    let mut buf = Vec::with_capacity(chunk.len() * DiskDirEntry::SIZE);
                    for &child in chunk {
                        let dentry = self.tree.dentry(child);
                        let ino = dentry.ino().ok_or(Error::Corrupted("entry has no inode"))?;
                        let record = DiskDirEntry::new(dentry.name(), ino, dentry.kind().into())?;
                        buf.extend(record.encode()?);

                        if let Some(child_inode) = dentry.inode() {
                            pending.push(child_inode);
                        }
                    }
                    self.driver.write(self.data_pos(block), &buf)?;
                }
            } else {
                for (data, &block) in inode.data().iter().zip(inode.blocks()) {
                    self.driver.write(self.data_pos(block), data)?;
                }
            }
        }

        Ok(())
    }
}

impl NewFileSystem {
    /// 从根目录逐层解析路径，沿途按需载入索引节点。
    ///
    /// 未命中不是错误：返回能解析到的最深的目录项，
    /// 途经普通文件时返回该文件的目录项。
    pub fn lookup(&mut self, path: &str) -> Result<Lookup> {
        self.ensure_mounted()?;

        let mut cursor = self.root;
        self.inode_of(cursor)?;
        if path::level(path) == 0 {
            return Ok(Lookup {
                dentry: cursor,
                found: true,
                is_root: true,
            });
        }

        for name in path::components(path) {
            let inode = self.inode_of(cursor)?;
            if !self.tree.inode(inode).is_dir() {
                log::debug!("lookup {path}: {} is not a directory", self.tree.path_of(cursor));
                return Ok(Lookup {
                    dentry: cursor,
                    found: false,
                    is_root: false,
                });
            }

            match self.tree.find_child(inode, name) {
                Some(child) => cursor = child,
                None => {
                    log::debug!("lookup {path}: {name} not found");
                    return Ok(Lookup {
                        dentry: cursor,
                        found: false,
                        is_root: false,
                    });
                }
            }
        }

        self.inode_of(cursor)?;
        Ok(Lookup {
            dentry: cursor,
            found: true,
            is_root: false,
        })
    }

    /// 解析路径，未命中时转为错误
    pub fn resolve(&mut self, path: &str) -> Result<DentryId> {
        let lookup = self.lookup(path)?;
        if lookup.found {
            return Ok(lookup.dentry);
        }

        if self.tree.dentry(lookup.dentry).kind().is_dir() {
            Err(Error::NotFound)
        } else {
            Err(Error::NotADirectory)
        }
    }

    /// 在父目录中新建文件或目录
    pub fn create(&mut self, path: &str, ty: DirEntryType) -> Result<DentryId> {
        self.ensure_mounted()?;

        let (parent_path, name) =
            path::split_last(path).ok_or(Error::InvalidArgument("expected an absolute path"))?;
        path::validate_name(name)?;

        let parent = self.resolve(parent_path)?;
        let dir = self.inode_of(parent)?;
        if !self.tree.inode(dir).is_dir() {
            return Err(Error::NotADirectory);
        }
        if self.tree.find_child(dir, name).is_some() {
            return Err(Error::AlreadyExists);
        }

        let dentry = self.new_dentry(name, ty)?;
        self.alloc_inode(dentry)?;
        self.alloc_dentry(dir, dentry)?;

        log::info!("created {path}");
        Ok(dentry)
    }

    pub fn stat(&mut self, dentry: DentryId) -> Result<Stat> {
        let inode = self.inode_of(dentry)?;
        let inode = self.tree.inode(inode);

        Ok(Stat {
            inode: inode.ino() as u64,
            mode: inode.kind(),
            block_size: self.block_size() as u64,
            blocks: inode.block_count() as u64,
            size: inode.size() as u64,
        })
    }

    /// 目录中的第 `offset` 项，越过末尾时返回空
    pub fn readdir(&mut self, dir: DentryId, offset: usize) -> Result<Option<DirEntry>> {
        let inode = self.inode_of(dir)?;
        if !self.tree.inode(inode).is_dir() {
            return Err(Error::NotADirectory);
        }

        let Some(child) = self.tree.nth_child(inode, offset) else {
            return Ok(None);
        };
        let dentry = self.tree.dentry(child);
        let ino = dentry.ino().ok_or(Error::Corrupted("entry has no inode"))?;

        Ok(Some(DirEntry {
            inode: ino as u64,
            ty: dentry.kind(),
            name: dentry.name().to_string(),
        }))
    }
}

impl NewFileSystem {
    #[inline]
    pub fn root(&self) -> DentryId {
        self.root
    }

    #[inline]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    #[inline]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    #[inline]
    pub fn usage(&self) -> u32 {
        self.usage
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.driver.block_size()
    }

    /// 每个逻辑块能存放的目录项个数
    #[inline]
    pub fn entries_per_block(&self) -> usize {
        self.block_size() / DiskDirEntry::SIZE
    }

    #[cfg(test)]
    pub(crate) fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    #[inline]
    pub fn inode_bitmap(&self) -> &Bitmap {
        &self.inode_map
    }

    #[inline]
    pub fn data_bitmap(&self) -> &Bitmap {
        &self.data_map
    }

    fn ensure_mounted(&self) -> Result<()> {
        if self.mounted {
            Ok(())
        } else {
            Err(Error::InvalidArgument("filesystem is not mounted"))
        }
    }

    /// 索引节点记录的地址
    fn inode_pos(&self, ino: u32) -> usize {
        let ino = ino as usize;
        self.inode_offset as usize
            + self.block_size() * (ino / INODES_PER_BLOCK)
            + (ino % INODES_PER_BLOCK) * DiskInode::SIZE
    }

    /// 数据块的地址
    fn data_pos(&self, block: u32) -> usize {
        self.data_offset as usize + self.block_size() * block as usize
    }
}

/// 磁盘记录中的偏移与数目都是 `u32`
fn narrow(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::InvalidArgument("device is too large"))
}
