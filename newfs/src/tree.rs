//! # 目录树层
//!
//! 内存中的文件树。目录项与索引节点分别存放在 [`Tree`] 的两个数组中，
//! 彼此之间只以下标相互指认：父目录项、兄弟目录项、
//! 目录项所指的索引节点、索引节点所属的目录项都是 ID。
//!
//! 目录的子目录项是一条单链表，表头是最近加入的那一项。

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use derive_more::{From, Into};
use vfs::DirEntryType;

use crate::DATA_PER_FILE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, From, Into)]
#[repr(transparent)]
pub struct DentryId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, From, Into)]
#[repr(transparent)]
pub struct InodeId(usize);

/// 目录项：父目录中的一条名字绑定
#[derive(Debug)]
pub struct Dentry {
    name: String,
    /// 所指索引节点的编号，分配之前为空
    ino: Option<u32>,
    /// 冗余一份文件类型，不必载入索引节点即可判断
    ty: DirEntryType,
    /// 只有根目录项没有父目录项
    parent: Option<DentryId>,
    sibling: Option<DentryId>,
    /// 缓存：载入之前为空
    inode: Option<InodeId>,
}

/// 索引节点：一个文件或目录的元信息
#[derive(Debug)]
pub struct Inode {
    ino: u32,
    /// 已占用的字节数
    size: u32,
    /// 目录项个数
    dir_cnt: u32,
    /// 拥有的数据块编号，至多 [`DATA_PER_FILE`] 个
    blocks: Vec<u32>,
    ty: DirEntryType,
    /// 指向该索引节点的目录项
    dentry: DentryId,
    /// 目录：子目录项链表的表头
    children: Option<DentryId>,
    /// 文件：每个数据块的内容
    data: Vec<Box<[u8]>>,
}

#[derive(Debug, Default)]
pub struct Tree {
    dentries: Vec<Dentry>,
    inodes: Vec<Inode>,
}

impl Dentry {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn ino(&self) -> Option<u32> {
        self.ino
    }

    #[inline]
    pub fn kind(&self) -> DirEntryType {
        self.ty
    }

    #[inline]
    pub fn parent(&self) -> Option<DentryId> {
        self.parent
    }

    #[inline]
    pub fn sibling(&self) -> Option<DentryId> {
        self.sibling
    }

    #[inline]
    pub fn inode(&self) -> Option<InodeId> {
        self.inode
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    #[inline]
    pub(crate) fn set_ino(&mut self, ino: u32) {
        self.ino = Some(ino);
    }
}

impl Inode {
    /// 新分配的空索引节点
    pub(crate) fn new(ino: u32, ty: DirEntryType, dentry: DentryId) -> Self {
        Self::restore(ino, 0, 0, Vec::new(), ty, dentry)
    }

    /// 由磁盘记录还原，子目录项与数据缓冲区留空
    pub(crate) fn restore(
        ino: u32,
        size: u32,
        dir_cnt: u32,
        blocks: Vec<u32>,
        ty: DirEntryType,
        dentry: DentryId,
    ) -> Self {
        debug_assert!(blocks.len() <= DATA_PER_FILE);
        Self {
            ino,
            size,
            dir_cnt,
            blocks,
            ty,
            dentry,
            children: None,
            data: Vec::new(),
        }
    }

    #[inline]
    pub fn ino(&self) -> u32 {
        self.ino
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub fn dir_count(&self) -> u32 {
        self.dir_cnt
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn blocks(&self) -> &[u32] {
        &self.blocks
    }

    #[inline]
    pub fn kind(&self) -> DirEntryType {
        self.ty
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.ty.is_dir()
    }

    #[inline]
    pub fn dentry(&self) -> DentryId {
        self.dentry
    }

    #[inline]
    pub fn data(&self) -> &[Box<[u8]>] {
        &self.data
    }

    /// 直接索引已满时返回 `false`
    pub(crate) fn push_block(&mut self, block: u32) -> bool {
        if self.blocks.len() == DATA_PER_FILE {
            return false;
        }
        self.blocks.push(block);
        true
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.blocks.len() == DATA_PER_FILE
    }

    pub(crate) fn count_entry(&mut self, entry_size: u32) -> u32 {
        self.dir_cnt += 1;
        self.size += entry_size;
        self.dir_cnt
    }

    #[inline]
    pub(crate) fn push_data(&mut self, buf: Box<[u8]>) {
        self.data.push(buf);
    }

    #[inline]
    pub(crate) fn set_data(&mut self, data: Vec<Box<[u8]>>) {
        self.data = data;
    }
}

impl Tree {
    /// 不检查名字，对外由 [`NewFileSystem::new_dentry`] 把关
    ///
    /// [`NewFileSystem::new_dentry`]: crate::NewFileSystem::new_dentry
    pub(crate) fn new_dentry(&mut self, name: &str, ty: DirEntryType) -> DentryId {
        let id = DentryId(self.dentries.len());
        self.dentries.push(Dentry {
            name: name.to_string(),
            ino: None,
            ty,
            parent: None,
            sibling: None,
            inode: None,
        });
        id
    }

    #[inline]
    pub fn dentry(&self, id: DentryId) -> &Dentry {
        &self.dentries[id.0]
    }

    #[inline]
    pub(crate) fn dentry_mut(&mut self, id: DentryId) -> &mut Dentry {
        &mut self.dentries[id.0]
    }

    #[inline]
    pub fn inode(&self, id: InodeId) -> &Inode {
        &self.inodes[id.0]
    }

    #[inline]
    pub(crate) fn inode_mut(&mut self, id: InodeId) -> &mut Inode {
        &mut self.inodes[id.0]
    }

    /// 将索引节点挂到目录项上并互相指认。
    /// 目录项已缓存索引节点时原地替换，ID 不变。
    pub(crate) fn attach(&mut self, dentry: DentryId, inode: Inode) -> InodeId {
        let ino = inode.ino;
        let id = match self.dentries[dentry.0].inode {
            Some(id) => {
                self.inodes[id.0] = inode;
                id
            }
            None => {
                self.inodes.push(inode);
                InodeId(self.inodes.len() - 1)
            }
        };
        self.inodes[id.0].dentry = dentry;

        let entry = &mut self.dentries[dentry.0];
        entry.ino = Some(ino);
        entry.inode = Some(id);
        id
    }

    /// 头插到目录的子目录项链表，不做任何计数
    pub(crate) fn link(&mut self, dir: InodeId, child: DentryId) {
        let parent = self.inodes[dir.0].dentry;
        let head = self.inodes[dir.0].children.replace(child);

        let entry = &mut self.dentries[child.0];
        entry.parent = Some(parent);
        entry.sibling = head;
    }

    /// 按链表顺序遍历目录的子目录项
    pub fn children(&self, dir: InodeId) -> Children<'_> {
        Children {
            tree: self,
            cursor: self.inodes[dir.0].children,
        }
    }

    /// 名字必须完全相同才算命中
    pub fn find_child(&self, dir: InodeId, name: &str) -> Option<DentryId> {
        self.children(dir)
            .find(|&child| self.dentry(child).name() == name)
    }

    /// 第 `n` 个子目录项(从 0 开始)
    pub fn nth_child(&self, dir: InodeId, n: usize) -> Option<DentryId> {
        self.children(dir).nth(n)
    }

    /// 从根目录项到 `dentry` 的绝对路径
    pub fn path_of(&self, dentry: DentryId) -> String {
        let mut names = Vec::new();
        let mut cursor = Some(dentry);
        while let Some(id) = cursor {
            let entry = self.dentry(id);
            if entry.is_root() {
                break;
            }
            names.push(entry.name());
            cursor = entry.parent;
        }

        let mut path = String::new();
        for name in names.iter().rev() {
            path.push('/');
            path.push_str(name);
        }
        if path.is_empty() {
            path.push('/');
        }
        path
    }
}

pub struct Children<'a> {
    tree: &'a Tree,
    cursor: Option<DentryId>,
}

impl Iterator for Children<'_> {
    type Item = DentryId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor?;
        self.cursor = self.tree.dentry(current).sibling;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with_root() -> (Tree, InodeId) {
        let mut tree = Tree::default();
        let root = tree.new_dentry("/", DirEntryType::Directory);
        let inode = tree.attach(root, Inode::new(0, DirEntryType::Directory, root));
        (tree, inode)
    }

    #[test]
    fn newest_child_heads_the_list() {
        let (mut tree, root) = tree_with_root();
        let names = ["a", "b", "c"];
        for name in names {
            let child = tree.new_dentry(name, DirEntryType::Regular);
            tree.link(root, child);
        }

        let listed: Vec<&str> = tree
            .children(root)
            .map(|child| tree.dentry(child).name())
            .collect();
        assert_eq!(listed, ["c", "b", "a"]);

        let b = tree.nth_child(root, 1).unwrap();
        assert_eq!(tree.dentry(b).name(), "b");
        assert_eq!(tree.dentry(b).parent(), Some(tree.inode(root).dentry()));
        assert_eq!(tree.nth_child(root, 3), None);
    }

    #[test]
    fn find_requires_whole_name() {
        let (mut tree, root) = tree_with_root();
        let abc = tree.new_dentry("abc", DirEntryType::Regular);
        tree.link(root, abc);

        assert_eq!(tree.find_child(root, "abc"), Some(abc));
        assert_eq!(tree.find_child(root, "ab"), None);
        assert_eq!(tree.find_child(root, "abcd"), None);
    }

    #[test]
    fn attach_cross_links() {
        let (mut tree, root) = tree_with_root();
        let dir = tree.new_dentry("dir", DirEntryType::Directory);
        tree.link(root, dir);
        let inode = tree.attach(dir, Inode::new(5, DirEntryType::Directory, dir));

        assert_eq!(tree.dentry(dir).inode(), Some(inode));
        assert_eq!(tree.dentry(dir).ino(), Some(5));
        assert_eq!(tree.inode(inode).dentry(), dir);

        // 重新载入时原地替换
        let again = tree.attach(dir, Inode::restore(5, 136, 1, vec![3], DirEntryType::Directory, dir));
        assert_eq!(again, inode);
        assert_eq!(tree.inode(inode).size(), 136);
        assert_eq!(tree.path_of(dir), "/dir");
        assert_eq!(tree.path_of(tree.inode(root).dentry()), "/");
    }

    #[test]
    fn direct_index_limit() {
        let (mut tree, root) = tree_with_root();
        let inode = tree.inode_mut(root);
        for block in 0..DATA_PER_FILE as u32 {
            assert!(inode.push_block(block));
        }
        assert!(inode.is_full());
        assert!(!inode.push_block(99));
        assert_eq!(inode.block_count(), DATA_PER_FILE);
    }
}
