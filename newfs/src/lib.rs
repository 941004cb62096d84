//! # newfs
//!
//! 一个简单的磁盘文件系统，自底向上分为：
//! - 块 I/O 适配层：[`Driver`]，按字节偏移读写对齐的逻辑块
//! - 磁盘数据结构层：超级块、位图、索引节点与目录项的磁盘记录
//! - 目录树层：[`Tree`]，内存中缓存的目录项与索引节点
//! - 文件系统层：[`NewFileSystem`]，挂载、分配、路径解析与卸载

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod config;
mod driver;
mod error;
mod layout;
mod nfs;
pub mod path;
mod tree;


pub use self::{
    config::*,
    driver::Driver,
    error::{Error, Result},
    layout::{Bitmap, DiskDirEntry, DiskFileType, DiskInode, SuperBlock},
    nfs::{Lookup, NewFileSystem},
    tree::{Children, Dentry, DentryId, Inode, InodeId, Tree},
};
