//! 以 `/` 分隔的路径

use crate::{Error, MAX_NAME_LEN, Result};

/// 非空的路径分量，重复或结尾的 `/` 不产生空分量
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|name| !name.is_empty())
}

/// 路径的层数，根目录为 0 层
pub fn level(path: &str) -> usize {
    components(path).count()
}

/// 路径的最后一个分量；根目录没有名字
pub fn file_name(path: &str) -> Option<&str> {
    components(path).last()
}

/// 拆分为父目录路径与最后一个分量
pub fn split_last(path: &str) -> Option<(&str, &str)> {
    let path = path.trim_end_matches('/');
    let (parent, name) = path.rsplit_once('/')?;
    if name.is_empty() {
        return None;
    }

    Some((if parent.is_empty() { "/" } else { parent }, name))
}

/// 检查能否作为目录项的名字写入磁盘
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidArgument("empty name"));
    }
    if name.len() >= MAX_NAME_LEN {
        return Err(Error::InvalidArgument("name too long"));
    }
    if name.contains(['/', '\0']) {
        return Err(Error::InvalidArgument("name contains '/' or NUL"));
    }

    Ok(())
}
