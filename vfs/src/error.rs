/// 交给系统调用适配层的错误种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    Io,
    NoSpace,
    NotFound,
    NotADirectory,
    AlreadyExists,
    InvalidArgument,
}

impl Error {
    /// 对应的 errno，适配层取负后返回
    pub const fn errno(self) -> i32 {
        match self {
            Self::Io => 5,
            Self::NoSpace => 28,
            Self::NotFound => 2,
            Self::NotADirectory => 20,
            Self::AlreadyExists => 17,
            Self::InvalidArgument => 22,
        }
    }
}
