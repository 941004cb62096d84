use block_dev::DeviceError;
use derive_more::Display;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display)]
pub enum Error {
    #[display(fmt = "device I/O failed: {}", _0)]
    Io(DeviceError),
    #[display(fmt = "malformed record: {}", _0)]
    Codec(binrw::Error),
    /// 参数为耗尽的位图或索引
    #[display(fmt = "no space left: {} exhausted", _0)]
    NoSpace(&'static str),
    #[display(fmt = "no such file or directory")]
    NotFound,
    #[display(fmt = "not a directory")]
    NotADirectory,
    #[display(fmt = "file exists")]
    AlreadyExists,
    #[display(fmt = "invalid argument: {}", _0)]
    InvalidArgument(&'static str),
    #[display(fmt = "corrupted filesystem: {}", _0)]
    Corrupted(&'static str),
}

impl Error {
    /// 折叠成交给系统调用适配层的错误种类
    pub fn kind(&self) -> vfs::Error {
        match self {
            Self::Io(_) | Self::Codec(_) | Self::Corrupted(_) => vfs::Error::Io,
            Self::NoSpace(_) => vfs::Error::NoSpace,
            Self::NotFound => vfs::Error::NotFound,
            Self::NotADirectory => vfs::Error::NotADirectory,
            Self::AlreadyExists => vfs::Error::AlreadyExists,
            Self::InvalidArgument(_) => vfs::Error::InvalidArgument,
        }
    }
}

impl From<DeviceError> for Error {
    #[inline]
    fn from(err: DeviceError) -> Self {
        Self::Io(err)
    }
}

impl From<binrw::Error> for Error {
    #[inline]
    fn from(err: binrw::Error) -> Self {
        Self::Codec(err)
    }
}

impl From<Error> for vfs::Error {
    #[inline]
    fn from(err: Error) -> Self {
        err.kind()
    }
}
