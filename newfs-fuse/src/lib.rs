#[cfg(test)]
mod tests;

mod block_file;

pub use self::block_file::BlockFile;
