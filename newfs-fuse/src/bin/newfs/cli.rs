use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
pub struct Cli {
    /// Disk image acting as the block device
    #[arg(long, short)]
    pub device: PathBuf,

    /// Native I/O unit of the device in bytes
    #[arg(long, default_value_t = 512)]
    pub io_size: usize,

    /// Inode region size in logical blocks, used only when formatting
    #[arg(long, default_value_t = newfs::INODE_BLOCKS)]
    pub inode_blocks: u32,

    /// Create a zero-filled image of this many MiB before mounting
    #[arg(long, value_name = "MiB")]
    pub create: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the superblock
    Info,
    /// List a directory
    Ls { path: String },
    /// Print the metadata of a file or directory
    Stat { path: String },
    /// Print the whole cached tree below a directory
    Tree {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Create a directory
    Mkdir { path: String },
    /// Create an empty regular file
    Touch { path: String },
}
