mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use block_dev::BlockDevice;
use clap::Parser;
use newfs::{Config, DentryId, NewFileSystem};
use newfs_fuse::BlockFile;
use typed_bytesize::ByteSizeIec;
use vfs::DirEntryType;

use self::cli::{Cli, Command};

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let device = match open_device(&cli) {
        Ok(device) => device,
        Err(err) => {
            eprintln!("{}: {err}", cli.device.display());
            return ExitCode::FAILURE;
        }
    };

    let config = Config {
        inode_blocks: cli.inode_blocks,
    };
    let mut fs = match NewFileSystem::mount(device, &config) {
        Ok(fs) => fs,
        Err(err) => {
            eprintln!("mount: {err}");
            return ExitCode::from(err.kind().errno() as u8);
        }
    };

    // 命令失败也要落盘
    let result = run(&mut fs, &cli.command);
    let unmounted = fs.unmount();
    if let Err(err) = &result {
        eprintln!("newfs: {err}");
    }
    if let Err(err) = &unmounted {
        log::error!("unmounting {}: {err}", cli.device.display());
        eprintln!("unmount: {err}");
    }

    // 退出码取第一个错误
    match result.and(unmounted) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => ExitCode::from(err.kind().errno() as u8),
    }
}

fn open_device(cli: &Cli) -> std::io::Result<Arc<dyn BlockDevice>> {
    let file = match cli.create {
        Some(mib) => BlockFile::create(&cli.device, ByteSizeIec::mib(mib).0, cli.io_size)?,
        None => BlockFile::open(&cli.device, cli.io_size)?,
    };

    Ok(Arc::new(file))
}

fn run(fs: &mut NewFileSystem, command: &Command) -> newfs::Result<()> {
    match command {
        Command::Info => {
            let super_block = fs.super_block();
            println!("{super_block:#?}");
            println!(
                "inodes in use: {}/{}",
                fs.inode_bitmap().count(),
                super_block.max_ino
            );
            println!(
                "data blocks in use: {}/{}",
                fs.data_bitmap().count(),
                super_block.max_data
            );
        }
        Command::Ls { path } => {
            let dir = fs.resolve(path)?;
            for offset in 0.. {
                let Some(entry) = fs.readdir(dir, offset)? else {
                    break;
                };
                let suffix = if entry.ty.is_dir() { "/" } else { "" };
                println!("{:>5} {}{suffix}", entry.inode, entry.name);
            }
        }
        Command::Stat { path } => {
            let dentry = fs.resolve(path)?;
            let stat = fs.stat(dentry)?;
            println!("{path}");
            println!("  inode: {}", stat.inode);
            println!("  mode:  {:o}", stat.st_mode());
            println!("  links: {}", stat.nlink());
            println!("  size:  {}", stat.size);
            println!("  blocks: {} x {}", stat.blocks, stat.block_size);
        }
        Command::Tree { path } => {
            let dir = fs.resolve(path)?;
            print_tree(fs, dir, 0)?;
        }
        Command::Mkdir { path } => {
            fs.create(path, DirEntryType::Directory)?;
        }
        Command::Touch { path } => {
            fs.create(path, DirEntryType::Regular)?;
        }
    }

    Ok(())
}

fn print_tree(fs: &mut NewFileSystem, dentry: DentryId, depth: usize) -> newfs::Result<()> {
    let entry = fs.tree().dentry(dentry);
    let name = if entry.is_root() { "" } else { entry.name() };
    let suffix = if entry.kind().is_dir() { "/" } else { "" };
    println!("{:indent$}{name}{suffix}", "", indent = depth * 2);
    if !entry.kind().is_dir() {
        return Ok(());
    }

    let dir = fs.inode_of(dentry)?;
    let children: Vec<DentryId> = fs.tree().children(dir).collect();
    for child in children {
        print_tree(fs, child, depth + 1)?;
    }

    Ok(())
}
