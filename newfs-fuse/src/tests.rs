use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use block_dev::{BlockDevice, DeviceError, Query};
use newfs::{Config, Error, MAGIC, NewFileSystem};
use vfs::DirEntryType;

use crate::BlockFile;

const IMAGE_SIZE: u64 = 4 * 1024 * 1024;

/// 每个测试各用一个镜像，避免并行测试互相踩踏
fn image(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("newfs-{}-{name}.img", std::process::id()))
}

#[test]
fn image_geometry() {
    let path = image("geometry");
    let disk = BlockFile::create(&path, IMAGE_SIZE, 512).unwrap();
    assert_eq!(disk.query(Query::Capacity), Ok(IMAGE_SIZE as usize));
    assert_eq!(disk.query(Query::IoSize), Ok(512));

    let mut buf = [0xAB; 512];
    disk.write_block(7, &buf).unwrap();
    buf.fill(0);
    disk.read_block(7, &mut buf).unwrap();
    assert_eq!(buf, [0xAB; 512]);

    assert_eq!(
        disk.read_block(IMAGE_SIZE as usize / 512, &mut buf),
        Err(DeviceError::OutOfRange(8192))
    );
    assert_eq!(disk.write_block(0, &[0; 16]), Err(DeviceError::Misaligned(16)));

    fs::remove_file(path).unwrap();
}

#[test]
fn image_survives_remount() {
    let path = image("remount");
    let disk = Arc::new(BlockFile::create(&path, IMAGE_SIZE, 512).unwrap());
    let mut nfs = NewFileSystem::mount(disk, &Config::default()).unwrap();
    nfs.create("/home", DirEntryType::Directory).unwrap();
    nfs.create("/home/user", DirEntryType::Directory).unwrap();
    nfs.create("/home/user/notes.txt", DirEntryType::Regular).unwrap();
    nfs.unmount().unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes[..4], MAGIC.to_le_bytes());

    let disk = Arc::new(BlockFile::open(&path, 512).unwrap());
    let mut nfs = NewFileSystem::mount(disk, &Config::default()).unwrap();
    let notes = nfs.resolve("/home/user/notes.txt").unwrap();
    let stat = nfs.stat(notes).unwrap();
    assert_eq!(stat.mode, DirEntryType::Regular);
    assert!(matches!(
        nfs.create("/home/user", DirEntryType::Directory),
        Err(Error::AlreadyExists)
    ));
    nfs.unmount().unwrap();

    fs::remove_file(path).unwrap();
}
