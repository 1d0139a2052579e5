use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use simple_fs::{BlockDevice, DiskError, FsError, SimpleFileSystem, BLOCK_SIZE};

use crate::BlockFile;

fn temp_image(name: &str) -> PathBuf {
    env::temp_dir().join(format!("sfs-{}-{name}.img", std::process::id()))
}

#[test]
fn image_survives_reopen() {
    let path = temp_image("reopen");

    {
        let device: Arc<dyn BlockDevice> = Arc::new(BlockFile::open(&path, 100).unwrap());
        SimpleFileSystem::format(device.as_ref()).unwrap();

        let mut fs = SimpleFileSystem::new();
        fs.mount(device).unwrap();
        let inumber = fs.create().unwrap();
        assert_eq!(fs.write(inumber, b"hello", 0), Ok(5));
        fs.unmount().unwrap();
    }

    {
        let device: Arc<dyn BlockDevice> = Arc::new(BlockFile::open(&path, 100).unwrap());
        let mut fs = SimpleFileSystem::new();
        fs.mount(device).unwrap();

        assert_eq!(fs.stat(0), Ok(5));
        let mut buf = [0; 5];
        assert_eq!(fs.read(0, &mut buf, 0), Ok(5));
        assert_eq!(&buf, b"hello");
        fs.unmount().unwrap();
    }

    fs::remove_file(&path).unwrap();
}

#[test]
fn reopened_image_without_format_has_no_magic() {
    let path = temp_image("nomagic");

    let device: Arc<dyn BlockDevice> = Arc::new(BlockFile::open(&path, 20).unwrap());
    let mut fs = SimpleFileSystem::new();
    assert_eq!(fs.mount(device), Err(FsError::BadMagic));

    fs::remove_file(&path).unwrap();
}

#[test]
fn counts_reads_and_writes() {
    let path = temp_image("counts");
    let device = BlockFile::open(&path, 10).unwrap();

    let mut buf = [0u8; BLOCK_SIZE];
    device.read_block(0, &mut buf).unwrap();
    device.write_block(1, &buf).unwrap();
    assert_eq!(device.reads(), 1);
    assert_eq!(device.writes(), 1);

    assert_eq!(device.read_block(10, &mut buf), Err(DiskError::OutOfRange));
    assert_eq!(device.write_block(3, &buf[..7]), Err(DiskError::InvalidBuffer));
    assert_eq!(device.reads(), 1);
    assert_eq!(device.writes(), 1);

    drop(device);
    fs::remove_file(&path).unwrap();
}

#[test]
fn fresh_image_reads_back_zeroes() {
    let path = temp_image("zeroes");
    let device = BlockFile::open(&path, 4).unwrap();

    let mut buf = [0xffu8; BLOCK_SIZE];
    device.read_block(3, &mut buf).unwrap();
    assert!(buf.iter().all(|&b| b == 0));

    drop(device);
    fs::remove_file(&path).unwrap();
}
