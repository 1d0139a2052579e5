//! 磁盘镜像驱动：[`BlockFile`] 把宿主机上的一个普通文件当作块设备使用。

#[cfg(test)]
mod tests;

use std::fs::OpenOptions;
use std::io;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use simple_fs::{BlockDevice, DiskError, BLOCK_SIZE};

/// 文件形态的块设备。
/// 记录累计读写次数，关闭（析构）时汇报。
pub struct BlockFile {
    file: Mutex<std::fs::File>,
    blocks: usize,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl BlockFile {
    /// 打开（必要时创建）镜像文件并截断到 `blocks * BLOCK_SIZE` 字节
    pub fn open(path: impl AsRef<Path>, blocks: usize) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        file.set_len((blocks * BLOCK_SIZE) as u64)?;

        Ok(Self {
            file: Mutex::new(file),
            blocks,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        })
    }

    #[inline]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    fn check_range(&self, block_id: usize, buf_len: usize) -> Result<(), DiskError> {
        if block_id >= self.blocks {
            return Err(DiskError::OutOfRange);
        }
        if buf_len != BLOCK_SIZE {
            return Err(DiskError::InvalidBuffer);
        }
        Ok(())
    }
}

impl BlockDevice for BlockFile {
    fn total_blocks(&self) -> usize {
        self.blocks
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DiskError> {
        self.check_range(block_id, buf.len())?;

        let mut file = self.file.lock().unwrap();
        read_at(&mut file, block_id, buf).map_err(|e| {
            log::error!("read of block {block_id} failed: {e}");
            DiskError::Io
        })?;

        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DiskError> {
        self.check_range(block_id, buf.len())?;

        let mut file = self.file.lock().unwrap();
        write_at(&mut file, block_id, buf).map_err(|e| {
            log::error!("write of block {block_id} failed: {e}");
            DiskError::Io
        })?;

        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl Drop for BlockFile {
    fn drop(&mut self) {
        log::info!("closing disk: {} reads, {} writes", self.reads(), self.writes());
    }
}

fn read_at(file: &mut std::fs::File, block_id: usize, buf: &mut [u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))?;
    file.read_exact(buf)
}

fn write_at(file: &mut std::fs::File, block_id: usize, buf: &[u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))?;
    file.write_all(buf)
}
