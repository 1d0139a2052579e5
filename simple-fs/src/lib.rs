#![no_std]

extern crate alloc;

/* simple-fs 的整体架构，自上而下 */

// 文件系统操作层：格式化、挂载以及按 inode 编号访问的匿名文件
mod sfs;
pub use sfs::SimpleFileSystem;
pub use sfs::{DebugReport, InodeReport};

// 磁盘数据结构层：表示磁盘文件系统的数据结构
mod layout;
pub use layout::{Block, Inode, SuperBlock};

// 错误类型
mod error;
pub use error::FsError;

// 磁盘块设备接口层：读写磁盘块设备的接口
mod block_dev;
pub use block_dev::{BlockDevice, DiskError};

pub const MAGIC: u32 = 0xf0f0_3410;
pub const BLOCK_SIZE: usize = 4096;
pub const INODES_PER_BLOCK: usize = 128;
pub const POINTERS_PER_INODE: usize = 5;
pub const POINTERS_PER_BLOCK: usize = BLOCK_SIZE / 4;

/// 单个文件的最大字节数：直接指针加上一整个间接索引块
pub const MAX_FILE_SIZE: usize = BLOCK_SIZE * (POINTERS_PER_INODE + POINTERS_PER_BLOCK);
