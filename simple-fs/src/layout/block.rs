use core::mem;

use crate::block_dev::{BlockDevice, DiskError};
use crate::layout::{Inode, SuperBlock};
use crate::{BLOCK_SIZE, INODES_PER_BLOCK, POINTERS_PER_BLOCK};

/// 间接索引块：整个块连续存储块编号，每个编号指向一个数据块
pub type IndirectBlock = [u32; POINTERS_PER_BLOCK];

/// 索引节点块
pub type InodeBlock = [Inode; INODES_PER_BLOCK];

/// 一个块的内存镜像。
///
/// 磁盘上的字节是唯一事实，四种类型视图都是临时的：
/// 超级块、索引节点数组、间接索引块、原始数据。
#[repr(C, align(8))]
pub struct Block([u8; BLOCK_SIZE]);

impl Block {
    #[inline]
    pub fn zeroed() -> Self {
        Self([0; BLOCK_SIZE])
    }

    /// 从设备读入一个块
    pub fn read_from(device: &dyn BlockDevice, block_id: usize) -> Result<Self, DiskError> {
        let mut block = Self::zeroed();
        device.read_block(block_id, &mut block.0)?;
        Ok(block)
    }

    /// 把整个块写回设备
    #[inline]
    pub fn write_to(&self, device: &dyn BlockDevice, block_id: usize) -> Result<(), DiskError> {
        device.write_block(block_id, &self.0)
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    #[inline]
    pub fn as_super(&self) -> &SuperBlock {
        self.view()
    }

    #[inline]
    pub fn as_super_mut(&mut self) -> &mut SuperBlock {
        self.view_mut()
    }

    #[inline]
    pub fn as_inodes(&self) -> &InodeBlock {
        self.view()
    }

    #[inline]
    pub fn as_inodes_mut(&mut self) -> &mut InodeBlock {
        self.view_mut()
    }

    #[inline]
    pub fn as_pointers(&self) -> &IndirectBlock {
        self.view()
    }

    #[inline]
    pub fn as_pointers_mut(&mut self) -> &mut IndirectBlock {
        self.view_mut()
    }
}

impl Block {
    fn view<T: Sized>(&self) -> &T {
        const {
            assert!(mem::size_of::<T>() <= BLOCK_SIZE);
            assert!(mem::align_of::<T>() <= mem::align_of::<Block>());
        }
        let addr = self.0.as_ptr().cast();
        unsafe { &*addr }
    }

    fn view_mut<T: Sized>(&mut self) -> &mut T {
        const {
            assert!(mem::size_of::<T>() <= BLOCK_SIZE);
            assert!(mem::align_of::<T>() <= mem::align_of::<Block>());
        }
        let addr = self.0.as_mut_ptr().cast();
        unsafe { &mut *addr }
    }
}
