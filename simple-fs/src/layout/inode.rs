use core::mem;

use crate::{BLOCK_SIZE, INODES_PER_BLOCK, POINTERS_PER_INODE};

/// 索引节点：一份 32 字节的记录，描述一个匿名文件的大小与块指针。
///
/// 指针值为绝对块编号；0 表示"未分配"。
/// 块 0 是超级块，不可能作为数据指针出现，因此 0 可以安全地充当哨兵。
#[derive(Debug, Default, Clone, Copy)]
#[repr(C)]
pub struct Inode {
    /// 1 表示在用，0 表示空槽位
    pub valid: u32,
    /// 文件大小（字节）
    pub size: u32,
    /// 直接指针
    pub(crate) direct: [u32; POINTERS_PER_INODE],
    /// 间接索引块的指针
    pub(crate) indirect: u32,
}

// 索引节点的磁盘布局恰好填满一个块
const _: () = assert!(mem::size_of::<Inode>() * INODES_PER_BLOCK == BLOCK_SIZE);

impl Inode {
    /// 占用一个空槽位：大小与所有指针归零
    #[inline]
    pub fn init(&mut self) {
        *self = Self {
            valid: 1,
            ..Default::default()
        };
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid == 1
    }

    /// 文件是否已经越过直接指针的容量，启用了间接索引块
    #[inline]
    pub fn uses_indirect(&self) -> bool {
        self.size as usize > BLOCK_SIZE * POINTERS_PER_INODE
    }
}
