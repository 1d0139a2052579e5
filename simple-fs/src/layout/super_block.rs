use crate::{INODES_PER_BLOCK, MAGIC};

/// 超级块：
/// - 提供文件系统合法性校验；
/// - 记录磁盘与索引节点表的规模
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct SuperBlock {
    /// 魔数：用于校验文件系统合法性
    magic: u32,
    /// 文件系统占据块数
    pub blocks: u32,
    /// 索引节点表占据块数，固定为总块数的十分之一向上取整
    pub inode_blocks: u32,
    /// 索引节点总数
    pub inodes: u32,
}

impl SuperBlock {
    #[inline]
    pub fn init(&mut self, blocks: u32) {
        let inode_blocks = blocks.div_ceil(10);
        *self = Self {
            magic: MAGIC,
            blocks,
            inode_blocks,
            inodes: inode_blocks * INODES_PER_BLOCK as u32,
        };
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC
    }

    /// 数据区域的首块：越过超级块与索引节点表
    #[inline]
    pub fn data_start(&self) -> usize {
        1 + self.inode_blocks as usize
    }
}
