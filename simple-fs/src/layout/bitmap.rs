use alloc::vec;
use alloc::vec::Vec;

/// 空闲块位图，覆盖 `[0, blocks)` 的每一块；置位表示已分配。
///
/// 位图不落盘：挂载时以索引节点表为事实来源重建，卸载时随句柄丢弃。
/// 超级块与索引节点表所在的保留块在创建时永久置位，永远不会被分配出去。
#[derive(Debug, PartialEq, Eq)]
pub struct Bitmap {
    /// 打包的位组，每组 64 块
    groups: Vec<u64>,
    /// 位图覆盖的总块数
    blocks: usize,
    /// 数据区域的首块，分配从这里开始扫描
    data_start: usize,
}

impl Bitmap {
    /// 创建全空位图并把 `[0, data_start)` 的保留块置位
    pub fn new(blocks: usize, data_start: usize) -> Self {
        let mut bitmap = Self {
            groups: vec![0; blocks.div_ceil(64)],
            blocks,
            data_start,
        };
        for block in 0..data_start {
            bitmap.set(block as u32);
        }
        bitmap
    }

    /// 在数据区域内分配一块并返回其编号；空间用尽则返回空。
    /// 固定取编号最小的空闲块，结果是确定性的。
    pub fn alloc(&mut self) -> Option<u32> {
        for group_index in self.data_start / 64..self.groups.len() {
            let bits = self.groups[group_index];
            if bits == u64::MAX {
                continue;
            }

            let ingroup_index = bits.trailing_ones() as usize;
            let block = group_index * 64 + ingroup_index;
            if block >= self.blocks {
                return None;
            }

            self.groups[group_index] |= 1 << ingroup_index;
            return Some(block as u32);
        }

        None
    }

    /// 置位。越界的编号直接忽略，磁盘上的过期指针不可信。
    pub fn set(&mut self, block: u32) {
        let block = block as usize;
        if block >= self.blocks {
            return;
        }
        self.groups[block / 64] |= 1 << (block % 64);
    }

    /// 清位。重复释放是无害的空操作，保留块不可释放。
    pub fn free(&mut self, block: u32) {
        let block = block as usize;
        if block < self.data_start || block >= self.blocks {
            return;
        }
        self.groups[block / 64] &= !(1 << (block % 64));
    }

    /// 查询某块是否已分配
    #[inline]
    pub fn is_set(&self, block: u32) -> bool {
        let block = block as usize;
        block < self.blocks && self.groups[block / 64] & (1 << (block % 64)) != 0
    }
}
